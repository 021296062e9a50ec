//! # docgate-intent
//!
//! Turns plain-English commands ("who owns Honda Shine", "list employees",
//! "add new engineer named Rohan in Pune") into calls on a
//! [`docgate_adapters::DataAccess`] and renders the results as markdown
//! tables.
//!
//! ```ignore
//! let interpreter = CommandInterpreter::new(access)?;
//! let reply = interpreter.interpret("show engineers from Thane above 60000").await;
//! println!("{}", reply.get("table").and_then(|t| t.as_str()).unwrap_or_default());
//! ```

pub mod adapter;
pub mod error;
pub mod filters;
pub mod interpreter;
pub mod table;

pub use adapter::CommandAdapter;
pub use error::{IntentError, Result};
pub use interpreter::{CommandInterpreter, Intent, IntentClassifier};
pub use table::format_table;
