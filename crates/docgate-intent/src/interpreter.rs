//! Natural-language command interpreter.
//!
//! A command is lower-cased and trimmed, then tried against an ordered list
//! of rules.  The first rule whose predicate holds extracts an [`Intent`];
//! later rules are never consulted.  Extraction is pure; executing an intent
//! is the only step that touches the data access facade.
//!
//! | # | Rule | Trigger |
//! |---|------|---------|
//! | 1 | list collections | ("list" or "show") and "collection" |
//! | 2 | list employees | "list" and "employee" |
//! | 3 | ownership | `who owns/has/own <vehicle>` |
//! | 4 | department | `which/who ... from <department>` |
//! | 5 | natural filter | "show", "find" or "filter" |
//! | 6 | insert | "add", "insert" or "create" |
//! | 7 | delete | "remove" or "delete" |
//!
//! Keyword triggers are substring tests, found in one pass with an
//! Aho-Corasick automaton.

use std::sync::Arc;

use aho_corasick::AhoCorasick;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use docgate_adapters::{DataAccess, DEFAULT_QUERY_LIMIT, Envelope};
use docgate_store::{Document, Filter};

use crate::error::{IntentError, Result};
use crate::filters::{
    capitalize, department_filter, name_filter, natural_filter, title_case, vehicle_filter,
};
use crate::table::{NO_RECORDS, format_table};

/// Collection every employee command operates on.
pub const EMPLOYEES: &str = "employees";

/// Result limit of ownership, department and filter queries.
pub const SEARCH_LIMIT: usize = 200;

/// Salary stored when an insert command names none.
pub const DEFAULT_SALARY: i64 = 50_000;

/// Reply to commands no rule recognizes.
pub const NOT_RECOGNIZED: &str = "Command not recognized. Try: 'who owns Honda Shine', \
     'list employees', 'show engineers from Thane above 60000', \
     'add new engineer named Rohan in Pune with salary 85000'.";

// ---------------------------------------------------------------------------
// Intent
// ---------------------------------------------------------------------------

/// What a command asks for, with its extracted parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    ListCollections,
    ListEmployees,
    Ownership { vehicle: String, filter: Filter },
    Department { department: String, filter: Filter },
    NaturalFilter { filter: Filter },
    Insert { record: Document },
    Delete { filter: Filter },
    Unrecognized,
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// Keywords tested by rule predicates.  Discriminants index [`KEYWORDS`].
#[derive(Debug, Clone, Copy)]
enum Keyword {
    List,
    Show,
    Collection,
    Employee,
    Find,
    Filter,
    Add,
    Insert,
    Create,
    Remove,
    Delete,
}

const KEYWORDS: [&str; 11] = [
    "list",
    "show",
    "collection",
    "employee",
    "find",
    "filter",
    "add",
    "insert",
    "create",
    "remove",
    "delete",
];

const DEPARTMENTS: &str = r"(engineer|sales|finance|hr|marketing|frappe)";

const OWNERSHIP: &str = r"who (?:owns|has|own) (?:a |an |the )?(.+)";
const DEPARTMENT_LOOKUP: &str = r"(?:which|who).*\bfrom\b\s+([a-zA-Z0-9_\- ]+)";
const DEPARTMENT_SUFFIX: &str = r"\s+(?:department|dept)$";
const CITY_FROM: &str = r"from\s+([a-zA-Z]+)";
const SALARY_ABOVE: &str = r"(?:above|greater than|over)\s*(\d+)";
const INSERT_NAME: &str =
    r"named\s+([a-z]+(?:\s+[a-z]+)*?)(?:\s+(?:in|with|from|salary)\b|[^a-z\s]|\s*$)";
const INSERT_CITY: &str = r"\bin\s+([a-z]+)";
const INSERT_SALARY: &str = r"salary\s*(\d+)";
const DELETE_NAME: &str =
    r"\b(?:named|employee)\s+(?:named\s+)?([a-z]+(?:\s+[a-z]+)*?)(?:\s+from\b|[^a-z\s]|\s*$)";
const DELETE_DEPARTMENT: &str = r"from\s+(?:the\s+)?([a-zA-Z]+)";
const PUNCTUATION: &str = r"[^\w\s\-]";

/// Every pattern the rules use, compiled once.
struct Patterns {
    keywords: AhoCorasick,
    departments: Regex,
    ownership: Regex,
    department_lookup: Regex,
    department_suffix: Regex,
    city_from: Regex,
    salary_above: Regex,
    insert_name: Regex,
    insert_city: Regex,
    insert_salary: Regex,
    delete_name: Regex,
    delete_department: Regex,
    punctuation: Regex,
}

fn compile(pattern: &'static str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| IntentError::InvalidPattern { pattern, source })
}

impl Patterns {
    fn new() -> Result<Self> {
        Ok(Self {
            keywords: AhoCorasick::new(KEYWORDS)?,
            departments: compile(DEPARTMENTS)?,
            ownership: compile(OWNERSHIP)?,
            department_lookup: compile(DEPARTMENT_LOOKUP)?,
            department_suffix: compile(DEPARTMENT_SUFFIX)?,
            city_from: compile(CITY_FROM)?,
            salary_above: compile(SALARY_ABOVE)?,
            insert_name: compile(INSERT_NAME)?,
            insert_city: compile(INSERT_CITY)?,
            insert_salary: compile(INSERT_SALARY)?,
            delete_name: compile(DELETE_NAME)?,
            delete_department: compile(DELETE_DEPARTMENT)?,
            punctuation: compile(PUNCTUATION)?,
        })
    }

    /// Bit set of the keywords occurring anywhere in `text`.
    fn keywords_in(&self, text: &str) -> u32 {
        self.keywords
            .find_overlapping_iter(text)
            .fold(0, |set, m| set | (1 << m.pattern().as_usize()))
    }
}

/// First capture group of `re` in `text`, if it matched.
fn capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn parse_number(digits: &str) -> Result<i64> {
    digits.parse().map_err(|_| IntentError::InvalidNumber {
        text: digits.to_owned(),
    })
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// One normalized command being classified.
struct Input<'a> {
    text: &'a str,
    keywords: u32,
    now: DateTime<Utc>,
}

impl Input<'_> {
    fn has(&self, keyword: Keyword) -> bool {
        self.keywords & (1 << keyword as u32) != 0
    }

    fn has_any(&self, keywords: &[Keyword]) -> bool {
        keywords.iter().any(|k| self.has(*k))
    }
}

struct Rule {
    name: &'static str,
    matches: fn(&Patterns, &Input<'_>) -> bool,
    extract: fn(&Patterns, &Input<'_>) -> Result<Intent>,
}

const RULES: [Rule; 7] = [
    Rule {
        name: "list_collections",
        matches: is_list_collections,
        extract: extract_list_collections,
    },
    Rule {
        name: "list_employees",
        matches: is_list_employees,
        extract: extract_list_employees,
    },
    Rule {
        name: "ownership",
        matches: is_ownership,
        extract: extract_ownership,
    },
    Rule {
        name: "department",
        matches: is_department,
        extract: extract_department,
    },
    Rule {
        name: "natural_filter",
        matches: is_natural_filter,
        extract: extract_natural_filter,
    },
    Rule {
        name: "insert",
        matches: is_insert,
        extract: extract_insert,
    },
    Rule {
        name: "delete",
        matches: is_delete,
        extract: extract_delete,
    },
];

fn is_list_collections(_: &Patterns, input: &Input<'_>) -> bool {
    input.has_any(&[Keyword::List, Keyword::Show]) && input.has(Keyword::Collection)
}

fn extract_list_collections(_: &Patterns, _: &Input<'_>) -> Result<Intent> {
    Ok(Intent::ListCollections)
}

fn is_list_employees(_: &Patterns, input: &Input<'_>) -> bool {
    input.has(Keyword::List) && input.has(Keyword::Employee)
}

fn extract_list_employees(_: &Patterns, _: &Input<'_>) -> Result<Intent> {
    Ok(Intent::ListEmployees)
}

fn is_ownership(p: &Patterns, input: &Input<'_>) -> bool {
    p.ownership.is_match(input.text)
}

fn extract_ownership(p: &Patterns, input: &Input<'_>) -> Result<Intent> {
    let raw = capture(&p.ownership, input.text).unwrap_or_default().trim();
    let vehicle = p.punctuation.replace_all(raw, "").into_owned();
    let filter = vehicle_filter(&vehicle);
    Ok(Intent::Ownership { vehicle, filter })
}

fn is_department(p: &Patterns, input: &Input<'_>) -> bool {
    p.department_lookup.is_match(input.text)
}

fn extract_department(p: &Patterns, input: &Input<'_>) -> Result<Intent> {
    let raw = capture(&p.department_lookup, input.text).unwrap_or_default().trim();
    let raw = p.department_suffix.replace(raw, "");
    let department = title_case(raw.trim());
    let filter = department_filter(&department);
    Ok(Intent::Department { department, filter })
}

fn is_natural_filter(_: &Patterns, input: &Input<'_>) -> bool {
    input.has_any(&[Keyword::Show, Keyword::Find, Keyword::Filter])
}

fn extract_natural_filter(p: &Patterns, input: &Input<'_>) -> Result<Intent> {
    let department = capture(&p.departments, input.text).map(capitalize);
    let city = capture(&p.city_from, input.text).map(capitalize);
    let salary = capture(&p.salary_above, input.text)
        .map(parse_number)
        .transpose()?;
    let filter = natural_filter(department.as_deref(), city.as_deref(), salary);
    Ok(Intent::NaturalFilter { filter })
}

fn is_insert(_: &Patterns, input: &Input<'_>) -> bool {
    input.has_any(&[Keyword::Add, Keyword::Insert, Keyword::Create])
}

fn extract_insert(p: &Patterns, input: &Input<'_>) -> Result<Intent> {
    let text = input.text;
    let name = capture(&p.insert_name, text).ok_or(IntentError::MissingDetails { field: "name" })?;
    let department = capture(&p.departments, text)
        .ok_or(IntentError::MissingDetails { field: "department" })?;
    let city = capture(&p.insert_city, text).ok_or(IntentError::MissingDetails { field: "city" })?;
    let salary = capture(&p.insert_salary, text)
        .map(parse_number)
        .transpose()?
        .unwrap_or(DEFAULT_SALARY);

    let mut record = Document::new();
    record.insert("name".into(), Value::from(title_case(name.trim())));
    record.insert("department".into(), Value::from(capitalize(department)));
    record.insert("salary".into(), Value::from(salary));
    record.insert("city".into(), Value::from(capitalize(city)));
    record.insert(
        "joinDate".into(),
        Value::from(input.now.to_rfc3339_opts(SecondsFormat::Micros, true)),
    );
    Ok(Intent::Insert { record })
}

fn is_delete(_: &Patterns, input: &Input<'_>) -> bool {
    input.has_any(&[Keyword::Remove, Keyword::Delete])
}

fn extract_delete(p: &Patterns, input: &Input<'_>) -> Result<Intent> {
    let name = capture(&p.delete_name, input.text)
        .map(str::trim)
        .filter(|name| !starts_with_marker(name))
        .ok_or(IntentError::MissingName)?;
    let name = title_case(name);
    let department = capture(&p.delete_department, input.text).map(capitalize);
    Ok(Intent::Delete {
        filter: name_filter(&name, department.as_deref()),
    })
}

/// A delete capture that begins with one of its own marker words means no
/// name followed the marker, as in "delete employee named".
fn starts_with_marker(name: &str) -> bool {
    matches!(name.split_whitespace().next(), Some("named" | "from"))
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Maps command text to an [`Intent`] without performing any I/O.
pub struct IntentClassifier {
    patterns: Patterns,
}

impl IntentClassifier {
    /// Compile every rule pattern.
    pub fn new() -> Result<Self> {
        Ok(Self {
            patterns: Patterns::new()?,
        })
    }

    /// Classify `command`, stamping inserts with the current time.
    pub fn classify(&self, command: &str) -> Result<Intent> {
        self.classify_at(command, Utc::now())
    }

    /// Classify `command`, stamping inserts with `now`.
    pub fn classify_at(&self, command: &str, now: DateTime<Utc>) -> Result<Intent> {
        let text = command.trim().to_lowercase();
        let input = Input {
            keywords: self.patterns.keywords_in(&text),
            text: &text,
            now,
        };

        for rule in &RULES {
            if (rule.matches)(&self.patterns, &input) {
                debug!(rule = rule.name, "command matched");
                return (rule.extract)(&self.patterns, &input);
            }
        }
        Ok(Intent::Unrecognized)
    }
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

/// Classifies commands and executes them against a [`DataAccess`].
pub struct CommandInterpreter {
    classifier: IntentClassifier,
    access: Arc<dyn DataAccess>,
}

impl CommandInterpreter {
    /// Create an interpreter forwarding to `access`.
    pub fn new(access: Arc<dyn DataAccess>) -> Result<Self> {
        Ok(Self {
            classifier: IntentClassifier::new()?,
            access,
        })
    }

    /// The pure classification step.
    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    /// Interpret one command.  Always answers with exactly one envelope.
    pub async fn interpret(&self, command: &str) -> Envelope {
        info!(command, "interpreting command");
        match self.classifier.classify(command) {
            Ok(intent) => self.execute(intent).await,
            Err(e) => {
                debug!(error = %e, "command rejected");
                Envelope::error(e.to_string())
            }
        }
    }

    /// Execute an already classified intent.
    pub async fn execute(&self, intent: Intent) -> Envelope {
        match intent {
            Intent::ListCollections => self.access.list_collections().await,
            Intent::ListEmployees => {
                let result = self
                    .access
                    .query(EMPLOYEES, Filter::empty(), DEFAULT_QUERY_LIMIT)
                    .await;
                if !result.is_success() {
                    return result;
                }
                let docs = result.documents("documents");
                Envelope::success().with("table", format_table(&docs, None))
            }
            Intent::Ownership { vehicle, filter } => {
                let result = self.access.query(EMPLOYEES, filter, SEARCH_LIMIT).await;
                if !result.is_success() {
                    return result;
                }
                let docs = result.documents("documents");
                if docs.is_empty() {
                    return Envelope::success()
                        .with("message", format!("No employees found owning '{vehicle}'"))
                        .with("table", NO_RECORDS);
                }
                Envelope::success()
                    .with("vehicle", vehicle)
                    .with("table", format_table(&docs, None))
            }
            Intent::Department { department, filter } => {
                let result = self.access.query(EMPLOYEES, filter, SEARCH_LIMIT).await;
                if !result.is_success() {
                    return result;
                }
                let docs = result.documents("documents");
                if docs.is_empty() {
                    return Envelope::success()
                        .with(
                            "message",
                            format!("No employees found in department '{department}'"),
                        )
                        .with("table", NO_RECORDS);
                }
                Envelope::success()
                    .with("department", department)
                    .with("table", format_table(&docs, None))
            }
            Intent::NaturalFilter { filter } => {
                let result = self
                    .access
                    .query(EMPLOYEES, filter.clone(), SEARCH_LIMIT)
                    .await;
                if !result.is_success() {
                    return result;
                }
                let docs = result.documents("documents");
                Envelope::success()
                    .with("filter", filter.into_value())
                    .with("table", format_table(&docs, None))
            }
            Intent::Insert { record } => self.access.insert(EMPLOYEES, record).await,
            Intent::Delete { filter } => self.access.delete(EMPLOYEES, filter).await,
            Intent::Unrecognized => Envelope::success().with("message", NOT_RECOGNIZED),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
