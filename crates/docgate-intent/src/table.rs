//! Markdown rendering of query results.

use std::collections::HashSet;

use serde_json::Value;

use docgate_store::Document;

/// Columns rendered when the caller does not pick any.
pub const DEFAULT_COLUMNS: [&str; 6] = ["_id", "name", "department", "salary", "city", "joinDate"];

/// Text returned for an empty result set.
pub const NO_RECORDS: &str = "No records found.";

/// Render `records` as a markdown table.
///
/// Records sharing a non-empty `name` are collapsed to the first one;
/// nameless records are always kept.
pub fn format_table(records: &[Document], columns: Option<&[&str]>) -> String {
    if records.is_empty() {
        return NO_RECORDS.to_owned();
    }
    let columns = columns.unwrap_or(&DEFAULT_COLUMNS);

    let mut out = String::new();
    push_row(&mut out, columns.iter().map(|c| (*c).to_owned()));
    push_row(&mut out, columns.iter().map(|_| "---".to_owned()));

    let mut seen = HashSet::new();
    for record in records {
        if let Some(name) = dedup_key(record)
            && !seen.insert(name)
        {
            continue;
        }
        push_row(&mut out, columns.iter().map(|c| cell(record.get(*c))));
    }
    out
}

fn push_row(out: &mut String, cells: impl Iterator<Item = String>) {
    out.push('|');
    for cell in cells {
        out.push(' ');
        out.push_str(&cell);
        out.push_str(" |");
    }
    out.push('\n');
}

fn dedup_key(record: &Document) -> Option<String> {
    match record.get("name")? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_input() {
        assert_eq!(format_table(&[], None), "No records found.");
    }

    #[test]
    fn renders_default_columns() {
        let records = [doc(json!({
            "_id": "1", "name": "Asha", "department": "Engineering",
            "salary": 72000, "city": "Thane", "joinDate": "2024-01-01"
        }))];
        assert_eq!(
            format_table(&records, None),
            "| _id | name | department | salary | city | joinDate |\n\
             | --- | --- | --- | --- | --- | --- |\n\
             | 1 | Asha | Engineering | 72000 | Thane | 2024-01-01 |\n"
        );
    }

    #[test]
    fn duplicate_names_collapse_to_first() {
        let records = [
            doc(json!({"name": "Asha", "city": "Thane"})),
            doc(json!({"name": "Asha", "city": "Pune"})),
            doc(json!({"city": "Mumbai"})),
            doc(json!({"city": "Nagpur"})),
        ];
        let table = format_table(&records, Some(&["name", "city"]));
        assert_eq!(
            table,
            "| name | city |\n| --- | --- |\n| Asha | Thane |\n|  | Mumbai |\n|  | Nagpur |\n"
        );
    }

    #[test]
    fn nested_values_render_as_compact_json() {
        let records = [doc(json!({
            "name": "Rohan",
            "vehicles": {"two_wheeler_bike": {"type": "Honda Shine"}},
            "tags": ["a", 1],
            "manager": null
        }))];
        let table = format_table(&records, Some(&["vehicles", "tags", "manager", "missing"]));
        let row = table.lines().nth(2).unwrap();
        assert_eq!(
            row,
            r#"| {"two_wheeler_bike":{"type":"Honda Shine"}} | ["a",1] |  |  |"#
        );
    }
}
