//! Filter builders and text helpers.
//!
//! Pure functions turning extracted entities into store [`Filter`]s.

use serde_json::json;

use docgate_store::Filter;

/// Nested fields searched by an ownership query.
pub const VEHICLE_FIELDS: [&str; 4] = [
    "vehicles.four_wheeler.type",
    "vehicles.two_wheeler_bike.type",
    "vehicles.two_wheeler_scooty.type",
    "vehicles.type",
];

/// Case-insensitive substring search for `vehicle` over [`VEHICLE_FIELDS`].
///
/// Regex metacharacters in the text are escaped; spaces are kept as-is.
pub fn vehicle_filter(vehicle: &str) -> Filter {
    let pattern = format!(".*{}.*", regex::escape(vehicle.trim()));
    Filter::any_of(VEHICLE_FIELDS.iter().map(|field| {
        Filter::empty().with(*field, json!({"$regex": pattern, "$options": "i"}))
    }))
}

/// Exact match on `department`.
pub fn department_filter(department: &str) -> Filter {
    Filter::empty().with("department", department)
}

/// `{salary: {$gt: amount}}`
pub fn salary_above(amount: i64) -> Filter {
    Filter::empty().with("salary", json!({ "$gt": amount }))
}

/// Combine the optional facets of a "show ... from ... above ..." command.
///
/// Absent facets are left out, so no facets at all matches every record.
pub fn natural_filter(
    department: Option<&str>,
    city: Option<&str>,
    salary_over: Option<i64>,
) -> Filter {
    let mut filter = Filter::empty();
    if let Some(department) = department {
        filter = filter.and(department_filter(department));
    }
    if let Some(city) = city {
        filter = filter.with("city", city);
    }
    if let Some(amount) = salary_over {
        filter = filter.and(salary_above(amount));
    }
    filter
}

/// Delete target: an exact name, optionally narrowed by department.
pub fn name_filter(name: &str, department: Option<&str>) -> Filter {
    let filter = Filter::empty().with("name", name);
    match department {
        Some(department) => filter.with("department", department),
        None => filter,
    }
}

/// Upper-case the first character and lower-case the rest.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Upper-case every letter that starts an alphabetic run, lower-case the
/// others.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_filter_ors_four_case_insensitive_regexes() {
        let value = vehicle_filter("  honda shine 125 ").into_value();
        let branches = value["$or"].as_array().unwrap();
        assert_eq!(branches.len(), 4);
        for (branch, field) in branches.iter().zip(VEHICLE_FIELDS) {
            assert_eq!(
                branch[field],
                json!({"$regex": ".*honda shine 125.*", "$options": "i"})
            );
        }
    }

    #[test]
    fn vehicle_text_metacharacters_are_escaped() {
        let value = vehicle_filter("c++ (v2)").into_value();
        assert_eq!(
            value["$or"][0]["vehicles.four_wheeler.type"]["$regex"],
            r".*c\+\+ \(v2\).*"
        );
    }

    #[test]
    fn natural_filter_keeps_facet_order_and_omits_missing() {
        let full = natural_filter(Some("Engineer"), Some("Thane"), Some(60000));
        assert_eq!(
            full.into_value(),
            json!({"department": "Engineer", "city": "Thane", "salary": {"$gt": 60000}})
        );
        assert!(natural_filter(None, None, None).is_empty());
        assert_eq!(
            natural_filter(None, Some("Pune"), None).into_value(),
            json!({"city": "Pune"})
        );
    }

    #[test]
    fn name_filter_with_and_without_department() {
        assert_eq!(name_filter("Rohan", None).into_value(), json!({"name": "Rohan"}));
        assert_eq!(
            name_filter("Rohan", Some("Sales")).into_value(),
            json!({"name": "Rohan", "department": "Sales"})
        );
    }

    #[test]
    fn single_facet_builders() {
        assert_eq!(department_filter("Frappe").into_value(), json!({"department": "Frappe"}));
        assert_eq!(salary_above(5).into_value(), json!({"salary": {"$gt": 5}}));
    }

    #[test]
    fn text_helpers() {
        assert_eq!(capitalize("tHANE"), "Thane");
        assert_eq!(capitalize(""), "");
        assert_eq!(title_case("rohan mehta"), "Rohan Mehta");
        assert_eq!(title_case("r&d-ops team"), "R&D-Ops Team");
    }
}
