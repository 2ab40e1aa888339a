//! Name conversion between entity properties (camelCase) and SQL columns (snake_case).

use serde_json::{Map, Value};

/// SQL column for a property name.
/// e.g. "releaseDate" -> "release_date", "deletedAt" -> "deleted_at"
pub fn column_name(property: &str) -> String {
    let mut out = String::with_capacity(property.len() + 4);
    for (i, c) in property.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Property name for a SQL column.
/// e.g. "release_date" -> "releaseDate"
pub fn property_name(column: &str) -> String {
    let mut out = String::with_capacity(column.len());
    let mut capitalize_next = false;
    for c in column.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Rename the keys of a row read from the database to property names.
pub fn row_to_properties(row: Map<String, Value>) -> Map<String, Value> {
    row.into_iter().map(|(k, v)| (property_name(&k), v)).collect()
}
