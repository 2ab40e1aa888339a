//! Bind JSON values as text parameters; placeholders carry the cast to the column type.

use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// Text form of a value, `None` for SQL NULL.
pub fn text_param(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(v.to_string()),
    }
}

/// `sqlx::query` with every parameter bound in order.
pub fn bind_all<'q>(sql: &'q str, params: &[Value]) -> Query<'q, Postgres, PgArguments> {
    let mut query = sqlx::query(sql);
    for p in params {
        query = query.bind(text_param(p));
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_text_forms() {
        assert_eq!(text_param(&json!(null)), None);
        assert_eq!(text_param(&json!(4)), Some("4".into()));
        assert_eq!(text_param(&json!(true)), Some("true".into()));
        assert_eq!(text_param(&json!("Toyota")), Some("Toyota".into()));
        assert_eq!(text_param(&json!({"a": 1})), Some("{\"a\":1}".into()));
    }
}
