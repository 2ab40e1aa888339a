//! Request body validation against an entity schema.

use crate::error::ApiError;
use crate::schema::{EntitySchema, ID};
use serde_json::{Map, Value};

/// Which write a body is validated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyMode {
    /// POST: id is server-assigned, required columns enforced.
    Create,
    /// PUT: id allowed (checked against the path elsewhere), required columns enforced.
    Replace,
    /// PATCH: id forbidden, missing columns allowed.
    Patch,
}

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a body, collecting every problem. Returns the body as an object.
    pub fn validate<'a>(
        schema: &EntitySchema,
        mode: BodyMode,
        body: &'a Value,
    ) -> Result<&'a Map<String, Value>, ApiError> {
        let Some(object) = body.as_object() else {
            return Err(ApiError::InvalidBody(vec!["body must be a JSON object".into()]));
        };
        let problems = Self::problems(schema, mode, object);
        if problems.is_empty() {
            Ok(object)
        } else {
            Err(ApiError::InvalidBody(problems))
        }
    }

    fn problems(schema: &EntitySchema, mode: BodyMode, body: &Map<String, Value>) -> Vec<String> {
        let mut problems = Vec::new();

        if body.contains_key(ID) {
            match mode {
                BodyMode::Create => problems.push(format!("{} cannot be set", ID)),
                BodyMode::Patch => problems.push(format!("{} cannot be updated", ID)),
                BodyMode::Replace => {}
            }
        }

        for (property, value) in body {
            let Some(column) = schema.column(property) else {
                problems.push(format!("{} is not a known property", property));
                continue;
            };
            if column.is_primary || EntitySchema::is_metadata(property) {
                continue;
            }
            if value.is_null() {
                if mode == BodyMode::Patch && !column.is_nullable {
                    problems.push(format!("{} cannot be null", property));
                }
                continue;
            }
            if !column.kind.accepts(value) {
                problems.push(format!("{} must be {}", property, column.kind.describe()));
            }
        }

        if mode != BodyMode::Patch {
            for column in schema.required_columns() {
                let present = body
                    .get(&column.property_name)
                    .is_some_and(|v| !v.is_null());
                if !present {
                    problems.push(format!("{} is required", column.property_name));
                }
            }
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::entity::tests::Car;
    use crate::schema::Entity;
    use serde_json::json;

    fn messages(mode: BodyMode, body: Value) -> Vec<String> {
        match RequestValidator::validate(&Car::schema(), mode, &body) {
            Ok(_) => Vec::new(),
            Err(ApiError::InvalidBody(items)) => items,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_create_lists_required_columns_in_order() {
        assert_eq!(
            messages(BodyMode::Create, json!({})),
            ["model is required", "wheels is required", "releaseDate is required"]
        );
    }

    #[test]
    fn create_accepts_a_complete_body() {
        let body = json!({"model": "Toyota", "wheels": 4, "releaseDate": "2021-01-01"});
        assert!(messages(BodyMode::Create, body).is_empty());
    }

    #[test]
    fn create_collects_every_problem() {
        let body = json!({"id": 3, "model": null, "wheels": "four", "colour": "red"});
        assert_eq!(
            messages(BodyMode::Create, body),
            [
                "id cannot be set",
                "colour is not a known property",
                "wheels must be an integer",
                "model is required",
                "releaseDate is required",
            ]
        );
    }

    #[test]
    fn replace_allows_id_and_timestamps() {
        let body = json!({
            "id": 1,
            "model": "Toyota",
            "wheels": 4,
            "releaseDate": "2021-01-01",
            "createdAt": "whenever"
        });
        assert!(messages(BodyMode::Replace, body).is_empty());
    }

    #[test]
    fn patch_skips_required_but_not_unknown_or_id() {
        assert!(messages(BodyMode::Patch, json!({"wheels": 6})).is_empty());
        assert_eq!(
            messages(BodyMode::Patch, json!({"id": 2, "doors": 4})),
            ["id cannot be updated", "doors is not a known property"]
        );
    }

    #[test]
    fn patch_null_only_for_nullable_columns() {
        assert!(messages(BodyMode::Patch, json!({"nickname": null})).is_empty());
        assert_eq!(messages(BodyMode::Patch, json!({"model": null})), ["model cannot be null"]);
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert_eq!(messages(BodyMode::Create, json!([1, 2])), ["body must be a JSON object"]);
    }
}
