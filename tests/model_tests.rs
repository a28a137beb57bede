//! Wire-shape tests for domain models.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;

mod example_tests {
    use super::*;
    use gobo::models::Example;

    #[test]
    fn test_example_serializes_id_and_name_only() {
        let example = Example {
            id: 7,
            name: "Example 1".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&example).unwrap(),
            json!({ "id": 7, "name": "Example 1" })
        );
    }

    #[test]
    fn test_example_list_is_a_plain_array() {
        let examples = vec![
            Example {
                id: 1,
                name: "a".to_string(),
            },
            Example {
                id: 2,
                name: "b".to_string(),
            },
        ];

        let value = serde_json::to_value(&examples).unwrap();
        assert!(value.is_array());
        assert_eq!(value[1]["id"], 2);
    }

    #[test]
    fn test_example_deserialize() {
        let example: Example = serde_json::from_str(r#"{"id":3,"name":"x"}"#).unwrap();
        assert_eq!(example.id, 3);
        assert_eq!(example.name, "x");
    }
}

mod api_tests {
    use super::*;
    use gobo::models::{CreateExampleRequest, CreateExampleResponse};

    #[test]
    fn test_create_request_accepts_name() {
        let request: CreateExampleRequest =
            serde_json::from_value(json!({ "name": "Example 1" })).unwrap();
        assert_eq!(request.name, "Example 1");
    }

    #[test]
    fn test_create_request_ignores_unknown_fields() {
        let request: CreateExampleRequest =
            serde_json::from_value(json!({ "name": "x", "id": 99 })).unwrap();
        assert_eq!(request.name, "x");
    }

    #[test]
    fn test_create_request_requires_name() {
        let result: Result<CreateExampleRequest, _> = serde_json::from_value(json!({}));
        assert!(result.unwrap_err().to_string().contains("missing field `name`"));
    }

    #[test]
    fn test_create_request_rejects_non_string_name() {
        let result: Result<CreateExampleRequest, _> = serde_json::from_value(json!({ "name": 5 }));
        assert!(result.is_err());
    }

    #[test]
    fn test_create_response_shape() {
        let response = CreateExampleResponse::created(42);

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "message": "Example created successfully", "id": 42 })
        );
    }
}

mod error_body_tests {
    use super::*;
    use gobo::error::ErrorResponse;

    #[test]
    fn test_error_response_shape() {
        let body = ErrorResponse {
            error: "Invalid credentials".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "error": "Invalid credentials" })
        );
    }
}
