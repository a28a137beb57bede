use serde::{Deserialize, Serialize};

use super::ExampleId;

/// Request to create a new example.
#[derive(Debug, Deserialize)]
pub struct CreateExampleRequest {
    /// Name of the example to create
    pub name: String,
}

/// Response after successfully creating an example.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateExampleResponse {
    pub message: String,
    /// Identifier assigned by the repository
    pub id: ExampleId,
}

impl CreateExampleResponse {
    pub fn created(id: ExampleId) -> Self {
        Self {
            message: "Example created successfully".to_string(),
            id,
        }
    }
}
