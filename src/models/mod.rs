mod api;
mod example;

pub use api::{CreateExampleRequest, CreateExampleResponse};
pub use example::{Example, ExampleId};
