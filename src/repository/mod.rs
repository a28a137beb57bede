//! Persistence boundary for [`Example`] entities.
//!
//! Handlers only see the [`ExampleRepository`] trait; the concrete store is
//! injected through [`AppState`](crate::state::AppState) at construction time.
//!
//! # Contract
//!
//! - `create` assigns a fresh id exactly once; ids are unique and never reused
//! - `list` returns every entity in ascending id order (creation order)
//! - implementations are internally synchronized and safe to share across tasks

mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Example, ExampleId};

pub use memory::InMemoryExampleRepository;

/// Failures reported by a repository implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The backing store could not be reached.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    /// The entity violates a storage-level constraint.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// The id sequence cannot produce another value.
    #[error("id sequence exhausted")]
    SequenceExhausted,
}

/// Persistence operations for the examples collection.
#[async_trait]
pub trait ExampleRepository: Send + Sync {
    /// Persist a new example and return its assigned id.
    async fn create(&self, name: &str) -> Result<ExampleId, RepositoryError>;

    /// Return all examples ordered by ascending id.
    async fn list(&self) -> Result<Vec<Example>, RepositoryError>;
}
