use serde::{Deserialize, Serialize};

/// Server-assigned identifier of an [`Example`].
pub type ExampleId = u64;

/// The single persisted entity.
///
/// `id` is assigned by the repository exactly once and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub id: ExampleId,
    pub name: String,
}
