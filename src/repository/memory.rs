use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{ExampleRepository, RepositoryError};
use crate::models::{Example, ExampleId};
use crate::validation::MAX_NAME_LENGTH;

#[derive(Debug)]
struct Table {
    rows: Vec<Example>,
    next_id: ExampleId,
}

/// Process-local example store.
///
/// Rows are appended under the write lock together with the sequence bump,
/// so concurrent creates always observe distinct ids and rows stay sorted by
/// id without a separate sort on read.
#[derive(Debug)]
pub struct InMemoryExampleRepository {
    table: RwLock<Table>,
}

impl InMemoryExampleRepository {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table {
                rows: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Number of stored examples.
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryExampleRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExampleRepository for InMemoryExampleRepository {
    async fn create(&self, name: &str) -> Result<ExampleId, RepositoryError> {
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(RepositoryError::Constraint(format!(
                "name exceeds {MAX_NAME_LENGTH} characters"
            )));
        }

        let mut table = self.table.write().await;
        let id = table.next_id;
        table.next_id = id.checked_add(1).ok_or(RepositoryError::SequenceExhausted)?;
        table.rows.push(Example {
            id,
            name: name.to_string(),
        });

        debug!(id, "Example stored");
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<Example>, RepositoryError> {
        Ok(self.table.read().await.rows.clone())
    }
}
