use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::DomainResult;

/// Trait for finding entities by ID
#[async_trait]
pub trait FindById<T> {
    /// Find an entity by ID
    async fn find_by_id(&self, id: Uuid) -> DomainResult<T>;
}

/// Trait for entities that support hard deletion
#[async_trait]
pub trait HardDeletable {
    /// The name of the entity table in the database (for dependency checks and logging)
    fn entity_name(&self) -> &'static str;

    /// Hard delete an entity by ID. Implementations refuse the delete when
    /// dependent records exist, reporting the dependent tables.
    async fn hard_delete(&self, id: Uuid) -> DomainResult<()>;
}
