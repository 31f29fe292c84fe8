//! Generic data access.
//!
//! [`Repository`] is the engine-neutral contract used by application
//! services. [`SeaOrmRepository`] implements it on top of sea-orm, staging
//! writes in the scoped [`UnitOfWork`].

pub mod filter;
pub mod persisted;
pub mod query;
pub mod sea_orm_repository;
pub mod unit_of_work;

pub use filter::{Criterion, Filter, FilterValue, Op, SortOrder};
pub use persisted::{DeletePolicy, Persisted};
pub use query::{Query, QuerySource, QuerySpec};
pub use sea_orm_repository::SeaOrmRepository;
pub use unit_of_work::{EntryHandle, EntryState, UnitOfWork};

use crate::domain::HasId;
use crate::errors::ServiceError;
use async_trait::async_trait;

/// Rejects predicate operations called without any criteria.
pub fn require_criteria(filter: &Filter) -> Result<(), ServiceError> {
    if filter.is_empty() {
        return Err(ServiceError::invalid_argument(
            "filter must contain at least one criterion",
        ));
    }
    Ok(())
}

#[async_trait]
pub trait Repository<M>: Send + Sync
where
    M: HasId + Send + Sync + 'static,
{
    /// Lazy query over every visible row.
    fn get_all(&self) -> Query<'_, M>;

    /// Like [`get_all`](Repository::get_all) with eager-loaded relations.
    /// Unknown relation names fail when the query runs.
    fn get_all_including(&self, relations: &[&str]) -> Query<'_, M> {
        relations
            .iter()
            .fold(self.get_all(), |query, relation| query.include(*relation))
    }

    /// Fails with `NotFound` when no visible row has this key.
    async fn get(&self, id: M::Key) -> Result<M, ServiceError>;

    /// First row matching the filter, if any.
    async fn get_by(&self, filter: Filter) -> Result<Option<M>, ServiceError>;

    async fn insert(&self, entity: M) -> Result<M, ServiceError>;

    /// Inserts and, for a transient entity, flushes right away so the
    /// generated key can be returned.
    async fn insert_and_get_id(&self, entity: M) -> Result<M::Key, ServiceError>;

    async fn update(&self, entity: M) -> Result<M, ServiceError>;

    async fn delete(&self, entity: M) -> Result<(), ServiceError>;

    /// No-op when the key matches nothing.
    async fn delete_by_id(&self, id: M::Key) -> Result<(), ServiceError>;

    async fn save_changes(&self) -> Result<u64, ServiceError>;

    async fn get_all_list(&self) -> Result<Vec<M>, ServiceError> {
        self.get_all().to_list().await
    }

    async fn get_all_list_by(&self, filter: Filter) -> Result<Vec<M>, ServiceError> {
        require_criteria(&filter)?;
        self.get_all().filter(filter).to_list().await
    }

    async fn count(&self) -> Result<u32, ServiceError> {
        self.get_all().count().await
    }

    async fn count_by(&self, filter: Filter) -> Result<u32, ServiceError> {
        require_criteria(&filter)?;
        self.get_all().filter(filter).count().await
    }

    async fn long_count(&self) -> Result<u64, ServiceError> {
        self.get_all().long_count().await
    }

    async fn long_count_by(&self, filter: Filter) -> Result<u64, ServiceError> {
        require_criteria(&filter)?;
        self.get_all().filter(filter).long_count().await
    }
}
