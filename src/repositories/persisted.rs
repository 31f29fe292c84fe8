use crate::domain::{Auditable, HasId};
use sea_orm::{ActiveModelBehavior, ActiveModelTrait, EntityTrait, FromQueryResult};
use std::fmt::Debug;

/// How a repository removes rows of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Physically remove the row.
    Hard,
    /// Flag the row as deleted, stamp the deletion time and hide it from reads.
    Soft,
}

/// Binds a sea-orm model to the generic repository.
///
/// The model is the entity: `Table` is its sea-orm entity and `Active` its
/// active model. `id_column` names the primary key column so transient inserts
/// can leave it to the database.
pub trait Persisted:
    HasId + Auditable + FromQueryResult + Clone + Debug + Send + Sync + 'static
{
    type Table: EntityTrait<Model = Self>;
    type Active: ActiveModelTrait<Entity = Self::Table> + ActiveModelBehavior + Send + Sync + 'static;

    /// Entity name used in errors and logs.
    const NAME: &'static str;

    /// Relation names accepted by `include`.
    const RELATIONS: &'static [&'static str] = &[];

    fn id_column() -> <Self::Table as EntityTrait>::Column;

    fn delete_policy() -> DeletePolicy {
        DeletePolicy::Hard
    }
}
