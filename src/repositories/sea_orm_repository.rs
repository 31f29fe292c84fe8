use super::filter::{Filter, FilterValue, Op, SortOrder};
use super::persisted::{DeletePolicy, Persisted};
use super::query::{Query, QuerySource, QuerySpec};
use super::unit_of_work::UnitOfWork;
use super::{require_criteria, Repository};
use crate::domain::{self, Clock};
use crate::errors::ServiceError;
use async_trait::async_trait;
use sea_orm::{
    sea_query::SimpleExpr, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IdenStatic,
    IntoActiveModel, Iterable, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Select,
};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, instrument};

type ColumnOf<M> = <<M as Persisted>::Table as EntityTrait>::Column;

const SOFT_DELETE_FIELD: &str = "is_deleted";

/// Resolves a field name to the entity column with the same name.
fn column<M: Persisted>(field: &str) -> Result<ColumnOf<M>, ServiceError> {
    ColumnOf::<M>::iter()
        .find(|c| c.as_str() == field)
        .ok_or_else(|| {
            ServiceError::invalid_argument(format!("{} has no field '{}'", M::NAME, field))
        })
}

fn criterion_expr<M: Persisted>(
    field: &str,
    op: Op,
    value: &FilterValue,
) -> Result<SimpleExpr, ServiceError> {
    let col = column::<M>(field)?;
    let expr = match op {
        Op::Eq => col.eq(sea_orm::Value::from(value.clone())),
        Op::Ne => col.ne(sea_orm::Value::from(value.clone())),
        Op::Gt => col.gt(sea_orm::Value::from(value.clone())),
        Op::Gte => col.gte(sea_orm::Value::from(value.clone())),
        Op::Lt => col.lt(sea_orm::Value::from(value.clone())),
        Op::Lte => col.lte(sea_orm::Value::from(value.clone())),
        Op::Contains => match value {
            FilterValue::Text(text) => col.contains(text.as_str()),
            other => {
                return Err(ServiceError::invalid_argument(format!(
                    "'contains' on '{}' needs a text operand, got {:?}",
                    field, other
                )))
            }
        },
        Op::IsNull => col.is_null(),
        Op::IsNotNull => col.is_not_null(),
    };
    Ok(expr)
}

/// Filter plus the soft-delete visibility rule of the entity.
fn visible<M: Persisted>(filter: &Filter) -> Result<Condition, ServiceError> {
    let mut condition = Condition::all();
    if M::delete_policy() == DeletePolicy::Soft {
        condition = condition.add(column::<M>(SOFT_DELETE_FIELD)?.eq(false));
    }
    for criterion in filter.criteria() {
        condition = condition.add(criterion_expr::<M>(
            &criterion.field,
            criterion.op,
            &criterion.value,
        )?);
    }
    Ok(condition)
}

fn is_soft_deleted<M: Persisted>(entity: &mut M) -> bool {
    entity.soft_delete().map_or(false, |flag| flag.is_deleted())
}

/// sea-orm backed [`Repository`] that stages writes in a [`UnitOfWork`].
pub struct SeaOrmRepository<M> {
    db: Arc<DatabaseConnection>,
    uow: Arc<UnitOfWork>,
    clock: Arc<dyn Clock>,
    _entity: PhantomData<fn() -> M>,
}

impl<M> SeaOrmRepository<M>
where
    M: Persisted + IntoActiveModel<M::Active>,
{
    pub fn new(db: Arc<DatabaseConnection>, uow: Arc<UnitOfWork>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            uow,
            clock,
            _entity: PhantomData,
        }
    }

    pub fn unit_of_work(&self) -> &Arc<UnitOfWork> {
        &self.uow
    }

    fn select(&self, spec: &QuerySpec) -> Result<Select<M::Table>, ServiceError> {
        for relation in &spec.include {
            if !M::RELATIONS.contains(&relation.as_str()) {
                return Err(ServiceError::invalid_argument(format!(
                    "{} has no relation '{}'",
                    M::NAME,
                    relation
                )));
            }
        }

        let mut select = M::Table::find().filter(visible::<M>(&spec.filter)?);
        for sort in &spec.sort {
            let order = match sort.order {
                SortOrder::Ascending => Order::Asc,
                SortOrder::Descending => Order::Desc,
            };
            select = select.order_by(column::<M>(&sort.field)?, order);
        }
        if let Some(skip) = spec.skip {
            select = select.offset(skip);
        }
        if let Some(take) = spec.take {
            select = select.limit(take);
        }
        Ok(select)
    }

    async fn find_visible(&self, id: M::Key) -> Result<Option<M>, ServiceError> {
        let condition = visible::<M>(&Filter::new())?.add(M::id_column().eq(id));
        Ok(M::Table::find().filter(condition).one(&*self.db).await?)
    }
}

#[async_trait]
impl<M> QuerySource<M> for SeaOrmRepository<M>
where
    M: Persisted + IntoActiveModel<M::Active>,
{
    async fn fetch(&self, spec: &QuerySpec) -> Result<Vec<M>, ServiceError> {
        let select = self.select(spec)?;
        debug!(entity = M::NAME, ?spec, "fetching rows");
        Ok(select.all(&*self.db).await?)
    }

    async fn fetch_count(&self, spec: &QuerySpec) -> Result<u64, ServiceError> {
        let unpaged = QuerySpec {
            skip: None,
            take: None,
            sort: Vec::new(),
            ..spec.clone()
        };
        let total = self.select(&unpaged)?.count(&*self.db).await?;
        Ok(spec.window(total))
    }
}

#[async_trait]
impl<M> Repository<M> for SeaOrmRepository<M>
where
    M: Persisted + IntoActiveModel<M::Active>,
{
    fn get_all(&self) -> Query<'_, M> {
        Query::new(self)
    }

    #[instrument(skip(self), fields(entity = M::NAME))]
    async fn get(&self, id: M::Key) -> Result<M, ServiceError> {
        self.find_visible(id.clone())
            .await?
            .ok_or_else(|| ServiceError::not_found(M::NAME, id))
    }

    async fn get_by(&self, filter: Filter) -> Result<Option<M>, ServiceError> {
        require_criteria(&filter)?;
        self.get_all().filter(filter).first().await
    }

    async fn insert(&self, mut entity: M) -> Result<M, ServiceError> {
        domain::stamp_creation(&mut entity, self.clock.as_ref());
        self.uow.stage_added(&mut entity).await?;
        Ok(entity)
    }

    #[instrument(skip(self, entity), fields(entity = M::NAME))]
    async fn insert_and_get_id(&self, mut entity: M) -> Result<M::Key, ServiceError> {
        let transient = entity.is_transient();
        domain::stamp_creation(&mut entity, self.clock.as_ref());
        let handle = self.uow.stage_added(&mut entity).await?;
        if !transient {
            return Ok(entity.id());
        }

        self.uow.save_changes().await?;
        let stored = self.uow.entity::<M>(handle).await.ok_or_else(|| {
            ServiceError::InternalError(format!("{} vanished from the unit of work", M::NAME))
        })?;
        debug!(id = %stored.id(), "generated key");
        Ok(stored.id())
    }

    async fn update(&self, mut entity: M) -> Result<M, ServiceError> {
        if entity.is_transient() {
            domain::stamp_creation(&mut entity, self.clock.as_ref());
        }
        domain::stamp_modification(&mut entity, self.clock.as_ref());
        self.uow.stage_modified(&mut entity).await;
        Ok(entity)
    }

    #[instrument(skip(self, entity), fields(entity = M::NAME))]
    async fn delete(&self, mut entity: M) -> Result<(), ServiceError> {
        let id = entity.id();
        if self.uow.detach_added::<M>(&id).await {
            return Ok(());
        }
        if entity.is_transient() {
            // A provisional key still reaches the row once it has been flushed
            match self.uow.find::<M>(&id).await {
                Some(tracked) if !tracked.is_transient() => entity.set_id(tracked.id()),
                _ => {
                    debug!("ignoring delete of an unsaved entity");
                    return Ok(());
                }
            }
        }

        match M::delete_policy() {
            DeletePolicy::Hard => {
                self.uow.stage_deleted(entity).await;
                Ok(())
            }
            DeletePolicy::Soft => {
                let flag = entity.soft_delete().ok_or_else(|| {
                    ServiceError::InvalidOperation(format!(
                        "{} declares soft delete but has no deletion flag",
                        M::NAME
                    ))
                })?;
                flag.set_deleted(true);
                domain::stamp_deletion(&mut entity, self.clock.as_ref(), false);
                self.update(entity).await.map(|_| ())
            }
        }
    }

    async fn delete_by_id(&self, id: M::Key) -> Result<(), ServiceError> {
        let target = match self.uow.find::<M>(&id).await {
            Some(mut tracked) => (!is_soft_deleted(&mut tracked)).then_some(tracked),
            None => self.find_visible(id.clone()).await?,
        };
        match target {
            Some(entity) => self.delete(entity).await,
            None => {
                debug!(entity = M::NAME, %id, "nothing to delete");
                Ok(())
            }
        }
    }

    async fn save_changes(&self) -> Result<u64, ServiceError> {
        self.uow.save_changes().await
    }
}
