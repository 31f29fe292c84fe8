use super::filter::{Filter, Sort, SortOrder};
use crate::errors::ServiceError;
use async_trait::async_trait;

/// Everything a terminal operation needs to build the store query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub filter: Filter,
    pub sort: Vec<Sort>,
    pub skip: Option<u64>,
    pub take: Option<u64>,
    pub include: Vec<String>,
}

impl QuerySpec {
    /// Number of rows a paged query yields out of `total` matches.
    pub fn window(&self, total: u64) -> u64 {
        let remaining = total.saturating_sub(self.skip.unwrap_or(0));
        match self.take {
            Some(take) => remaining.min(take),
            None => remaining,
        }
    }
}

/// Backend that executes a [`QuerySpec`].
#[async_trait]
pub trait QuerySource<M>: Send + Sync {
    async fn fetch(&self, spec: &QuerySpec) -> Result<Vec<M>, ServiceError>;

    async fn fetch_count(&self, spec: &QuerySpec) -> Result<u64, ServiceError>;
}

/// Lazy, composable query over one entity type.
///
/// Nothing touches the store until [`to_list`](Query::to_list),
/// [`first`](Query::first), [`count`](Query::count) or
/// [`long_count`](Query::long_count) runs.
pub struct Query<'r, M> {
    source: &'r dyn QuerySource<M>,
    spec: QuerySpec,
}

impl<'r, M: Send> Query<'r, M> {
    pub fn new(source: &'r dyn QuerySource<M>) -> Self {
        Self {
            source,
            spec: QuerySpec::default(),
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.spec.filter = std::mem::take(&mut self.spec.filter).and(filter);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.spec.sort.push(Sort {
            field: field.into(),
            order,
        });
        self
    }

    pub fn skip(mut self, n: u64) -> Self {
        self.spec.skip = Some(n);
        self
    }

    pub fn take(mut self, n: u64) -> Self {
        self.spec.take = Some(n);
        self
    }

    pub fn include(mut self, relation: impl Into<String>) -> Self {
        self.spec.include.push(relation.into());
        self
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub async fn to_list(self) -> Result<Vec<M>, ServiceError> {
        self.source.fetch(&self.spec).await
    }

    pub async fn first(mut self) -> Result<Option<M>, ServiceError> {
        self.spec.take = Some(1);
        Ok(self.source.fetch(&self.spec).await?.into_iter().next())
    }

    pub async fn long_count(self) -> Result<u64, ServiceError> {
        self.source.fetch_count(&self.spec).await
    }

    pub async fn count(self) -> Result<u32, ServiceError> {
        let total = self.long_count().await?;
        u32::try_from(total).map_err(|_| {
            ServiceError::InvalidOperation(format!("count {} does not fit in 32 bits", total))
        })
    }
}
