//! Per-scope change tracker.
//!
//! Repositories stage inserts, updates and deletes here instead of writing
//! straight to the database. [`UnitOfWork::save_changes`] flushes every staged
//! entry inside one transaction; on failure the transaction is rolled back and
//! the staged entries stay in place.

use super::persisted::Persisted;
use crate::domain::entity::PrimaryKey;
use crate::errors::ServiceError;
use async_trait::async_trait;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, IntoActiveModel,
    Iterable, TransactionTrait,
};
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Tracking state of one entity inside a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Added,
    Modified,
    Deleted,
    Unchanged,
}

/// Stable reference to a tracked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle(u64);

struct Flushed {
    rows: u64,
    refreshed: Option<Box<dyn Any + Send + Sync>>,
}

#[async_trait]
trait TrackedEntry: Send + Sync {
    fn state(&self) -> EntryState;

    fn set_state(&mut self, state: EntryState);

    fn entity(&self) -> &(dyn Any + Send + Sync);

    fn accept(&mut self, refreshed: Box<dyn Any + Send + Sync>);

    fn entity_name(&self) -> &'static str;

    async fn flush(&self, txn: &DatabaseTransaction) -> Result<Flushed, DbErr>;
}

struct Tracked<M> {
    state: EntryState,
    model: M,
}

/// Active model with every column marked as set, so inserts and updates
/// write the whole row.
fn fully_set<M>(model: M) -> M::Active
where
    M: Persisted + IntoActiveModel<M::Active>,
{
    let mut active = model.into_active_model();
    for column in <M::Table as EntityTrait>::Column::iter() {
        if let Some(value) = active.get(column).into_value() {
            active.set(column, value);
        }
    }
    active
}

#[async_trait]
impl<M> TrackedEntry for Tracked<M>
where
    M: Persisted + IntoActiveModel<M::Active>,
{
    fn state(&self) -> EntryState {
        self.state
    }

    fn set_state(&mut self, state: EntryState) {
        self.state = state;
    }

    fn entity(&self) -> &(dyn Any + Send + Sync) {
        &self.model
    }

    fn accept(&mut self, refreshed: Box<dyn Any + Send + Sync>) {
        if let Ok(model) = refreshed.downcast::<M>() {
            self.model = *model;
        }
    }

    fn entity_name(&self) -> &'static str {
        M::NAME
    }

    async fn flush(&self, txn: &DatabaseTransaction) -> Result<Flushed, DbErr> {
        match self.state {
            EntryState::Added => {
                let mut active = fully_set(self.model.clone());
                if self.model.is_transient() {
                    active.not_set(M::id_column());
                }
                let inserted = active.insert(txn).await?;
                Ok(Flushed {
                    rows: 1,
                    refreshed: Some(Box::new(inserted)),
                })
            }
            EntryState::Modified => {
                let updated = fully_set(self.model.clone()).update(txn).await?;
                Ok(Flushed {
                    rows: 1,
                    refreshed: Some(Box::new(updated)),
                })
            }
            EntryState::Deleted => {
                let result = self.model.clone().into_active_model().delete(txn).await?;
                if result.rows_affected == 0 {
                    return Err(DbErr::RecordNotUpdated);
                }
                Ok(Flushed {
                    rows: result.rows_affected,
                    refreshed: None,
                })
            }
            EntryState::Unchanged => Ok(Flushed {
                rows: 0,
                refreshed: None,
            }),
        }
    }
}

struct Entry {
    handle: EntryHandle,
    /// Provisional key of a staged insert; still matches after the flush.
    alias: Option<Box<dyn Any + Send + Sync>>,
    tracked: Box<dyn TrackedEntry>,
}

impl Entry {
    fn model<M: Persisted>(&self) -> Option<&M> {
        self.tracked.entity().downcast_ref::<M>()
    }

    fn holds<M: Persisted>(&self, id: &M::Key) -> bool {
        let Some(model) = self.model::<M>() else {
            return false;
        };
        if !model.is_transient() && model.id() == *id {
            return true;
        }
        self.alias
            .as_ref()
            .and_then(|alias| alias.downcast_ref::<M::Key>())
            .map_or(false, |alias| alias == id)
    }

    /// Gives `model` the store key once the tracked row has one.
    fn adopt_key<M: Persisted>(&self, model: &mut M) {
        if let Some(current) = self.model::<M>() {
            if model.is_transient() && !current.is_transient() {
                model.set_id(current.id());
            }
        }
    }
}

pub struct UnitOfWork {
    db: Arc<DatabaseConnection>,
    entries: Mutex<Vec<Entry>>,
    next_handle: AtomicU64,
}

impl UnitOfWork {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            entries: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Appends an entry. Transient models get a provisional key first.
    fn push<M>(&self, entries: &mut Vec<Entry>, model: &mut M, state: EntryState) -> EntryHandle
    where
        M: Persisted + IntoActiveModel<M::Active>,
    {
        let handle = EntryHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let mut alias: Option<Box<dyn Any + Send + Sync>> = None;
        if model.is_transient() {
            if let Some(key) = M::Key::provisional(handle.0) {
                model.set_id(key.clone());
                alias = Some(Box::new(key));
            }
        }
        entries.push(Entry {
            handle,
            alias,
            tracked: Box::new(Tracked {
                state,
                model: model.clone(),
            }),
        });
        handle
    }

    /// Stages a new row. A key that is already tracked is rejected. Transient
    /// models receive the provisional key they are tracked under.
    pub async fn stage_added<M>(&self, model: &mut M) -> Result<EntryHandle, ServiceError>
    where
        M: Persisted + IntoActiveModel<M::Active>,
    {
        let mut entries = self.entries.lock().await;
        let id = model.id();
        if entries.iter().any(|e| e.holds::<M>(&id)) {
            return Err(ServiceError::InvalidOperation(format!(
                "{} with ID '{}' is already tracked",
                M::NAME,
                id
            )));
        }
        debug!(entity = M::NAME, "staged insert");
        Ok(self.push(&mut entries, model, EntryState::Added))
    }

    /// Attaches the entity if needed and marks it modified. Entries still
    /// waiting to be inserted stay `Added`; an unknown transient entity is
    /// staged as an insert.
    pub async fn stage_modified<M>(&self, model: &mut M) -> EntryHandle
    where
        M: Persisted + IntoActiveModel<M::Active>,
    {
        let mut entries = self.entries.lock().await;
        let id = model.id();
        if let Some(entry) = entries.iter_mut().find(|e| e.holds::<M>(&id)) {
            entry.adopt_key(model);
            let next = match entry.tracked.state() {
                EntryState::Added => EntryState::Added,
                _ => EntryState::Modified,
            };
            entry.tracked = Box::new(Tracked {
                state: next,
                model: model.clone(),
            });
            debug!(entity = M::NAME, %id, state = ?next, "restaged tracked entity");
            return entry.handle;
        }

        if model.is_transient() {
            debug!(entity = M::NAME, "update of a transient entity staged as insert");
            return self.push(&mut entries, model, EntryState::Added);
        }
        debug!(entity = M::NAME, %id, "attached entity as modified");
        self.push(&mut entries, model, EntryState::Modified)
    }

    /// Stages physical removal. Deleting an entry that was never inserted just
    /// forgets it.
    pub async fn stage_deleted<M>(&self, mut model: M)
    where
        M: Persisted + IntoActiveModel<M::Active>,
    {
        let mut entries = self.entries.lock().await;
        let id = model.id();
        match entries.iter().position(|e| e.holds::<M>(&id)) {
            Some(index) if entries[index].tracked.state() == EntryState::Added => {
                entries.remove(index);
                debug!(entity = M::NAME, %id, "detached pending insert");
            }
            Some(index) => {
                entries[index].adopt_key(&mut model);
                entries[index].tracked = Box::new(Tracked {
                    state: EntryState::Deleted,
                    model,
                });
                debug!(entity = M::NAME, %id, "staged delete");
            }
            None if model.is_transient() => {
                debug!(entity = M::NAME, "ignoring delete of a transient entity");
            }
            None => {
                self.push(&mut entries, &mut model, EntryState::Deleted);
                debug!(entity = M::NAME, %id, "attached entity as deleted");
            }
        }
    }

    /// Forgets a staged insert. Returns `false` when `id` is not pending.
    pub async fn detach_added<M: Persisted>(&self, id: &M::Key) -> bool {
        let mut entries = self.entries.lock().await;
        match entries
            .iter()
            .position(|e| e.tracked.state() == EntryState::Added && e.holds::<M>(id))
        {
            Some(index) => {
                entries.remove(index);
                debug!(entity = M::NAME, %id, "detached pending insert");
                true
            }
            None => false,
        }
    }

    /// Tracked entity with the given key, unless it is staged for deletion.
    pub async fn find<M: Persisted>(&self, id: &M::Key) -> Option<M> {
        let entries = self.entries.lock().await;
        entries
            .iter()
            .filter(|e| e.tracked.state() != EntryState::Deleted)
            .find(|e| e.holds::<M>(id))
            .and_then(|e| e.model::<M>().cloned())
    }

    /// Current snapshot of a tracked entity.
    pub async fn entity<M: Persisted>(&self, handle: EntryHandle) -> Option<M> {
        let entries = self.entries.lock().await;
        entries
            .iter()
            .find(|e| e.handle == handle)
            .and_then(|e| e.model::<M>().cloned())
    }

    pub async fn state(&self, handle: EntryHandle) -> Option<EntryState> {
        let entries = self.entries.lock().await;
        entries
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| e.tracked.state())
    }

    /// Number of entries that the next flush would write.
    pub async fn pending(&self) -> usize {
        let entries = self.entries.lock().await;
        entries
            .iter()
            .filter(|e| e.tracked.state() != EntryState::Unchanged)
            .count()
    }

    /// Writes every staged entry in one transaction and returns the number of
    /// affected rows.
    #[instrument(skip(self))]
    pub async fn save_changes(&self) -> Result<u64, ServiceError> {
        let mut entries = self.entries.lock().await;
        let pending: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.tracked.state() != EntryState::Unchanged)
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await?;
        let mut outcomes = Vec::with_capacity(pending.len());
        for index in pending {
            let tracked = &entries[index].tracked;
            match tracked.flush(&txn).await {
                Ok(flushed) => outcomes.push((index, flushed)),
                Err(err) => {
                    warn!(
                        entity = tracked.entity_name(),
                        state = ?tracked.state(),
                        error = %err,
                        "flush failed, rolling back"
                    );
                    counter!("store_uow.rollbacks", 1);
                    if let Err(rollback_err) = txn.rollback().await {
                        warn!(error = %rollback_err, "rollback failed");
                    }
                    return Err(ServiceError::from_write(err));
                }
            }
        }
        txn.commit().await.map_err(ServiceError::from_write)?;

        let mut rows = 0;
        for (index, flushed) in outcomes {
            rows += flushed.rows;
            if let Some(refreshed) = flushed.refreshed {
                entries[index].tracked.accept(refreshed);
            }
        }
        entries.retain(|e| e.tracked.state() != EntryState::Deleted);
        for entry in entries.iter_mut() {
            entry.tracked.set_state(EntryState::Unchanged);
        }

        counter!("store_uow.commits", 1);
        info!(rows, "unit of work committed");
        Ok(rows)
    }
}
