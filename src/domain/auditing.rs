//! Audit capabilities and the helpers that stamp them.
//!
//! Entities opt into capabilities by implementing the small traits below and
//! advertising them through [`Auditable`]. The write paths of the repository
//! call [`stamp_creation`], [`stamp_modification`] and [`stamp_deletion`]
//! without knowing which capabilities a given entity actually has.

use super::clock::Clock;
use chrono::{DateTime, Duration, Utc};

/// Window inside which repeated modifications keep the first timestamp.
pub const MODIFICATION_DEBOUNCE_SECS: i64 = 60;

pub trait HasCreationTime {
    /// `DateTime::<Utc>::default()` (the Unix epoch) means "never stamped".
    fn creation_time(&self) -> DateTime<Utc>;
    fn set_creation_time(&mut self, at: DateTime<Utc>);
}

pub trait HasModificationTime {
    fn last_modification_time(&self) -> Option<DateTime<Utc>>;
    fn set_last_modification_time(&mut self, at: Option<DateTime<Utc>>);
}

pub trait SoftDelete {
    fn is_deleted(&self) -> bool;
    fn set_deleted(&mut self, deleted: bool);

    fn undelete(&mut self) {
        self.set_deleted(false);
    }
}

pub trait HasDeletionTime: SoftDelete {
    fn deletion_time(&self) -> Option<DateTime<Utc>>;
    fn set_deletion_time(&mut self, at: Option<DateTime<Utc>>);
}

/// `None` or flagged as deleted.
pub fn is_null_or_deleted<E: SoftDelete + ?Sized>(entity: Option<&E>) -> bool {
    entity.map_or(true, |e| e.is_deleted())
}

/// Runtime capability lookup. Every hook defaults to "not supported".
pub trait Auditable {
    fn creation_audit(&mut self) -> Option<&mut dyn HasCreationTime> {
        None
    }

    fn modification_audit(&mut self) -> Option<&mut dyn HasModificationTime> {
        None
    }

    fn deletion_audit(&mut self) -> Option<&mut dyn HasDeletionTime> {
        None
    }

    fn soft_delete(&mut self) -> Option<&mut dyn SoftDelete> {
        None
    }
}

/// Sets the creation time once. Later calls leave it alone.
pub fn stamp_creation<E: Auditable + ?Sized>(entity: &mut E, clock: &dyn Clock) {
    let Some(audit) = entity.creation_audit() else {
        return;
    };
    if audit.creation_time() == DateTime::<Utc>::default() {
        audit.set_creation_time(clock.now());
    }
}

/// Sets the modification time unless it was set within the last minute.
pub fn stamp_modification<E: Auditable + ?Sized>(entity: &mut E, clock: &dyn Clock) {
    let Some(audit) = entity.modification_audit() else {
        return;
    };
    let now = clock.now();
    let stale = audit
        .last_modification_time()
        .map_or(true, |at| at < now - Duration::seconds(MODIFICATION_DEBOUNCE_SECS));
    if stale {
        audit.set_last_modification_time(Some(now));
    }
}

/// Sets the deletion time when absent, or always when `overwrite` is set.
pub fn stamp_deletion<E: Auditable + ?Sized>(entity: &mut E, clock: &dyn Clock, overwrite: bool) {
    let Some(audit) = entity.deletion_audit() else {
        return;
    };
    if audit.deletion_time().is_none() || overwrite {
        audit.set_deletion_time(Some(clock.now()));
    }
}

/// Entity without audit capabilities.
#[macro_export]
macro_rules! plain_entity {
    ($ty:ty) => {
        impl $crate::domain::auditing::Auditable for $ty {}
    };
}

/// Entity with a `creation_time` field.
#[macro_export]
macro_rules! creation_audited {
    ($ty:ty) => {
        $crate::__impl_creation_time!($ty);

        impl $crate::domain::auditing::Auditable for $ty {
            fn creation_audit(
                &mut self,
            ) -> Option<&mut dyn $crate::domain::auditing::HasCreationTime> {
                Some(self)
            }
        }
    };
}

/// Entity with `creation_time` and `last_modification_time` fields.
#[macro_export]
macro_rules! audited {
    ($ty:ty) => {
        $crate::__impl_creation_time!($ty);
        $crate::__impl_modification_time!($ty);

        impl $crate::domain::auditing::Auditable for $ty {
            fn creation_audit(
                &mut self,
            ) -> Option<&mut dyn $crate::domain::auditing::HasCreationTime> {
                Some(self)
            }

            fn modification_audit(
                &mut self,
            ) -> Option<&mut dyn $crate::domain::auditing::HasModificationTime> {
                Some(self)
            }
        }
    };
}

/// Audited entity that also carries `is_deleted` and `deletion_time`.
#[macro_export]
macro_rules! full_audited {
    ($ty:ty) => {
        $crate::__impl_creation_time!($ty);
        $crate::__impl_modification_time!($ty);

        impl $crate::domain::auditing::SoftDelete for $ty {
            fn is_deleted(&self) -> bool {
                self.is_deleted
            }

            fn set_deleted(&mut self, deleted: bool) {
                self.is_deleted = deleted;
            }
        }

        impl $crate::domain::auditing::HasDeletionTime for $ty {
            fn deletion_time(&self) -> Option<::chrono::DateTime<::chrono::Utc>> {
                self.deletion_time
            }

            fn set_deletion_time(&mut self, at: Option<::chrono::DateTime<::chrono::Utc>>) {
                self.deletion_time = at;
            }
        }

        impl $crate::domain::auditing::Auditable for $ty {
            fn creation_audit(
                &mut self,
            ) -> Option<&mut dyn $crate::domain::auditing::HasCreationTime> {
                Some(self)
            }

            fn modification_audit(
                &mut self,
            ) -> Option<&mut dyn $crate::domain::auditing::HasModificationTime> {
                Some(self)
            }

            fn deletion_audit(
                &mut self,
            ) -> Option<&mut dyn $crate::domain::auditing::HasDeletionTime> {
                Some(self)
            }

            fn soft_delete(&mut self) -> Option<&mut dyn $crate::domain::auditing::SoftDelete> {
                Some(self)
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __impl_creation_time {
    ($ty:ty) => {
        impl $crate::domain::auditing::HasCreationTime for $ty {
            fn creation_time(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.creation_time
            }

            fn set_creation_time(&mut self, at: ::chrono::DateTime<::chrono::Utc>) {
                self.creation_time = at;
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __impl_modification_time {
    ($ty:ty) => {
        impl $crate::domain::auditing::HasModificationTime for $ty {
            fn last_modification_time(&self) -> Option<::chrono::DateTime<::chrono::Utc>> {
                self.last_modification_time
            }

            fn set_last_modification_time(
                &mut self,
                at: Option<::chrono::DateTime<::chrono::Utc>>,
            ) {
                self.last_modification_time = at;
            }
        }
    };
}
