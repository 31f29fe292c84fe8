//! Entity capability model shared by every persisted type.

pub mod auditing;
pub mod clock;
pub mod entity;

pub use auditing::{
    is_null_or_deleted, stamp_creation, stamp_deletion, stamp_modification, Auditable,
    HasCreationTime, HasDeletionTime, HasModificationTime, SoftDelete,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use entity::{HasId, PrimaryKey};
