use std::fmt::{Debug, Display};
use uuid::Uuid;

/// Key types usable as an entity identifier.
///
/// A key is *transient* when it carries no store-assigned identity yet. For
/// signed numeric keys every value `<= 0` counts as transient, since stores
/// never hand out non-positive surrogate keys.
pub trait PrimaryKey:
    Clone + PartialEq + Debug + Display + Send + Sync + Into<sea_orm::Value> + 'static
{
    fn is_transient(&self) -> bool;

    /// Distinct transient placeholder for the `seq`-th staged insert, so a
    /// pending row can be addressed before the store assigns its key. `None`
    /// for key types with a single transient value.
    fn provisional(_seq: u64) -> Option<Self> {
        None
    }
}

impl PrimaryKey for i32 {
    fn is_transient(&self) -> bool {
        *self <= 0
    }

    fn provisional(seq: u64) -> Option<Self> {
        i32::try_from(seq).ok().filter(|n| *n > 0).map(|n| -n)
    }
}

impl PrimaryKey for i64 {
    fn is_transient(&self) -> bool {
        *self <= 0
    }

    fn provisional(seq: u64) -> Option<Self> {
        i64::try_from(seq).ok().filter(|n| *n > 0).map(|n| -n)
    }
}

impl PrimaryKey for u32 {
    fn is_transient(&self) -> bool {
        *self == 0
    }
}

impl PrimaryKey for u64 {
    fn is_transient(&self) -> bool {
        *self == 0
    }
}

impl PrimaryKey for Uuid {
    fn is_transient(&self) -> bool {
        self.is_nil()
    }
}

impl PrimaryKey for String {
    fn is_transient(&self) -> bool {
        self.is_empty()
    }
}

/// An object with identity.
pub trait HasId {
    type Key: PrimaryKey;

    fn id(&self) -> Self::Key;

    fn set_id(&mut self, id: Self::Key);

    /// True until the store has assigned or confirmed the key.
    fn is_transient(&self) -> bool {
        self.id().is_transient()
    }
}
