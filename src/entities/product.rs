use crate::domain::HasId;
use crate::repositories::{DeletePolicy, Persisted};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product catalog entry. Soft-deleted rows stay in the table with
/// `is_deleted = true`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Stock keeping unit, 1 to 20 characters
    pub sku: String,

    pub name: String,

    pub stock: i32,

    pub price: Decimal,

    pub status: ProductStatus,

    pub creation_time: DateTime<Utc>,

    pub last_modification_time: Option<DateTime<Utc>>,

    pub is_deleted: bool,

    pub deletion_time: Option<DateTime<Utc>>,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ProductStatus {
    #[default]
    #[sea_orm(string_value = "Active")]
    Active,
    #[sea_orm(string_value = "Inactive")]
    Inactive,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

crate::full_audited!(Model);

impl HasId for Model {
    type Key = i32;

    fn id(&self) -> i32 {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = id;
    }
}

impl Persisted for Model {
    type Table = Entity;
    type Active = ActiveModel;

    const NAME: &'static str = "Product";

    fn id_column() -> Column {
        Column::Id
    }

    fn delete_policy() -> DeletePolicy {
        DeletePolicy::Soft
    }
}

impl Model {
    /// Transient product with audit fields at their defaults.
    pub fn new(sku: impl Into<String>, name: impl Into<String>, stock: i32, price: Decimal) -> Self {
        Self {
            id: 0,
            sku: sku.into(),
            name: name.into(),
            stock,
            price,
            status: ProductStatus::Active,
            creation_time: DateTime::<Utc>::default(),
            last_modification_time: None,
            is_deleted: false,
            deletion_time: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{stamp_creation, stamp_deletion, Clock, FixedClock};
    use rust_decimal_macros::dec;

    #[test]
    fn new_product_is_transient_and_active() {
        let product = Model::new("SKU001", "Widget", 5, dec!(9.99));
        assert!(product.is_transient());
        assert_eq!(product.status, ProductStatus::Active);
        assert_eq!(Model::delete_policy(), DeletePolicy::Soft);
    }

    #[test]
    fn audit_helpers_see_every_capability() {
        let clock = FixedClock::new(Utc::now());
        let mut product = Model::new("SKU002", "Gadget", 1, dec!(1.50));

        stamp_creation(&mut product, &clock);
        assert_eq!(product.creation_time, clock.now());

        stamp_deletion(&mut product, &clock, false);
        assert_eq!(product.deletion_time, Some(clock.now()));
    }

    #[test]
    fn status_serializes_by_name() {
        assert_eq!(
            serde_json::to_string(&ProductStatus::Inactive).unwrap(),
            "\"Inactive\""
        );
    }
}
