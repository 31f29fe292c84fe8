//! Property-based tests for the entity capability helpers.
//!
//! These use proptest to check the key and audit rules across a wide range of
//! inputs rather than a handful of hand-picked values.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use store_api::{
    domain::{
        auditing::MODIFICATION_DEBOUNCE_SECS, stamp_creation, stamp_deletion, stamp_modification,
        FixedClock, HasId, PrimaryKey,
    },
    dto::ProductListQuery,
    entities::product,
};
use validator::Validate;

fn product_with_id(id: i32) -> product::Model {
    let mut product = product::Model::new("SKU", "Prop", 1, Decimal::ONE);
    product.id = id;
    product
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn signed_keys_are_transient_iff_not_positive(id in any::<i64>()) {
        prop_assert_eq!(id.is_transient(), id <= 0);
    }

    #[test]
    fn product_transience_follows_its_key(id in any::<i32>()) {
        prop_assert_eq!(product_with_id(id).is_transient(), id <= 0);
    }

    #[test]
    fn string_keys_are_transient_iff_empty(key in ".{0,8}") {
        prop_assert_eq!(key.is_transient(), key.is_empty());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn modification_is_debounced(previous_age in 0i64..600) {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let clock = FixedClock::new(now);
        let previous = now - Duration::seconds(previous_age);

        let mut product = product_with_id(1);
        product.last_modification_time = Some(previous);
        stamp_modification(&mut product, &clock);

        let expected = if previous_age > MODIFICATION_DEBOUNCE_SECS { now } else { previous };
        prop_assert_eq!(product.last_modification_time, Some(expected));
    }

    #[test]
    fn creation_is_stamped_once(offset in 1i64..100_000) {
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = FixedClock::new(first);
        let mut product = product_with_id(0);

        stamp_creation(&mut product, &clock);
        clock.advance(Duration::seconds(offset));
        stamp_creation(&mut product, &clock);

        prop_assert_eq!(product.creation_time, first);
    }

    #[test]
    fn deletion_time_only_moves_when_overwriting(offset in 1i64..100_000, overwrite in any::<bool>()) {
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = FixedClock::new(first);
        let mut product = product_with_id(1);

        stamp_deletion(&mut product, &clock, false);
        clock.advance(Duration::seconds(offset));
        stamp_deletion(&mut product, &clock, overwrite);

        let expected = if overwrite { first + Duration::seconds(offset) } else { first };
        prop_assert_eq!(product.deletion_time, Some(expected));
    }

    #[test]
    fn list_query_offset_matches_page(page in 1u64..10_000, page_size in 1u64..500) {
        let query = ProductListQuery { page, page_size };
        prop_assert!(query.validate().is_ok());
        prop_assert_eq!(query.offset(), (page - 1) * page_size);
    }
}
