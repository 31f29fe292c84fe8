//! sea-orm entities.

pub mod product;
