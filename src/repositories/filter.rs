use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Comparison applied by a [`Criterion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Substring match on text columns
    Contains,
    IsNull,
    IsNotNull,
}

/// Scalar operand of a criterion, independent of any storage engine.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Text(String),
    Decimal(Decimal),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Null,
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        FilterValue::Int(v.into())
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

impl From<Decimal> for FilterValue {
    fn from(v: Decimal) -> Self {
        FilterValue::Decimal(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(v: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(v)
    }
}

impl From<FilterValue> for sea_orm::Value {
    fn from(v: FilterValue) -> Self {
        match v {
            FilterValue::Int(i) => i.into(),
            FilterValue::Text(s) => s.into(),
            FilterValue::Decimal(d) => d.into(),
            FilterValue::Bool(b) => b.into(),
            FilterValue::Timestamp(t) => t.into(),
            FilterValue::Null => sea_orm::Value::String(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub field: String,
    pub op: Op,
    pub value: FilterValue,
}

/// Conjunction of criteria over entity fields, named by column.
///
/// ```
/// use store_api::repositories::Filter;
///
/// let filter = Filter::new().eq("status", "Active").gte("stock", 10);
/// assert_eq!(filter.criteria().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    criteria: Vec<Criterion>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, op: Op, value: impl Into<FilterValue>) -> Self {
        self.criteria.push(Criterion {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.with(field, Op::Eq, value)
    }

    pub fn ne(self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.with(field, Op::Ne, value)
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.with(field, Op::Gt, value)
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.with(field, Op::Gte, value)
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.with(field, Op::Lt, value)
    }

    pub fn lte(self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.with(field, Op::Lte, value)
    }

    pub fn contains(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(field, Op::Contains, FilterValue::Text(value.into()))
    }

    pub fn is_null(self, field: impl Into<String>) -> Self {
        self.with(field, Op::IsNull, FilterValue::Null)
    }

    pub fn is_not_null(self, field: impl Into<String>) -> Self {
        self.with(field, Op::IsNotNull, FilterValue::Null)
    }

    /// Merges another filter into this one.
    pub fn and(mut self, other: Filter) -> Self {
        self.criteria.extend(other.criteria);
        self
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_insertion_order() {
        let filter = Filter::new()
            .eq("sku", "SKU001")
            .gt("stock", 3)
            .is_null("deletion_time");

        let ops: Vec<Op> = filter.criteria().iter().map(|c| c.op).collect();
        assert_eq!(ops, vec![Op::Eq, Op::Gt, Op::IsNull]);
        assert_eq!(filter.criteria()[1].value, FilterValue::Int(3));
    }

    #[test]
    fn and_concatenates_criteria() {
        let merged = Filter::new().eq("a", 1).and(Filter::new().eq("b", true));
        assert_eq!(merged.criteria().len(), 2);
        assert!(Filter::new().is_empty());
    }
}
