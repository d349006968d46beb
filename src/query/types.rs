use crate::errors::AccessError;
use serde::{Deserialize, Serialize};

// Safety limits to prevent resource abuse
pub(crate) const MAX_TREE_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 1000;
pub(crate) const MAX_SORT_FIELDS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub(crate) const fn wire_name(self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
        }
    }
}

/// Store-agnostic filter predicate tree.
///
/// Literals arrive as text from the framework; they are coerced to the
/// field's native type during translation, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterNode {
    Compare { field: String, op: CompareOp, literal: String },
    In { field: String, literals: Vec<String> },
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
    Not(Box<FilterNode>),
    /// Relationship-traversal predicate. Always rejected before translation:
    /// the underlying store has no join model.
    Exists { relation: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    #[serde(default)]
    pub descending: bool,
}

impl SortKey {
    #[must_use]
    pub fn ascending(field: impl Into<String>) -> Self {
        Self { field: field.into(), descending: false }
    }

    #[must_use]
    pub fn descending(field: impl Into<String>) -> Self {
        Self { field: field.into(), descending: true }
    }
}

/// Skip/take pagination window. `number` is 1-based; `size` 0 means
/// "return none of this page", not "unlimited".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    number: u64,
    size: u64,
}

impl PageWindow {
    /// # Errors
    /// Returns `Query` when `number` is zero.
    pub fn new(number: u64, size: u64) -> Result<Self, AccessError> {
        if number == 0 {
            return Err(AccessError::Query("page number must be 1 or greater".into()));
        }
        Ok(Self { number, size })
    }

    #[must_use]
    pub const fn number(&self) -> u64 {
        self.number
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Saturates instead of overflowing; a window past `u64::MAX` documents
    /// can only ever address an empty tail.
    #[must_use]
    pub const fn skip(&self) -> u64 {
        self.number.saturating_sub(1).saturating_mul(self.size)
    }

    #[must_use]
    pub const fn take(&self) -> u64 {
        self.size
    }
}

/// One store-agnostic query as handed over by the framework: filter predicate
/// tree, sort key list and pagination window. Read-only; consumed once per
/// translation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDescription {
    pub filter: Option<FilterNode>,
    #[serde(default)]
    pub sort: Vec<SortKey>,
    pub page: Option<PageWindow>,
}

impl QueryDescription {
    #[must_use]
    pub fn filter_only(filter: FilterNode) -> Self {
        Self { filter: Some(filter), ..Self::default() }
    }
}
