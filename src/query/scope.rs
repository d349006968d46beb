use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// Native type of one attribute as persisted in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    String,
    Int,
    Double,
    Bool,
    DateTime,
    ObjectId,
}

/// Describes the element type of one resource's documents: attribute types
/// for literal coercion plus the declared relationship names, which this
/// layer must reject.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub resource: String,
    pub id_field: String,
    pub fields: HashMap<String, FieldType>,
    pub relationships: HashSet<String>,
}

impl TypeDescriptor {
    #[must_use]
    pub fn new(resource: impl Into<String>, id_field: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            id_field: id_field.into(),
            fields: HashMap::new(),
            relationships: HashSet::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.insert(name.into(), ty);
        self
    }

    #[must_use]
    pub fn with_relationship(mut self, name: impl Into<String>) -> Self {
        self.relationships.insert(name.into());
        self
    }

    #[must_use]
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).copied()
    }

    #[must_use]
    pub fn is_relationship(&self, name: &str) -> bool {
        self.relationships.contains(name)
    }
}

static SCOPE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The single iteration variable of one query translation.
///
/// Created at the top of `apply_query`, handed by reference to the builders,
/// and dropped when the translated query has been constructed. A scope is
/// never reused across two translation calls; the numbered parameter name
/// makes each translation identifiable in debug output.
#[derive(Debug)]
pub struct Scope<'a> {
    parameter_name: String,
    element_type: &'a TypeDescriptor,
}

impl<'a> Scope<'a> {
    pub(crate) fn enter(element_type: &'a TypeDescriptor) -> Self {
        let n = SCOPE_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self { parameter_name: format!("doc{n}"), element_type }
    }

    #[must_use]
    pub fn parameter_name(&self) -> &str {
        &self.parameter_name
    }

    #[must_use]
    pub fn element_type(&self) -> &TypeDescriptor {
        self.element_type
    }

    #[must_use]
    pub fn field_type(&self, field: &str) -> Option<FieldType> {
        self.element_type.field_type(field)
    }

    #[must_use]
    pub fn is_relationship(&self, field: &str) -> bool {
        self.element_type.is_relationship(field)
    }
}
