use crate::errors::AccessError;
use bson::Bson;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type CollectionName = String;

/// Native type of a resource identifier as persisted in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdType {
    ObjectId,
    String,
    Int,
}

/// Maps one resource type onto exactly one collection.
///
/// Fixed configuration supplied at startup and injected into the repository;
/// never looked up through ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceMapping {
    pub resource: String,
    pub collection: CollectionName,
    pub id_field: String,
    pub id_type: IdType,
}

impl ResourceMapping {
    #[must_use]
    pub fn new(
        resource: impl Into<String>,
        collection: impl Into<String>,
        id_field: impl Into<String>,
        id_type: IdType,
    ) -> Self {
        Self {
            resource: resource.into(),
            collection: collection.into(),
            id_field: id_field.into(),
            id_type,
        }
    }

    /// Converts a textual identifier from the framework into its store-native
    /// form.
    ///
    /// # Errors
    /// Returns `LiteralCoercion` when the text does not parse as the mapped
    /// identifier type.
    pub fn coerce_id(&self, raw: &str) -> Result<Bson, AccessError> {
        match self.id_type {
            IdType::String => Ok(Bson::String(raw.to_owned())),
            IdType::Int => raw.parse::<i64>().map(Bson::Int64).map_err(|_| {
                AccessError::LiteralCoercion {
                    field: self.id_field.clone(),
                    value: raw.to_owned(),
                    target: "integer id",
                }
            }),
            IdType::ObjectId => bson::oid::ObjectId::parse_str(raw)
                .map(Bson::ObjectId)
                .map_err(|_| AccessError::LiteralCoercion {
                    field: self.id_field.clone(),
                    value: raw.to_owned(),
                    target: "object id",
                }),
        }
    }
}

/// The set of attribute names a write request explicitly intends to change.
///
/// Writes copy only these fields from the incoming object, so server-owned
/// fields are never taken verbatim from a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetedFields(BTreeSet<String>);

impl TargetedFields {
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<S: Into<String>> FromIterator<S> for TargetedFields {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
