use crate::errors::AccessError;
use crate::query::scope::Scope;
use crate::query::types::{MAX_SORT_FIELDS, SortKey};
use bson::Document;

/// Compiles an ordered sort key list into the store's sort document.
///
/// Key order is preserved: the first key is the primary sort, each later key
/// breaks ties among the preceding ones. Ascending maps to `1`, descending
/// to `-1`. Lists longer than `MAX_SORT_FIELDS` are rejected outright;
/// silently dropping keys would break tie-breaking.
pub(crate) fn build_sort(scope: &Scope<'_>, keys: &[SortKey]) -> Result<Document, AccessError> {
    if keys.len() > MAX_SORT_FIELDS {
        return Err(AccessError::Query(format!(
            "sort list has {} keys, maximum is {MAX_SORT_FIELDS}",
            keys.len()
        )));
    }
    let mut sort = Document::new();
    for key in keys {
        if scope.is_relationship(&key.field) {
            return Err(AccessError::RelationshipsUnsupported(format!(
                "cannot sort by relationship '{}' of resource '{}'",
                key.field,
                scope.element_type().resource
            )));
        }
        sort.insert(key.field.clone(), if key.descending { -1_i32 } else { 1_i32 });
    }
    Ok(sort)
}
