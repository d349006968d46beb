use crate::errors::AccessError;
use crate::query::coerce::coerce_literal;
use crate::query::scope::Scope;
use crate::query::types::{FilterNode, MAX_IN_SET, MAX_TREE_DEPTH};
use bson::{Bson, Document};

/// Compiles a filter predicate tree into the store's wire filter document,
/// field accesses resolved against the scope's element type.
///
/// # Errors
/// `RelationshipsUnsupported` for any `Exists` node or comparison against a
/// declared relationship; `LiteralCoercion` when an operand does not parse.
pub(crate) fn build_filter(scope: &Scope<'_>, node: &FilterNode) -> Result<Document, AccessError> {
    build_node(scope, node, 0)
}

fn build_node(scope: &Scope<'_>, node: &FilterNode, depth: usize) -> Result<Document, AccessError> {
    if depth > MAX_TREE_DEPTH {
        return Err(AccessError::Query(format!(
            "filter tree exceeds maximum depth of {MAX_TREE_DEPTH}"
        )));
    }
    match node {
        FilterNode::Compare { field, op, literal } => {
            reject_relationship(scope, field)?;
            let value = coerce_literal(scope, field, literal)?;
            let mut cond = Document::new();
            cond.insert(op.wire_name(), value);
            let mut out = Document::new();
            out.insert(field.clone(), cond);
            Ok(out)
        }
        FilterNode::In { field, literals } => {
            reject_relationship(scope, field)?;
            if literals.len() > MAX_IN_SET {
                return Err(AccessError::Query(format!(
                    "'in' set exceeds maximum of {MAX_IN_SET} values"
                )));
            }
            let values = literals
                .iter()
                .map(|l| coerce_literal(scope, field, l))
                .collect::<Result<Vec<_>, _>>()?;
            let mut cond = Document::new();
            cond.insert("$in", Bson::Array(values));
            let mut out = Document::new();
            out.insert(field.clone(), cond);
            Ok(out)
        }
        FilterNode::And(children) => combine(scope, "$and", children, depth),
        FilterNode::Or(children) => {
            if children.is_empty() {
                return Err(AccessError::Query("logical 'or' requires at least one operand".into()));
            }
            combine(scope, "$or", children, depth)
        }
        FilterNode::Not(child) => {
            let inner = build_node(scope, child, depth + 1)?;
            let mut out = Document::new();
            out.insert("$not", inner);
            Ok(out)
        }
        FilterNode::Exists { relation } => Err(AccessError::RelationshipsUnsupported(format!(
            "cannot filter on relationship '{relation}' of resource '{}'",
            scope.element_type().resource
        ))),
    }
}

fn combine(
    scope: &Scope<'_>,
    operator: &str,
    children: &[FilterNode],
    depth: usize,
) -> Result<Document, AccessError> {
    // An empty conjunction matches everything.
    if children.is_empty() {
        return Ok(Document::new());
    }
    let parts = children
        .iter()
        .map(|c| build_node(scope, c, depth + 1).map(Bson::Document))
        .collect::<Result<Vec<_>, _>>()?;
    let mut out = Document::new();
    out.insert(operator, Bson::Array(parts));
    Ok(out)
}

fn reject_relationship(scope: &Scope<'_>, field: &str) -> Result<(), AccessError> {
    if scope.is_relationship(field) {
        return Err(AccessError::RelationshipsUnsupported(format!(
            "cannot compare against relationship '{field}' of resource '{}'",
            scope.element_type().resource
        )));
    }
    Ok(())
}
