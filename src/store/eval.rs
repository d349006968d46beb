use bson::{Bson, Document};
use std::cmp::Ordering;

pub(crate) const MAX_PATH_DEPTH: usize = 32;

/// Evaluates a wire filter document (`$and`/`$or`/`$not` combinators,
/// per-field operator documents, implicit equality) against one stored
/// document. An empty filter matches everything.
pub fn matches_filter(doc: &Document, filter: &Document) -> bool {
    for (key, cond) in filter {
        let key: &str = key;
        let ok = match key {
            "$and" => cond
                .as_array()
                .is_some_and(|cs| cs.iter().all(|c| as_subfilter(doc, c))),
            "$or" => cond
                .as_array()
                .is_some_and(|cs| cs.iter().any(|c| as_subfilter(doc, c))),
            "$not" => cond.as_document().is_some_and(|d| !matches_filter(doc, d)),
            path => field_matches(doc, path, cond),
        };
        if !ok {
            return false;
        }
    }
    true
}

fn as_subfilter(doc: &Document, cond: &Bson) -> bool {
    cond.as_document().is_some_and(|d| matches_filter(doc, d))
}

fn field_matches(doc: &Document, path: &str, cond: &Bson) -> bool {
    let actual = get_path(doc, path);
    match cond {
        Bson::Document(ops) if is_operator_document(ops) => ops.iter().all(|(op, value)| {
            let op: &str = op;
            apply_operator(actual, op, value)
        }),
        other => actual.is_some_and(|a| bson_eq(a, other)),
    }
}

fn is_operator_document(d: &Document) -> bool {
    !d.is_empty()
        && d.iter().all(|(k, _)| {
            let k: &str = k;
            k.starts_with('$')
        })
}

fn apply_operator(actual: Option<&Bson>, op: &str, value: &Bson) -> bool {
    match op {
        "$eq" => actual.is_some_and(|a| bson_eq(a, value)),
        "$ne" => !actual.is_some_and(|a| bson_eq(a, value)),
        "$gt" => actual.is_some_and(|a| compare_bson(a, value) == Ordering::Greater),
        "$gte" => actual.is_some_and(|a| compare_bson(a, value) != Ordering::Less),
        "$lt" => actual.is_some_and(|a| compare_bson(a, value) == Ordering::Less),
        "$lte" => actual.is_some_and(|a| compare_bson(a, value) != Ordering::Greater),
        "$in" => value
            .as_array()
            .is_some_and(|vs| actual.is_some_and(|a| vs.iter().any(|v| bson_eq(a, v)))),
        _ => {
            log::warn!("unknown filter operator '{op}'");
            false
        }
    }
}

/// Composite ordering by a sort document: earlier keys take precedence,
/// later keys break ties. Missing fields sort before present ones.
pub fn compare_docs(a: &Document, b: &Document, sort: &Document) -> Ordering {
    for (field, direction) in sort {
        let field: &str = field;
        let ord = match (get_path(a, field), get_path(b, field)) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            let descending = matches!(direction, Bson::Int32(d) if *d < 0)
                || matches!(direction, Bson::Int64(d) if *d < 0);
            return if descending { ord.reverse() } else { ord };
        }
    }
    Ordering::Equal
}

/// Equality with numeric looseness: an Int32 value equals the Int64 the
/// coercer produced for the same number.
pub(crate) fn bson_eq(a: &Bson, b: &Bson) -> bool {
    if is_num(a) && is_num(b) {
        return as_f64_num(a).total_cmp(&as_f64_num(b)) == Ordering::Equal;
    }
    a == b
}

pub(crate) fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    if is_num(a) && is_num(b) {
        return as_f64_num(a).total_cmp(&as_f64_num(b));
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => {
            x.timestamp_millis().cmp(&y.timestamp_millis())
        }
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn is_num(x: &Bson) -> bool {
    matches!(x, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

#[allow(clippy::cast_precision_loss)]
fn as_f64_num(x: &Bson) -> f64 {
    match x {
        Bson::Int32(i) => f64::from(*i),
        Bson::Int64(i) => *i as f64,
        Bson::Double(f) => *f,
        _ => f64::NAN,
    }
}

fn type_rank(v: &Bson) -> u8 {
    match v {
        Bson::Null => 0,
        Bson::Boolean(_) => 1,
        Bson::Int32(_) => 2,
        Bson::Int64(_) => 3,
        Bson::Double(_) => 4,
        Bson::String(_) => 5,
        Bson::Array(_) => 6,
        Bson::Document(_) => 7,
        Bson::ObjectId(_) => 9,
        Bson::DateTime(_) => 10,
        _ => 100,
    }
}

fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let parts: Vec<&str> = path.split('.').collect();
    if parts.len() > MAX_PATH_DEPTH {
        return None;
    }
    let (last, parents) = parts.split_last()?;
    let mut cur = doc;
    for part in parents {
        match cur.get(part) {
            Some(Bson::Document(d)) => cur = d,
            _ => return None,
        }
    }
    cur.get(last)
}
