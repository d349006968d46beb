use crate::errors::AccessError;
use crate::query::types::{CompareOp, FilterNode, PageWindow, QueryDescription, SortKey};
use serde::{Deserialize, Serialize};

// Serde-facing structures for safe JSON parsing of query descriptions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterSerde {
    And {
        #[serde(rename = "$and")]
        and: Vec<FilterSerde>,
    },
    Or {
        #[serde(rename = "$or")]
        or: Vec<FilterSerde>,
    },
    Not {
        #[serde(rename = "$not")]
        not: Box<FilterSerde>,
    },
    Exists {
        relation: String,
    },
    In {
        field: String,
        #[serde(rename = "$in")]
        in_vals: Vec<String>,
    },
    Cmp {
        field: String,
        #[serde(rename = "$eq")]
        eq: Option<String>,
        #[serde(rename = "$ne")]
        ne: Option<String>,
        #[serde(rename = "$gt")]
        gt: Option<String>,
        #[serde(rename = "$gte")]
        gte: Option<String>,
        #[serde(rename = "$lt")]
        lt: Option<String>,
        #[serde(rename = "$lte")]
        lte: Option<String>,
    },
}

impl TryFrom<FilterSerde> for FilterNode {
    type Error = AccessError;
    fn try_from(fs: FilterSerde) -> Result<Self, Self::Error> {
        use FilterSerde as FS;
        Ok(match fs {
            FS::And { and } => {
                Self::And(and.into_iter().map(Self::try_from).collect::<Result<_, _>>()?)
            }
            FS::Or { or } => {
                Self::Or(or.into_iter().map(Self::try_from).collect::<Result<_, _>>()?)
            }
            FS::Not { not } => Self::Not(Box::new(Self::try_from(*not)?)),
            FS::Exists { relation } => Self::Exists { relation },
            FS::In { field, in_vals } => Self::In { field, literals: in_vals },
            FS::Cmp { field, eq, ne, gt, gte, lt, lte } => {
                let (op, literal) = if let Some(v) = eq {
                    (CompareOp::Eq, v)
                } else if let Some(v) = ne {
                    (CompareOp::Ne, v)
                } else if let Some(v) = gt {
                    (CompareOp::Gt, v)
                } else if let Some(v) = gte {
                    (CompareOp::Gte, v)
                } else if let Some(v) = lt {
                    (CompareOp::Lt, v)
                } else if let Some(v) = lte {
                    (CompareOp::Lte, v)
                } else {
                    return Err(AccessError::Query("no comparison operator provided".into()));
                };
                Self::Compare { field, op, literal }
            }
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageSerde {
    pub number: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryDescriptionSerde {
    #[serde(default)]
    pub filter: Option<FilterSerde>,
    #[serde(default)]
    pub sort: Vec<SortKey>,
    #[serde(default)]
    pub page: Option<PageSerde>,
}

impl TryFrom<QueryDescriptionSerde> for QueryDescription {
    type Error = AccessError;
    fn try_from(qs: QueryDescriptionSerde) -> Result<Self, Self::Error> {
        let filter = qs.filter.map(FilterNode::try_from).transpose()?;
        let page = qs.page.map(|p| PageWindow::new(p.number, p.size)).transpose()?;
        Ok(Self { filter, sort: qs.sort, page })
    }
}

/// # Errors
/// Returns an error if the JSON string cannot be parsed into a filter tree.
pub fn parse_filter_json(json: &str) -> Result<FilterNode, AccessError> {
    let fs: FilterSerde = serde_json::from_str(json)?;
    FilterNode::try_from(fs)
}

/// # Errors
/// Returns an error if the JSON string cannot be parsed into a query
/// description, or if its page window is out of bounds.
pub fn parse_query_json(json: &str) -> Result<QueryDescription, AccessError> {
    let qs: QueryDescriptionSerde = serde_json::from_str(json)?;
    QueryDescription::try_from(qs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_comparison() {
        let f = parse_filter_json(r#"{"field":"price","$gte":"10"}"#).unwrap();
        assert!(matches!(f, FilterNode::Compare { ref field, op: CompareOp::Gte, .. } if field == "price"));
    }

    #[test]
    fn parse_full_description() {
        let q = parse_query_json(
            r#"{
                "filter": {"$and": [
                    {"field": "price", "$gte": "10"},
                    {"field": "price", "$lte": "20"}
                ]},
                "sort": [{"field": "name"}],
                "page": {"number": 2, "size": 3}
            }"#,
        )
        .unwrap();
        assert!(matches!(q.filter, Some(FilterNode::And(ref v)) if v.len() == 2));
        assert_eq!(q.sort.len(), 1);
        assert!(!q.sort[0].descending);
        assert_eq!(q.page.unwrap().skip(), 3);
    }

    #[test]
    fn zero_page_number_is_rejected() {
        let err = parse_query_json(r#"{"page": {"number": 0, "size": 5}}"#).unwrap_err();
        assert!(matches!(err, AccessError::Query(_)));
    }

    #[test]
    fn comparison_without_operator_is_rejected() {
        assert!(parse_filter_json(r#"{"field":"price"}"#).is_err());
    }

    #[test]
    fn huge_page_number_saturates_instead_of_overflowing() {
        let q = parse_query_json(r#"{"page": {"number": 18446744073709551615, "size": 2}}"#)
            .unwrap();
        assert_eq!(q.page.unwrap().skip(), u64::MAX);
    }
}
