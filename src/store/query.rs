use std::cmp::Ordering;

use serde_json::{json, Value};

use super::Document;

/// Filters and ordering understood by [`super::DocumentStore::list_documents`].
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Equal(String, Value),
    OrderDesc(String),
    Limit(u32),
    Offset(u32),
}

impl Query {
    pub fn equal(attribute: &str, value: impl Into<Value>) -> Self {
        Query::Equal(attribute.to_string(), value.into())
    }

    pub fn order_desc(attribute: &str) -> Self {
        Query::OrderDesc(attribute.to_string())
    }

    /// JSON query string as accepted by the `queries[]` parameter.
    pub fn to_query_string(&self) -> String {
        let q = match self {
            Query::Equal(attr, value) => {
                json!({ "method": "equal", "attribute": attr, "values": [value] })
            }
            Query::OrderDesc(attr) => json!({ "method": "orderDesc", "attribute": attr }),
            Query::Limit(n) => json!({ "method": "limit", "values": [n] }),
            Query::Offset(n) => json!({ "method": "offset", "values": [n] }),
        };
        q.to_string()
    }
}

fn field<'a>(doc: &'a Document, attribute: &str) -> Option<&'a Value> {
    if attribute == "$id" {
        return None;
    }
    doc.fields.get(attribute)
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Evaluates `queries` over `docs` in process, the way the hosted store
/// would: filters first, then ordering, then offset and limit.
pub fn apply(mut docs: Vec<Document>, queries: &[Query]) -> Vec<Document> {
    for q in queries {
        if let Query::Equal(attr, expected) = q {
            docs.retain(|d| {
                if attr == "$id" {
                    expected.as_str() == Some(d.id.as_str())
                } else {
                    field(d, attr) == Some(expected)
                }
            });
        }
    }

    // Later order clauses break ties of earlier ones.
    for q in queries.iter().rev() {
        if let Query::OrderDesc(attr) = q {
            docs.sort_by(|a, b| compare(field(b, attr), field(a, attr)));
        }
    }

    let offset = queries
        .iter()
        .rev()
        .find_map(|q| match q {
            Query::Offset(n) => Some(*n as usize),
            _ => None,
        })
        .unwrap_or(0);
    let limit = queries
        .iter()
        .rev()
        .find_map(|q| match q {
            Query::Limit(n) => Some(*n as usize),
            _ => None,
        })
        .unwrap_or(DEFAULT_LIMIT);

    docs.into_iter().skip(offset).take(limit).collect()
}

/// Page size the hosted store applies when no limit is given.
pub const DEFAULT_LIMIT: usize = 25;
