//! Paged resource envelopes and query filters of the v2 API.

use serde::Deserialize;
use serde::Serialize;

use crate::ConnectionError;

/// One page of a resource listing.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct Page<T> {
    #[serde(default)]
    pub next_url: Option<String>,
    #[serde(default)]
    pub resources: Vec<T>,
}

/// A resource as returned by the v2 API.
#[derive(Debug, Deserialize)]
pub(crate) struct Resource<T> {
    pub metadata: Metadata,
    pub entity: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Metadata {
    pub guid: String,
}

/// A `q=` query filter for resource listings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filter {
    field: String,
    operator: &'static str,
    values: Vec<String>,
}

impl Filter {
    /// Match resources whose `field` equals `value`.
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: ":",
            values: vec![value.into()],
        }
    }

    /// Match resources whose `field` is one of `values`.
    pub fn any_of<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            operator: " IN ",
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Match resources named `name`.
    pub fn name(name: impl Into<String>) -> Self {
        Self::equals("name", name)
    }

    fn expression(&self) -> String {
        format!("{}{}{}", self.field, self.operator, self.values.join(","))
    }
}

#[derive(Serialize)]
struct Query {
    q: String,
}

/// Encode `filters` as a query string (without the leading `?`).
pub(crate) fn encode_filters(filters: &[Filter]) -> Result<String, ConnectionError> {
    filters
        .iter()
        .map(|filter| {
            serde_qs::to_string(&Query {
                q: filter.expression(),
            })
            .map_err(|e| ConnectionError::InvalidRequest(format!("invalid filter: {}", e)))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(|pairs| pairs.join("&"))
}
