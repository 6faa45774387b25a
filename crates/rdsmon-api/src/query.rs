//! Scrape query parameters.
//!
//! `labels[]` repeats, so the handler extracts the query as ordered
//! `(key, value)` pairs through [`axum::extract::Query`] and folds them here
//! instead of deserializing into a map.

/// Parameters of one scrape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeQuery {
    pub resource_id: Option<String>,
    /// Requested label names, in request order.
    pub labels: Vec<String>,
}

impl ScrapeQuery {
    /// Fold decoded query pairs. The first non-empty `ResourceId` wins; an
    /// empty one counts as absent. Unknown keys are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut query = ScrapeQuery::default();
        for (key, value) in pairs {
            match key.as_str() {
                "ResourceId" if query.resource_id.is_none() && !value.is_empty() => {
                    query.resource_id = Some(value)
                }
                "labels[]" => query.labels.push(value),
                _ => {}
            }
        }
        query
    }
}
