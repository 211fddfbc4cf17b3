// Search module
// Similarity queries over synced collections and lookups by source identifier


use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::embeddings::Embedder;
use crate::index::{IndexError, VectorIndex};
use crate::records::Payload;

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const PRODUCT_SUGGESTION_LIMIT: usize = 5;
pub const SHOP_SUGGESTION_LIMIT: usize = 3;

/// One ranked search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub score: f32,
    pub payload: Payload,
}

/// Product side of a suggestion request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductSearch {
    pub keywords: Vec<String>,
    pub categories: Vec<String>,
    pub features: Vec<String>,
}

impl ProductSearch {
    /// Query text: keywords, then categories, then features
    #[inline]
    pub fn query_text(&self) -> String {
        self.keywords
            .iter()
            .chain(&self.categories)
            .chain(&self.features)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Shop side of a suggestion request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopSearch {
    pub keywords: Vec<String>,
    pub features: Vec<String>,
}

impl ShopSearch {
    #[inline]
    pub fn query_text(&self) -> String {
        self.keywords
            .iter()
            .chain(&self.features)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Search terms extracted from a conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionQuery {
    pub product_search: ProductSearch,
    pub shop_search: ShopSearch,
}

/// Payloads to show next to a conversational answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    pub products: Vec<Payload>,
    pub shops: Vec<Payload>,
}

/// Embeds query text and asks the index for nearest neighbours.
///
/// The embedder must be the one the collections were written with. Queries issued
/// while a collection is being recreated can see it empty or partially filled.
#[derive(Clone)]
pub struct SearchClient {
    index: Arc<dyn VectorIndex>,
    embedder: Embedder,
}

impl SearchClient {
    #[inline]
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Embedder) -> Self {
        Self { index, embedder }
    }

    /// Ranked payloads for `query`, best match first. No matches is an empty list.
    #[inline]
    pub fn search(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, IndexError> {
        let info = self
            .index
            .collection_info(collection)?
            .ok_or_else(|| IndexError::CollectionNotFound(collection.to_string()))?;

        if info.params.size != self.embedder.dimension() {
            return Err(IndexError::DimensionMismatch {
                collection: collection.to_string(),
                expected: self.embedder.dimension(),
                actual: info.params.size,
            });
        }

        let vector = self.embedder.embed(query);
        let hits = self.index.search_points(collection, &vector, limit)?;
        debug!(
            "Search in '{}' for {:?} returned {} hits",
            collection,
            query,
            hits.len()
        );

        Ok(hits
            .into_iter()
            .map(|hit| SearchHit {
                score: hit.score,
                payload: hit.payload,
            })
            .collect())
    }

    /// Payload of the point whose `field` equals `value`.
    ///
    /// Point ids are not source keys, so this scans payload content. An absent
    /// record or collection is `None`.
    #[inline]
    pub fn find_by_source_id(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Payload>, IndexError> {
        match self.index.scroll_by_payload(collection, field, value, 1) {
            Ok(mut payloads) => Ok((!payloads.is_empty()).then(|| payloads.swap_remove(0))),
            Err(IndexError::CollectionNotFound(_)) => {
                debug!("Lookup in missing collection '{}'", collection);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Product and shop suggestions; a failed query yields an empty list
    #[inline]
    pub fn suggest(&self, query: &SuggestionQuery) -> Suggestions {
        Suggestions {
            products: self.suggest_from(
                "products",
                &query.product_search.query_text(),
                PRODUCT_SUGGESTION_LIMIT,
            ),
            shops: self.suggest_from(
                "shops",
                &query.shop_search.query_text(),
                SHOP_SUGGESTION_LIMIT,
            ),
        }
    }

    fn suggest_from(&self, collection: &str, text: &str, limit: usize) -> Vec<Payload> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        match self.search(collection, text, limit) {
            Ok(hits) => hits.into_iter().map(|hit| hit.payload).collect(),
            Err(e) => {
                warn!("Error searching '{}' for suggestions: {}", collection, e);
                Vec::new()
            }
        }
    }
}
