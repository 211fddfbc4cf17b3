
use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::Url;

use super::{
    CollectionInfo, DeleteOutcome, IndexError, Point, ScoredPoint, VectorIndex, VectorParams,
};
use crate::config::{ConfigError, QdrantConfig};
use crate::records::Payload;

const API_KEY_HEADER: &str = "api-key";

/// Blocking REST client for a Qdrant vector index service
#[derive(Debug, Clone)]
pub struct QdrantClient {
    base_url: Url,
    api_key: Option<String>,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CollectionDescription {
    points_count: Option<u64>,
    config: CollectionConfig,
}

#[derive(Debug, Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Debug, Deserialize)]
struct CollectionParams {
    vectors: VectorsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VectorsConfig {
    Single(VectorParams),
    Named(HashMap<String, VectorParams>),
}

#[derive(Debug, Deserialize)]
struct CollectionList {
    collections: Vec<CollectionName>,
}

#[derive(Debug, Deserialize)]
struct CollectionName {
    name: String,
}

#[derive(Debug, Serialize)]
struct CreateCollectionRequest {
    vectors: VectorParams,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    points: &'a [Point],
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct WireScoredPoint {
    id: super::PointId,
    score: f32,
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
struct ScrollResult {
    points: Vec<WireRecord>,
}

#[derive(Debug, Deserialize)]
struct WireRecord {
    #[serde(default)]
    payload: Option<Payload>,
}

impl QdrantClient {
    /// Create a client from configuration. A missing URL is a configuration error.
    #[inline]
    pub fn new(config: &QdrantConfig) -> Result<Self, ConfigError> {
        let base_url = config.qdrant_url()?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .http_status_as_error(false)
            .build()
            .into();

        let api_key = config.api_key.clone().filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            debug!("No Qdrant API key configured, using unauthenticated requests");
        }

        Ok(Self {
            base_url,
            api_key,
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        self
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key.as_str()),
            None => request,
        }
    }

    fn get(&self, url: &Url) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        self.authorize(self.agent.get(url.as_str())).call()
    }

    fn delete(&self, url: &Url) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        self.authorize(self.agent.delete(url.as_str())).call()
    }

    fn put_json(
        &self,
        url: &Url,
        body: &str,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        self.authorize(self.agent.put(url.as_str()))
            .header("Content-Type", "application/json")
            .send(body)
    }

    fn post_json(
        &self,
        url: &Url,
        body: &str,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        self.authorize(self.agent.post(url.as_str()))
            .header("Content-Type", "application/json")
            .send(body)
    }

    /// Run a request and return the status code with the response body
    fn execute<F>(
        &self,
        operation: &'static str,
        collection: &str,
        request_fn: F,
    ) -> Result<(u16, String), IndexError>
    where
        F: FnOnce() -> Result<ureq::http::Response<ureq::Body>, ureq::Error>,
    {
        let transport = |error: ureq::Error| IndexError::Transport {
            operation,
            collection: collection.to_string(),
            message: error.to_string(),
        };

        let mut response = request_fn().map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string().map_err(transport)?;

        debug!("{} on '{}' answered HTTP {}", operation, collection, status);
        Ok((status, body))
    }

    fn serialize<T: Serialize>(operation: &'static str, value: &T) -> Result<String, IndexError> {
        serde_json::to_string(value).map_err(|e| IndexError::Decode {
            operation,
            message: format!("Failed to serialize request: {}", e),
        })
    }

    fn parse<T: DeserializeOwned>(operation: &'static str, body: &str) -> Result<T, IndexError> {
        serde_json::from_str::<ApiResponse<T>>(body)
            .map(|response| response.result)
            .map_err(|e| IndexError::Decode {
                operation,
                message: e.to_string(),
            })
    }

    fn status_error(
        operation: &'static str,
        collection: &str,
        status: u16,
        body: String,
    ) -> IndexError {
        IndexError::Status {
            operation,
            collection: collection.to_string(),
            status,
            body,
        }
    }
}

impl VectorIndex for QdrantClient {
    #[inline]
    fn list_collections(&self) -> Result<Vec<String>, IndexError> {
        const OPERATION: &str = "list collections";
        let url = self.endpoint(&["collections"]);

        let (status, body) = self.execute(OPERATION, "*", || self.get(&url))?;
        if status != 200 {
            return Err(Self::status_error(OPERATION, "*", status, body));
        }

        let list: CollectionList = Self::parse(OPERATION, &body)?;
        Ok(list.collections.into_iter().map(|c| c.name).collect())
    }

    #[inline]
    fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>, IndexError> {
        const OPERATION: &str = "get collection";
        let url = self.endpoint(&["collections", name]);

        let (status, body) = self.execute(OPERATION, name, || self.get(&url))?;
        match status {
            200 => {
                let description: CollectionDescription = Self::parse(OPERATION, &body)?;
                let params = match description.config.params.vectors {
                    VectorsConfig::Single(params) => params,
                    VectorsConfig::Named(named) => {
                        return Err(IndexError::Decode {
                            operation: OPERATION,
                            message: format!(
                                "collection '{}' uses named vectors ({:?}), expected a single unnamed vector",
                                name,
                                named.keys().collect::<Vec<_>>()
                            ),
                        });
                    }
                };

                Ok(Some(CollectionInfo {
                    name: name.to_string(),
                    params,
                    points_count: description.points_count,
                }))
            }
            404 => Ok(None),
            _ => Err(Self::status_error(OPERATION, name, status, body)),
        }
    }

    #[inline]
    fn create_collection(&self, name: &str, params: VectorParams) -> Result<(), IndexError> {
        const OPERATION: &str = "create collection";
        let url = self.endpoint(&["collections", name]);
        let request = Self::serialize(OPERATION, &CreateCollectionRequest { vectors: params })?;

        let (status, body) = self.execute(OPERATION, name, || self.put_json(&url, &request))?;
        if status != 200 {
            return Err(Self::status_error(OPERATION, name, status, body));
        }

        info!(
            "Created collection '{}' ({} dimensions, {})",
            name, params.size, params.distance
        );
        Ok(())
    }

    #[inline]
    fn delete_collection(&self, name: &str) -> Result<DeleteOutcome, IndexError> {
        const OPERATION: &str = "delete collection";
        let url = self.endpoint(&["collections", name]);

        let (status, body) = self.execute(OPERATION, name, || self.delete(&url))?;
        match status {
            200 => {
                // Some server versions answer 200 with `false` for a missing collection
                let deleted = Self::parse::<bool>(OPERATION, &body).unwrap_or(true);
                if deleted {
                    Ok(DeleteOutcome::Deleted)
                } else {
                    Ok(DeleteOutcome::NotFound)
                }
            }
            404 => Ok(DeleteOutcome::NotFound),
            _ => {
                warn!(
                    "Failed to delete collection '{}': HTTP {} - {}",
                    name, status, body
                );
                Err(Self::status_error(OPERATION, name, status, body))
            }
        }
    }

    #[inline]
    fn upsert_points(&self, name: &str, points: &[Point]) -> Result<(), IndexError> {
        const OPERATION: &str = "upsert points";
        let mut url = self.endpoint(&["collections", name, "points"]);
        url.query_pairs_mut().append_pair("wait", "true");
        let request = Self::serialize(OPERATION, &UpsertRequest { points })?;

        let (status, body) = self.execute(OPERATION, name, || self.put_json(&url, &request))?;
        if status != 200 {
            return Err(Self::status_error(OPERATION, name, status, body));
        }

        debug!("Upserted {} points into '{}'", points.len(), name);
        Ok(())
    }

    #[inline]
    fn search_points(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, IndexError> {
        const OPERATION: &str = "search points";
        let url = self.endpoint(&["collections", name, "points", "search"]);
        let request = Self::serialize(
            OPERATION,
            &SearchRequest {
                vector,
                limit,
                with_payload: true,
            },
        )?;

        let (status, body) = self.execute(OPERATION, name, || self.post_json(&url, &request))?;
        match status {
            200 => {
                let hits: Vec<WireScoredPoint> = Self::parse(OPERATION, &body)?;
                Ok(hits
                    .into_iter()
                    .map(|hit| ScoredPoint {
                        id: hit.id,
                        score: hit.score,
                        payload: hit.payload.unwrap_or_default(),
                    })
                    .collect())
            }
            404 => Err(IndexError::CollectionNotFound(name.to_string())),
            _ => Err(Self::status_error(OPERATION, name, status, body)),
        }
    }

    #[inline]
    fn scroll_by_payload(
        &self,
        name: &str,
        key: &str,
        value: &Value,
        limit: usize,
    ) -> Result<Vec<Payload>, IndexError> {
        const OPERATION: &str = "scroll points";
        let url = self.endpoint(&["collections", name, "points", "scroll"]);
        let request = Self::serialize(
            OPERATION,
            &json!({
                "filter": { "must": [ { "key": key, "match": { "value": value } } ] },
                "limit": limit,
                "with_payload": true,
                "with_vector": false,
            }),
        )?;

        let (status, body) = self.execute(OPERATION, name, || self.post_json(&url, &request))?;
        match status {
            200 => {
                let result: ScrollResult = Self::parse(OPERATION, &body)?;
                Ok(result
                    .points
                    .into_iter()
                    .filter_map(|point| point.payload)
                    .collect())
            }
            404 => Err(IndexError::CollectionNotFound(name.to_string())),
            _ => Err(Self::status_error(OPERATION, name, status, body)),
        }
    }
}
