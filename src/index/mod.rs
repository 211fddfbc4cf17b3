// Vector index module
// Wire types and the trait every vector index backend implements

#[cfg(test)]
mod tests;

pub mod memory;
pub mod qdrant;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::records::Payload;

pub use memory::MemoryIndex;
pub use qdrant::QdrantClient;

/// Similarity metric declared on a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Distance {
    #[default]
    Cosine,
    Euclid,
    Dot,
    Manhattan,
}

impl fmt::Display for Distance {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Cosine => write!(f, "Cosine"),
            Self::Euclid => write!(f, "Euclid"),
            Self::Dot => write!(f, "Dot"),
            Self::Manhattan => write!(f, "Manhattan"),
        }
    }
}

/// Vector configuration of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorParams {
    pub size: usize,
    pub distance: Distance,
}

impl VectorParams {
    #[inline]
    pub const fn cosine(size: usize) -> Self {
        Self {
            size,
            distance: Distance::Cosine,
        }
    }
}

/// Identifier of a point: an unsigned integer or a UUID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(Uuid),
}

impl fmt::Display for PointId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(id) => write!(f, "{}", id),
            Self::Uuid(id) => write!(f, "{}", id),
        }
    }
}

impl From<u64> for PointId {
    #[inline]
    fn from(value: u64) -> Self {
        Self::Num(value)
    }
}

impl From<Uuid> for PointId {
    #[inline]
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

/// The atomic unit stored in a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: PointId,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

/// A search hit as returned by the index, best match first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: PointId,
    pub score: f32,
    #[serde(default)]
    pub payload: Payload,
}

/// Declared configuration and size of an existing collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    pub params: VectorParams,
    pub points_count: Option<u64>,
}

/// Result of a delete request. Both variants leave the collection absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("{operation} on collection '{collection}' failed with HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        collection: String,
        status: u16,
        body: String,
    },

    #[error("{operation} on collection '{collection}' failed: {message}")]
    Transport {
        operation: &'static str,
        collection: String,
        message: String,
    },

    #[error("Unexpected response to {operation}: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    #[error(
        "Collection '{collection}' stores {actual}-dimensional vectors, but {expected} were requested"
    )]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    #[error("Collection '{collection}' uses {actual} distance, but {expected} was requested")]
    DistanceMismatch {
        collection: String,
        expected: Distance,
        actual: Distance,
    },

    #[error("Collection '{0}' does not exist")]
    CollectionNotFound(String),
}

impl IndexError {
    /// HTTP status carried by the error, if the server answered at all
    #[inline]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Operations the sync pipeline and the search path need from a vector index.
///
/// Implementations are blocking; every call is a network round trip for remote
/// backends and must carry its own timeout.
pub trait VectorIndex: Send + Sync {
    /// Names of all collections
    fn list_collections(&self) -> Result<Vec<String>, IndexError>;

    /// Configuration of `name`, or `None` when it does not exist
    fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>, IndexError>;

    fn create_collection(&self, name: &str, params: VectorParams) -> Result<(), IndexError>;

    /// Delete `name`. Deleting an absent collection is not an error.
    fn delete_collection(&self, name: &str) -> Result<DeleteOutcome, IndexError>;

    /// Insert or overwrite `points` in a single request
    fn upsert_points(&self, name: &str, points: &[Point]) -> Result<(), IndexError>;

    /// Nearest neighbours of `vector`, highest similarity first
    fn search_points(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, IndexError>;

    /// Payloads whose `key` field equals `value`
    fn scroll_by_payload(
        &self,
        name: &str,
        key: &str,
        value: &Value,
        limit: usize,
    ) -> Result<Vec<Payload>, IndexError>;
}
