// In-process vector index
// Used for dry runs and tests; behaves like the remote service for the operations we call

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::debug;

use super::{
    CollectionInfo, DeleteOutcome, Distance, IndexError, Point, PointId, ScoredPoint, VectorIndex,
    VectorParams,
};
use crate::records::Payload;

#[derive(Debug, Clone)]
struct StoredCollection {
    params: VectorParams,
    points: BTreeMap<PointId, Point>,
}

/// Scripted upsert failures for one collection
#[derive(Debug, Clone, Copy)]
struct FailurePlan {
    /// Upserts to let through before failing
    skip: usize,
    /// Failures left to inject once `skip` is exhausted
    remaining: usize,
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, StoredCollection>,
    upsert_failures: HashMap<String, FailurePlan>,
    delete_failures: HashMap<String, usize>,
    upsert_calls: HashMap<String, usize>,
}

/// Vector index held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryIndex {
    state: Mutex<State>,
}

impl MemoryIndex {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Let `skip` upserts into `collection` succeed, then fail the next `failures` of them
    #[inline]
    pub fn fail_upserts(&self, collection: &str, skip: usize, failures: usize) {
        self.lock().upsert_failures.insert(
            collection.to_string(),
            FailurePlan {
                skip,
                remaining: failures,
            },
        );
    }

    /// Fail the next `failures` delete requests for `collection`
    #[inline]
    pub fn fail_deletes(&self, collection: &str, failures: usize) {
        self.lock()
            .delete_failures
            .insert(collection.to_string(), failures);
    }

    /// Points currently stored in `collection`, ordered by id
    #[inline]
    pub fn points(&self, collection: &str) -> Vec<Point> {
        self.lock()
            .collections
            .get(collection)
            .map(|stored| stored.points.values().cloned().collect())
            .unwrap_or_default()
    }

    #[inline]
    pub fn point_count(&self, collection: &str) -> usize {
        self.lock()
            .collections
            .get(collection)
            .map_or(0, |stored| stored.points.len())
    }

    #[inline]
    pub fn contains_collection(&self, collection: &str) -> bool {
        self.lock().collections.contains_key(collection)
    }

    /// Number of upsert requests received for `collection`, failed ones included
    #[inline]
    pub fn upsert_calls(&self, collection: &str) -> usize {
        self.lock()
            .upsert_calls
            .get(collection)
            .copied()
            .unwrap_or(0)
    }
}

fn injected(operation: &'static str, collection: &str) -> IndexError {
    IndexError::Status {
        operation,
        collection: collection.to_string(),
        status: 503,
        body: "injected failure".to_string(),
    }
}

/// Larger scores rank first for similarities, smaller ones for distances
const fn higher_is_better(distance: Distance) -> bool {
    matches!(distance, Distance::Cosine | Distance::Dot)
}

fn score(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    match distance {
        Distance::Cosine => {
            let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm_a == 0.0 || norm_b == 0.0 {
                0.0
            } else {
                dot / (norm_a * norm_b)
            }
        }
        Distance::Dot => dot,
        Distance::Euclid => a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
        Distance::Manhattan => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
    }
}

impl VectorIndex for MemoryIndex {
    #[inline]
    fn list_collections(&self) -> Result<Vec<String>, IndexError> {
        let mut names: Vec<String> = self.lock().collections.keys().cloned().collect();
        names.sort_unstable();
        Ok(names)
    }

    #[inline]
    fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>, IndexError> {
        Ok(self
            .lock()
            .collections
            .get(name)
            .map(|stored| CollectionInfo {
                name: name.to_string(),
                params: stored.params,
                points_count: Some(stored.points.len() as u64),
            }))
    }

    #[inline]
    fn create_collection(&self, name: &str, params: VectorParams) -> Result<(), IndexError> {
        let mut state = self.lock();
        if state.collections.contains_key(name) {
            return Err(IndexError::Status {
                operation: "create collection",
                collection: name.to_string(),
                status: 409,
                body: format!("Collection `{}` already exists!", name),
            });
        }

        state.collections.insert(
            name.to_string(),
            StoredCollection {
                params,
                points: BTreeMap::new(),
            },
        );
        debug!("Created in-memory collection '{}'", name);
        Ok(())
    }

    #[inline]
    fn delete_collection(&self, name: &str) -> Result<DeleteOutcome, IndexError> {
        let mut state = self.lock();
        if let Some(remaining) = state.delete_failures.get_mut(name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(injected("delete collection", name));
            }
        }

        Ok(match state.collections.remove(name) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }

    #[inline]
    fn upsert_points(&self, name: &str, points: &[Point]) -> Result<(), IndexError> {
        let mut state = self.lock();
        *state.upsert_calls.entry(name.to_string()).or_insert(0) += 1;

        if let Some(plan) = state.upsert_failures.get_mut(name) {
            if plan.skip > 0 {
                plan.skip -= 1;
            } else if plan.remaining > 0 {
                plan.remaining -= 1;
                return Err(injected("upsert points", name));
            }
        }

        let stored = state
            .collections
            .get_mut(name)
            .ok_or_else(|| IndexError::CollectionNotFound(name.to_string()))?;

        if let Some(point) = points
            .iter()
            .find(|point| point.vector.len() != stored.params.size)
        {
            return Err(IndexError::Status {
                operation: "upsert points",
                collection: name.to_string(),
                status: 400,
                body: format!(
                    "Wrong input: Vector dimension error: expected dim: {}, got {} (point {})",
                    stored.params.size,
                    point.vector.len(),
                    point.id
                ),
            });
        }

        for point in points {
            stored.points.insert(point.id, point.clone());
        }
        Ok(())
    }

    #[inline]
    fn search_points(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, IndexError> {
        let state = self.lock();
        let stored = state
            .collections
            .get(name)
            .ok_or_else(|| IndexError::CollectionNotFound(name.to_string()))?;

        let distance = stored.params.distance;
        let mut hits: Vec<ScoredPoint> = stored
            .points
            .values()
            .map(|point| ScoredPoint {
                id: point.id,
                score: score(distance, vector, &point.vector),
                payload: point.payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| {
            let ordering = a.score.total_cmp(&b.score);
            if higher_is_better(distance) {
                ordering.reverse()
            } else {
                ordering
            }
            .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    #[inline]
    fn scroll_by_payload(
        &self,
        name: &str,
        key: &str,
        value: &Value,
        limit: usize,
    ) -> Result<Vec<Payload>, IndexError> {
        let state = self.lock();
        let stored = state
            .collections
            .get(name)
            .ok_or_else(|| IndexError::CollectionNotFound(name.to_string()))?;

        Ok(stored
            .points
            .values()
            .filter(|point| point.payload.get(key) == Some(value))
            .take(limit)
            .map(|point| point.payload.clone())
            .collect())
    }
}
