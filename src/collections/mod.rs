// Collection lifecycle
// Create, recreate and delete named collections on the vector index


use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::index::{CollectionInfo, DeleteOutcome, IndexError, VectorIndex, VectorParams};

/// What `ensure_collection` found or did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    Created,
    Existing,
}

/// Idempotent collection management on top of a [`VectorIndex`]
#[derive(Clone)]
pub struct CollectionManager {
    index: Arc<dyn VectorIndex>,
}

impl CollectionManager {
    #[inline]
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Make sure `name` exists with exactly `params`.
    ///
    /// With `recreate` the collection is deleted first, so the caller starts from an
    /// empty collection. Between that delete and the end of the following upserts,
    /// readers may observe a missing or partially populated collection.
    ///
    /// An existing collection with a different vector size or distance is an error;
    /// it is never reused silently.
    #[inline]
    pub fn ensure_collection(
        &self,
        name: &str,
        params: VectorParams,
        recreate: bool,
    ) -> Result<CollectionState, IndexError> {
        if recreate {
            match self.index.delete_collection(name)? {
                DeleteOutcome::Deleted => info!("Deleted collection '{}' for recreation", name),
                DeleteOutcome::NotFound => {
                    debug!("Collection '{}' did not exist, nothing to delete", name);
                }
            }
        }

        if let Some(existing) = self.index.collection_info(name)? {
            check_params(&existing, params)?;
            debug!("Collection '{}' already exists", name);
            return Ok(CollectionState::Existing);
        }

        match self.index.create_collection(name, params) {
            Ok(()) => Ok(CollectionState::Created),
            Err(err) if err.status() == Some(409) => {
                // Another writer created it between our check and our create
                warn!(
                    "Collection '{}' was created concurrently, re-reading its configuration",
                    name
                );
                let existing = self.index.collection_info(name)?.ok_or(err)?;
                check_params(&existing, params)?;
                Ok(CollectionState::Existing)
            }
            Err(err) => Err(err),
        }
    }

    /// Delete `name`. A missing collection counts as deleted; any other failure is
    /// logged and reported as `false` so callers can carry on with other tables.
    #[inline]
    pub fn delete_collection(&self, name: &str) -> bool {
        match self.index.delete_collection(name) {
            Ok(DeleteOutcome::Deleted) => {
                info!("Deleted collection '{}'", name);
                true
            }
            Ok(DeleteOutcome::NotFound) => {
                debug!("Collection '{}' not found, treating as deleted", name);
                true
            }
            Err(e) => {
                error!("Failed to delete collection '{}': {}", name, e);
                false
            }
        }
    }

    /// Every collection with its declared configuration, sorted by name
    #[inline]
    pub fn describe_all(&self) -> Result<Vec<CollectionInfo>, IndexError> {
        let mut names = self.index.list_collections()?;
        names.sort_unstable();

        let mut described = Vec::with_capacity(names.len());
        for name in names {
            // Dropped between the listing and the lookup
            if let Some(info) = self.index.collection_info(&name)? {
                described.push(info);
            }
        }
        Ok(described)
    }
}

fn check_params(existing: &CollectionInfo, requested: VectorParams) -> Result<(), IndexError> {
    if existing.params.size != requested.size {
        return Err(IndexError::DimensionMismatch {
            collection: existing.name.clone(),
            expected: requested.size,
            actual: existing.params.size,
        });
    }
    if existing.params.distance != requested.distance {
        return Err(IndexError::DistanceMismatch {
            collection: existing.name.clone(),
            expected: requested.distance,
            actual: existing.params.distance,
        });
    }
    Ok(())
}
