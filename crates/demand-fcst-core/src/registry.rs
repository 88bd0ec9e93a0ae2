//! Registry of fitted per-product models.
//!
//! The registry owns every fitted model, keyed by product id. Models are
//! immutable once published: a batch re-fit swaps the whole mapping in one
//! write, and readers holding an `Arc` to a replaced model keep a valid
//! snapshot for any prediction already in flight. Absence of a key means
//! the product is unfitted, which is an expected state (new product, too
//! little history), not an error.

use crate::model::DemandModel;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Mapping from product id to its fitted model, plus a registry-wide
/// fitted flag that turns true once a fit pass has completed, regardless
/// of per-product outcomes.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: RwLock<HashMap<String, Arc<DemandModel>>>,
    fitted: AtomicBool,
}

impl ModelRegistry {
    /// Create an empty, unfitted registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire mapping with the result of a fit pass and mark
    /// the registry fitted. There is no incremental merge: products absent
    /// from `models` are dropped.
    pub fn replace_all(&self, models: HashMap<String, Arc<DemandModel>>) {
        let mut guard = self.models.write().unwrap_or_else(|e| e.into_inner());
        *guard = models;
        drop(guard);
        self.fitted.store(true, Ordering::Release);
    }

    /// Look up the fitted model for a product. `None` means unfitted.
    pub fn get(&self, product_id: &str) -> Option<Arc<DemandModel>> {
        let guard = self.models.read().unwrap_or_else(|e| e.into_inner());
        guard.get(product_id).cloned()
    }

    /// Whether a fit pass has completed.
    pub fn is_fitted(&self) -> bool {
        self.fitted.load(Ordering::Acquire)
    }

    /// Number of products with a fitted model.
    pub fn len(&self) -> usize {
        let guard = self.models.read().unwrap_or_else(|e| e.into_inner());
        guard.len()
    }

    /// True when no product has a fitted model.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Product ids with a fitted model, sorted.
    pub fn product_ids(&self) -> Vec<String> {
        let guard = self.models.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = guard.keys().cloned().collect();
        ids.sort();
        ids
    }
}
