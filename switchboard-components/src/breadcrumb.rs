//! Diagnostic breadcrumbs.
//!
//! A breadcrumb is recorded before a handler body runs so that an
//! unexpected fault further down can be correlated with the activation that
//! caused it. The trail is bounded; the oldest crumbs fall off first.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

pub const DEFAULT_BREADCRUMB_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub message: String,
    pub data: BTreeMap<String, String>,
}

impl Breadcrumb {
    pub fn new(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            category: category.into(),
            message: message.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.data.insert(key.into(), value.to_string());
        self
    }
}

/// Bounded, thread-safe ring of breadcrumbs.
#[derive(Debug)]
pub struct BreadcrumbTrail {
    entries: Mutex<VecDeque<Breadcrumb>>,
    capacity: usize,
}

impl BreadcrumbTrail {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Breadcrumb>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a breadcrumb, returning its id.
    pub fn record(&self, crumb: Breadcrumb) -> Uuid {
        let id = crumb.id;
        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(crumb);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<Breadcrumb> {
        self.lock().iter().find(|c| c.id == id).cloned()
    }

    pub fn latest(&self) -> Option<Breadcrumb> {
        self.lock().back().cloned()
    }

    /// All crumbs, oldest first.
    pub fn snapshot(&self) -> Vec<Breadcrumb> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for BreadcrumbTrail {
    fn default() -> Self {
        Self::new(DEFAULT_BREADCRUMB_CAPACITY)
    }
}
