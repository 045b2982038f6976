//! Pending operation set
//!
//! Buffered mutations of one open transaction, kept per kind in the order
//! they were issued.

use crate::value::Value;

/// Ordered buffers of pending sets, updates and deletes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingOps {
    sets: Vec<(String, Value)>,
    updates: Vec<(String, Value)>,
    deletes: Vec<String>,
}

impl PendingOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_set(&mut self, key: impl Into<String>, value: Value) {
        self.sets.push((key.into(), value));
    }

    pub fn push_update(&mut self, key: impl Into<String>, value: Value) {
        self.updates.push((key.into(), value));
    }

    pub fn push_delete(&mut self, key: impl Into<String>) {
        self.deletes.push(key.into());
    }

    pub fn sets(&self) -> &[(String, Value)] {
        &self.sets
    }

    pub fn updates(&self) -> &[(String, Value)] {
        &self.updates
    }

    pub fn deletes(&self) -> &[String] {
        &self.deletes
    }

    /// Total number of buffered operations
    pub fn len(&self) -> usize {
        self.sets.len() + self.updates.len() + self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.sets.clear();
        self.updates.clear();
        self.deletes.clear();
    }
}
