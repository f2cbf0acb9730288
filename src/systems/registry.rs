//! Registry of systems, ordered by priority and addressable by name.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{EngineError, EngineResult};
use crate::systems::System;

#[derive(Default)]
pub struct SystemRegistry {
    ordered: Vec<Arc<dyn System>>,
    by_name: FxHashMap<String, Arc<dyn System>>,
}

impl std::fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert keeping ascending priority. Systems with equal priority keep
    /// insertion order.
    pub fn add(&mut self, system: Arc<dyn System>) -> EngineResult<()> {
        let name = system.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(EngineError::DuplicateSystem(name));
        }
        let priority = system.base().priority();
        let at = self
            .ordered
            .partition_point(|s| s.base().priority() <= priority);
        self.ordered.insert(at, Arc::clone(&system));
        self.by_name.insert(name, system);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn System>> {
        self.by_name.get(name).cloned()
    }

    pub fn enable_all(&self) {
        for s in &self.ordered {
            s.base().enable();
        }
    }

    /// Enabled systems in execution order, as observed now.
    pub fn runnable(&self) -> Vec<Arc<dyn System>> {
        self.ordered
            .iter()
            .filter(|s| s.base().is_enabled())
            .cloned()
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(|s| s.name())
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
