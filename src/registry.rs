//! Model registry.
//!
//! Maps model names to registered [`ModelEntry`]s. Each [`Database`](crate::Database)
//! owns one registry; string relation targets are resolved against it.

use crate::error::TideError;
use crate::model::{Model, ModelEntry};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Default)]
pub struct Registry {
    models: RwLock<HashMap<String, Arc<ModelEntry>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `model` under `name`, or under `model.name()` when `name` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `TideError::AlreadyRegistered` if the name is taken.
    pub fn register(
        &self,
        model: Arc<dyn Model>,
        name: Option<&str>,
    ) -> Result<Arc<ModelEntry>, TideError> {
        let name = name.unwrap_or_else(|| model.name()).to_string();
        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        if models.contains_key(&name) {
            return Err(TideError::AlreadyRegistered(name));
        }

        let entry = Arc::new(ModelEntry::new(name.clone(), model));
        log::debug!("registered model {name} (table {})", entry.table_name());
        models.insert(name, Arc::clone(&entry));
        Ok(entry)
    }

    /// Find a registered model by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<ModelEntry>, TideError> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| TideError::UnregisteredModel(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.models.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
