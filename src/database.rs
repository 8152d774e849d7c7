//! The top-level handle.
//!
//! A [`Database`] owns the executor, the model registry, the plugins and the
//! configuration. It is cheap to clone; clones share everything.

use crate::config::TideConfig;
use crate::connection;
use crate::error::TideError;
use crate::executor::{MayPostgresExecutor, TideExecutor};
use crate::model::{Model, ModelHandle};
use crate::plugin::{CaseConverterPlugin, Plugin};
use crate::query::QueryBuilder;
use crate::registry::Registry;
use std::fmt;
use std::sync::{Arc, Weak};

pub(crate) struct DatabaseInner {
    executor: Arc<dyn TideExecutor>,
    registry: Registry,
    plugins: Vec<Arc<dyn Plugin>>,
    config: TideConfig,
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// A database with the default configuration and no plugins.
    pub fn new(executor: Arc<dyn TideExecutor>) -> Self {
        Self::builder(executor).build()
    }

    pub fn builder(executor: Arc<dyn TideExecutor>) -> DatabaseBuilder {
        DatabaseBuilder {
            executor,
            plugins: Vec::new(),
            config: TideConfig::default(),
        }
    }

    /// Connect to `config.url` with `may_postgres`.
    pub fn connect(config: &TideConfig) -> Result<Self, TideError> {
        let client = connection::connect(&config.url)?;
        Ok(Self::builder(Arc::new(MayPostgresExecutor::new(client)))
            .config(config.clone())
            .build())
    }

    /// Load [`TideConfig`] from file and environment, then connect.
    pub fn from_env() -> Result<Self, TideError> {
        let config = TideConfig::load()?;
        Self::connect(&config)
    }

    /// Register a model under its own name.
    pub fn register<M: Model>(&self, model: M) -> Result<ModelHandle, TideError> {
        self.register_model(Arc::new(model), None)
    }

    /// Register a model under `name`.
    pub fn register_as<M: Model>(&self, model: M, name: &str) -> Result<ModelHandle, TideError> {
        self.register_model(Arc::new(model), Some(name))
    }

    fn register_model(
        &self,
        model: Arc<dyn Model>,
        name: Option<&str>,
    ) -> Result<ModelHandle, TideError> {
        let entry = self.inner.registry.register(model, name)?;
        Ok(ModelHandle::new(entry, self.clone()))
    }

    /// Handle of a registered model.
    pub fn model(&self, name: &str) -> Result<ModelHandle, TideError> {
        let entry = self.inner.registry.lookup(name)?;
        Ok(ModelHandle::new(entry, self.clone()))
    }

    /// Shorthand for `db.model(name)?.query()`.
    pub fn query(&self, name: &str) -> Result<QueryBuilder, TideError> {
        Ok(self.model(name)?.query())
    }

    pub fn executor(&self) -> &Arc<dyn TideExecutor> {
        &self.inner.executor
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.inner.plugins
    }

    pub fn config(&self) -> &TideConfig {
        &self.inner.config
    }

    pub(crate) fn downgrade(&self) -> Weak<DatabaseInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<DatabaseInner>) -> Result<Self, TideError> {
        weak.upgrade()
            .map(|inner| Self { inner })
            .ok_or_else(|| TideError::Other("database handle was dropped".to_string()))
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("models", &self.inner.registry.names())
            .field("plugins", &self.inner.plugins.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

pub struct DatabaseBuilder {
    executor: Arc<dyn TideExecutor>,
    plugins: Vec<Arc<dyn Plugin>>,
    config: TideConfig,
}

impl DatabaseBuilder {
    /// Add a plugin. Plugins run in the order they were added.
    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn config(mut self, config: TideConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(mut self) -> Database {
        if self.config.convert_case {
            self.plugins.push(Arc::new(CaseConverterPlugin));
        }
        if let Some(size) = self.config.stack_size {
            may::config().set_stack_size(size);
        }
        Database {
            inner: Arc::new(DatabaseInner {
                executor: self.executor,
                registry: Registry::new(),
                plugins: self.plugins,
                config: self.config,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockExecutor;

    struct User;

    impl Model for User {
        fn name(&self) -> &str {
            "User"
        }
    }

    #[test]
    fn test_register_and_model() {
        let db = Database::new(Arc::new(MockExecutor::new()));
        db.register(User).unwrap();
        assert_eq!(db.model("User").unwrap().table_name(), "users");
        assert!(db.model("Ghost").is_err());
    }

    #[test]
    fn test_register_twice_fails() {
        let db = Database::new(Arc::new(MockExecutor::new()));
        db.register(User).unwrap();
        assert!(matches!(
            db.register(User),
            Err(TideError::AlreadyRegistered(_))
        ));
        db.register_as(User, "Admin").unwrap();
        assert_eq!(db.registry().names(), vec!["Admin", "User"]);
    }

    #[test]
    fn test_registries_are_per_database() {
        let first = Database::new(Arc::new(MockExecutor::new()));
        let second = Database::new(Arc::new(MockExecutor::new()));
        first.register(User).unwrap();
        second.register(User).unwrap();
        assert!(first.registry().contains("User"));
        assert!(second.registry().contains("User"));
    }

    #[test]
    fn test_convert_case_adds_plugin() {
        let config = TideConfig {
            convert_case: true,
            ..TideConfig::default()
        };
        let db = Database::builder(Arc::new(MockExecutor::new()))
            .config(config)
            .build();
        assert_eq!(db.plugins().len(), 1);
    }

    #[test]
    fn test_upgrade_after_drop() {
        let db = Database::new(Arc::new(MockExecutor::new()));
        let weak = db.downgrade();
        assert!(Database::upgrade(&weak).is_ok());
        drop(db);
        assert!(Database::upgrade(&weak).is_err());
    }
}
