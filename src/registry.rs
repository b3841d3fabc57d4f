//! Module discovery by name.
//!
//! Configuration refers to middleware by a string ID such as
//! `http.handlers.x_request_id`. The [`Registry`] maps those IDs to factories
//! that decode the module's own configuration, run its lifecycle hooks, and
//! hand back a ready-to-share [`BoxedMiddleware`].

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::Error;
use crate::middleware::{BoxedMiddleware, Context, Middleware, Module, XRequestId};

/// Builds a middleware from its JSON configuration.
pub type Factory = fn(serde_json::Value, &Context) -> Result<BoxedMiddleware, Error>;

/// A registry entry.
#[derive(Clone, Copy)]
pub struct ModuleInfo {
    pub id: &'static str,
    pub new: Factory,
}

impl ModuleInfo {
    /// Entry for any middleware that can be deserialized from its config.
    pub fn of<M>(id: &'static str) -> Self
    where
        M: Middleware + Module + DeserializeOwned,
    {
        Self { id, new: build::<M> }
    }
}

impl std::fmt::Debug for ModuleInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleInfo").field("id", &self.id).finish_non_exhaustive()
    }
}

fn build<M>(config: serde_json::Value, ctx: &Context) -> Result<BoxedMiddleware, Error>
where
    M: Middleware + Module + DeserializeOwned,
{
    let mut module: M = serde_json::from_value(config)?;
    module.provision(ctx)?;
    module.validate()?;
    Ok(Arc::new(module))
}

/// String-keyed table of middleware factories.
#[derive(Debug, Default)]
pub struct Registry {
    modules: HashMap<&'static str, ModuleInfo>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every middleware shipped with this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for info in [XRequestId::module_info()] {
            registry.modules.insert(info.id, info);
        }
        registry
    }

    /// Adds `info`. IDs are unique; registering one twice is an error.
    pub fn register(&mut self, info: ModuleInfo) -> Result<(), Error> {
        if self.modules.contains_key(info.id) {
            return Err(Error::DuplicateModule(info.id.to_owned()));
        }
        self.modules.insert(info.id, info);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ModuleInfo> {
        self.modules.get(id)
    }

    /// Registered IDs in sorted order.
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.modules.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Instantiates module `id` from `config`.
    pub fn load(&self, id: &str, config: serde_json::Value) -> Result<BoxedMiddleware, Error> {
        let info = self.get(id).ok_or_else(|| Error::UnknownModule(id.to_owned()))?;
        let module = (info.new)(config, &Context::for_module(info.id))?;
        debug!(module = info.id, "module loaded");
        Ok(module)
    }
}

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::with_builtins);

/// The process-wide registry, populated with the built-ins on first use.
pub fn global() -> &'static Registry {
    &GLOBAL
}
