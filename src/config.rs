//! JSON configuration.
//!
//! ```json
//! {
//!   "listen": "0.0.0.0:3000",
//!   "middleware": [
//!     { "module": "http.handlers.x_request_id", "disabled": false }
//!   ]
//! }
//! ```
//!
//! Each `middleware` entry names a registry ID in `module`; every other key in
//! the entry belongs to that module and is handed to its factory untouched.

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::middleware::BoxedMiddleware;
use crate::registry::Registry;

const DEFAULT_LISTEN: &str = "0.0.0.0:3000";

fn default_listen() -> String {
    DEFAULT_LISTEN.to_owned()
}

/// Top-level server configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Ordered middleware stack; the first entry sees each request first.
    #[serde(default)]
    pub middleware: Vec<MiddlewareConfig>,
}

/// One entry of the middleware stack.
#[derive(Clone, Debug, Deserialize)]
pub struct MiddlewareConfig {
    pub module: String,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self { listen: default_listen(), middleware: Vec::new() }
    }
}

impl Config {
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Instantiates the configured stack, in order, through `registry`.
    pub fn build_middleware(&self, registry: &Registry) -> Result<Vec<BoxedMiddleware>, Error> {
        self.middleware
            .iter()
            .map(|entry| registry.load(&entry.module, Value::Object(entry.options.clone())))
            .collect()
    }
}
