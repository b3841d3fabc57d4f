//! # xrequestid
//!
//! Every request that passes through the pipeline carries a correlation
//! identifier in `X-Request-Id`.
//!
//! - Caller sent a non-blank value: it is kept exactly as received.
//! - Header missing, empty or whitespace only: a fresh UUID v4 is stored.
//! - Middleware disabled: the header is never looked at.
//!
//! The [`XRequestId`] middleware runs inside a small hyper-based pipeline:
//! a radix-tree [`Router`] with an ordered middleware stack, a [`Server`]
//! with graceful shutdown, and a name-keyed [`Registry`](registry::Registry)
//! so the stack can be assembled from JSON [`Config`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use xrequestid::{Request, Router, Server, XRequestId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), xrequestid::Error> {
//!     xrequestid::logging::init();
//!
//!     let app = Router::new()
//!         .layer(XRequestId::new())
//!         .get("/whoami", whoami);
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn whoami(req: Request) -> String {
//!     req.header("x-request-id").unwrap_or_default().to_owned()
//! }
//! ```
//!
//! ## From configuration
//!
//! ```rust
//! use xrequestid::{Config, Router, registry};
//!
//! let config = Config::from_json(r#"{
//!     "middleware": [{ "module": "http.handlers.x_request_id", "disabled": false }]
//! }"#)?;
//! let app = Router::new().layers(config.build_middleware(registry::global())?);
//! # Ok::<(), xrequestid::Error>(())
//! ```

mod error;
mod request;
mod response;
mod router;
mod server;

pub mod config;
pub mod handler;
pub mod logging;
pub mod middleware;
pub mod registry;

pub use config::Config;
pub use error::Error;
pub use handler::Handler;
pub use middleware::XRequestId;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::{Server, serve_listener};
