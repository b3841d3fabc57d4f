//! Middleware layer.
//!
//! Middleware sits between the server and the routed handler and is the
//! place for cross-cutting concerns such as request-id injection. The stack
//! is an ordered slice: the first registered middleware sees the request
//! first and each one hands it to the rest of the stack through [`Next`].
//!
//! ```text
//! server → m₀.handle(req, next₁) → m₁.handle(req, next₂) → … → endpoint
//!        ←           result       ←           result       ← … ←
//! ```
//!
//! A middleware that is also a [`Module`] can be discovered by name through
//! the [`Registry`](crate::registry::Registry) and built from configuration.
//!
//! Built-in middleware:
//! - [`x_request_id`] — guarantees every request carries an `X-Request-Id`

use std::future::Future;
use std::sync::Arc;

use crate::error::Error;
use crate::handler::{BoxFuture, HandlerResult};
use crate::request::Request;

pub mod x_request_id;

pub use x_request_id::XRequestId;

// ── Middleware ────────────────────────────────────────────────────────────────

/// One stage of the request pipeline.
///
/// Implementations get the request by value, may mutate it, and must call
/// [`Next::run`] exactly once to continue the chain. The returned future may
/// borrow `self` and the chain for `'a`.
pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a>;
}

/// A shared, type-erased middleware as stored by the router.
pub type BoxedMiddleware = Arc<dyn Middleware>;

// ── Endpoint ──────────────────────────────────────────────────────────────────

/// The terminal stage reached once every middleware has run.
///
/// Implemented for any `Fn(Request) -> impl Future<Output = HandlerResult>`,
/// which is how tests drive a single middleware in isolation.
pub trait Endpoint: Send + Sync {
    fn call(&self, req: Request) -> BoxFuture<'_>;
}

impl<F, Fut> Endpoint for F
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<'_> {
        Box::pin(self(req))
    }
}

// ── Next ──────────────────────────────────────────────────────────────────────

/// The remainder of the chain, handed to each middleware.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stack: &'a [BoxedMiddleware],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    pub fn new(stack: &'a [BoxedMiddleware], endpoint: &'a dyn Endpoint) -> Self {
        Self { stack, endpoint }
    }

    /// Runs the next middleware, or the endpoint once the stack is exhausted.
    pub fn run(self, req: Request) -> BoxFuture<'a> {
        match self.stack.split_first() {
            Some((head, rest)) => head.handle(req, Next { stack: rest, endpoint: self.endpoint }),
            None => self.endpoint.call(req),
        }
    }
}

// ── from_fn ───────────────────────────────────────────────────────────────────

/// Turns a plain function into a [`Middleware`].
///
/// ```rust
/// use xrequestid::handler::BoxFuture;
/// use xrequestid::middleware::{Next, from_fn};
/// use xrequestid::{Request, Router};
///
/// fn tag<'a>(mut req: Request, next: Next<'a>) -> BoxFuture<'a> {
///     Box::pin(async move {
///         req.set_header("x-stage", "tagged")?;
///         next.run(req).await
///     })
/// }
///
/// let app = Router::new().layer(from_fn(tag));
/// ```
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: for<'a> Fn(Request, Next<'a>) -> BoxFuture<'a> + Send + Sync + 'static,
{
    FromFn(f)
}

/// Middleware returned by [`from_fn`].
pub struct FromFn<F>(F);

impl<F> Middleware for FromFn<F>
where
    F: for<'a> Fn(Request, Next<'a>) -> BoxFuture<'a> + Send + Sync + 'static,
{
    fn handle<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a> {
        (self.0)(req, next)
    }
}

// ── Module lifecycle ──────────────────────────────────────────────────────────

/// Startup context handed to [`Module::provision`].
#[derive(Clone, Debug)]
pub struct Context {
    module_id: &'static str,
}

impl Context {
    pub fn for_module(module_id: &'static str) -> Self {
        Self { module_id }
    }

    /// The registry ID the module is being loaded under.
    pub fn module_id(&self) -> &'static str {
        self.module_id
    }
}

/// Lifecycle hooks run once when a module is loaded from configuration.
///
/// `provision` prepares derived state; `validate` then checks the result.
/// Both run before the first request and never on the request path.
pub trait Module {
    fn provision(&mut self, _ctx: &Context) -> Result<(), Error> {
        Ok(())
    }

    fn validate(&self) -> Result<(), Error> {
        Ok(())
    }
}
