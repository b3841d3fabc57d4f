//! Radix-tree request router with a middleware stack in front.
//!
//! One tree per HTTP method, O(path-length) lookup. Every request, matched or
//! not, passes through the whole middleware stack before route lookup runs,
//! so a 404 still carries whatever the middleware put on the request.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, Handler, HandlerResult};
use crate::middleware::{BoxedMiddleware, Endpoint, Middleware, Next};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each builder call returns `self` so registrations chain naturally.
///
/// ```rust
/// use http::Method;
/// use xrequestid::{Request, Response, Router, XRequestId};
///
/// # async fn get_user(_: Request) -> Response { Response::text("") }
/// # async fn create_user(_: Request) -> Response { Response::text("") }
/// let app = Router::new()
///     .layer(XRequestId::new())
///     .on(Method::GET,  "/users/{id}", get_user)
///     .on(Method::POST, "/users",      create_user);
/// ```
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    middleware: Vec<BoxedMiddleware>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), middleware: Vec::new() }
    }

    /// Register a handler for a method + path pair.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    /// Appends `middleware` to the stack. Earlier layers run first.
    pub fn layer(self, middleware: impl Middleware) -> Self {
        self.layer_arc(Arc::new(middleware))
    }

    pub fn layer_arc(mut self, middleware: BoxedMiddleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Appends a stack built from configuration, e.g. by
    /// [`Config::build_middleware`](crate::Config::build_middleware).
    pub fn layers(mut self, stack: impl IntoIterator<Item = BoxedMiddleware>) -> Self {
        self.middleware.extend(stack);
        self
    }

    /// Runs `req` through the middleware stack and the matching route.
    ///
    /// Unmatched requests resolve to `404 Not Found`.
    pub async fn handle(&self, req: Request) -> HandlerResult {
        let endpoint = Routes { router: self };
        Next::new(&self.middleware, &endpoint).run(req).await
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// Terminal stage: route lookup and handler dispatch.
struct Routes<'r> {
    router: &'r Router,
}

impl Endpoint for Routes<'_> {
    fn call(&self, mut req: Request) -> BoxFuture<'_> {
        match self.router.lookup(req.method(), req.path()) {
            Some((handler, params)) => {
                req.set_params(params);
                handler.call(req)
            }
            None => Box::pin(std::future::ready(Ok::<_, Error>(Response::status(StatusCode::NOT_FOUND)))),
        }
    }
}
