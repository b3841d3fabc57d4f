//! Handler trait and type erasure.
//!
//! The router stores handlers of different concrete types side by side, so
//! each one is wrapped in an `Arc<dyn ErasedHandler>`:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.get("/", hello)
//! hello.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                       ← stored as BoxedHandler
//!        ↓
//! handler.call(req) at request time                ← one vtable dispatch
//! ```
//!
//! Every handler resolves to `Result<Response, Error>`. That is the value the
//! middleware chain forwards back to the server, success or failure alike.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;

use crate::error::Error;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// What every stage of the chain resolves to.
pub type HandlerResult = Result<Response, Error>;

/// A heap-allocated, type-erased future resolving to a [`HandlerResult`].
///
/// The lifetime lets middleware futures borrow the chain they run in.
pub type BoxFuture<'a> = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'a>>;

#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture<'static>;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── IntoHandlerResult ─────────────────────────────────────────────────────────

/// Conversion of a handler's return value into a [`HandlerResult`].
///
/// Plain responses become `Ok`; `Result<_, Error>` passes through so a handler
/// can report failure with `?`.
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> HandlerResult;
}

impl<T: IntoResponse> IntoHandlerResult for Result<T, Error> {
    fn into_handler_result(self) -> HandlerResult {
        self.map(IntoResponse::into_response)
    }
}

macro_rules! ok_response {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoHandlerResult for $ty {
                fn into_handler_result(self) -> HandlerResult {
                    Ok(self.into_response())
                }
            }
        )*
    };
}

ok_response!(Response, &'static str, String, StatusCode);

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// Satisfied automatically by any `async fn(Request) -> R` where `R` is a
/// response-like value or a `Result<_, Error>`. The trait is sealed.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoHandlerResult + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoHandlerResult + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoHandlerResult + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<'static> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_handler_result() })
    }
}
