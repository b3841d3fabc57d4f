//! `X-Request-Id` injection.
//!
//! Guarantees that everything downstream of this middleware sees a non-blank
//! correlation identifier in the request header, without ever discarding one
//! the caller supplied.
//!
//! | Incoming header | Result |
//! |---|---|
//! | missing | set to a fresh UUID v4 |
//! | `""` or whitespace only | overwritten with a fresh UUID v4 |
//! | anything else | left byte-for-byte as received |
//! | any, module disabled | untouched |
//!
//! The decision runs synchronously before the chain continues; the only
//! `await` in the request path belongs to the downstream handler, whose
//! result is returned as is.
//!
//! ```rust
//! use xrequestid::{Router, XRequestId};
//!
//! let app = Router::new().layer(XRequestId::new());
//! ```

use http::header::{HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::Error;
use crate::handler::BoxFuture;
use crate::middleware::{Context, Middleware, Module, Next};
use crate::registry::ModuleInfo;
use crate::request::Request;

/// Registry ID under which the middleware is discovered.
pub const MODULE_ID: &str = "http.handlers.x_request_id";

/// Header inspected and, when blank, populated.
pub const DEFAULT_HEADER: &str = "X-Request-Id";

/// Returns a new random identifier: a UUID v4 in its canonical 36-character
/// lowercase hyphenated form.
pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// Options recognised in the module's JSON configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct XRequestIdConfig {
    /// Turns the middleware into a pure pass-through.
    pub disabled: bool,
    /// Header name, matched case-insensitively.
    pub header: String,
}

impl Default for XRequestIdConfig {
    fn default() -> Self {
        Self { disabled: false, header: DEFAULT_HEADER.to_owned() }
    }
}

// ── XRequestId ────────────────────────────────────────────────────────────────

/// The request-id middleware.
#[derive(Clone, Debug)]
pub struct XRequestId {
    config: XRequestIdConfig,
    header: HeaderName,
    module: &'static str,
}

impl XRequestId {
    /// Enabled, watching `X-Request-Id`.
    pub fn new() -> Self {
        Self {
            config: XRequestIdConfig::default(),
            header: HeaderName::from_static("x-request-id"),
            module: MODULE_ID,
        }
    }

    /// A pass-through instance that never touches the header.
    pub fn disabled() -> Self {
        let mut m = Self::new();
        m.config.disabled = true;
        m
    }

    pub fn from_config(config: XRequestIdConfig) -> Result<Self, Error> {
        let header = HeaderName::from_bytes(config.header.as_bytes())
            .map_err(|_| Error::InvalidHeaderName(config.header.clone()))?;
        Ok(Self { config, header, module: MODULE_ID })
    }

    /// Watches `name` instead of `X-Request-Id`.
    pub fn with_header(self, name: &str) -> Result<Self, Error> {
        Self::from_config(XRequestIdConfig { header: name.to_owned(), ..self.config })
    }

    pub fn config(&self) -> &XRequestIdConfig {
        &self.config
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header
    }

    pub fn module_info() -> ModuleInfo {
        ModuleInfo::of::<Self>(MODULE_ID)
    }

    /// Sets the header to a fresh identifier if it is missing or blank.
    fn ensure_request_id(&self, req: &mut Request) {
        if let Some(existing) = req.headers().get(&self.header) {
            if !is_blank(existing) {
                debug!(
                    module = self.module,
                    header = %self.header,
                    value = %String::from_utf8_lossy(existing.as_bytes()),
                    "found existing request id header, reusing it"
                );
                return;
            }
        }

        let id = new_request_id();
        // Canonical UUID text is lowercase hex and hyphens only.
        let value = HeaderValue::from_str(&id).expect("uuid text is a valid header value");
        req.headers_mut().insert(self.header.clone(), value);
        debug!(
            module = self.module,
            header = %self.header,
            value = %id,
            "added request id header with a generated value"
        );
    }
}

impl Default for XRequestId {
    fn default() -> Self { Self::new() }
}

impl TryFrom<XRequestIdConfig> for XRequestId {
    type Error = Error;

    fn try_from(config: XRequestIdConfig) -> Result<Self, Error> {
        Self::from_config(config)
    }
}

impl<'de> Deserialize<'de> for XRequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let config = XRequestIdConfig::deserialize(deserializer)?;
        Self::from_config(config).map_err(serde::de::Error::custom)
    }
}

/// Empty after trimming whitespace. Values that are not UTF-8 fall back to
/// ASCII trimming so opaque bytes still count as present.
fn is_blank(value: &HeaderValue) -> bool {
    let bytes = value.as_bytes();
    match std::str::from_utf8(bytes) {
        Ok(s) => s.trim().is_empty(),
        Err(_) => bytes.trim_ascii().is_empty(),
    }
}

impl Middleware for XRequestId {
    fn handle<'a>(&'a self, mut req: Request, next: Next<'a>) -> BoxFuture<'a> {
        if !self.config.disabled {
            self.ensure_request_id(&mut req);
        }
        next.run(req)
    }
}

impl Module for XRequestId {
    fn provision(&mut self, ctx: &Context) -> Result<(), Error> {
        self.module = ctx.module_id();
        Ok(())
    }

    /// The parsed header must exist and agree with the configured name.
    fn validate(&self) -> Result<(), Error> {
        let configured = self.config.header.as_str();
        if configured.is_empty() || !self.header.as_str().eq_ignore_ascii_case(configured) {
            return Err(Error::InvalidHeaderName(configured.to_owned()));
        }
        Ok(())
    }
}

// Compile-time check that the middleware fits the registry's expectations.
fn assert_module<M: Middleware + Module + DeserializeOwned>() {}
const _: fn() = assert_module::<XRequestId>;

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use http::Method;

    use super::*;
    use crate::middleware::BoxedMiddleware;
    use crate::response::Response;

    const EXISTING: &str = "66b5651c-b01b-11ea-b3de-0242ac130004";

    fn request(value: Option<&str>) -> Request {
        let req = Request::new(Method::GET, "/");
        match value {
            Some(v) => req.with_header(DEFAULT_HEADER, v).unwrap(),
            None => req,
        }
    }

    /// Runs `mw` in front of an endpoint that echoes the header it observed.
    async fn observed(mw: &XRequestId, req: Request) -> Option<String> {
        let endpoint = |req: Request| {
            let seen = req.header(DEFAULT_HEADER).unwrap_or("<absent>").to_owned();
            std::future::ready(Ok::<_, Error>(Response::text(seen)))
        };
        let res = mw.handle(req, Next::new(&[], &endpoint)).await.unwrap();
        let body = String::from_utf8(res.body().to_vec()).unwrap();
        (body != "<absent>").then_some(body)
    }

    fn is_uuid_v4(s: &str) -> bool {
        let bytes = s.as_bytes();
        s.len() == 36
            && [8, 13, 18, 23].iter().all(|&i| bytes[i] == b'-')
            && bytes[14] == b'4'
            && matches!(bytes[19], b'8' | b'9' | b'a' | b'b')
            && s.chars()
                .filter(|c| *c != '-')
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    #[test]
    fn new_request_id_is_canonical_uuid_v4() {
        let id = new_request_id();
        assert_eq!(id.len(), 36);
        assert!(is_uuid_v4(&id), "{id}");
        assert_ne!(id, new_request_id());
    }

    #[tokio::test]
    async fn missing_header_gets_generated_id() {
        let seen = observed(&XRequestId::new(), request(None)).await.unwrap();
        assert!(is_uuid_v4(&seen), "{seen}");
    }

    #[tokio::test]
    async fn empty_header_gets_generated_id() {
        let seen = observed(&XRequestId::new(), request(Some(""))).await.unwrap();
        assert_eq!(seen.len(), 36);
    }

    #[tokio::test]
    async fn whitespace_header_gets_generated_id() {
        for blank in ["   ", "\t", " \t "] {
            let seen = observed(&XRequestId::new(), request(Some(blank))).await.unwrap();
            assert_ne!(seen, blank);
            assert!(is_uuid_v4(&seen), "{seen}");
        }
    }

    #[tokio::test]
    async fn existing_header_is_kept() {
        let seen = observed(&XRequestId::new(), request(Some(EXISTING))).await;
        assert_eq!(seen.as_deref(), Some(EXISTING));
    }

    #[tokio::test]
    async fn existing_header_is_not_trimmed() {
        let seen = observed(&XRequestId::new(), request(Some("  abc\t"))).await;
        assert_eq!(seen.as_deref(), Some("  abc\t"));
    }

    #[tokio::test]
    async fn disabled_leaves_missing_header_absent() {
        let seen = observed(&XRequestId::disabled(), request(None)).await;
        assert_eq!(seen, None);
    }

    #[tokio::test]
    async fn disabled_leaves_blank_header_blank() {
        let seen = observed(&XRequestId::disabled(), request(Some("  "))).await;
        assert_eq!(seen.as_deref(), Some("  "));
    }

    #[tokio::test]
    async fn second_pass_reuses_first_id() {
        let mw = XRequestId::new();
        let first = observed(&mw, request(None)).await.unwrap();
        let second = observed(&mw, request(Some(&first))).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn custom_header_name() {
        let mw = XRequestId::new().with_header("X-Correlation-Id").unwrap();
        let endpoint = |req: Request| {
            let ok = req.header("x-correlation-id").is_some_and(is_uuid_v4)
                && req.header(DEFAULT_HEADER).is_none();
            std::future::ready(Ok::<_, Error>(Response::text(ok.to_string())))
        };
        let res = mw
            .handle(Request::new(Method::GET, "/"), Next::new(&[], &endpoint))
            .await
            .unwrap();
        assert_eq!(res.body(), b"true");
    }

    #[tokio::test]
    async fn downstream_error_is_returned_unchanged() {
        let endpoint = |_req: Request| {
            std::future::ready(Err::<Response, _>(Error::handler("upstream exploded")))
        };
        let err = XRequestId::new()
            .handle(request(None), Next::new(&[], &endpoint))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Handler(ref m) if m == "upstream exploded"));
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        let err = XRequestId::new().with_header("not a header").unwrap_err();
        assert!(matches!(err, Error::InvalidHeaderName(_)));
    }

    #[test]
    fn config_defaults() {
        let cfg: XRequestIdConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, XRequestIdConfig::default());
        assert!(!cfg.disabled);
        assert_eq!(cfg.header, "X-Request-Id");
    }

    #[test]
    fn config_rejects_unknown_fields() {
        let res = serde_json::from_str::<XRequestIdConfig>(r#"{"format":"ulid"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn deserializes_straight_into_middleware() {
        let mw: XRequestId = serde_json::from_str(r#"{"disabled":true}"#).unwrap();
        assert!(mw.config().disabled);
        assert_eq!(mw.header_name().as_str(), "x-request-id");
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn logs_one_debug_record_per_request() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mw = XRequestId::new();
        let endpoint = |_req: Request| std::future::ready(Ok::<_, Error>(Response::text("ok")));
        // The record is emitted before the chain continues, so it is enough to
        // hold the subscriber while building the future.
        let stack: Vec<BoxedMiddleware> = Vec::new();
        let fut = tracing::subscriber::with_default(subscriber, || {
            mw.handle(request(Some(EXISTING)), Next::new(&stack, &endpoint))
        });
        fut.await.unwrap();

        let out = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert_eq!(out.lines().count(), 1, "{out}");
        assert!(out.contains("DEBUG"), "{out}");
        assert!(out.contains("reusing"), "{out}");
        assert!(out.contains(EXISTING), "{out}");
        assert!(out.contains("header=x-request-id"), "{out}");
    }

    #[tokio::test]
    async fn logs_generated_value() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mw = XRequestId::new();
        let endpoint = |req: Request| {
            let seen = req.header(DEFAULT_HEADER).unwrap_or_default().to_owned();
            std::future::ready(Ok::<_, Error>(Response::text(seen)))
        };
        let stack: Vec<BoxedMiddleware> = Vec::new();
        let fut = tracing::subscriber::with_default(subscriber, || {
            mw.handle(request(None), Next::new(&stack, &endpoint))
        });
        let res = fut.await.unwrap();
        let id = String::from_utf8(res.body().to_vec()).unwrap();

        let out = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert_eq!(out.lines().count(), 1, "{out}");
        assert!(out.contains("DEBUG"), "{out}");
        assert!(out.contains("added request id header with a generated value"), "{out}");
        assert!(is_uuid_v4(&id), "{id}");
        assert!(out.contains(&id), "{out}");
    }

    #[test]
    fn blank_check_on_non_utf8_values() {
        assert!(!is_blank(&HeaderValue::from_bytes(b"\xa0").unwrap()));
        assert!(!is_blank(&HeaderValue::from_bytes(b" \xa0\t").unwrap()));
        assert!(is_blank(&HeaderValue::from_bytes(b" \t").unwrap()));
        assert!(is_blank(&HeaderValue::from_static("")));
    }

    #[tokio::test]
    async fn non_utf8_value_is_kept_byte_for_byte() {
        let mw = XRequestId::new();
        let endpoint = |req: Request| {
            let raw = req.headers().get(DEFAULT_HEADER).map(|v| v.as_bytes().to_vec());
            std::future::ready(Ok::<_, Error>(Response::json(raw.unwrap_or_default())))
        };
        let mut req = Request::new(Method::GET, "/");
        req.headers_mut()
            .insert("x-request-id", HeaderValue::from_bytes(b"\xa0").unwrap());
        let res = mw.handle(req, Next::new(&[], &endpoint)).await.unwrap();
        assert_eq!(res.body(), b"\xa0");
    }

    #[tokio::test]
    async fn tab_and_space_value_is_replaced() {
        let seen = observed(&XRequestId::new(), request(Some(" \t"))).await.unwrap();
        assert!(is_uuid_v4(&seen), "{seen}");
    }

    #[test]
    fn validate_accepts_matching_header() {
        let mw = XRequestId::new().with_header("X-Trace-Id").unwrap();
        assert!(mw.validate().is_ok());
        assert!(XRequestId::new().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_header_name() {
        let mw = XRequestId {
            config: XRequestIdConfig { header: String::new(), ..XRequestIdConfig::default() },
            ..XRequestId::new()
        };
        let err = mw.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidHeaderName(ref n) if n.is_empty()));
    }

    #[test]
    fn validate_rejects_header_out_of_sync_with_config() {
        let mw = XRequestId {
            config: XRequestIdConfig { header: "X-Other".to_owned(), ..XRequestIdConfig::default() },
            ..XRequestId::new()
        };
        assert!(matches!(mw.validate(), Err(Error::InvalidHeaderName(ref n)) if n == "X-Other"));
    }

    #[test]
    fn empty_header_in_config_is_rejected() {
        let res = serde_json::from_str::<XRequestId>(r#"{"header":""}"#);
        assert!(res.unwrap_err().to_string().contains("invalid header name"));
    }
}
