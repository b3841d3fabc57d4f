//! Minimal xrequestid example.
//!
//! Run with:
//!   RUST_LOG=xrequestid=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/whoami
//!   curl -H 'x-request-id: my-own-id' http://localhost:3000/whoami
//!   curl -H 'x-request-id:    ' http://localhost:3000/whoami

use xrequestid::{Config, Request, Router, Server, registry};

const CONFIG: &str = r#"{
    "listen": "0.0.0.0:3000",
    "middleware": [
        { "module": "http.handlers.x_request_id", "disabled": false }
    ]
}"#;

#[tokio::main]
async fn main() -> Result<(), xrequestid::Error> {
    xrequestid::logging::init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::from_json(CONFIG)?,
    };

    let app = Router::new()
        .layers(config.build_middleware(registry::global())?)
        .get("/whoami", whoami);

    Server::from_config(&config)?.serve(app).await
}

// GET /whoami → the request id the handler observed
async fn whoami(req: Request) -> String {
    req.header("x-request-id").unwrap_or("<none>").to_owned()
}
