use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use xrequestid::{Error, Request, Response, Router, XRequestId, serve_listener};

async fn whoami(req: Request) -> String {
    req.header("x-request-id").unwrap_or("<absent>").to_owned()
}

async fn broken(_req: Request) -> Result<Response, Error> {
    Err(Error::handler("broken"))
}

async fn roundtrip(addr: std::net::SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut out = String::new();
    stream.read_to_string(&mut out).await.unwrap();
    out
}

#[tokio::test]
async fn serves_requests_through_the_stack() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
        .layer(XRequestId::new())
        .get("/whoami", whoami)
        .get("/broken", broken);

    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(serve_listener(listener, app, async move {
        let _ = stopped.await;
    }));

    let kept = roundtrip(
        addr,
        "GET /whoami HTTP/1.1\r\nhost: test\r\nx-request-id: caller-id-1\r\nconnection: close\r\n\r\n",
    )
    .await;
    assert!(kept.starts_with("HTTP/1.1 200"), "{kept}");
    assert!(kept.ends_with("caller-id-1"), "{kept}");

    let generated = roundtrip(
        addr,
        "GET /whoami HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n",
    )
    .await;
    let id = generated.rsplit("\r\n\r\n").next().unwrap();
    assert_eq!(id.len(), 36, "{generated}");

    let failed = roundtrip(
        addr,
        "GET /broken HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n",
    )
    .await;
    assert!(failed.starts_with("HTTP/1.1 500"), "{failed}");

    stop.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not drain")
        .unwrap()
        .unwrap();
}
