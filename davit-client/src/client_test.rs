use std::time::Duration;

use assert_matches::assert_matches;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::net::TcpListener;
use tokio_stream::StreamExt;

use davit_transport::EngineAddr;
use davit_wire::Limits;

use crate::client::{Engine, EngineConfig, execute_buffered, start_streamed};
use crate::error::EngineError;
use crate::request::EngineRequest;

async fn read_request_head(stream: &mut DuplexStream) -> Vec<u8> {
    let mut request = Vec::new();
    let mut buf = [0u8; 512];
    while !request.windows(4).any(|window| window == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "peer closed before request completed");
        request.extend_from_slice(&buf[..n]);
    }
    request
}

#[tokio::test]
async fn buffered_request_resolves_response() {
    let (mut client_side, mut server_side) = tokio::io::duplex(4096);
    tokio::spawn(async move {
        let request = read_request_head(&mut server_side).await;
        let text = String::from_utf8_lossy(&request);
        assert!(text.starts_with("GET /version HTTP/1.1\r\n"));
        server_side
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 15\r\n\r\n{\"Version\":\"1\"}")
            .await
            .unwrap();
    });

    let encoded = EngineRequest::get("/version").encode("localhost");
    let response = execute_buffered(&mut client_side, &encoded, Limits::default())
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.body, b"{\"Version\":\"1\"}".to_vec());
}

#[tokio::test]
async fn error_status_maps_to_typed_error() {
    let (mut client_side, mut server_side) = tokio::io::duplex(4096);
    tokio::spawn(async move {
        read_request_head(&mut server_side).await;
        server_side
            .write_all(
                b"HTTP/1.1 404 Not Found\r\nContent-Length: 31\r\n\r\n{\"message\":\"no such container\"}",
            )
            .await
            .unwrap();
    });

    let encoded = EngineRequest::get("/containers/missing/json").encode("localhost");
    let error = execute_buffered(&mut client_side, &encoded, Limits::default())
        .await
        .unwrap_err();
    assert_matches!(error, EngineError::NotFound(message) if message == "no such container");
}

#[tokio::test]
async fn chunked_body_streams_incrementally() {
    let (client_side, mut server_side) = tokio::io::duplex(4096);
    tokio::spawn(async move {
        read_request_head(&mut server_side).await;
        server_side
            .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n")
            .await
            .unwrap();
        server_side.write_all(b"5\r\nhello\r\n").await.unwrap();
        server_side.write_all(b"6\r\n world\r\n").await.unwrap();
        server_side.write_all(b"0\r\n\r\n").await.unwrap();
    });

    let encoded = EngineRequest::post("/images/create")
        .query("fromImage", "alpine")
        .body(Vec::new())
        .encode("localhost");
    let (head, mut body) = start_streamed(client_side, &encoded, Limits::default())
        .await
        .unwrap();
    assert_eq!(head.status, 200);

    let mut chunks = Vec::new();
    while let Some(item) = body.next().await {
        chunks.push(item.unwrap());
    }
    assert_eq!(chunks, vec![b"hello".to_vec(), b" world".to_vec()]);
}

#[tokio::test]
async fn streamed_error_status_is_rejected_before_streaming() {
    let (client_side, mut server_side) = tokio::io::duplex(4096);
    tokio::spawn(async move {
        read_request_head(&mut server_side).await;
        server_side
            .write_all(b"HTTP/1.1 500 Oops\r\nContent-Length: 22\r\n\r\n{\"message\":\"exploded\"}")
            .await
            .unwrap();
    });

    let encoded = EngineRequest::post("/images/create").body(Vec::new()).encode("localhost");
    let error = start_streamed(client_side, &encoded, Limits::default())
        .await
        .unwrap_err();
    assert_matches!(error, EngineError::Http { status: 500, .. });
}

#[tokio::test]
async fn engine_request_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = stream.read(&mut buf).await;
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nOK")
            .await
            .unwrap();
    });

    let engine = Engine::new(EngineConfig::new(EngineAddr::Tcp {
        host: addr.ip().to_string(),
        port: addr.port(),
    }));
    let response = engine.request(EngineRequest::get("/_ping")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text(), "OK");
}

#[tokio::test]
async fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let mut config = EngineConfig::new(EngineAddr::Tcp {
        host: addr.ip().to_string(),
        port: addr.port(),
    });
    config.timeout = Duration::from_millis(50);
    let engine = Engine::new(config);

    let error = engine.request(EngineRequest::get("/_ping")).await.unwrap_err();
    assert_matches!(error, EngineError::Timeout);
}
