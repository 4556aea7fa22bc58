//! HTTP transport against a throw-away local server

use futures::future::join_all;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use miso_data_downloader::config::ClientConfig;
use miso_data_downloader::transport::{HttpTransport, Transport, TransportError};

#[derive(Default)]
struct ServerStats {
    hits: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Serve `/missing*` as 404, `/error*` as 500, anything else as 200 echoing
/// the request target after `delay`.
///
/// `/stall*` sends the headers of a large body and then never sends the body.
/// `/truncated*` promises more bytes than it sends before closing.
async fn serve(delay: Duration) -> (SocketAddr, Arc<ServerStats>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let stats = Arc::new(ServerStats::default());

    let server_stats = stats.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let stats = server_stats.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                loop {
                    let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    read += n;
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }

                stats.hits.fetch_add(1, Ordering::SeqCst);
                let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(delay).await;

                let request = String::from_utf8_lossy(&buf[..read]).to_string();
                let target = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                if target.starts_with("/stall") {
                    let head = "HTTP/1.1 200 OK\r\nContent-Length: 10000000\r\nConnection: close\r\n\r\n";
                    let _ = socket.write_all(head.as_bytes()).await;
                    stats.in_flight.fetch_sub(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    return;
                }
                if target.starts_with("/truncated") {
                    let partial = "HTTP/1.1 200 OK\r\nContent-Length: 1000\r\nConnection: close\r\n\r\nshort";
                    let _ = socket.write_all(partial.as_bytes()).await;
                    stats.in_flight.fetch_sub(1, Ordering::SeqCst);
                    let _ = socket.shutdown().await;
                    return;
                }

                let (status, body) = if target.starts_with("/missing") {
                    ("404 Not Found", String::new())
                } else if target.starts_with("/error") {
                    ("500 Internal Server Error", String::new())
                } else {
                    ("200 OK", target)
                };
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stats.in_flight.fetch_sub(1, Ordering::SeqCst);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, stats)
}

fn transport(max_attempts: u32, limit: usize) -> HttpTransport {
    let config = ClientConfig::miso()
        .with_concurrent_limit(limit)
        .with_retry(max_attempts, Duration::from_millis(5));
    HttpTransport::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_fetch_sends_query_parameters() {
    let (addr, _) = serve(Duration::ZERO).await;
    let transport = transport(3, 4);

    let body = transport
        .fetch(
            &format!("http://{addr}/DataBrokerServices.asmx"),
            &[
                ("messageType", "gettotalload".to_string()),
                ("returnType", "json".to_string()),
            ],
        )
        .await
        .unwrap();

    assert_eq!(
        &body[..],
        b"/DataBrokerServices.asmx?messageType=gettotalload&returnType=json"
    );
}

#[tokio::test]
async fn test_not_found_is_never_retried() {
    let (addr, stats) = serve(Duration::ZERO).await;
    let transport = transport(5, 4);

    let err = transport
        .fetch(&format!("http://{addr}/missing.csv"), &[])
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(stats.hits.load(Ordering::SeqCst), 1);
    assert!(!transport
        .exists_at(&format!("http://{addr}/missing.csv"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_server_error_is_terminal() {
    let (addr, stats) = serve(Duration::ZERO).await;
    let transport = transport(5, 4);

    let err = transport
        .fetch(&format!("http://{addr}/error"), &[])
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Status { status: 500, .. }));
    assert_eq!(stats.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_refused_connection_is_retried_then_surfaced() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let transport = transport(3, 4);

    let started = std::time::Instant::now();
    let err = transport
        .fetch(&format!("http://{addr}/refused"), &[])
        .await
        .unwrap_err();

    assert!(err.is_retryable(), "unexpected error: {err:?}");
    // two waits between three attempts
    assert!(started.elapsed() >= Duration::from_millis(10));
}

#[tokio::test]
async fn test_concurrency_limit_bounds_in_flight_requests() {
    let (addr, stats) = serve(Duration::from_millis(50)).await;
    let transport = transport(1, 2);
    let urls: Vec<String> = (0..6).map(|i| format!("http://{addr}/file{i}")).collect();

    let results = join_all(urls.iter().map(|url| transport.fetch(url, &[]))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(stats.hits.load(Ordering::SeqCst), 6);
    assert!(stats.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_close_rejects_later_fetches() {
    let (addr, stats) = serve(Duration::ZERO).await;
    let transport = transport(3, 4);
    let url = format!("http://{addr}/ok");

    assert!(transport.fetch(&url, &[]).await.is_ok());
    transport.close().await;

    assert!(matches!(
        transport.fetch(&url, &[]).await,
        Err(TransportError::Closed)
    ));
    assert_eq!(stats.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_exists_at_reads_status_without_body() {
    let (addr, stats) = serve(Duration::ZERO).await;
    let transport = transport(3, 1);
    let url = format!("http://{addr}/stall/202101_da_expost_lmp_csv.zip");

    let exists = tokio::time::timeout(Duration::from_secs(5), transport.exists_at(&url))
        .await
        .expect("existence check waited for the body");

    assert!(exists.unwrap());
    assert_eq!(stats.hits.load(Ordering::SeqCst), 1);
    // the permit is released even though the body was never read
    assert_eq!(transport.limiter().available(), 1);
}

#[tokio::test]
async fn test_exists_at_maps_statuses() {
    let (addr, _) = serve(Duration::ZERO).await;
    let transport = transport(3, 4);

    assert!(transport.exists_at(&format!("http://{addr}/ok.csv")).await.unwrap());
    assert!(!transport
        .exists_at(&format!("http://{addr}/missing.csv"))
        .await
        .unwrap());
    assert!(matches!(
        transport.exists_at(&format!("http://{addr}/error.csv")).await,
        Err(TransportError::Status { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_truncated_body_is_retried() {
    let (addr, stats) = serve(Duration::ZERO).await;
    let transport = transport(3, 4);

    let err = transport
        .fetch(&format!("http://{addr}/truncated.csv"), &[])
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Body { .. }), "unexpected error: {err:?}");
    assert_eq!(stats.hits.load(Ordering::SeqCst), 3);
}
