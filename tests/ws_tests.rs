//! End-to-end status channel tests against a local WebSocket server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use voice_remote::channel::StatusChannel;
use voice_remote::endpoint::{Endpoint, SessionKey};
use voice_remote::error::RemoteError;
use voice_remote::machine::ChannelState;
use voice_remote::transport::{Transport, WsConnection, WsTransport};

/// How the server treats the n-th incoming connection.
#[derive(Debug, Clone)]
enum Behaviour {
    /// Complete the handshake, then close straight away.
    Close,
    /// Send these text frames, then stay open until the client leaves.
    Send(Vec<&'static str>),
}

struct TestServer {
    addr: SocketAddr,
    uris: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    fn connections(&self) -> usize {
        self.uris.lock().unwrap().len()
    }
}

async fn spawn_server(behaviours: Vec<Behaviour>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let uris = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&uris);
    let index = Arc::new(AtomicUsize::new(0));

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let n = index.fetch_add(1, Ordering::SeqCst);
            let behaviour = behaviours
                .get(n)
                .cloned()
                .unwrap_or(Behaviour::Send(vec![]));
            let seen = Arc::clone(&seen);

            tokio::spawn(async move {
                let record = move |req: &Request, resp: Response| {
                    seen.lock().unwrap().push(req.uri().to_string());
                    Ok::<_, ErrorResponse>(resp)
                };
                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, record).await else {
                    return;
                };
                match behaviour {
                    Behaviour::Close => {
                        let _ = ws.close(None).await;
                    }
                    Behaviour::Send(frames) => {
                        for frame in frames {
                            if ws.send(WsMessage::Text(frame.to_string())).await.is_err() {
                                return;
                            }
                        }
                        while let Some(Ok(_)) = ws.next().await {}
                    }
                }
            });
        }
    });

    TestServer { addr, uris }
}

fn endpoint(addr: SocketAddr) -> Endpoint {
    Endpoint::new(addr.to_string(), false).unwrap()
}

#[tokio::test]
async fn reconnects_after_close_then_honours_disconnected() {
    let server = spawn_server(vec![
        Behaviour::Close,
        Behaviour::Send(vec!["END", "PAUSED", "END", "DISCONNECTED"]),
    ])
    .await;

    let ended = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ended);
    let handle = StatusChannel::builder(&endpoint(server.addr), SessionKey::new("abc").unwrap())
        .on_track_ended(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap()
        .start();

    let state = tokio::time::timeout(Duration::from_secs(5), handle.join())
        .await
        .expect("channel did not reach its final state");

    assert_eq!(state, ChannelState::ClosedFinal);
    assert_eq!(ended.load(Ordering::SeqCst), 2);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let uris = server.uris.lock().unwrap().clone();
    assert_eq!(uris.len(), 2, "no attempt after DISCONNECTED: {uris:?}");
    assert!(uris.iter().all(|u| u == "/audio-control/status?key=abc"), "{uris:?}");
}

#[tokio::test]
async fn stop_closes_an_open_connection() {
    let server = spawn_server(vec![Behaviour::Send(vec!["END"])]).await;

    let ended = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ended);
    let handle = StatusChannel::builder(&endpoint(server.addr), SessionKey::new("abc").unwrap())
        .on_track_ended(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap()
        .start();

    tokio::time::timeout(Duration::from_secs(5), async {
        while ended.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("END never delivered");
    assert_eq!(handle.state(), ChannelState::Open);

    handle.stop();
    let state = tokio::time::timeout(Duration::from_secs(5), handle.join())
        .await
        .unwrap();
    assert_eq!(state, ChannelState::ClosedFinal);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.connections(), 1);
}

/// Real WebSocket transport that counts connection attempts.
struct CountingTransport {
    inner: WsTransport,
    attempts: Arc<AtomicUsize>,
}

impl Transport for CountingTransport {
    type Conn = WsConnection;

    fn connect<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<WsConnection, RemoteError>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.inner.connect(url)
    }
}

#[tokio::test]
async fn unreachable_server_keeps_retrying_until_stopped() {
    // Grab a free port, then release it so connections are refused.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let attempts = Arc::new(AtomicUsize::new(0));
    let handle = StatusChannel::builder(&endpoint(addr), SessionKey::new("abc").unwrap())
        .on_track_ended(|| {})
        .transport(CountingTransport {
            inner: WsTransport,
            attempts: Arc::clone(&attempts),
        })
        .build()
        .unwrap()
        .start();

    tokio::time::timeout(Duration::from_secs(5), async {
        while attempts.load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("channel stopped retrying");

    assert_ne!(handle.state(), ChannelState::Open);
    assert!(!handle.state().is_final());

    handle.stop();
    let state = tokio::time::timeout(Duration::from_secs(5), handle.join())
        .await
        .unwrap();
    assert_eq!(state, ChannelState::ClosedFinal);

    let after_stop = attempts.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), after_stop);
}

#[tokio::test]
async fn failed_connect_error_does_not_carry_the_full_key() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let key = SessionKey::new("supersecretkey123").unwrap();
    let url = endpoint(addr).status_url(&key);

    let err = match WsTransport.connect(&url).await {
        Ok(_) => panic!("connect to a closed port succeeded"),
        Err(e) => e,
    };

    let shown = err.to_string();
    assert!(matches!(err, RemoteError::Connect { .. }), "{err:?}");
    assert!(!shown.contains("supersecretkey123"), "{shown}");
    assert!(!format!("{err:?}").contains("supersecretkey123"));
    assert!(shown.contains("key=supe…"), "{shown}");
}
