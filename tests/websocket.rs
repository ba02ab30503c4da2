//! End-to-end tests over real WebSocket connections

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use fanout_hub::{BroadcastHub, GroupName, HubConfig, HubServer, ServerConfig};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: SocketAddr,
    hub: Arc<BroadcastHub>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<fanout_hub::Result<()>>,
}

async fn start(max_connections: usize) -> TestServer {
    start_with(|addr| ServerConfig::with_addr(addr).max_connections(max_connections)).await
}

async fn start_with(config: impl FnOnce(SocketAddr) -> ServerConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HubServer::new(config(addr));
    let hub = Arc::clone(server.hub());
    let (shutdown, rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        server
            .serve(listener, async {
                let _ = rx.await;
            })
            .await
    });

    TestServer {
        addr,
        hub,
        shutdown,
        task,
    }
}

async fn connect(addr: SocketAddr, group: &str) -> Client {
    let (client, _) = connect_async(format!("ws://{}/ws/{}", addr, group))
        .await
        .unwrap();
    client
}

async fn next_text(client: &mut Client) -> String {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .unwrap();
        match msg {
            Message::Text(text) => return text.as_str().to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..400 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

fn group(name: &str) -> GroupName {
    GroupName::new(name).unwrap()
}

#[tokio::test]
async fn test_message_fans_out_to_group_including_sender() {
    let server = start(0).await;
    let mut a = connect(server.addr, "cases").await;
    let mut b = connect(server.addr, "cases").await;
    let mut other = connect(server.addr, "patients").await;
    eventually(|| server.hub.registry().member_count(&group("cases")) == 2).await;
    eventually(|| server.hub.registry().member_count(&group("patients")) == 1).await;

    let payload = r#"{"id_expediente":1,"temperatura":38.2}"#;
    a.send(Message::text(payload)).await.unwrap();

    assert_eq!(next_text(&mut a).await, payload);
    assert_eq!(next_text(&mut b).await, payload);

    // Other groups are untouched
    let nothing = tokio::time::timeout(Duration::from_millis(100), other.next()).await;
    assert!(nothing.is_err());
}

#[tokio::test]
async fn test_injected_message_reaches_clients() {
    let server = start(0).await;
    let mut client = connect(server.addr, "patients").await;
    eventually(|| server.hub.registry().member_count(&group("patients")) == 1).await;

    let report = server
        .hub
        .inject(&group("patients"), Bytes::from_static(br#"{"id_usuario":7}"#))
        .await;

    assert_eq!(report.delivered, 1);
    assert_eq!(next_text(&mut client).await, r#"{"id_usuario":7}"#);
}

#[tokio::test]
async fn test_closed_client_leaves_group() {
    let server = start(0).await;
    let mut a = connect(server.addr, "cases").await;
    let mut b = connect(server.addr, "cases").await;
    eventually(|| server.hub.registry().member_count(&group("cases")) == 2).await;

    b.close(None).await.unwrap();
    eventually(|| server.hub.registry().member_count(&group("cases")) == 1).await;

    a.send(Message::text("still here")).await.unwrap();
    assert_eq!(next_text(&mut a).await, "still here");
    eventually(|| server.hub.stats().active_connections == 1).await;
}

#[tokio::test]
async fn test_message_sent_just_before_close_is_relayed() {
    let server = start(0).await;
    let mut a = connect(server.addr, "cases").await;
    let mut b = connect(server.addr, "cases").await;
    eventually(|| server.hub.registry().member_count(&group("cases")) == 2).await;

    a.send(Message::text("last words")).await.unwrap();
    a.close(None).await.unwrap();

    assert_eq!(next_text(&mut b).await, "last words");
    eventually(|| server.hub.registry().member_count(&group("cases")) == 1).await;
}

#[tokio::test]
async fn test_sustained_flood_keeps_sender_connected() {
    const FRAMES: usize = 2000;

    let server = start_with(|addr| {
        ServerConfig::with_addr(addr).hub(
            HubConfig::default()
                .connection_buffer(4)
                .send_timeout(Duration::from_secs(1)),
        )
    })
    .await;
    let client = connect(server.addr, "cases").await;
    eventually(|| server.hub.registry().member_count(&group("cases")) == 1).await;

    let (mut sink, mut stream) = client.split();
    let writer = tokio::spawn(async move {
        for i in 0..FRAMES {
            sink.send(Message::text(i.to_string())).await.unwrap();
        }
        sink
    });

    for i in 0..FRAMES {
        let msg = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for an echo")
            .expect("stream ended")
            .unwrap();
        assert_eq!(msg, Message::text(i.to_string()));
    }

    let _sink = writer.await.unwrap();
    let stats = server.hub.stats();
    assert_eq!(stats.delivery_failures, 0);
    assert_eq!(stats.messages_received, FRAMES as u64);
    assert_eq!(server.hub.registry().member_count(&group("cases")), 1);
}

#[tokio::test]
async fn test_connection_limit_rejects_handshake() {
    let server = start(1).await;
    let _first = connect(server.addr, "cases").await;

    let err = connect_async(format!("ws://{}/ws/cases", server.addr))
        .await
        .unwrap_err();

    match err {
        WsError::Http(response) => assert_eq!(response.status(), 503),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(server.hub.registry().member_count(&group("cases")), 1);
}

#[tokio::test]
async fn test_shutdown_closes_clients() {
    let server = start(0).await;
    let mut client = connect(server.addr, "cases").await;
    eventually(|| server.hub.stats().active_connections == 1).await;

    server.shutdown.send(()).unwrap();

    // The client sees a close frame or the end of the stream
    loop {
        let next = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("client was not closed");
        match next {
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
            Some(Ok(_)) => continue,
        }
    }

    let result = tokio::time::timeout(Duration::from_secs(2), server.task)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
    eventually(|| server.hub.stats().active_connections == 0).await;
    assert_eq!(server.hub.registry().group_count(), 0);
}
