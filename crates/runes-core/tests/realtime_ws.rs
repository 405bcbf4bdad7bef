use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use runes_core::{ConnectionState, NoopObserver, RealtimeClient, RealtimeConfig};

async fn next_text<S>(ws: &mut S) -> String
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = ws.next().await {
        match frame.expect("server read must succeed") {
            Message::Text(text) => return text.as_str().to_owned(),
            _ => continue,
        }
    }
    panic!("client went away before sending a text frame");
}

#[tokio::test(flavor = "multi_thread")]
async fn reconnects_after_server_close_and_delivers_messages() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.expect("first accept");
        let mut first = accept_async(tcp).await.expect("first handshake");
        first
            .send(Message::Text(r#"{"type":"block","height":1}"#.into()))
            .await
            .expect("first send");
        first.close(None).await.expect("server close");
        drop(first);

        let (tcp, _) = listener.accept().await.expect("second accept");
        let mut second = accept_async(tcp).await.expect("second handshake");
        second
            .send(Message::Text(r#"{"type":"block","height":2}"#.into()))
            .await
            .expect("second send");
        next_text(&mut second).await
    });

    let mut config = RealtimeConfig::new(format!("ws://{addr}"));
    config.reconnect_interval = Duration::from_millis(50);
    config.max_reconnect_attempts = 3;
    let client = RealtimeClient::new(&config, Arc::new(NoopObserver));

    let (heights_tx, mut heights_rx) = mpsc::unbounded_channel();
    client
        .on(
            "block",
            Arc::new(move |message: &Value| {
                let _ = heights_tx.send(message["height"].as_u64());
            }),
        )
        .await;
    client.connect().await;

    let deadline = Duration::from_secs(10);
    for expected in [1, 2] {
        let height = tokio::time::timeout(deadline, heights_rx.recv())
            .await
            .expect("message must arrive")
            .expect("listener channel open");
        assert_eq!(height, Some(expected));
    }
    assert_eq!(client.state(), ConnectionState::Open);
    assert_eq!(client.attempts(), 0, "successful reopen resets the budget");

    let sent = client
        .send(&json!({"method": "subscribe", "params": ["blocks"]}))
        .await
        .expect("payload serializes");
    assert!(sent);

    let received = tokio::time::timeout(deadline, server)
        .await
        .expect("server must finish")
        .expect("server task must not panic");
    let received: Value = serde_json::from_str(&received).expect("client sent JSON");
    assert_eq!(received["method"], "subscribe");

    client.close().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test(flavor = "multi_thread")]
async fn refused_endpoint_stays_disconnected_after_budget() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let mut config = RealtimeConfig::new(format!("ws://127.0.0.1:{port}"));
    config.reconnect_interval = Duration::from_millis(20);
    config.max_reconnect_attempts = 2;
    let client = RealtimeClient::new(&config, Arc::new(NoopObserver));

    let mut states = client.subscribe_state();
    states.borrow_and_update();
    client.connect().await;
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            states.changed().await.expect("state channel open");
            if *states.borrow() == ConnectionState::Disconnected {
                break;
            }
        }
    })
    .await
    .expect("driver must give up");

    assert_eq!(client.attempts(), 2);
    assert!(!client
        .send(&json!({"method": "ping"}))
        .await
        .expect("payload serializes"));
}
