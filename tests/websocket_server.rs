//! End-to-end tests against a running server.

use futures_util::SinkExt;
use reqwest::StatusCode;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use std::sync::Arc;

use wsgate::config::ConfigOverrides;
use wsgate::upgrade::{creator_fn, CreateResult};
use wsgate::{Endpoint, Session, WebSocketContainer};

mod common;

use common::{mapping, next_message, start_server, ADMIN_KEY};

#[tokio::test]
async fn test_echo_round_trip() {
    let server = start_server(vec![mapping("/echo", "echo")]).await;

    let (mut client, _) = connect_async(server.ws_url("/echo")).await.unwrap();
    client.send(Message::text("héllo ✓")).await.unwrap();
    let reply = next_message(&mut client).await.unwrap();
    assert_eq!(reply.to_text().unwrap(), "héllo ✓");

    client.send(Message::binary(vec![0u8, 159, 146, 150])).await.unwrap();
    let reply = next_message(&mut client).await.unwrap();
    assert_eq!(&reply.into_data()[..], &[0u8, 159, 146, 150]);

    assert_eq!(server.container.open_sessions().len(), 1);
    client.close(None).await.unwrap();
    assert!(common::eventually(|| server.container.open_sessions().is_empty()).await);
}

#[tokio::test]
async fn test_unmapped_path_is_not_found() {
    let server = start_server(vec![mapping("/echo", "echo")]).await;

    let err = connect_async(server.ws_url("/news")).await.unwrap_err();
    match err {
        WsError::Http(response) => assert_eq!(response.status(), 404),
        other => panic!("unexpected error: {other}"),
    }

    let res = reqwest::get(server.http_url("/news")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_plain_request_to_mapped_path_is_rejected() {
    let server = start_server(vec![mapping("/echo", "echo")]).await;

    let res = reqwest::get(server.http_url("/echo")).await.unwrap();
    assert!(res.status().is_client_error());
    assert_ne!(res.status(), StatusCode::NOT_FOUND);
    assert!(server.container.open_sessions().is_empty());
}

#[tokio::test]
async fn test_chat_subprotocol_and_broadcast() {
    let server = start_server(vec![mapping("/chat/*", "chat")]).await;

    let mut request = server.ws_url("/chat/lobby").into_client_request().unwrap();
    request
        .headers_mut()
        .insert("sec-websocket-protocol", "chat".parse().unwrap());
    let (mut alice, response) = connect_async(request).await.unwrap();
    assert_eq!(
        response.headers().get("sec-websocket-protocol").unwrap(),
        "chat"
    );

    let (mut bob, _) = connect_async(server.ws_url("/chat/lobby")).await.unwrap();
    assert!(common::eventually(|| server.container.open_sessions().len() == 2).await);

    alice.send(Message::text("hello bob")).await.unwrap();
    let received = next_message(&mut bob).await.unwrap();
    assert_eq!(received.to_text().unwrap(), "hello bob");
}

#[tokio::test]
async fn test_declined_upgrade_uses_creator_status() {
    let server = start_server(vec![mapping("/chat/*", "chat")]).await;

    let mut request = server.ws_url("/chat/lobby").into_client_request().unwrap();
    request
        .headers_mut()
        .insert("sec-websocket-protocol", "mqtt".parse().unwrap());
    match connect_async(request).await.unwrap_err() {
        WsError::Http(response) => assert_eq!(response.status(), 400),
        other => panic!("unexpected error: {other}"),
    }
    assert!(server.container.open_sessions().is_empty());
}

#[tokio::test]
async fn test_text_ceiling_closes_with_size_code() {
    let mut small = mapping("/echo", "echo");
    small.overrides = ConfigOverrides::new().max_text_message_size(16);
    let server = start_server(vec![small]).await;

    let (mut client, _) = connect_async(server.ws_url("/echo")).await.unwrap();
    client.send(Message::text("x".repeat(32))).await.unwrap();

    match next_message(&mut client).await {
        Some(Message::Close(Some(frame))) => assert_eq!(frame.code, CloseCode::Size),
        other => panic!("expected close frame, got {other:?}"),
    }
    assert!(common::eventually(|| server.container.open_sessions().is_empty()).await);
}

#[tokio::test]
async fn test_idle_timeout_closes_session() {
    let mut idle = mapping("/echo", "echo");
    idle.overrides = ConfigOverrides::new().idle_timeout(std::time::Duration::from_secs(1));
    let server = start_server(vec![idle]).await;

    let (mut client, _) = connect_async(server.ws_url("/echo")).await.unwrap();
    match next_message(&mut client).await {
        Some(Message::Close(Some(frame))) => assert_eq!(frame.code, CloseCode::Away),
        other => panic!("expected close frame, got {other:?}"),
    }
    assert!(common::eventually(|| server.container.open_sessions().is_empty()).await);
}

#[tokio::test]
async fn test_admin_api_requires_key_and_lists_sessions() {
    let server = start_server(vec![mapping("/echo", "echo")]).await;
    let (_client, _) = connect_async(server.ws_url("/echo")).await.unwrap();

    let http = reqwest::Client::new();
    let res = http.get(server.admin_url("/admin/status")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let status: serde_json::Value = http
        .get(server.admin_url("/admin/status"))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["open_sessions"], 1);
    assert_eq!(status["mappings"], 1);

    let sessions: serde_json::Value = http
        .get(server.admin_url("/admin/sessions"))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(sessions[0]["path"], "/echo");
    assert_eq!(sessions[0]["path_spec"], "/echo");
    assert_eq!(sessions[0]["state"], "open");
}

#[tokio::test]
async fn test_admin_close_session() {
    let server = start_server(vec![mapping("/echo", "echo")]).await;
    let (mut client, _) = connect_async(server.ws_url("/echo")).await.unwrap();
    assert!(common::eventually(|| server.container.open_sessions().len() == 1).await);

    let id = server.container.open_sessions()[0].id();
    let res = reqwest::Client::new()
        .post(server.admin_url(&format!("/admin/sessions/{id}/close")))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    assert!(matches!(next_message(&mut client).await, Some(Message::Close(_))));
    assert!(server.container.open_sessions().is_empty());

    let res = reqwest::Client::new()
        .post(server.admin_url(&format!("/admin/sessions/{id}/close")))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_shutdown_closes_open_sessions() {
    let server = start_server(vec![mapping("/echo", "echo")]).await;
    let (mut client, _) = connect_async(server.ws_url("/echo")).await.unwrap();
    assert!(common::eventually(|| server.container.open_sessions().len() == 1).await);

    server.shutdown.trigger();

    assert!(matches!(next_message(&mut client).await, Some(Message::Close(_))));
    assert!(server.container.open_sessions().is_empty());
}

struct Faulty;

impl Endpoint for Faulty {
    fn on_text(&self, _session: &Arc<Session>, text: String) {
        if text == "boom" {
            panic!("endpoint blew up");
        }
    }
}

#[tokio::test]
async fn test_panicking_endpoint_does_not_leak_session() {
    let mut builder = WebSocketContainer::builder();
    builder
        .add_mapping(
            "/faulty",
            creator_fn(|_, _, _| -> CreateResult { Ok(Some(Arc::new(Faulty))) }),
        )
        .unwrap();
    let server = common::start_with_container(builder.build()).await;

    let (mut client, _) = connect_async(server.ws_url("/faulty")).await.unwrap();
    assert!(common::eventually(|| server.container.open_sessions().len() == 1).await);
    let session = server.container.open_sessions()[0].clone();

    client.send(Message::text("boom")).await.unwrap();
    match next_message(&mut client).await {
        Some(Message::Close(Some(frame))) => assert_eq!(frame.code, CloseCode::Error),
        other => panic!("expected close frame, got {other:?}"),
    }
    assert!(common::eventually(|| server.container.open_sessions().is_empty()).await);
    assert!(!session.is_open());
    assert_eq!(server.container.registry().len(), 0);
}
