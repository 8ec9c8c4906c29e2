//! WebSocket notification tests against a live server

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Error as WsError, tungstenite::Message, MaybeTlsStream,
    WebSocketStream,
};
use uuid::Uuid;

use common::*;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr, token: &str) -> Socket {
    let (socket, _) = connect_async(format!("ws://{}/ws?token={}", addr, token))
        .await
        .unwrap();
    socket
}

async fn send_frame(socket: &mut Socket, frame: Value) {
    socket.send(Message::Text(frame.to_string())).await.unwrap();
}

/// Next JSON text frame, or `None` if nothing arrives in time
async fn next_frame(socket: &mut Socket, wait: Duration) -> Option<Value> {
    loop {
        match tokio::time::timeout(wait, socket.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return serde_json::from_str(&text).ok(),
            Ok(Some(Ok(_))) => continue,
            _ => return None,
        }
    }
}

async fn join_own_room(socket: &mut Socket, user_id: Uuid) {
    send_frame(socket, json!({ "type": "join_user_room", "user_id": user_id })).await;
    let reply = next_frame(socket, Duration::from_secs(2)).await.unwrap();
    assert_eq!(reply["type"], "joined");
    assert_eq!(reply["room"], format!("user:{}", user_id));
}

/// Round-trip a ping so the session is registered with the hub
async fn ready(socket: &mut Socket) {
    send_frame(socket, json!({ "type": "ping" })).await;
    let reply = next_frame(socket, Duration::from_secs(2)).await.unwrap();
    assert_eq!(reply["type"], "pong");
}

#[tokio::test]
async fn test_claim_notifies_the_customer_room_only() {
    let (app, _) = test_app(&test_config());
    let addr = serve(app.clone()).await;

    let (customer, customer_id) = signup(&app, "c@example.com", "customer").await;
    let (outsider, outsider_id) = signup(&app, "x@example.com", "customer").await;
    let (mechanic, mechanic_id) = signup(&app, "m@example.com", "mechanic").await;

    let mut customer_socket = connect(addr, &customer).await;
    join_own_room(&mut customer_socket, customer_id).await;
    let mut outsider_socket = connect(addr, &outsider).await;
    join_own_room(&mut outsider_socket, outsider_id).await;
    let mut mechanic_socket = connect(addr, &mechanic).await;
    ready(&mut mechanic_socket).await;

    let booking = create_booking(&app, &customer, "standard").await;
    let id = booking["id"].as_str().unwrap();

    let frame = next_frame(&mut mechanic_socket, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(frame["type"], "event");
    assert_eq!(frame["event"], "new_booking");
    assert_eq!(frame["data"]["id"], id);

    let (status, _) = patch_booking(&app, &mechanic, id, json!({ "action": "claim" })).await;
    assert_eq!(status, StatusCode::OK);

    let frame = next_frame(&mut customer_socket, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(frame["event"], "booking_updated");
    assert_eq!(frame["data"]["status"], "accepted");
    assert_eq!(frame["data"]["montir_id"], mechanic_id.to_string());

    assert!(next_frame(&mut outsider_socket, Duration::from_millis(200))
        .await
        .is_none());
}

#[tokio::test]
async fn test_unjoined_socket_gets_no_booking_updates() {
    let (app, _) = test_app(&test_config());
    let addr = serve(app.clone()).await;

    let (customer, _) = signup(&app, "c@example.com", "customer").await;
    let (mechanic, mechanic_id) = signup(&app, "m@example.com", "mechanic").await;

    let mut customer_socket = connect(addr, &customer).await;
    ready(&mut customer_socket).await;

    let booking = create_booking(&app, &customer, "standard").await;
    let id = booking["id"].as_str().unwrap();

    let (status, _) = patch_booking(&app, &mechanic, id, json!({ "action": "claim" })).await;
    assert_eq!(status, StatusCode::OK);

    assert!(next_frame(&mut customer_socket, Duration::from_millis(200))
        .await
        .is_none());

    let (status, fetched) = send(
        &app,
        Method::GET,
        &format!("/bookings/{}", id),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "accepted");
    assert_eq!(fetched["montir_id"], mechanic_id.to_string());
}

#[tokio::test]
async fn test_cannot_join_another_users_room() {
    let (app, _) = test_app(&test_config());
    let addr = serve(app.clone()).await;
    let (token, _) = signup(&app, "c@example.com", "customer").await;

    let mut socket = connect(addr, &token).await;
    send_frame(
        &mut socket,
        json!({ "type": "join_user_room", "user_id": Uuid::new_v4() }),
    )
    .await;
    let reply = next_frame(&mut socket, Duration::from_secs(2)).await.unwrap();
    assert_eq!(reply["type"], "error");
}

#[tokio::test]
async fn test_chat_message_reaches_joined_participant() {
    let (app, _) = test_app(&test_config());
    let addr = serve(app.clone()).await;

    let (customer, _) = signup(&app, "c@example.com", "customer").await;
    let (mechanic, _) = signup(&app, "m@example.com", "mechanic").await;
    let booking = create_booking(&app, &customer, "standard").await;
    let booking_id = booking["id"].as_str().unwrap();
    patch_booking(&app, &mechanic, booking_id, json!({ "action": "claim" })).await;

    let (_, conversation) = send(
        &app,
        Method::POST,
        "/conversations",
        Some(&mechanic),
        Some(json!({ "booking_id": booking_id })),
    )
    .await;
    let conversation_id = conversation["id"].as_str().unwrap().to_string();

    let mut socket = connect(addr, &customer).await;
    send_frame(
        &mut socket,
        json!({ "type": "join_conversation", "conversation_id": conversation_id }),
    )
    .await;
    let reply = next_frame(&mut socket, Duration::from_secs(2)).await.unwrap();
    assert_eq!(reply["type"], "joined");

    let form = format!(
        "--b\r\nContent-Disposition: form-data; name=\"conversation_id\"\r\n\r\n{}\r\n\
         --b\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\nSaya sudah dekat\r\n--b--\r\n",
        conversation_id
    );
    let response = reqwest::Client::new()
        .post(format!("http://{}/messages", addr))
        .bearer_auth(&mechanic)
        .header("content-type", "multipart/form-data; boundary=b")
        .body(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let frame = next_frame(&mut socket, Duration::from_secs(2)).await.unwrap();
    assert_eq!(frame["event"], "receive_message");
    assert_eq!(frame["data"]["text"], "Saya sudah dekat");
}

#[tokio::test]
async fn test_upgrade_requires_a_valid_token() {
    let (app, _) = test_app(&test_config());
    let addr = serve(app).await;

    let missing = connect_async(format!("ws://{}/ws", addr)).await;
    assert!(matches!(missing, Err(WsError::Http(ref r)) if r.status() == 401));

    let invalid = connect_async(format!("ws://{}/ws?token=garbage", addr)).await;
    assert!(matches!(invalid, Err(WsError::Http(ref r)) if r.status() == 403));
}
