//! ---
//! volta_section: "05-networking-external-interfaces"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "WebSocket streaming endpoint."
//! volta_version: "v0.0.0-prealpha"
//! volta_owner: "tbd"
//! ---
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::routing::get;
use axum::Router;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use volta_core::{ClientRequest, ObserverId, ObserverSink, ServerMessage};

use crate::server::AppState;

pub(crate) fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(upgrade_handler))
}

async fn upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> axum::response::Response {
    ws.on_upgrade(|socket| client_loop(socket, state))
}

/// One observer per connection. Registry events arrive on `outbound`;
/// request errors are written straight back to the socket.
async fn client_loop(mut socket: WebSocket, state: Arc<AppState>) {
    let observer = ObserverId::new();
    let (sink, mut outbound) = mpsc::channel::<ServerMessage>(state.observer_buffer);
    info!(%observer, "observer connected");

    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else {
                    break;
                };
                let text = match message.to_json() {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(%observer, error = %err, "failed to serialise outbound message");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            message = socket.recv() => {
                let Some(Ok(message)) = message else {
                    break;
                };

                let reply = match message {
                    Message::Text(text) => handle_request(&state, observer, &sink, &text),
                    Message::Binary(_) => Some(ServerMessage::error("binary frames are not supported")),
                    Message::Ping(payload) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                        None
                    }
                    Message::Pong(_) => None,
                    Message::Close(_) => break,
                };
                if let Some(reply) = reply {
                    let Ok(text) = reply.to_json() else {
                        continue;
                    };
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    state.registry.disconnect(observer);
    info!(%observer, "observer disconnected");
}

fn handle_request(
    state: &AppState,
    observer: ObserverId,
    sink: &ObserverSink,
    text: &str,
) -> Option<ServerMessage> {
    let request = match ClientRequest::parse(text) {
        Ok(request) => request,
        Err(err) => {
            warn!(%observer, error = %err, "malformed websocket request");
            return Some(ServerMessage::from(&err));
        }
    };

    match request {
        ClientRequest::StartSimulation { design_id, config } => {
            match state.registry.start(observer, sink.clone(), design_id, config) {
                Ok(_) => None,
                Err(err) => {
                    warn!(%observer, design = %design_id, error = %err, "start rejected");
                    Some(ServerMessage::from(&err))
                }
            }
        }
        ClientRequest::StopSimulation => {
            state.registry.stop(observer);
            None
        }
        ClientRequest::UpdateComponent {
            component_id,
            properties,
        } => {
            if !state
                .registry
                .update_component(observer, component_id, properties)
            {
                debug!(%observer, component = component_id, "update had no effect");
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use serde_json::{json, Value};
    use tokio::net::TcpStream;
    use tokio::time::{sleep, timeout};
    use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
    use uuid::Uuid;

    use crate::server::test_support::{spawn_server, RESISTOR};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn send(socket: &mut Client, value: Value) {
        socket.send(WsMessage::Text(value.to_string())).await.unwrap();
    }

    async fn next_json(socket: &mut Client) -> Value {
        loop {
            let frame = timeout(Duration::from_secs(5), socket.next())
                .await
                .expect("frame within timeout")
                .expect("socket open")
                .expect("valid frame");
            if let WsMessage::Text(text) = frame {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    async fn next_of_type(socket: &mut Client, kind: &str) -> Value {
        loop {
            let value = next_json(socket).await;
            if value["type"] == kind {
                return value;
            }
        }
    }

    #[tokio::test]
    async fn streams_snapshots_until_stopped() {
        let (handle, registry, id) = spawn_server().await;
        let url = format!("ws://{}/ws", handle.local_addr());
        let (mut socket, _response) = connect_async(&url).await.unwrap();

        send(
            &mut socket,
            json!({"type": "start_simulation", "designId": id, "config": {"tickIntervalMs": 10}}),
        )
        .await;
        let started = next_json(&mut socket).await;
        assert_eq!(started["type"], "simulation_started");
        assert_eq!(started["designId"], id.to_string());
        assert_eq!(started["config"], json!({"tickIntervalMs": 10, "durationMs": 30000}));

        let data = next_json(&mut socket).await;
        assert_eq!(data["type"], "simulation_data");
        assert_eq!(data["data"]["timeStep"], 0);
        let node = &data["data"]["nodes"][RESISTOR.to_string()];
        let (voltage, current) = (node["voltage"].as_f64().unwrap(), node["current"].as_f64().unwrap());
        assert_eq!(current, voltage / 1000.0);
        assert!(data["data"]["performance"]["totalPower"].is_number());

        send(
            &mut socket,
            json!({"type": "update_component", "componentId": RESISTOR, "properties": {"resistance": 2000}}),
        )
        .await;
        let updated = next_of_type(&mut socket, "component_updated").await;
        assert_eq!(updated["componentId"], RESISTOR);
        assert_eq!(updated["properties"]["resistance"], 2000.0);

        send(&mut socket, json!({"type": "stop_simulation"})).await;
        next_of_type(&mut socket, "simulation_stopped").await;
        assert!(timeout(Duration::from_millis(100), socket.next()).await.is_err());
        assert_eq!(registry.active_sessions(), 0);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn bad_requests_get_errors_and_keep_the_connection() {
        let (handle, _registry, _id) = spawn_server().await;
        let url = format!("ws://{}/ws", handle.local_addr());
        let (mut socket, _response) = connect_async(&url).await.unwrap();

        socket.send(WsMessage::Text("{nope".into())).await.unwrap();
        let error = next_json(&mut socket).await;
        assert!(error["error"].as_str().unwrap().starts_with("malformed request"));

        let missing = Uuid::new_v4();
        send(&mut socket, json!({"type": "start_simulation", "designId": missing})).await;
        let error = next_json(&mut socket).await;
        assert_eq!(error["error"], format!("design {missing} not found"));

        socket.send(WsMessage::Binary(vec![1, 2, 3])).await.unwrap();
        let error = next_json(&mut socket).await;
        assert_eq!(error["error"], "binary frames are not supported");

        send(&mut socket, json!({"type": "stop_simulation"})).await;
        send(&mut socket, json!({"type": "update_component", "componentId": 9, "properties": {}})).await;
        assert!(timeout(Duration::from_millis(100), socket.next()).await.is_err());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn closing_the_socket_releases_the_session() {
        let (handle, registry, id) = spawn_server().await;
        let url = format!("ws://{}/ws", handle.local_addr());
        let (mut socket, _response) = connect_async(&url).await.unwrap();

        send(
            &mut socket,
            json!({"type": "start_simulation", "designId": id, "config": {"tickIntervalMs": 10}}),
        )
        .await;
        next_of_type(&mut socket, "simulation_data").await;
        assert_eq!(registry.active_sessions(), 1);

        socket.close(None).await.unwrap();
        drop(socket);
        for _ in 0..50 {
            if registry.active_sessions() == 0 {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(registry.active_sessions(), 0);

        handle.shutdown().await.unwrap();
    }
}
