use crate::bridge::control::ControlState;
use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use hazardcore::interface::ServerMessage;
use hazardcore::telemetry::{LogManager, Metrics, MetricsRecorder};
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use warp::ws::{Message, WebSocket, Ws};
use warp::Filter;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    #[serde(flatten)]
    pub metrics: Metrics,
    pub clients: usize,
}

/// WebSocket fan-out of engine events plus the `/status` endpoint.
///
/// Every client gets its own subscription to the event channel; replies to a
/// client's own messages (pong) go only to that client.
#[derive(Clone)]
pub struct ClientBridge {
    events: broadcast::Sender<ServerMessage>,
    control: Arc<ControlState>,
    metrics: Arc<MetricsRecorder>,
}

fn with<T: Clone + Send + Sync>(value: T) -> impl Filter<Extract = (T,), Error = Infallible> + Clone {
    warp::any().map(move || value.clone())
}

impl ClientBridge {
    pub fn new(
        events: broadcast::Sender<ServerMessage>,
        control: Arc<ControlState>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            events,
            control,
            metrics,
        }
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            metrics: self.metrics.snapshot(),
            clients: self.control.clients(),
        }
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let socket_route = warp::path::end()
            .and(warp::ws())
            .and(with(self.events.clone()))
            .and(with(self.control.clone()))
            .map(
                |ws: Ws, events: broadcast::Sender<ServerMessage>, control: Arc<ControlState>| {
                    ws.on_upgrade(move |socket| client_session(socket, events, control))
                },
            );

        let status_route = warp::path("status")
            .and(warp::path::end())
            .and(warp::get())
            .and(with(self.clone()))
            .map(|bridge: ClientBridge| warp::reply::json(&bridge.status()));

        socket_route.or(status_route)
    }

    /// Binds the listener and serves on the current runtime.
    pub fn serve(&self, addr: SocketAddr) -> anyhow::Result<SocketAddr> {
        let (bound, server) = warp::serve(self.routes())
            .try_bind_ephemeral(addr)
            .with_context(|| format!("binding websocket server on {}", addr))?;
        tokio::spawn(server);
        Ok(bound)
    }
}

async fn client_session(
    socket: WebSocket,
    events: broadcast::Sender<ServerMessage>,
    control: Arc<ControlState>,
) {
    let logger = LogManager::new("ws");
    logger.record(&format!("client connected ({} total)", control.client_connected()));

    let (mut sink, mut stream) = socket.split();
    let mut feed = events.subscribe();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ServerMessage>();

    let writer = tokio::spawn(async move {
        let logger = LogManager::new("ws");
        loop {
            let message = tokio::select! {
                event = feed.recv() => match event {
                    Ok(message) => message,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        logger.trace(&format!("slow client skipped {} events", skipped));
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(message) => message,
                    None => break,
                },
            };
            let text = match message.to_json() {
                Ok(text) => text,
                Err(err) => {
                    logger.warn(&format!("dropping unserializable event: {}", err));
                    continue;
                }
            };
            if sink.send(Message::text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(incoming) = stream.next().await {
        let message = match incoming {
            Ok(message) => message,
            Err(err) => {
                logger.trace(&format!("socket error: {}", err));
                break;
            }
        };
        if message.is_close() {
            break;
        }
        let Ok(text) = message.to_str() else {
            continue;
        };
        if let Some(reply) = control.handle_client_text(text) {
            if reply_tx.send(reply).is_err() {
                break;
            }
        }
    }

    writer.abort();
    logger.record(&format!(
        "client disconnected ({} remaining)",
        control.client_disconnected()
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazardcore::interface::HazardAlert;

    fn bridge() -> ClientBridge {
        let (events, _) = broadcast::channel(16);
        ClientBridge::new(
            events,
            Arc::new(ControlState::new()),
            Arc::new(MetricsRecorder::new()),
        )
    }

    #[tokio::test]
    async fn status_reports_counters_and_clients() {
        let bridge = bridge();
        bridge.metrics.record_frame(true);
        bridge.metrics.record_frame(false);
        let response = warp::test::request()
            .method("GET")
            .path("/status")
            .reply(&bridge.routes())
            .await;
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["frames_processed"], 2);
        assert_eq!(body["alerts"], 1);
        assert_eq!(body["clients"], 0);
    }

    #[tokio::test]
    async fn ping_gets_private_pong_and_trigger_reaches_loop() {
        let bridge = bridge();
        let mut client = warp::test::ws()
            .path("/")
            .handshake(bridge.routes())
            .await
            .expect("handshake");

        client.send_text(r#"{"type":"trigger_phase2"}"#).await;
        client.send_text("garbage").await;
        client.send_text(r#"{"type":"ping"}"#).await;
        let reply = client.recv().await.unwrap();
        assert_eq!(reply.to_str(), Ok(r#"{"type":"pong"}"#));
        assert!(bridge.control.take_scene_request());
    }

    #[tokio::test]
    async fn broadcast_events_reach_connected_clients() {
        let bridge = bridge();
        let mut client = warp::test::ws()
            .path("/")
            .handshake(bridge.routes())
            .await
            .expect("handshake");

        // round-trip a ping so the session has subscribed before publishing
        client.send_text(r#"{"type":"ping"}"#).await;
        client.recv().await.unwrap();

        bridge
            .events
            .send(ServerMessage::Hazard(HazardAlert::heartbeat(3)))
            .unwrap();
        let event = client.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(event.to_str().unwrap()).unwrap();
        assert_eq!(value["type"], "phase_1");
        assert_eq!(value["total_hazards"], 3);
    }
}
