use crate::{
    client::{Client, Request},
    config::Config,
    error::GameError,
    session::{RoomRegistry, DEFAULT_ROOM_CODE},
};
use axum::extract::Query;
use futures_util::{select, FutureExt, SinkExt, StreamExt, TryStreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request as HsRequest, Response as HsResponse};
use tokio_tungstenite::tungstenite::Message;

const DEFAULT_NAME: &str = "Guest";

/// Query parameters on the WebSocket URL, e.g. `/ws?room=ABC&name=Alex`.
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(default)]
struct JoinParams {
    room: String,
    name: String,
}

impl Default for JoinParams {
    fn default() -> Self {
        Self {
            room: DEFAULT_ROOM_CODE.to_string(),
            name: DEFAULT_NAME.to_string(),
        }
    }
}

pub async fn accept_connection(stream: TcpStream, registry: &'static RoomRegistry, config: Config) {
    log::info!("Accepted new connection");

    let mut path = String::new();
    let callback = |req: &HsRequest, res: HsResponse| -> Result<HsResponse, ErrorResponse> {
        path = req.uri().to_string();
        Ok(res)
    };
    let Ok(stream) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
        log::error!("Error occured during websocket handshake");
        return;
    };
    let params = join_params(&path);
    let (mut write, read) = stream.split();
    let mut read = read.fuse();

    let mut client = match Client::join(registry, &params.room, &params.name) {
        Ok(client) => client,
        Err(err) => {
            log::info!("[WS] {} could not join {}: {}", params.name, params.room, err);
            write.send(Message::Text(error_reply(&err).to_string())).await.ok();
            return;
        }
    };
    log::info!("[WS] {} joined {}", params.name, client.room_code());

    let joined = json!({
        "type": "joined",
        "playerId": client.player(),
        "code": client.room_code()
    });
    if write.send(Message::Text(joined.to_string())).await.is_err() {
        client.leave();
        return;
    }

    let mut ping = tokio::time::interval(config.ping_interval);

    loop {
        select! {
            msg = read.try_next() => {
                let text = match msg {
                    Ok(Some(Message::Text(text))) => text,
                    Ok(Some(Message::Close(_))) | Ok(None) | Err(_) => break,
                    Ok(Some(_)) => continue,
                };
                match serde_json::from_str::<Request>(&text) {
                    Ok(request) => client.handle(request),
                    Err(err) => {
                        log::error!("Invalid message received: {} ({})", &text, err);
                        let reply = json!({ "type": "error", "error": "protocol_error" });
                        write.send(Message::Text(reply.to_string())).await.ok();
                    }
                }
                if client.has_left() {
                    break;
                }
            },
            event = client.next_event().fuse() => {
                let Some(event) = event else {
                    break;
                };
                let Ok(text) = serde_json::to_string(&event) else {
                    continue;
                };
                if write.send(Message::Text(text)).await.is_err() {
                    log::error!("Could not send websockets message");
                    break;
                }
            },
            _ = ping.tick().fuse() => {
                if write.send(Message::Ping(vec![])).await.is_err() {
                    break;
                }
            }
        }
    }

    client.leave();
    log::info!("[WS] {} left {}", params.name, client.room_code());
}

/// Reads the room and name from the handshake path, defaulting whatever is missing.
fn join_params(path: &str) -> JoinParams {
    path.parse::<axum::http::Uri>()
        .ok()
        .and_then(|uri| Query::<JoinParams>::try_from_uri(&uri).ok())
        .map(|Query(params)| params)
        .unwrap_or_default()
}

fn error_reply(err: &GameError) -> Value {
    json!({
        "type": "error",
        "error": err.to_string()
    })
}
