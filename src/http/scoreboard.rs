use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use super::AppState;
use crate::auth::Scheme;
use crate::scoreboard::Scoreboard;

/// What a screen sends to change the board.
#[derive(Debug, Deserialize)]
struct Publish {
    authorization: Option<String>,
    scoreboard: Scoreboard,
}

/// What the server pushes: `{"scoreboard": {...}}` or `{"error": "..."}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Frame {
    Scoreboard(Scoreboard),
    Error(String),
}

pub async fn connect(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve(socket, state))
}

async fn serve(socket: WebSocket, state: AppState) {
    let (initial, mut updates) = state.scoreboard.subscribe().await;
    let (mut sink, mut stream) = socket.split();
    debug!("scoreboard subscriber connected");

    if let Some(board) = initial {
        if send(&mut sink, Frame::Scoreboard(board)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            update = updates.recv() => {
                let frame = match update {
                    Ok(board) => Frame::Scoreboard(board),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("scoreboard subscriber lagged by {skipped}");
                        match state.scoreboard.current().await {
                            Some(board) => Frame::Scoreboard(board),
                            None => continue,
                        }
                    }
                    Err(RecvError::Closed) => break,
                };
                if send(&mut sink, frame).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = handle_publish(&state, text.as_str()).await {
                        if send(&mut sink, reply).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    }

    drop(updates);
    metrics::gauge!(crate::observability::SCOREBOARD_SUBSCRIBERS).set(state.scoreboard.subscriber_count() as f64);
    debug!("scoreboard subscriber disconnected");
}

/// Publish an authorized update. Returns the error frame for the sender
/// when the message is rejected; accepted updates come back via broadcast.
async fn handle_publish(state: &AppState, text: &str) -> Option<Frame> {
    let message: Publish = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => return Some(Frame::Error(format!("invalid message: {e}"))),
    };
    if let Err(e) = state.admin.check(message.authorization.as_deref(), Scheme::Bearer) {
        warn!("rejected scoreboard update: {e}");
        metrics::counter!(crate::observability::AUTH_FAILURES_TOTAL).increment(1);
        return Some(Frame::Error(e.to_string()));
    }
    state.scoreboard.publish(message.scoreboard).await;
    None
}

async fn send<S>(sink: &mut S, frame: Frame) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let json = serde_json::to_string(&frame).map_err(|_| ())?;
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_tagged_by_kind() {
        let board = Scoreboard {
            match_id: None,
            team1: "Hugo".into(),
            team2: "Ferry".into(),
            score1: 2,
            score2: 1,
            updated_at: 0,
        };
        let json = serde_json::to_value(Frame::Scoreboard(board)).unwrap();
        assert_eq!(json["scoreboard"]["team1"], "Hugo");
        let json = serde_json::to_value(Frame::Error("unauthorized".into())).unwrap();
        assert_eq!(json, serde_json::json!({"error": "unauthorized"}));
    }

    #[test]
    fn publish_message_accepts_missing_authorization() {
        let m: Publish = serde_json::from_str(r#"{"scoreboard":{"team1":"A","team2":"B","score1":1}}"#).unwrap();
        assert!(m.authorization.is_none());
        assert_eq!(m.scoreboard.score1, 1);
        assert_eq!(m.scoreboard.score2, 0);
    }
}
