use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};

use crate::model::Ms;

const CHANNEL_CAPACITY: usize = 64;

/// The board shown on venue screens. Ephemeral: reset on restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    #[serde(rename = "matchId", default, skip_serializing_if = "Option::is_none")]
    pub match_id: Option<String>,
    #[serde(rename = "team1")]
    pub team1: String,
    #[serde(rename = "team2")]
    pub team2: String,
    #[serde(rename = "score1", default)]
    pub score1: u32,
    #[serde(rename = "score2", default)]
    pub score2: u32,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Ms,
}

/// Current scoreboard plus fan-out to every connected observer.
/// Writers are serialized by the mutex; last write wins.
pub struct ScoreboardHub {
    current: Mutex<Option<Scoreboard>>,
    tx: broadcast::Sender<Scoreboard>,
}

impl Default for ScoreboardHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreboardHub {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            tx: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    /// Replace the board and broadcast it. Returns the stored value.
    pub async fn publish(&self, mut board: Scoreboard) -> Scoreboard {
        board.updated_at = chrono::Utc::now().timestamp_millis();
        let mut current = self.current.lock().await;
        *current = Some(board.clone());
        // No receivers is fine.
        let _ = self.tx.send(board.clone());
        board
    }

    pub async fn current(&self) -> Option<Scoreboard> {
        self.current.lock().await.clone()
    }

    /// Current value and a receiver for every later change, taken together
    /// so no publish falls between them.
    pub async fn subscribe(&self) -> (Option<Scoreboard>, broadcast::Receiver<Scoreboard>) {
        let current = self.current.lock().await;
        let rx = self.tx.subscribe();
        metrics::gauge!(crate::observability::SCOREBOARD_SUBSCRIBERS).set(self.tx.receiver_count() as f64);
        (current.clone(), rx)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
