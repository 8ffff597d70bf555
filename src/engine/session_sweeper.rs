//! Background purge of session rows past the retention window.
//!
//! Store reads already ignore expired rows, so this only reclaims space.

use crate::config::SessionConfig;
use crate::db::SessionStore;
use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

pub struct SessionSweeper {
    sessions: Arc<dyn SessionStore>,
}

impl SessionSweeper {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    /// Run a single sweep, returning the number of rows removed
    pub async fn run_once(&self) -> Result<u64> {
        let removed = self.sessions.purge_expired().await?;
        if removed > 0 {
            tracing::info!(removed, "Purged expired sessions");
        } else {
            tracing::debug!("No expired sessions to purge");
        }
        Ok(removed)
    }
}

/// Spawn the periodic sweep task
pub fn spawn_session_sweeper(
    sessions: Arc<dyn SessionStore>,
    config: &SessionConfig,
) -> JoinHandle<()> {
    let interval_secs = config.sweep_interval_secs.max(1);
    tracing::info!(interval_secs, "Starting session sweeper");

    let sweeper = SessionSweeper::new(sessions);
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick.tick().await;
            if let Err(e) = sweeper.run_once().await {
                tracing::error!(error = %e, "Session sweep failed");
            }
        }
    })
}
