//! Background auto-deny sweeper.
//!
//! Escalations that outlive the hard deadline must not become zombie
//! intents: a periodic task classifies every open escalation and appends
//! `AUTO_DENIED_TIMEOUT` for the expired ones.

use tracing::{error, info};

use crate::state::AppState;

/// Spawn the periodic sweep. Returns the task handle; the task runs until
/// the runtime shuts down.
pub fn spawn_sweeper(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config.sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match state.registry.sweep_expired() {
                Ok(denied) if !denied.is_empty() => {
                    info!(count = denied.len(), "auto-denied expired escalations");
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "escalation sweep failed"),
            }
        }
    })
}
