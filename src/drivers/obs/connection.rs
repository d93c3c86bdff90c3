//! OBS connection management and event handling
//!
//! Handles WebSocket connection, reconnection, event listening, and state synchronization.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::driver::ObsDriver;
use super::ConnectionStatus;
use crate::config::ObsConfig;

/// Upper bound of the linear reconnect backoff
const MAX_RECONNECT_DELAY_MS: usize = 30_000;

/// Delay before reconnect attempt `attempt` (1-based)
pub(super) fn reconnect_delay_ms(attempt: usize) -> usize {
    std::cmp::min(MAX_RECONNECT_DELAY_MS, 1000 * attempt)
}

impl ObsDriver {
    /// Emit connection status to all subscribers
    pub(super) fn emit_status(&self, status: ConnectionStatus) {
        *self.current_status.write() = status.clone();
        for callback in self.status_callbacks.read().iter() {
            callback(status.clone());
        }
    }

    /// Connect to OBS WebSocket
    pub(super) async fn connect(&self) -> Result<()> {
        let ObsConfig {
            host,
            port,
            password,
            ..
        } = self.settings.read().clone();
        info!("🎬 Connecting to OBS at {}:{}", host, port);

        let client = obws::Client::connect(host, port, password)
            .await
            .context("Failed to connect to OBS WebSocket")?;

        *self.client.write().await = Some(client);
        *self.reconnect_count.lock() = 0;

        // Refresh initial state
        self.refresh_state().await?;

        // Start event listener
        self.spawn_event_listener();

        self.emit_status(ConnectionStatus::Connected);

        info!("✅ OBS WebSocket connected");
        Ok(())
    }

    /// Spawn background task to listen to OBS events
    ///
    /// The task ends when the event stream closes and hands over to
    /// [`ObsDriver::schedule_reconnect`].
    pub(super) fn spawn_event_listener(&self) {
        let client = Arc::clone(&self.client);
        let program_scene = Arc::clone(&self.program_scene);
        let shutdown_flag = Arc::clone(&self.shutdown_flag);
        let driver_for_reconnect = self.clone_for_task();

        tokio::spawn(async move {
            let events = {
                let guard = client.read().await;
                match guard.as_ref().map(|c| c.events()) {
                    Some(Ok(stream)) => stream,
                    Some(Err(e)) => {
                        warn!("Failed to get OBS event stream: {}", e);
                        return;
                    },
                    None => return,
                }
            };

            use obws::events::Event;
            use tokio_stream::StreamExt;

            tokio::pin!(events);
            while let Some(event) = events.next().await {
                if *shutdown_flag.lock() {
                    return;
                }

                match event {
                    Event::CurrentProgramSceneChanged { name } => {
                        debug!("OBS program scene changed: {}", name);
                        *program_scene.write() = name;
                    },
                    Event::ExitStarted => {
                        info!("OBS is shutting down");
                    },
                    _ => {},
                }
            }

            if *shutdown_flag.lock() {
                return;
            }

            warn!("🔌 OBS event stream closed");
            *driver_for_reconnect.client.write().await = None;
            driver_for_reconnect.emit_status(ConnectionStatus::Disconnected);
            driver_for_reconnect.schedule_reconnect().await;
        });
    }

    /// Refresh OBS state (current program scene)
    pub(super) async fn refresh_state(&self) -> Result<()> {
        let guard = self.client.read().await;
        let client = guard.as_ref().context("OBS client not connected")?;

        let program_scene = client.scenes().current_program_scene().await?;
        debug!("OBS program scene: {}", program_scene);
        *self.program_scene.write() = program_scene;

        Ok(())
    }

    /// Schedule reconnection with linear backoff (1 s per attempt, 30 s cap)
    pub(super) async fn schedule_reconnect(&self) {
        loop {
            if *self.shutdown_flag.lock() {
                return;
            }

            let retry_count = {
                let mut count = self.reconnect_count.lock();
                *count += 1;
                *count
            };

            let delay_ms = reconnect_delay_ms(retry_count);
            debug!("⏳ OBS reconnect #{} in {}ms", retry_count, delay_ms);

            self.emit_status(ConnectionStatus::Reconnecting {
                attempt: retry_count,
            });

            sleep(Duration::from_millis(delay_ms as u64)).await;

            if *self.shutdown_flag.lock() {
                return;
            }

            match self.connect().await {
                Ok(_) => {
                    info!("✅ OBS reconnection successful");
                    return;
                },
                Err(e) => {
                    debug!("OBS reconnect #{} failed: {:#}", retry_count, e);
                },
            }
        }
    }

    /// Apply new connection settings
    ///
    /// A live connection is closed; its event listener then reconnects
    /// with the new settings. A pending reconnect loop picks them up on its
    /// next attempt.
    pub async fn reconfigure(&self, config: &ObsConfig) {
        {
            let mut settings = self.settings.write();
            if settings.host == config.host
                && settings.port == config.port
                && settings.password == config.password
            {
                return;
            }
            *settings = config.clone();
        }

        info!("🔄 OBS settings changed, reconnecting to {}:{}", config.host, config.port);
        *self.reconnect_count.lock() = 0;

        if let Some(client) = self.client.write().await.take() {
            drop(client);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_backoff_is_linear_and_capped() {
        assert_eq!(reconnect_delay_ms(1), 1000);
        assert_eq!(reconnect_delay_ms(5), 5000);
        assert_eq!(reconnect_delay_ms(30), 30_000);
        assert_eq!(reconnect_delay_ms(100), 30_000);
    }
}
