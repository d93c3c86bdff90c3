//! Port and lifecycle implementations for OBS
//!
//! Port calls never wait on the WebSocket: they enqueue a request for the
//! worker task and return.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::driver::ObsDriver;
use super::requests::ObsRequest;
use super::{
    ConnectionStatus, Driver, EffectorError, SourceVolume, StatusCallback, StreamingPort,
};

impl ObsDriver {
    fn enqueue(&self, request: ObsRequest) -> Result<(), EffectorError> {
        if !self.is_connected() {
            return Err(EffectorError::NotConnected("OBS"));
        }
        debug!("OBS → {}", request);
        self.requests
            .send(request)
            .map_err(|_| EffectorError::Backend("OBS request worker stopped".to_string()))
    }
}

impl StreamingPort for ObsDriver {
    fn set_source_volume(&self, name: &str, volume: SourceVolume) -> Result<(), EffectorError> {
        self.enqueue(ObsRequest::SetVolume {
            input: name.to_string(),
            volume,
        })
    }

    fn toggle_mute(&self, name: &str) -> Result<(), EffectorError> {
        self.enqueue(ObsRequest::ToggleMute {
            input: name.to_string(),
        })
    }

    fn set_scene(&self, name: &str) -> Result<(), EffectorError> {
        self.enqueue(ObsRequest::SetScene {
            scene: name.to_string(),
        })
    }

    fn start_stream(&self) -> Result<(), EffectorError> {
        self.enqueue(ObsRequest::StartStream)
    }

    fn stop_stream(&self) -> Result<(), EffectorError> {
        self.enqueue(ObsRequest::StopStream)
    }

    fn start_record(&self) -> Result<(), EffectorError> {
        self.enqueue(ObsRequest::StartRecord)
    }

    fn stop_record(&self) -> Result<(), EffectorError> {
        self.enqueue(ObsRequest::StopRecord)
    }

    fn save_replay_buffer(&self) -> Result<(), EffectorError> {
        self.enqueue(ObsRequest::SaveReplay)
    }

    fn set_source_target(&self, name: &str, window: &str) -> Result<(), EffectorError> {
        self.enqueue(ObsRequest::SetWindow {
            input: name.to_string(),
            window: window.to_string(),
        })
    }

    fn is_connected(&self) -> bool {
        *self.current_status.read() == ConnectionStatus::Connected
    }
}

#[async_trait]
impl Driver for ObsDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self) -> Result<()> {
        info!("🎬 Initializing OBS WebSocket driver");

        match self.connect().await {
            Ok(_) => {
                info!("✅ OBS connected on init");
            },
            Err(e) => {
                warn!("⚠️  OBS connection failed on init: {:#}", e);
                warn!("🔄 Will retry automatically in background");

                self.emit_status(ConnectionStatus::Disconnected);

                let driver_clone = self.clone_for_task();
                tokio::spawn(async move {
                    driver_clone.schedule_reconnect().await;
                });
            },
        }

        // Always succeed - driver is usable even if disconnected
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down OBS WebSocket driver");
        *self.shutdown_flag.lock() = true;

        if let Some(client) = self.client.write().await.take() {
            drop(client);
        }
        self.emit_status(ConnectionStatus::Disconnected);

        info!("✅ OBS WebSocket driver shutdown complete");
        Ok(())
    }

    fn connection_status(&self) -> ConnectionStatus {
        self.current_status.read().clone()
    }

    fn subscribe_connection_status(&self, callback: StatusCallback) {
        debug!("OBS driver: new connection status subscription");

        // Emit current status immediately to new subscriber
        let current = self.current_status.read().clone();
        callback(current);

        self.status_callbacks.write().push(callback);
    }
}
