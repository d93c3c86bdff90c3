//! Requests queued for OBS and the worker that sends them

use obws::requests::inputs::{SetSettings, Volume};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use super::driver::ObsDriver;
use super::SourceVolume;

/// One obs-websocket call
#[derive(Debug, Clone, PartialEq)]
pub enum ObsRequest {
    SetVolume { input: String, volume: SourceVolume },
    ToggleMute { input: String },
    SetScene { scene: String },
    StartStream,
    StopStream,
    StartRecord,
    StopRecord,
    SaveReplay,
    /// Retarget a window-capture input
    SetWindow { input: String, window: String },
}

impl ObsRequest {
    pub async fn send(&self, client: &obws::Client) -> obws::Result<()> {
        match self {
            ObsRequest::SetVolume { input, volume } => {
                let volume = match *volume {
                    SourceVolume::Multiplier(m) => Volume::Mul(m),
                    SourceVolume::Decibel(db) => Volume::Db(db),
                };
                client.inputs().set_volume(input, volume).await
            }
            ObsRequest::ToggleMute { input } => {
                let muted = client.inputs().toggle_mute(input).await?;
                debug!("OBS input '{}' muted: {}", input, muted);
                Ok(())
            }
            ObsRequest::SetScene { scene } => {
                client.scenes().set_current_program_scene(scene).await
            }
            ObsRequest::StartStream => client.streaming().start().await,
            ObsRequest::StopStream => client.streaming().stop().await,
            ObsRequest::StartRecord => client.recording().start().await,
            ObsRequest::StopRecord => {
                let path = client.recording().stop().await?;
                debug!("OBS recording saved to {}", path);
                Ok(())
            }
            ObsRequest::SaveReplay => client.replay_buffer().save().await,
            ObsRequest::SetWindow { input, window } => {
                let settings = json!({ "window": window });
                client
                    .inputs()
                    .set_settings(SetSettings {
                        input,
                        settings: &settings,
                        overlay: Some(true),
                    })
                    .await
            }
        }
    }
}

impl fmt::Display for ObsRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObsRequest::SetVolume { input, volume } => write!(f, "SetVolume({}, {:?})", input, volume),
            ObsRequest::ToggleMute { input } => write!(f, "ToggleMute({})", input),
            ObsRequest::SetScene { scene } => write!(f, "SetScene({})", scene),
            ObsRequest::StartStream => f.write_str("StartStream"),
            ObsRequest::StopStream => f.write_str("StopStream"),
            ObsRequest::StartRecord => f.write_str("StartRecord"),
            ObsRequest::StopRecord => f.write_str("StopRecord"),
            ObsRequest::SaveReplay => f.write_str("SaveReplay"),
            ObsRequest::SetWindow { input, window } => write!(f, "SetWindow({}, {})", input, window),
        }
    }
}

impl ObsDriver {
    /// Send queued requests in arrival order until every sender is gone
    pub(super) async fn run_request_worker(
        client: Arc<RwLock<Option<obws::Client>>>,
        mut rx: mpsc::UnboundedReceiver<ObsRequest>,
    ) {
        while let Some(request) = rx.recv().await {
            let guard = client.read().await;
            match guard.as_ref() {
                Some(c) => match request.send(c).await {
                    Ok(()) => debug!("OBS ← {}", request),
                    Err(e) => warn!("⚠️  OBS {} failed: {}", request, e),
                },
                None => warn!("⚠️  OBS not connected, {} dropped", request),
            }
        }
        debug!("OBS request worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_display() {
        let req = ObsRequest::SetScene {
            scene: "Live".to_string(),
        };
        assert_eq!(req.to_string(), "SetScene(Live)");
        assert_eq!(ObsRequest::SaveReplay.to_string(), "SaveReplay");
    }

    #[tokio::test]
    async fn test_worker_drops_requests_while_disconnected() {
        let client = Arc::new(RwLock::new(None));
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(ObsDriver::run_request_worker(client, rx));

        tx.send(ObsRequest::StartStream).unwrap();
        drop(tx);

        // Worker drains the queue and exits once the sender is gone
        worker.await.unwrap();
    }
}
