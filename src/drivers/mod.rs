//! Effector drivers (system audio, OBS, keyboard, processes, HTTP, windows)
//!
//! The dispatch engine only sees the port traits below. Every port method is
//! synchronous from the caller's point of view: ports backed by an async
//! service spawn their request and log its outcome themselves.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use crate::dispatch::transform::SourceVolume;

pub mod audio;
pub mod console;
pub mod http;
pub mod input;
pub mod obs;
pub mod process;
pub mod window;

#[cfg(test)]
pub mod testing;

pub use audio::SystemAudio;
pub use console::ConsoleDriver;
pub use http::HttpClient;
pub use input::KeyboardInput;
pub use obs::ObsDriver;
pub use process::CommandLauncher;
pub use window::ForegroundWindow;

/// Failure of a single effector call
#[derive(Debug, Error)]
pub enum EffectorError {
    #[error("{0} is not connected")]
    NotConnected(&'static str),

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("invalid key code '{0}'")]
    InvalidKeyCode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to launch '{path}': {source}")]
    Launch {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Backend(String),
}

/// Transport keys a controller can press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKey {
    PlayPause,
    Next,
    Prev,
    Stop,
}

/// Master volume of the default playback device
pub trait AudioPort: Send + Sync {
    /// `fraction` is 0.0-1.0
    fn set_volume(&self, fraction: f32) -> Result<(), EffectorError>;

    fn volume(&self) -> Result<f32, EffectorError>;
}

/// Live-streaming tool control
pub trait StreamingPort: Send + Sync {
    fn set_source_volume(&self, name: &str, volume: SourceVolume) -> Result<(), EffectorError>;
    fn toggle_mute(&self, name: &str) -> Result<(), EffectorError>;
    fn set_scene(&self, name: &str) -> Result<(), EffectorError>;
    fn start_stream(&self) -> Result<(), EffectorError>;
    fn stop_stream(&self) -> Result<(), EffectorError>;
    fn start_record(&self) -> Result<(), EffectorError>;
    fn stop_record(&self) -> Result<(), EffectorError>;
    fn save_replay_buffer(&self) -> Result<(), EffectorError>;

    /// Point a window-capture source at `window` (an OBS window descriptor)
    fn set_source_target(&self, name: &str, window: &str) -> Result<(), EffectorError>;

    fn is_connected(&self) -> bool;
}

/// Keyboard simulation
pub trait InputPort: Send + Sync {
    fn press_media_key(&self, key: MediaKey) -> Result<(), EffectorError>;

    /// Press and release a virtual-key code given as text (decimal or `0x` hex)
    fn press_key(&self, code: &str) -> Result<(), EffectorError>;
}

pub trait ProcessPort: Send + Sync {
    fn run_process(&self, path: &str, args: &str) -> Result<(), EffectorError>;
}

pub trait HttpPort: Send + Sync {
    /// `method_and_body` is `METHOD|BODY`, `METHOD`, or empty for GET
    fn send_request(&self, url: &str, method_and_body: &str) -> Result<(), EffectorError>;
}

pub trait WindowPort: Send + Sync {
    /// Descriptor of the current foreground window, if there is one
    fn foreground_window(&self) -> Result<Option<String>, EffectorError>;
}

/// The full set of ports the dispatcher invokes
#[derive(Clone)]
pub struct Effectors {
    pub audio: Arc<dyn AudioPort>,
    pub streaming: Arc<dyn StreamingPort>,
    pub input: Arc<dyn InputPort>,
    pub process: Arc<dyn ProcessPort>,
    pub http: Arc<dyn HttpPort>,
    pub window: Arc<dyn WindowPort>,
}

impl Effectors {
    /// Real system effectors around a shared OBS driver
    pub fn system(obs: Arc<ObsDriver>, runtime: tokio::runtime::Handle) -> Result<Self> {
        Ok(Self {
            audio: Arc::new(SystemAudio::new()),
            streaming: obs,
            input: Arc::new(KeyboardInput::new()),
            process: Arc::new(CommandLauncher::new(runtime.clone())),
            http: Arc::new(HttpClient::new(runtime)?),
            window: Arc::new(ForegroundWindow::new()),
        })
    }

    /// Every port replaced by one logging console driver
    pub fn console(driver: Arc<ConsoleDriver>) -> Self {
        Self {
            audio: driver.clone(),
            streaming: driver.clone(),
            input: driver.clone(),
            process: driver.clone(),
            http: driver.clone(),
            window: driver,
        }
    }
}

/// Connection state of a driver that talks to another application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting { attempt: usize },
}

/// Callback type for connection status changes
pub type StatusCallback = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

/// Lifecycle of long-lived drivers
///
/// Note: All methods take &self to support Arc<dyn Driver>.
/// Drivers use interior mutability for their state.
#[async_trait]
pub trait Driver: Send + Sync {
    fn name(&self) -> &str;

    /// Connect / open resources
    async fn init(&self) -> Result<()>;

    async fn shutdown(&self) -> Result<()>;

    /// Default: always connected (drivers without network connections)
    fn connection_status(&self) -> ConnectionStatus {
        ConnectionStatus::Connected
    }

    /// Default: no-op (driver doesn't track connection status)
    fn subscribe_connection_status(&self, _callback: StatusCallback) {}
}
