//! OBS Driver core struct and initialization
//!
//! Defines the ObsDriver struct with all its state and provides constructors.

use obws::Client as ObsClient;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, RwLock};

use super::requests::ObsRequest;
use super::{ConnectionStatus, StatusCallback};
use crate::config::ObsConfig;

/// OBS Studio WebSocket driver
pub struct ObsDriver {
    pub(super) name: String,

    // Connection settings; replaced on config reload
    pub(super) settings: Arc<parking_lot::RwLock<ObsConfig>>,

    // OBS client (wrapped for interior mutability)
    pub(super) client: Arc<RwLock<Option<ObsClient>>>,

    // Requests from the dispatch thread, sent in order by one worker task
    pub(super) requests: mpsc::UnboundedSender<ObsRequest>,

    // State tracking (using parking_lot for sync access)
    pub(super) program_scene: Arc<parking_lot::RwLock<String>>,

    // Connection status tracking
    pub(super) status_callbacks: Arc<parking_lot::RwLock<Vec<StatusCallback>>>,
    pub(super) current_status: Arc<parking_lot::RwLock<ConnectionStatus>>,

    // Reconnection state
    pub(super) reconnect_count: Arc<Mutex<usize>>,
    pub(super) shutdown_flag: Arc<Mutex<bool>>,
}

impl ObsDriver {
    /// Create a new OBS driver; the request worker runs on `runtime`
    pub fn new(config: ObsConfig, runtime: &Handle) -> Self {
        let client = Arc::new(RwLock::new(None));
        let (requests, rx) = mpsc::unbounded_channel();
        runtime.spawn(Self::run_request_worker(Arc::clone(&client), rx));

        Self {
            name: "obs".to_string(),
            settings: Arc::new(parking_lot::RwLock::new(config)),
            client,
            requests,
            program_scene: Arc::new(parking_lot::RwLock::new(String::new())),
            status_callbacks: Arc::new(parking_lot::RwLock::new(Vec::new())),
            current_status: Arc::new(parking_lot::RwLock::new(ConnectionStatus::Disconnected)),
            reconnect_count: Arc::new(Mutex::new(0)),
            shutdown_flag: Arc::new(Mutex::new(false)),
        }
    }

    /// Create from config
    pub fn from_config(config: &ObsConfig, runtime: &Handle) -> Self {
        Self::new(config.clone(), runtime)
    }

    /// Current program scene as last reported by OBS
    pub fn program_scene(&self) -> String {
        self.program_scene.read().clone()
    }

    /// Clone all Arc fields for spawning background tasks (reconnect, listener)
    ///
    /// All fields are Arc-wrapped, so this creates a cheap clone that shares
    /// the same underlying data with the original instance.
    pub(super) fn clone_for_task(&self) -> Self {
        Self {
            name: self.name.clone(),
            settings: Arc::clone(&self.settings),
            client: Arc::clone(&self.client),
            requests: self.requests.clone(),
            program_scene: Arc::clone(&self.program_scene),
            status_callbacks: Arc::clone(&self.status_callbacks),
            current_status: Arc::clone(&self.current_status),
            reconnect_count: Arc::clone(&self.reconnect_count),
            shutdown_flag: Arc::clone(&self.shutdown_flag),
        }
    }
}
