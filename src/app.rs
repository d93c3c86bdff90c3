//! Application wiring shared by the main loop and the HTTP API
//!
//! A configuration change (API update or file hot-reload) always goes
//! through [`App::apply`]: bindings and volume mode are swapped first, then
//! the MIDI input and OBS connection are re-established if their settings
//! changed.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AppConfig, ConfigStore, ConfigUpdateError, MidiConfig};
use crate::device::MidiDevice;
use crate::dispatch::Dispatcher;
use crate::drivers::ObsDriver;

pub struct App {
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<ConfigStore>,
    pub device: Arc<MidiDevice>,
    /// `None` in dry-run mode
    pub obs: Option<Arc<ObsDriver>>,
}

impl App {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        config: Arc<ConfigStore>,
        obs: Option<Arc<ObsDriver>>,
    ) -> Self {
        let device = Arc::new(MidiDevice::new(Arc::clone(&dispatcher)));
        Self {
            dispatcher,
            config,
            device,
            obs,
        }
    }

    /// Open the configured MIDI input, if any; failures are logged
    pub fn connect_device(&self, midi: &MidiConfig) {
        match &midi.device {
            Some(name) => {
                if let Err(e) = self.device.connect(name) {
                    warn!("⚠️  MIDI input unavailable: {:#}", e);
                }
            },
            None => {
                self.device.disconnect();
                info!("No MIDI device configured (set midi.device or use the API)");
            },
        }
    }

    /// Make `current` take effect, given the config it replaces
    pub async fn apply(&self, previous: &AppConfig, current: &AppConfig) {
        self.dispatcher.replace_bindings(current.binding_table());
        self.dispatcher.set_volume_mode(current.obs.volume_mode);

        if previous.midi != current.midi || !self.device.is_connected() {
            self.connect_device(&current.midi);
        }

        if let Some(obs) = &self.obs {
            obs.reconfigure(&current.obs).await;
        }

        if previous.api.port != current.api.port {
            warn!(
                "api.port changed to {}; restart to move the control API",
                current.api.port
            );
        }

        info!("✅ Configuration applied ({} bindings)", current.bindings.len());
    }

    /// Validate, persist and apply a config submitted through the API
    pub async fn update_config(&self, config: AppConfig) -> Result<(), ConfigUpdateError> {
        let previous = self.config.update(config).await?;
        let current = self.config.current();
        self.apply(&previous, &current).await;
        Ok(())
    }

    /// Apply a config re-read from disk by the watcher
    pub async fn reload_config(&self, config: AppConfig) {
        let previous = self.config.replace(config);
        let current = self.config.current();
        self.apply(&previous, &current).await;
    }
}
