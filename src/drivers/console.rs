//! Console driver - logs every effector call instead of performing it
//!
//! Used by `--dry-run` to exercise a binding set without touching the
//! system, OBS or the network.

use super::{
    AudioPort, Driver, EffectorError, HttpPort, InputPort, MediaKey, ProcessPort, SourceVolume,
    StreamingPort, WindowPort,
};
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

pub struct ConsoleDriver {
    name: String,
    /// Execution counter for debugging
    execution_count: Mutex<u64>,
    /// Last volume set, so `volume()` reads back something sensible
    volume: Mutex<f32>,
}

impl ConsoleDriver {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            execution_count: Mutex::new(0),
            volume: Mutex::new(1.0),
        }
    }

    pub fn execution_count(&self) -> u64 {
        *self.execution_count.lock()
    }

    fn log(&self, action: &str, params: &[&dyn std::fmt::Debug]) {
        let exec_num = {
            let mut count = self.execution_count.lock();
            *count += 1;
            *count
        };

        let params_str = if params.is_empty() {
            "(no params)".to_string()
        } else {
            params
                .iter()
                .map(|p| format!("{:?}", p))
                .collect::<Vec<_>>()
                .join(", ")
        };

        info!(
            "🎮 [{}] '{}' → {} ({}) [exec #{}]",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            self.name,
            action,
            params_str,
            exec_num
        );
    }
}

impl AudioPort for ConsoleDriver {
    fn set_volume(&self, fraction: f32) -> Result<(), EffectorError> {
        *self.volume.lock() = fraction;
        self.log("set_volume", &[&fraction]);
        Ok(())
    }

    fn volume(&self) -> Result<f32, EffectorError> {
        Ok(*self.volume.lock())
    }
}

impl StreamingPort for ConsoleDriver {
    fn set_source_volume(&self, name: &str, volume: SourceVolume) -> Result<(), EffectorError> {
        self.log("set_source_volume", &[&name, &volume]);
        Ok(())
    }

    fn toggle_mute(&self, name: &str) -> Result<(), EffectorError> {
        self.log("toggle_mute", &[&name]);
        Ok(())
    }

    fn set_scene(&self, name: &str) -> Result<(), EffectorError> {
        self.log("set_scene", &[&name]);
        Ok(())
    }

    fn start_stream(&self) -> Result<(), EffectorError> {
        self.log("start_stream", &[]);
        Ok(())
    }

    fn stop_stream(&self) -> Result<(), EffectorError> {
        self.log("stop_stream", &[]);
        Ok(())
    }

    fn start_record(&self) -> Result<(), EffectorError> {
        self.log("start_record", &[]);
        Ok(())
    }

    fn stop_record(&self) -> Result<(), EffectorError> {
        self.log("stop_record", &[]);
        Ok(())
    }

    fn save_replay_buffer(&self) -> Result<(), EffectorError> {
        self.log("save_replay_buffer", &[]);
        Ok(())
    }

    fn set_source_target(&self, name: &str, window: &str) -> Result<(), EffectorError> {
        self.log("set_source_target", &[&name, &window]);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }
}

impl InputPort for ConsoleDriver {
    fn press_media_key(&self, key: MediaKey) -> Result<(), EffectorError> {
        self.log("press_media_key", &[&key]);
        Ok(())
    }

    fn press_key(&self, code: &str) -> Result<(), EffectorError> {
        let vk = super::input::parse_key_code(code)?;
        self.log("press_key", &[&vk]);
        Ok(())
    }
}

impl ProcessPort for ConsoleDriver {
    fn run_process(&self, path: &str, args: &str) -> Result<(), EffectorError> {
        let argv = super::process::split_args(args);
        self.log("run_process", &[&path, &argv]);
        Ok(())
    }
}

impl HttpPort for ConsoleDriver {
    fn send_request(&self, url: &str, method_and_body: &str) -> Result<(), EffectorError> {
        let (method, body) = super::http::parse_method_and_body(method_and_body)?;
        self.log("send_request", &[&method, &url, &body]);
        Ok(())
    }
}

impl WindowPort for ConsoleDriver {
    fn foreground_window(&self) -> Result<Option<String>, EffectorError> {
        let descriptor = super::window::window_descriptor("Console", "ConsoleWindowClass", "grass-midi.exe");
        self.log("foreground_window", &[&descriptor]);
        Ok(Some(descriptor))
    }
}

#[async_trait]
impl Driver for ConsoleDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self) -> Result<()> {
        *self.execution_count.lock() = 0;
        info!("✅ ConsoleDriver '{}' initialized", self.name);
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        info!(
            "🛑 ConsoleDriver '{}' shutting down (executed {} actions)",
            self.name,
            self.execution_count()
        );
        Ok(())
    }
}
