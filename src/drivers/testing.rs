//! Recording port doubles for tests

use super::{
    AudioPort, EffectorError, Effectors, HttpPort, InputPort, MediaKey, ProcessPort,
    SourceVolume, StreamingPort, WindowPort,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// One recorded port call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetVolume(f32),
    SourceVolume(String, SourceVolume),
    ToggleMute(String),
    SetScene(String),
    StartStream,
    StopStream,
    StartRecord,
    StopRecord,
    SaveReplay,
    SetSourceTarget(String, String),
    MediaKey(MediaKey),
    Key(String),
    RunProcess(String, String),
    HttpRequest(String, String),
    ForegroundWindow,
}

type CallPredicate = Arc<dyn Fn(&Call) -> bool + Send + Sync>;
type CallHook = Arc<dyn Fn(&Call) + Send + Sync>;

/// Implements every port; records each call, optionally failing some
pub struct Recorder {
    calls: Mutex<Vec<Call>>,
    failing: Mutex<Option<CallPredicate>>,
    hook: Mutex<Option<CallHook>>,
    window: Mutex<Option<String>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(None),
            hook: Mutex::new(None),
            window: Mutex::new(Some("Game:GameWnd:game.exe".to_string())),
        })
    }

    pub fn effectors(self: &Arc<Self>) -> Effectors {
        Effectors {
            audio: self.clone(),
            streaming: self.clone(),
            input: self.clone(),
            process: self.clone(),
            http: self.clone(),
            window: self.clone(),
        }
    }

    /// Calls matching `predicate` are recorded and then fail
    pub fn fail_when(&self, predicate: impl Fn(&Call) -> bool + Send + Sync + 'static) {
        *self.failing.lock() = Some(Arc::new(predicate));
    }

    /// Run `hook` on every call, before it is recorded
    pub fn on_call(&self, hook: impl Fn(&Call) + Send + Sync + 'static) {
        *self.hook.lock() = Some(Arc::new(hook));
    }

    pub fn set_foreground_window(&self, window: Option<&str>) {
        *self.window.lock() = window.map(str::to_string);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: Call) -> Result<(), EffectorError> {
        let hook = self.hook.lock().clone();
        if let Some(hook) = hook {
            hook(&call);
        }

        let failing = self.failing.lock().clone();
        let fails = failing.map_or(false, |p| p(&call));
        self.calls.lock().push(call);

        if fails {
            Err(EffectorError::Backend("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl AudioPort for Recorder {
    fn set_volume(&self, fraction: f32) -> Result<(), EffectorError> {
        self.record(Call::SetVolume(fraction))
    }

    fn volume(&self) -> Result<f32, EffectorError> {
        Ok(0.0)
    }
}

impl StreamingPort for Recorder {
    fn set_source_volume(&self, name: &str, volume: SourceVolume) -> Result<(), EffectorError> {
        self.record(Call::SourceVolume(name.to_string(), volume))
    }

    fn toggle_mute(&self, name: &str) -> Result<(), EffectorError> {
        self.record(Call::ToggleMute(name.to_string()))
    }

    fn set_scene(&self, name: &str) -> Result<(), EffectorError> {
        self.record(Call::SetScene(name.to_string()))
    }

    fn start_stream(&self) -> Result<(), EffectorError> {
        self.record(Call::StartStream)
    }

    fn stop_stream(&self) -> Result<(), EffectorError> {
        self.record(Call::StopStream)
    }

    fn start_record(&self) -> Result<(), EffectorError> {
        self.record(Call::StartRecord)
    }

    fn stop_record(&self) -> Result<(), EffectorError> {
        self.record(Call::StopRecord)
    }

    fn save_replay_buffer(&self) -> Result<(), EffectorError> {
        self.record(Call::SaveReplay)
    }

    fn set_source_target(&self, name: &str, window: &str) -> Result<(), EffectorError> {
        self.record(Call::SetSourceTarget(name.to_string(), window.to_string()))
    }

    fn is_connected(&self) -> bool {
        true
    }
}

impl InputPort for Recorder {
    fn press_media_key(&self, key: MediaKey) -> Result<(), EffectorError> {
        self.record(Call::MediaKey(key))
    }

    fn press_key(&self, code: &str) -> Result<(), EffectorError> {
        self.record(Call::Key(code.to_string()))
    }
}

impl ProcessPort for Recorder {
    fn run_process(&self, path: &str, args: &str) -> Result<(), EffectorError> {
        self.record(Call::RunProcess(path.to_string(), args.to_string()))
    }
}

impl HttpPort for Recorder {
    fn send_request(&self, url: &str, method_and_body: &str) -> Result<(), EffectorError> {
        self.record(Call::HttpRequest(url.to_string(), method_and_body.to_string()))
    }
}

impl WindowPort for Recorder {
    fn foreground_window(&self) -> Result<Option<String>, EffectorError> {
        self.record(Call::ForegroundWindow)?;
        Ok(self.window.lock().clone())
    }
}
