//! Event normalization and binding dispatch
//!
//! Raw frames from the device callback (or synthetic events from the API)
//! become canonical events, are recorded by the learn sink, and then fan
//! out to every matching binding. A failing effector is logged and never
//! stops its siblings.
//!
//! The binding table is an `ArcSwap` snapshot: configuration reloads store
//! a new table while an in-flight dispatch keeps iterating the one it
//! loaded.

pub mod binding;
pub mod learn;
pub mod normalize;
pub mod transform;


use arc_swap::ArcSwap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::drivers::{EffectorError, Effectors, MediaKey};
use crate::midi::{format_hex, MidiMessage};

pub use binding::{ActionKind, Binding, BindingTable, UNUSED_CHANNEL};
pub use learn::LearnSink;
pub use normalize::{normalize, normalize_raw, now_ms, CanonicalEvent, MAX_VALUE};
pub use transform::{ActionValue, SourceVolume, VolumeMode};

/// Outcome of dispatching one event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Bindings whose key matched the event
    pub matched: usize,
    /// Matches whose transform produced a value and were invoked
    pub fired: usize,
    /// Invocations that returned an error
    pub failed: usize,
}

pub struct Dispatcher {
    table: ArcSwap<BindingTable>,
    volume_mode: ArcSwap<VolumeMode>,
    effectors: Effectors,
    learn: LearnSink,
}

impl Dispatcher {
    pub fn new(effectors: Effectors, table: BindingTable, volume_mode: VolumeMode) -> Self {
        Self {
            table: ArcSwap::from_pointee(table),
            volume_mode: ArcSwap::from_pointee(volume_mode),
            effectors,
            learn: LearnSink::new(),
        }
    }

    pub fn effectors(&self) -> &Effectors {
        &self.effectors
    }

    /// Current binding table snapshot
    pub fn bindings(&self) -> Arc<BindingTable> {
        self.table.load_full()
    }

    /// Swap in a new binding table; in-flight dispatches are unaffected
    pub fn replace_bindings(&self, table: BindingTable) {
        debug!("Binding table replaced ({} bindings)", table.len());
        self.table.store(Arc::new(table));
    }

    pub fn volume_mode(&self) -> VolumeMode {
        **self.volume_mode.load()
    }

    pub fn set_volume_mode(&self, mode: VolumeMode) {
        self.volume_mode.store(Arc::new(mode));
    }

    pub fn last_observed_event(&self) -> Option<CanonicalEvent> {
        self.learn.last()
    }

    /// Live feed of every ingested event
    pub fn subscribe(&self) -> broadcast::Receiver<CanonicalEvent> {
        self.learn.subscribe()
    }

    /// Entry point for the device callback
    ///
    /// Returns `None` when the frame is not a CC or note-on message.
    pub fn normalize_and_dispatch(&self, raw: &[u8]) -> Option<DispatchReport> {
        match normalize_raw(raw, now_ms()) {
            Some(event) => Some(self.ingest(event)),
            None => {
                match MidiMessage::parse(raw) {
                    Some(message) => {
                        trace!("MIDI message ignored: {} [{}]", message, format_hex(raw))
                    }
                    None => trace!("MIDI frame ignored: {}", format_hex(raw)),
                }
                None
            }
        }
    }

    /// Inject an event as if a device had sent it; `value` is clamped to 0-127
    pub fn trigger_synthetic(
        &self,
        channel: i32,
        id: i32,
        is_continuous: bool,
        value: i32,
    ) -> DispatchReport {
        let value = value.clamp(0, MAX_VALUE as i32) as u8;
        self.ingest(CanonicalEvent::new(channel, id, is_continuous, value, now_ms()))
    }

    /// Record for learn mode, then dispatch
    pub fn ingest(&self, event: CanonicalEvent) -> DispatchReport {
        self.learn.observe(event);
        self.dispatch(&event)
    }

    /// Fire every binding matching `event`, in table order
    pub fn dispatch(&self, event: &CanonicalEvent) -> DispatchReport {
        let table = self.table.load_full();
        let mode = self.volume_mode();
        let mut report = DispatchReport::default();

        for binding in table.matching(event) {
            report.matched += 1;

            let Some(value) = binding.kind.transform(event.value, mode) else {
                continue;
            };
            report.fired += 1;

            if let Err(e) = self.invoke(binding.kind, &binding.target, &binding.data, value) {
                report.failed += 1;
                warn!(
                    "⚠️  {:?} '{}' failed (ch:{} id:{}): {}",
                    binding.kind, binding.target, event.channel, event.id, e
                );
            }
        }

        if report.matched == 0 {
            trace!(
                "No binding for ch:{} id:{} cc:{}",
                event.channel,
                event.id,
                event.is_continuous
            );
        } else {
            debug!(
                "ch:{} id:{} v:{} → matched {}, fired {}, failed {}",
                event.channel,
                event.id,
                event.value,
                report.matched,
                report.fired,
                report.failed
            );
        }

        report
    }

    /// Run one action directly, outside the binding table
    ///
    /// Discrete kinds fire regardless of `value`; continuous kinds use the
    /// usual transform of the clamped value.
    pub fn execute(
        &self,
        kind: ActionKind,
        target: &str,
        data: &str,
        value: i32,
    ) -> Result<(), EffectorError> {
        let value = value.clamp(0, MAX_VALUE as i32) as u8;
        let action_value = if kind.is_continuous() {
            kind.transform(value, self.volume_mode())
        } else {
            Some(ActionValue::Trigger)
        };

        match action_value {
            Some(v) => self.invoke(kind, target, data, v),
            None => Ok(()),
        }
    }

    /// Route one transformed value to its effector port
    fn invoke(
        &self,
        kind: ActionKind,
        target: &str,
        data: &str,
        value: ActionValue,
    ) -> Result<(), EffectorError> {
        if kind.requires_target() && target.trim().is_empty() {
            return Err(EffectorError::InvalidRequest(format!(
                "{:?} needs a target",
                kind
            )));
        }

        let e = &self.effectors;
        match (kind, value) {
            (ActionKind::SystemVolume, ActionValue::Fraction(f)) => e.audio.set_volume(f),
            (ActionKind::ObsVolume, ActionValue::Volume(v)) => {
                e.streaming.set_source_volume(target, v)
            }
            (ActionKind::ObsMute, ActionValue::Trigger) => e.streaming.toggle_mute(target),
            (ActionKind::ObsSwitchScene, ActionValue::Trigger) => e.streaming.set_scene(target),
            (ActionKind::MediaPlayPause, ActionValue::Trigger) => {
                e.input.press_media_key(MediaKey::PlayPause)
            }
            (ActionKind::MediaNext, ActionValue::Trigger) => e.input.press_media_key(MediaKey::Next),
            (ActionKind::MediaPrev, ActionValue::Trigger) => e.input.press_media_key(MediaKey::Prev),
            (ActionKind::MediaStop, ActionValue::Trigger) => e.input.press_media_key(MediaKey::Stop),
            (ActionKind::ObsStartStream, ActionValue::Trigger) => e.streaming.start_stream(),
            (ActionKind::ObsStopStream, ActionValue::Trigger) => e.streaming.stop_stream(),
            (ActionKind::ObsStartRecord, ActionValue::Trigger) => e.streaming.start_record(),
            (ActionKind::ObsStopRecord, ActionValue::Trigger) => e.streaming.stop_record(),
            (ActionKind::ObsSaveReplay, ActionValue::Trigger) => e.streaming.save_replay_buffer(),
            (ActionKind::RunProcess, ActionValue::Trigger) => e.process.run_process(target, data),
            (ActionKind::KeyboardKey, ActionValue::Trigger) => e.input.press_key(data),
            (ActionKind::HttpRequest, ActionValue::Trigger) => e.http.send_request(target, data),
            (ActionKind::ObsSetForegroundWindow, ActionValue::Trigger) => {
                match e.window.foreground_window()? {
                    Some(window) => e.streaming.set_source_target(target, &window),
                    None => Err(EffectorError::Backend("no foreground window".to_string())),
                }
            }
            (kind, value) => Err(EffectorError::InvalidRequest(format!(
                "{:?} cannot take {:?}",
                kind, value
            ))),
        }
    }
}
