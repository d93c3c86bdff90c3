//! Event normalization: raw MIDI frames → canonical events

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::midi::MidiMessage;

/// Highest value a canonical event can carry
pub const MAX_VALUE: u8 = 127;

/// Normalized (channel, id, continuous, value) tuple that bindings match on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// 1-based MIDI channel for hardware events
    pub channel: i32,
    /// Controller number (CC) or note number
    pub id: i32,
    /// true for control change, false for note on
    pub is_continuous: bool,
    /// 0-127
    pub value: u8,
    /// Wall-clock milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl CanonicalEvent {
    /// Build an event, clamping `value` into 0-127
    ///
    /// Hardware and injected events are both built here.
    pub fn new(channel: i32, id: i32, is_continuous: bool, value: u8, timestamp: u64) -> Self {
        Self {
            channel,
            id,
            is_continuous,
            value: value.min(MAX_VALUE),
            timestamp,
        }
    }

    /// (channel, id, continuous) without value or timestamp
    pub fn key(&self) -> (i32, i32, bool) {
        (self.channel, self.id, self.is_continuous)
    }
}

/// Map a parsed MIDI message to a canonical event
///
/// Control change and note on (any velocity) produce events; everything
/// else is ignored.
pub fn normalize(message: &MidiMessage, timestamp: u64) -> Option<CanonicalEvent> {
    match *message {
        MidiMessage::ControlChange { channel, cc, value } => Some(CanonicalEvent::new(
            channel as i32 + 1,
            cc as i32,
            true,
            value,
            timestamp,
        )),
        MidiMessage::NoteOn {
            channel,
            note,
            velocity,
        } => Some(CanonicalEvent::new(
            channel as i32 + 1,
            note as i32,
            false,
            velocity,
            timestamp,
        )),
        _ => None,
    }
}

/// Parse and normalize a raw frame in one step
pub fn normalize_raw(data: &[u8], timestamp: u64) -> Option<CanonicalEvent> {
    MidiMessage::parse(data).and_then(|m| normalize(&m, timestamp))
}

/// Current wall-clock time in milliseconds
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
