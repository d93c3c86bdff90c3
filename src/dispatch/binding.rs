//! Binding rules and the immutable binding table
//!
//! Bindings deserialize from both the snake_case config layout and the
//! PascalCase `bindings.json` layout written by earlier GrassMidi releases.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::normalize::CanonicalEvent;

/// Channel value reserved for disabled bindings; no device reports it.
pub const UNUSED_CHANNEL: i32 = -1;

/// What a binding does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ActionKind {
    /// Master output volume of the default playback device
    SystemVolume,
    /// OBS input volume (cubic taper)
    ObsVolume,
    /// Toggle OBS input mute
    ObsMute,
    /// Switch OBS program scene
    ObsSwitchScene,
    MediaPlayPause,
    MediaNext,
    MediaPrev,
    MediaStop,
    ObsStartStream,
    ObsStopStream,
    ObsStartRecord,
    ObsStopRecord,
    ObsSaveReplay,
    /// Launch `target` with `data` as arguments
    RunProcess,
    /// Press the virtual-key code in `data`
    KeyboardKey,
    /// Send an HTTP request to `target`; `data` is `METHOD|BODY`
    HttpRequest,
    /// Point an OBS window-capture input at the current foreground window
    ObsSetForegroundWindow,
}

impl ActionKind {
    /// Every action kind, in declaration order
    pub const ALL: [ActionKind; 17] = [
        ActionKind::SystemVolume,
        ActionKind::ObsVolume,
        ActionKind::ObsMute,
        ActionKind::ObsSwitchScene,
        ActionKind::MediaPlayPause,
        ActionKind::MediaNext,
        ActionKind::MediaPrev,
        ActionKind::MediaStop,
        ActionKind::ObsStartStream,
        ActionKind::ObsStopStream,
        ActionKind::ObsStartRecord,
        ActionKind::ObsStopRecord,
        ActionKind::ObsSaveReplay,
        ActionKind::RunProcess,
        ActionKind::KeyboardKey,
        ActionKind::HttpRequest,
        ActionKind::ObsSetForegroundWindow,
    ];

    /// Continuous kinds follow the control's value; all others fire on press
    pub fn is_continuous(self) -> bool {
        matches!(self, ActionKind::SystemVolume | ActionKind::ObsVolume)
    }

    /// Whether the binding's `target` must be non-empty for this kind
    pub fn requires_target(self) -> bool {
        matches!(
            self,
            ActionKind::ObsVolume
                | ActionKind::ObsMute
                | ActionKind::ObsSwitchScene
                | ActionKind::RunProcess
                | ActionKind::HttpRequest
                | ActionKind::ObsSetForegroundWindow
        )
    }
}

/// One rule mapping a physical control to an action
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Binding {
    /// Device channel (1-16), or [`UNUSED_CHANNEL`]
    #[serde(alias = "Channel")]
    pub channel: i32,
    /// Controller number for CC bindings, note number for button bindings
    #[serde(alias = "Note", alias = "note")]
    pub control: i32,
    /// true = fader/knob (CC), false = button/pad (note)
    #[serde(alias = "IsControlChange", alias = "is_control_change")]
    pub continuous: bool,
    #[serde(rename = "action", alias = "Type")]
    pub kind: ActionKind,
    /// Scene, input name, URL or executable path depending on `kind`
    #[serde(default, alias = "Target")]
    pub target: String,
    /// Secondary payload: HTTP method/body, process arguments, key code
    #[serde(default, alias = "Data")]
    pub data: String,
}

impl Binding {
    pub fn new(channel: i32, control: i32, continuous: bool, kind: ActionKind) -> Self {
        Self {
            channel,
            control,
            continuous,
            kind,
            target: String::new(),
            data: String::new(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }

    /// Exact match on (channel, control, continuous)
    #[inline]
    pub fn matches(&self, event: &CanonicalEvent) -> bool {
        self.channel == event.channel
            && self.control == event.id
            && self.continuous == event.is_continuous
    }
}

/// Ordered, immutable set of bindings
///
/// Tables are never edited in place; a configuration change builds a new
/// table and swaps it in whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingTable {
    bindings: Arc<[Binding]>,
}

impl BindingTable {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self {
            bindings: bindings.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    /// All bindings matching the event, in table order
    pub fn matching<'a>(
        &'a self,
        event: &'a CanonicalEvent,
    ) -> impl Iterator<Item = &'a Binding> + 'a {
        self.bindings.iter().filter(move |b| b.matches(event))
    }
}

impl From<Vec<Binding>> for BindingTable {
    fn from(bindings: Vec<Binding>) -> Self {
        Self::new(bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(channel: i32, id: i32, is_continuous: bool) -> CanonicalEvent {
        CanonicalEvent::new(channel, id, is_continuous, 100, 0)
    }

    #[test]
    fn test_match_requires_all_three_fields() {
        let b = Binding::new(1, 7, true, ActionKind::SystemVolume);

        assert!(b.matches(&event(1, 7, true)));
        assert!(!b.matches(&event(2, 7, true)));
        assert!(!b.matches(&event(1, 8, true)));
        assert!(!b.matches(&event(1, 7, false)));
    }

    #[test]
    fn test_unused_channel_never_matches_device_channels() {
        let b = Binding::new(UNUSED_CHANNEL, 7, true, ActionKind::SystemVolume);
        for ch in 1..=16 {
            assert!(!b.matches(&event(ch, 7, true)));
        }
    }

    #[test]
    fn test_matching_preserves_insertion_order() {
        let table = BindingTable::new(vec![
            Binding::new(1, 1, false, ActionKind::MediaNext),
            Binding::new(1, 2, false, ActionKind::MediaStop),
            Binding::new(1, 1, false, ActionKind::RunProcess).with_target("a"),
            Binding::new(1, 1, false, ActionKind::ObsMute).with_target("Mic"),
        ]);

        let e = event(1, 1, false);
        let kinds: Vec<_> = table.matching(&e).map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActionKind::MediaNext,
                ActionKind::RunProcess,
                ActionKind::ObsMute
            ]
        );
    }

    #[test]
    fn test_deserialize_snake_case_yaml() {
        let yaml = r#"
channel: 1
control: 7
continuous: true
action: ObsVolume
target: Mic/Aux
"#;
        let b: Binding = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(b.kind, ActionKind::ObsVolume);
        assert_eq!(b.target, "Mic/Aux");
        assert_eq!(b.data, "");
    }

    #[test]
    fn test_deserialize_legacy_json() {
        let json = r#"{
            "Channel": 1,
            "Note": 36,
            "IsControlChange": false,
            "Type": "HttpRequest",
            "Target": "http://localhost:8080/hook",
            "Data": "POST|{\"a\":1}"
        }"#;
        let b: Binding = serde_json::from_str(json).unwrap();
        assert_eq!(b.channel, 1);
        assert_eq!(b.control, 36);
        assert!(!b.continuous);
        assert_eq!(b.kind, ActionKind::HttpRequest);
        assert_eq!(b.data, "POST|{\"a\":1}");
    }

    #[test]
    fn test_continuous_kinds() {
        let continuous: Vec<_> = ActionKind::ALL
            .iter()
            .copied()
            .filter(|k| k.is_continuous())
            .collect();
        assert_eq!(
            continuous,
            vec![ActionKind::SystemVolume, ActionKind::ObsVolume]
        );
    }
}
