//! GrassMidi - MIDI controller automation bridge
//!
//! Turns knob, fader and pad events from a MIDI controller into desktop
//! and OBS Studio actions: system volume, source volume and mute, scene
//! switching, media keys, process launching and HTTP requests.

pub mod api;
pub mod app;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod drivers;
pub mod midi;
pub mod paths;
