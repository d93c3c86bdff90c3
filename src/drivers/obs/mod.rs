//! OBS Studio WebSocket Driver
//!
//! Provides integration with OBS Studio via the obs-websocket protocol for:
//! - Input volume and mute
//! - Scene switching
//! - Stream / record / replay buffer control
//! - Window-capture retargeting
//! - Automatic reconnection

mod actions;
mod connection;
mod driver;
mod requests;

pub use driver::ObsDriver;

use super::{ConnectionStatus, Driver, EffectorError, SourceVolume, StatusCallback, StreamingPort};
