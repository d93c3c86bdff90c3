//! MIDI input device
//!
//! Owns the `midir` input connection. The midir callback thread hands each
//! raw frame straight to the dispatcher.

use anyhow::{Context, Result};
use colored::Colorize;
use midir::{Ignore, MidiInput, MidiInputConnection};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::dispatch::Dispatcher;

const CLIENT_NAME: &str = "GrassMidi";

struct Connection {
    port_name: String,
    input: MidiInputConnection<()>,
}

pub struct MidiDevice {
    dispatcher: Arc<Dispatcher>,
    connection: Mutex<Option<Connection>>,
}

/// Pick a port: exact name first, then case-insensitive substring
pub fn select_port(names: &[String], pattern: &str) -> Option<usize> {
    if let Some(idx) = names.iter().position(|n| n == pattern) {
        return Some(idx);
    }
    let pattern = pattern.to_lowercase();
    names
        .iter()
        .position(|n| n.to_lowercase().contains(&pattern))
}

/// Names of all MIDI input ports
pub fn list_inputs() -> Result<Vec<String>> {
    let midi_in = MidiInput::new(CLIENT_NAME).context("Failed to create MIDI input")?;
    Ok(midi_in
        .ports()
        .iter()
        .filter_map(|port| midi_in.port_name(port).ok())
        .collect())
}

/// Print discovered input ports (`--list-ports`)
pub fn print_ports() -> Result<()> {
    let ports = list_inputs()?;
    println!("\n{}", "=== MIDI Input Ports ===".bold());
    if ports.is_empty() {
        println!("  {}", "(none found)".dimmed());
    }
    for (i, name) in ports.iter().enumerate() {
        println!("  {}: {}", i.to_string().cyan(), name);
    }
    println!();
    Ok(())
}

impl MidiDevice {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            connection: Mutex::new(None),
        }
    }

    /// Open the input port matching `pattern`, replacing any open connection
    pub fn connect(&self, pattern: &str) -> Result<String> {
        self.disconnect();

        let mut midi_in = MidiInput::new(CLIENT_NAME).context("Failed to create MIDI input")?;
        midi_in.ignore(Ignore::All);

        let ports = midi_in.ports();
        let names: Vec<String> = ports
            .iter()
            .map(|p| midi_in.port_name(p).unwrap_or_default())
            .collect();
        debug!("Found {} MIDI input ports", names.len());

        let idx = select_port(&names, pattern)
            .ok_or_else(|| anyhow::anyhow!("Input port '{}' not found", pattern))?;
        let port_name = names[idx].clone();

        info!("🎹 Connecting to MIDI input: {}", port_name);

        let dispatcher = Arc::clone(&self.dispatcher);
        let input = midi_in
            .connect(
                &ports[idx],
                "grass-midi-in",
                move |_timestamp, data, _| {
                    dispatcher.normalize_and_dispatch(data);
                },
                (),
            )
            .map_err(|e| anyhow::anyhow!("Failed to connect to input port '{}': {}", port_name, e))?;

        *self.connection.lock() = Some(Connection {
            port_name: port_name.clone(),
            input,
        });

        info!("✅ MIDI input connected: {}", port_name);
        Ok(port_name)
    }

    /// Close the connection; no event is dispatched after this returns
    pub fn disconnect(&self) {
        if let Some(conn) = self.connection.lock().take() {
            conn.input.close();
            info!("🔌 MIDI input disconnected: {}", conn.port_name);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.lock().is_some()
    }

    pub fn connected_name(&self) -> Option<String> {
        self.connection
            .lock()
            .as_ref()
            .map(|c| c.port_name.clone())
    }
}

impl Drop for MidiDevice {
    fn drop(&mut self) {
        self.disconnect();
    }
}
