//! MIDI output backed by `midir`.

use air_keys::{KeysError, MidiSink, Note, NullSink};

use crate::config::MidiConfig;

const CLIENT_NAME: &str = "air_piano";

#[derive(Debug, thiserror::Error)]
pub enum MidiOpenError {
    #[error("MIDI init error: {0}")]
    Init(String),

    #[error("no MIDI output ports found (start a synthesizer such as `fluidsynth` or `timidity -iA`)")]
    NoPorts,

    #[error("no MIDI output port matches {0:?}")]
    NoMatch(String),

    #[error("failed to connect to {port}: {reason}")]
    Connect { port: String, reason: String },
}

// ════════════════════════════════════════════════════════════════════════════
// MidirSink
// ════════════════════════════════════════════════════════════════════════════

pub struct MidirSink {
    conn:      Option<midir::MidiOutputConnection>,
    port_name: String,
}

impl MidirSink {
    fn send(&mut self, message: &[u8]) -> air_keys::Result<()> {
        let conn = self.conn.as_mut()
            .ok_or_else(|| KeysError::Midi(format!("{} is closed", self.port_name)))?;
        conn.send(message).map_err(|e| KeysError::Midi(e.to_string()))
    }
}

impl MidiSink for MidirSink {
    fn program_change(&mut self, channel: u8, program: u8) -> air_keys::Result<()> {
        self.send(&[0xC0 | (channel & 0x0F), program & 0x7F])
    }
    fn note_on(&mut self, channel: u8, note: Note, velocity: u8) -> air_keys::Result<()> {
        self.send(&[0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F])
    }
    fn note_off(&mut self, channel: u8, note: Note, velocity: u8) -> air_keys::Result<()> {
        self.send(&[0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F])
    }
    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            let _ = conn.close();
            log::info!("closed MIDI port {}", self.port_name);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// open_output: pick a port and connect
// ════════════════════════════════════════════════════════════════════════════

/// Open the configured output, or a [`NullSink`] when `null_output` is set.
pub fn open_output(cfg: &MidiConfig) -> Result<Box<dyn MidiSink>, MidiOpenError> {
    if cfg.null_output {
        log::info!("MIDI output disabled (null_output = true)");
        return Ok(Box::new(NullSink));
    }

    let midi_out = midir::MidiOutput::new(CLIENT_NAME)
        .map_err(|e| MidiOpenError::Init(e.to_string()))?;

    let ports = midi_out.ports();
    if ports.is_empty() {
        return Err(MidiOpenError::NoPorts);
    }
    let names: Vec<String> = ports.iter()
        .map(|p| midi_out.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
        .collect();

    let idx = pick_port(&names, cfg.port.as_deref())?;
    let name = names[idx].clone();
    log::info!("opening MIDI port: {}", name);

    match midi_out.connect(&ports[idx], "air-piano-out") {
        Ok(conn) => Ok(Box::new(MidirSink { conn: Some(conn), port_name: name })),
        Err(e)   => Err(MidiOpenError::Connect { port: name, reason: e.to_string() }),
    }
}

/// Choose a port index from its name list.
///
/// With a hint: first case-insensitive substring match, or an error.
/// Without: the first name that looks like a software synth, else index 0.
pub fn pick_port(names: &[String], hint: Option<&str>) -> Result<usize, MidiOpenError> {
    if names.is_empty() {
        return Err(MidiOpenError::NoPorts);
    }
    if let Some(hint) = hint {
        let hint = hint.to_lowercase();
        return names.iter()
            .position(|n| n.to_lowercase().contains(&hint))
            .ok_or(MidiOpenError::NoMatch(hint));
    }
    let synth = names.iter().position(|n| {
        let n = n.to_lowercase();
        ["fluid", "timidity", "microsoft", "gm", "synth"].iter().any(|s| n.contains(s))
    });
    Ok(synth.unwrap_or(0))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
