//! The single writer to the MIDI collaborator.
//!
//! [`MidiSink`] is the device seam; [`Dispatcher`] wraps one and is the only
//! thing in the crate that calls it.  Note-on always carries full velocity,
//! note-off always carries zero.

use crate::error::Result;
use crate::layout::Note;

/// Velocity sent with every note-on.
pub const MAX_VELOCITY: u8 = 127;

/// General MIDI program 0.
pub const ACOUSTIC_GRAND_PIANO: u8 = 0;

// ════════════════════════════════════════════════════════════════════════════
// MidiSink: abstraction over a real port / null / recorder
// ════════════════════════════════════════════════════════════════════════════

pub trait MidiSink {
    fn program_change(&mut self, channel: u8, program: u8) -> Result<()>;
    fn note_on(&mut self,  channel: u8, note: Note, velocity: u8) -> Result<()>;
    fn note_off(&mut self, channel: u8, note: Note, velocity: u8) -> Result<()>;
    /// Close the underlying port.  Further sends are undefined.
    fn close(&mut self) {}
}

impl<S: MidiSink + ?Sized> MidiSink for Box<S> {
    fn program_change(&mut self, channel: u8, program: u8) -> Result<()> {
        (**self).program_change(channel, program)
    }
    fn note_on(&mut self, channel: u8, note: Note, velocity: u8) -> Result<()> {
        (**self).note_on(channel, note, velocity)
    }
    fn note_off(&mut self, channel: u8, note: Note, velocity: u8) -> Result<()> {
        (**self).note_off(channel, note, velocity)
    }
    fn close(&mut self) { (**self).close() }
}

// ── null backend ──────────────────────────────────────────────────────────

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl MidiSink for NullSink {
    fn program_change(&mut self, _ch: u8, _p: u8)           -> Result<()> { Ok(()) }
    fn note_on(&mut self, _ch: u8, _n: Note, _v: u8)        -> Result<()> { Ok(()) }
    fn note_off(&mut self, _ch: u8, _n: Note, _v: u8)       -> Result<()> { Ok(()) }
}

// ── recording backend ─────────────────────────────────────────────────────

/// One message as seen by a [`RecordingSink`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiEvent {
    ProgramChange { channel: u8, program: u8 },
    NoteOn  { channel: u8, note: Note, velocity: u8 },
    NoteOff { channel: u8, note: Note, velocity: u8 },
    Closed,
}

/// Keeps every message in send order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<MidiEvent>,
}

impl RecordingSink {
    pub fn notes_on(&self) -> Vec<Note> {
        self.events.iter()
            .filter_map(|e| match e { MidiEvent::NoteOn { note, .. } => Some(*note), _ => None })
            .collect()
    }

    pub fn notes_off(&self) -> Vec<Note> {
        self.events.iter()
            .filter_map(|e| match e { MidiEvent::NoteOff { note, .. } => Some(*note), _ => None })
            .collect()
    }

    pub fn clear(&mut self) { self.events.clear(); }
}

impl MidiSink for RecordingSink {
    fn program_change(&mut self, channel: u8, program: u8) -> Result<()> {
        self.events.push(MidiEvent::ProgramChange { channel, program });
        Ok(())
    }
    fn note_on(&mut self, channel: u8, note: Note, velocity: u8) -> Result<()> {
        self.events.push(MidiEvent::NoteOn { channel, note, velocity });
        Ok(())
    }
    fn note_off(&mut self, channel: u8, note: Note, velocity: u8) -> Result<()> {
        self.events.push(MidiEvent::NoteOff { channel, note, velocity });
        Ok(())
    }
    fn close(&mut self) {
        self.events.push(MidiEvent::Closed);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Dispatcher
// ════════════════════════════════════════════════════════════════════════════

pub struct Dispatcher<S: MidiSink> {
    sink:    S,
    channel: u8,
    closed:  bool,
}

impl<S: MidiSink> Dispatcher<S> {
    pub fn new(sink: S, channel: u8) -> Self {
        Dispatcher { sink, channel: channel & 0x0F, closed: false }
    }

    /// Build a dispatcher and select `program` on its channel.
    pub fn with_program(sink: S, channel: u8, program: u8) -> Result<Self> {
        let mut d = Self::new(sink, channel);
        d.sink.program_change(d.channel, program & 0x7F)?;
        Ok(d)
    }

    pub fn channel(&self) -> u8 { self.channel }

    /// Note-on at full velocity.
    pub fn play(&mut self, note: Note) -> Result<()> {
        self.sink.note_on(self.channel, note, MAX_VELOCITY)
    }

    /// Note-off with zero velocity.
    pub fn stop(&mut self, note: Note) -> Result<()> {
        self.sink.note_off(self.channel, note, 0)
    }

    /// Close the sink once; later calls do nothing.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.sink.close();
        }
    }

    pub fn sink(&self) -> &S { &self.sink }
    pub fn sink_mut(&mut self) -> &mut S { &mut self.sink }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
