//! # air_keys
//!
//! Press detection and note bookkeeping for a camera-only piano keyboard.
//!
//! Two fixed cameras watch the player's hands: a **top** view that decides
//! *which* key a fingertip is over, and a **front** view whose vertical
//! coordinate stands in for push depth.  A finger only sounds a note when both
//! views agree.
//!
//! ## Per-frame pipeline
//!
//! ```text
//!  top frame ──► HandDetector ──► FingerSnapshot ─┐
//!                                                 ├─► PressDetector ──► NoteStateMachine ──► Dispatcher ──► MidiSink
//!  front frame ─► HandDetector ──► FingerSnapshot ─┘
//! ```
//!
//! [`session::Session`] drives the loop and owns the finalizer that silences
//! every held note on the way out.
//!
//! No windowing, camera or MIDI-port code lives here; those collaborators are
//! traits ([`frame::FrameSource`], [`frame::HandDetector`],
//! [`session::Display`], [`dispatch::MidiSink`]) implemented by the
//! application crate or by test mocks.

pub mod error;
pub mod layout;
pub mod finger;
pub mod frame;
pub mod press;
pub mod dispatch;
pub mod notes;
pub mod session;

pub use error::{KeysError, Result};
pub use layout::{KeyLayout, Note};
pub use finger::{Finger, FingerId, FingerSnapshot, Hand, NormPoint, PixelPoint};
pub use frame::{Frame, FrameSource, HandDetector};
pub use press::{PressDetector, PressSet};
pub use dispatch::{Dispatcher, MidiEvent, MidiSink, NullSink, RecordingSink};
pub use notes::{NoteStateMachine, Transitions};
pub use session::{Display, ExitReason, Scene, Session, View};
