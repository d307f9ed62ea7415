//! # air_piano
//!
//! A virtual piano played in the air: two fixed cameras watch the player's
//! fingertips and a MIDI synthesizer sounds the keys they press.
//!
//! * **Top view**: which key each fingertip is over.
//! * **Front view**: whether it is pushed down (vertical position past a
//!   threshold line).
//!
//! Press detection and note bookkeeping live in [`air_keys`]; this crate
//! supplies the cameras, the landmark detector, MIDI output and the windows.
//!
//! ## Feature flags
//!
//! * (default): **Simulation mode**: synthetic frames and a mouse-driven
//!   hand.  Hover over the key area in "Top View" and hold the left mouse
//!   button to press the key under the cursor.
//! * `camera`: **Hardware mode**: two cameras via `nokhwa` plus the
//!   MediaPipe landmark process in `tools/hand_landmarks.py`.
//!
//! ## Keys
//!
//! | Key | Action |
//! |---|---|
//! | `Q` | Quit (all held notes are released first) |

pub mod config;
pub mod midi;
pub mod detector;
pub mod sim;
pub mod canvas;
pub mod visualizer;
#[cfg(feature = "camera")]
pub mod camera;
pub mod app;
