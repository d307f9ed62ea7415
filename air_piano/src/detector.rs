//! Hand landmarks from an external MediaPipe process.
//!
//! Launches `python script --max-hands N --min-detection-confidence D
//! --min-tracking-confidence T` and speaks a line-oriented protocol over its
//! stdin/stdout:
//!
//! * child → parent, once: `READY\n`
//! * parent → child, per frame: `width`, `height`, `channels` as little-endian
//!   `u32`, then `width × height × channels` raw RGB bytes
//! * child → parent, per frame: one JSON line
//!   `{"hands":[{"handedness":"Left","score":0.93,"landmarks":[{"x":..,"y":..,"z":..}, ×21]}],"error":null}`
//!
//! One process per camera view, so each keeps its own tracking state.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::Deserialize;

use air_keys::{Frame, Hand, HandDetector, KeysError, NormPoint};

use crate::config::DetectorConfig;

/// Landmarks per hand in the MediaPipe hand model.
const LANDMARKS_PER_HAND: usize = 21;

#[derive(Deserialize, Debug)]
struct LandmarkJson {
    x: f64,
    y: f64,
    #[allow(dead_code)]
    #[serde(default)]
    z: f64,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default)]
    handedness: String,
    score: f32,
    landmarks: Vec<LandmarkJson>,
}

#[derive(Deserialize, Debug)]
struct DetectionJson {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkProcess
// ════════════════════════════════════════════════════════════════════════════

pub struct LandmarkProcess {
    label:     String,
    process:   Child,
    stdin:     ChildStdin,
    stdout:    BufReader<ChildStdout>,
    max_hands: usize,
}

impl LandmarkProcess {
    /// Start the landmark process and wait for its `READY` line.
    pub fn spawn(label: &str, cfg: &DetectorConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        if !cfg.script.exists() {
            anyhow::bail!("landmark script not found at {}", cfg.script.display());
        }
        log::info!("[{}] starting landmark detector: {} {}", label, cfg.python, cfg.script.display());

        let mut process = Command::new(&cfg.python)
            .arg(&cfg.script)
            .arg("--max-hands").arg(cfg.max_hands.to_string())
            .arg("--min-detection-confidence").arg(cfg.min_detection_confidence.to_string())
            .arg("--min-tracking-confidence").arg(cfg.min_tracking_confidence.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to start {}", cfg.python))?;

        let (stdin, stdout) = match (process.stdin.take(), process.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = process.kill();
                let _ = process.wait();
                anyhow::bail!("landmark process has no stdio pipes");
            }
        };

        // Built before the handshake so Drop reaps the child on every failure.
        let mut detector = LandmarkProcess {
            label: label.to_string(),
            process,
            stdin,
            stdout: BufReader::new(stdout),
            max_hands: cfg.max_hands,
        };

        let mut ready = String::new();
        detector.stdout.read_line(&mut ready).context("landmark process closed before READY")?;
        if ready.trim() != "READY" {
            anyhow::bail!("landmark process did not signal ready, got: {:?}", ready.trim());
        }
        log::info!("[{}] landmark detector ready", label);

        Ok(detector)
    }

    fn exchange(&mut self, frame: &Frame) -> std::io::Result<String> {
        self.stdin.write_all(&frame.width().to_le_bytes())?;
        self.stdin.write_all(&frame.height().to_le_bytes())?;
        self.stdin.write_all(&(air_keys::frame::CHANNELS as u32).to_le_bytes())?;
        self.stdin.write_all(frame.data())?;
        self.stdin.flush()?;

        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "landmark process exited",
            ));
        }
        Ok(line)
    }
}

impl HandDetector for LandmarkProcess {
    fn detect(&mut self, frame: &Frame) -> air_keys::Result<Vec<Hand>> {
        let line = self.exchange(frame)
            .map_err(|e| KeysError::Detector(format!("[{}] {}", self.label, e)))?;
        parse_response(&line, self.max_hands)
            .map_err(|e| KeysError::Detector(format!("[{}] {}", self.label, e)))
    }
}

impl Drop for LandmarkProcess {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Response parsing
// ════════════════════════════════════════════════════════════════════════════

/// Decode one response line into at most `max_hands` hands, in detector
/// order, dropping hands with too few landmarks.
///
/// Confidence gating is the detector's job (its detection and tracking
/// thresholds); every hand it reports keeps its position in the list.
///
/// A reported `error` is a soft failure: logged, and treated as no hands.
pub fn parse_response(line: &str, max_hands: usize) -> Result<Vec<Hand>, serde_json::Error> {
    let result: DetectionJson = serde_json::from_str(line.trim())?;
    if let Some(err) = result.error {
        log::warn!("landmark detector error: {}", err);
        return Ok(Vec::new());
    }

    let mut hands = Vec::new();
    for hand in result.hands {
        if hands.len() == max_hands { break; }
        if hand.landmarks.len() < LANDMARKS_PER_HAND {
            log::warn!("expected {} landmarks, got {}", LANDMARKS_PER_HAND, hand.landmarks.len());
            continue;
        }
        let points: Vec<NormPoint> = hand.landmarks.iter()
            .map(|lm| NormPoint::new(lm.x, lm.y))
            .collect();
        if let Some(h) = Hand::from_landmarks(&points) {
            log::trace!("{} hand (score {:.2})", hand.handedness, hand.score);
            hands.push(h);
        }
    }
    Ok(hands)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
