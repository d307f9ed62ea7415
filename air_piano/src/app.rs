//! Wiring: build every collaborator from the configuration, hand them to an
//! [`air_keys::Session`], and run it.

use anyhow::Context;

use air_keys::{Dispatcher, ExitReason, Session, View};

use crate::config::AppConfig;
use crate::midi::open_output;
use crate::visualizer::Visualizer;

/// Run the controller until quit or capture failure.
///
/// The session's finalizer silences held notes and releases the cameras,
/// the MIDI port and both windows whichever way the loop ends.
pub fn run(cfg: AppConfig) -> anyhow::Result<ExitReason> {
    let press = cfg.press_detector();
    log::info!(
        "layout: {} divisions, spacing {}px, key area y ≥ {}, press threshold y > {}",
        press.layout().divisions(),
        press.layout().spacing(),
        press.key_area_top(),
        press.press_threshold(),
    );

    let (top, front, display) = build_views(&cfg)?;

    let sink = open_output(&cfg.midi).context("failed to open MIDI output")?;
    let dispatcher = Dispatcher::with_program(sink, cfg.midi.channel, cfg.midi.program)
        .context("failed to select MIDI program")?;

    let mut session = Session::new(top, front, press, dispatcher, display);
    let reason = session.run()?;
    log::info!("stopped: {:?} after {} frame(s)", reason, session.frames());
    Ok(reason)
}

/// Simulation: synthetic cameras, mouse-driven hand.
#[cfg(not(feature = "camera"))]
fn build_views(cfg: &AppConfig) -> anyhow::Result<(View, View, Box<dyn air_keys::Display>)> {
    use std::cell::Cell;
    use std::rc::Rc;
    use crate::sim::{PointerDetector, SimCamera, SimView};

    log::info!("mode: simulation (hover over Top View, hold the left button to press)");
    let (w, h) = (cfg.frame.width, cfg.frame.height);
    let pointer = Rc::new(Cell::new(Default::default()));

    let top = View::new(
        Box::new(SimCamera::new("sim-top", w, h, [0x30, 0x30, 0x38])),
        Box::new(PointerDetector::new(SimView::Top, pointer.clone(), w, h)),
    );
    let front = View::new(
        Box::new(SimCamera::new("sim-front", w, h, [0x38, 0x30, 0x30])),
        Box::new(PointerDetector::new(SimView::Front, pointer.clone(), w, h)),
    );
    let display = Visualizer::new(w as usize, h as usize, Some(pointer))
        .map_err(anyhow::Error::msg)
        .context("failed to open windows")?;
    Ok((top, front, Box::new(display)))
}

/// Hardware: two cameras, one landmark process per view.
#[cfg(feature = "camera")]
fn build_views(cfg: &AppConfig) -> anyhow::Result<(View, View, Box<dyn air_keys::Display>)> {
    use crate::camera::NokhwaCamera;
    use crate::detector::LandmarkProcess;

    log::info!("mode: cameras (top #{}, front #{})", cfg.camera.top_index, cfg.camera.front_index);
    let (w, h) = (cfg.frame.width, cfg.frame.height);
    let cam = &cfg.camera;

    let top = View::new(
        Box::new(NokhwaCamera::open("top", cam.top_index, w, h, cam.mirror_top)?),
        Box::new(LandmarkProcess::spawn("top", &cfg.detector)?),
    );
    let front = View::new(
        Box::new(NokhwaCamera::open("front", cam.front_index, w, h, cam.mirror_front)?),
        Box::new(LandmarkProcess::spawn("front", &cfg.detector)?),
    );
    let display = Visualizer::new(w as usize, h as usize, None)
        .map_err(anyhow::Error::msg)
        .context("failed to open windows")?;
    Ok((top, front, Box::new(display)))
}
