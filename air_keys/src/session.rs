//! The frame-driven controller.
//!
//! A [`Session`] owns both views (camera + detector), the press detector, the
//! note state machine, the dispatcher and the display.  Everything runs on the
//! calling thread; per iteration:
//!
//! 1. read the top frame, then the front frame (blocking, sequential)
//! 2. run the detector on each
//! 3. project both into snapshots and fuse them into a press set
//! 4. advance the note state machine (which drives the dispatcher)
//! 5. present the scene, then check for a quit request
//!
//! Whatever ends the loop (quit, capture failure, a collaborator error, or a
//! panic unwinding through the session), [`Session::finalize`] runs exactly
//! once: flush held notes, release both cameras, close MIDI, close the display.

use std::collections::BTreeSet;

use crate::dispatch::{Dispatcher, MidiSink};
use crate::error::Result;
use crate::finger::FingerSnapshot;
use crate::frame::{Frame, FrameSource, HandDetector};
use crate::layout::Note;
use crate::notes::NoteStateMachine;
use crate::press::PressDetector;

// ════════════════════════════════════════════════════════════════════════════
// View: one camera and its detector
// ════════════════════════════════════════════════════════════════════════════

pub struct View {
    pub source:   Box<dyn FrameSource>,
    pub detector: Box<dyn HandDetector>,
}

impl View {
    pub fn new(source: Box<dyn FrameSource>, detector: Box<dyn HandDetector>) -> Self {
        View { source, detector }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Display: rendering + quit signal
// ════════════════════════════════════════════════════════════════════════════

/// Everything the display needs for one frame.  Read-only; nothing flows
/// back into the core.
pub struct Scene<'a> {
    pub top_frame:   &'a Frame,
    pub front_frame: &'a Frame,
    pub top:         &'a FingerSnapshot,
    pub front:       &'a FingerSnapshot,
    pub press:       &'a PressDetector,
    pub sounding:    &'a BTreeSet<Note>,
}

pub trait Display {
    fn show(&mut self, scene: &Scene<'_>) -> Result<()>;

    /// Non-blocking quit check, called once per iteration after `show`.
    fn quit_requested(&mut self) -> bool;

    fn close(&mut self);
}

// ════════════════════════════════════════════════════════════════════════════
// Session
// ════════════════════════════════════════════════════════════════════════════

/// Why the loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// The display asked to quit.
    Quit,
    /// A camera returned no frame.
    CaptureFailed,
}

/// Outcome of one iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    Exit(ExitReason),
}

pub struct Session<S: MidiSink> {
    top:        View,
    front:      View,
    press:      PressDetector,
    notes:      NoteStateMachine,
    dispatcher: Dispatcher<S>,
    display:    Box<dyn Display>,
    /// Resolution the detector's normalised coordinates are scaled to.
    width:      u32,
    height:     u32,
    frames:     u64,
    finalized:  bool,
}

impl<S: MidiSink> Session<S> {
    pub fn new(
        top:        View,
        front:      View,
        press:      PressDetector,
        dispatcher: Dispatcher<S>,
        display:    Box<dyn Display>,
    ) -> Self {
        let width  = press.layout().frame_width();
        let height = press.frame_height().max(0) as u32;
        Session {
            top,
            front,
            press,
            notes: NoteStateMachine::new(),
            dispatcher,
            display,
            width,
            height,
            frames: 0,
            finalized: false,
        }
    }

    pub fn notes(&self)      -> &NoteStateMachine { &self.notes }
    pub fn dispatcher(&self) -> &Dispatcher<S>    { &self.dispatcher }
    pub fn frames(&self)     -> u64               { self.frames }

    /// Run until quit or capture failure, then finalize.
    ///
    /// A loop error takes precedence over a finalizer error in the result.
    pub fn run(&mut self) -> Result<ExitReason> {
        let outcome = self.run_loop();
        let flushed = self.finalize();
        let reason = outcome?;
        flushed?;
        Ok(reason)
    }

    fn run_loop(&mut self) -> Result<ExitReason> {
        loop {
            if let Step::Exit(reason) = self.step()? {
                return Ok(reason);
            }
        }
    }

    /// One iteration of the pipeline.
    pub fn step(&mut self) -> Result<Step> {
        let top_frame   = self.top.source.read();
        let front_frame = self.front.source.read();
        let (top_frame, front_frame) = match (top_frame, front_frame) {
            (Some(top), Some(front)) => (top, front),
            (top, front) => {
                let failed = failed_sources(&[(&top, &self.top), (&front, &self.front)]);
                log::warn!("failed to capture frames from {}; stopping", failed.join(", "));
                return Ok(Step::Exit(ExitReason::CaptureFailed));
            }
        };

        let top_hands   = self.top.detector.detect(&top_frame)?;
        let front_hands = self.front.detector.detect(&front_frame)?;

        let top   = FingerSnapshot::from_hands(&top_hands,   self.width, self.height);
        let front = FingerSnapshot::from_hands(&front_hands, self.width, self.height);

        let presses = self.press.detect(&top, &front);
        self.notes.apply(&presses, &mut self.dispatcher)?;
        self.frames += 1;

        let sounding = self.notes.sounding();
        self.display.show(&Scene {
            top_frame:   &top_frame,
            front_frame: &front_frame,
            top:         &top,
            front:       &front,
            press:       &self.press,
            sounding:    &sounding,
        })?;

        if self.display.quit_requested() {
            return Ok(Step::Exit(ExitReason::Quit));
        }
        Ok(Step::Continue)
    }

    /// Silence everything and release every resource.  Runs once; later
    /// calls return `Ok(())` without doing anything.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized { return Ok(()); }
        self.finalized = true;

        let flushed = self.notes.flush(&mut self.dispatcher).map(|t| t.stopped.len());
        match &flushed {
            Ok(n)  => log::info!("flushed {} held note(s)", n),
            Err(e) => log::warn!("flush incomplete: {}", e),
        }

        self.top.source.release();
        self.front.source.release();
        self.dispatcher.close();
        self.display.close();
        log::info!("session closed after {} frame(s)", self.frames);

        flushed.map(|_| ())
    }
}

/// Names of the cameras whose read came back empty, in read order.
fn failed_sources<'a>(reads: &[(&Option<Frame>, &'a View)]) -> Vec<&'a str> {
    reads.iter()
        .filter(|(frame, _)| frame.is_none())
        .map(|(_, view)| view.source.name())
        .collect()
}

impl<S: MidiSink> Drop for Session<S> {
    fn drop(&mut self) {
        if !self.finalized {
            let _ = self.finalize();
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use crate::dispatch::{MidiEvent, RecordingSink};
    use crate::error::KeysError;
    use crate::finger::{Hand, NormPoint};
    use crate::layout::KeyLayout;

    const W: u32 = 1280;
    const H: u32 = 720;

    /// Shared, ordered log of lifecycle calls across all mocks.
    type Journal = Rc<RefCell<Vec<String>>>;

    /// Camera labels in the order `read` was called.
    type Reads = Rc<RefCell<Vec<&'static str>>>;

    struct ScriptedCamera {
        label:   &'static str,
        frames:  usize,
        journal: Journal,
        reads:   Reads,
    }

    impl FrameSource for ScriptedCamera {
        fn name(&self) -> &str { self.label }
        fn read(&mut self) -> Option<Frame> {
            self.reads.borrow_mut().push(self.label);
            if self.frames == 0 { return None; }
            self.frames -= 1;
            Some(Frame::solid(4, 4, [0, 0, 0]))
        }
        fn release(&mut self) {
            self.journal.borrow_mut().push(format!("release {}", self.label));
        }
    }

    /// Replays one hand list per frame; empty once the script runs out.
    struct ScriptedDetector {
        script: VecDeque<Vec<Hand>>,
        fail_at: Option<usize>,
        calls:   usize,
    }

    impl ScriptedDetector {
        fn new(script: Vec<Vec<Hand>>) -> Self {
            ScriptedDetector { script: script.into(), fail_at: None, calls: 0 }
        }
    }

    impl HandDetector for ScriptedDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Hand>> {
            self.calls += 1;
            if self.fail_at == Some(self.calls) {
                return Err(KeysError::Detector("model crashed".into()));
            }
            Ok(self.script.pop_front().unwrap_or_default())
        }
    }

    struct MockDisplay {
        quit_after: Option<usize>,
        shown:      usize,
        journal:    Journal,
    }

    impl Display for MockDisplay {
        fn show(&mut self, _scene: &Scene<'_>) -> Result<()> {
            self.shown += 1;
            Ok(())
        }
        fn quit_requested(&mut self) -> bool {
            self.quit_after.is_some_and(|n| self.shown >= n)
        }
        fn close(&mut self) {
            self.journal.borrow_mut().push("close display".into());
        }
    }

    /// Sink that records into a shared log and the journal.
    struct JournalSink {
        events:  Rc<RefCell<RecordingSink>>,
        journal: Journal,
    }

    impl MidiSink for JournalSink {
        fn program_change(&mut self, c: u8, p: u8) -> Result<()> {
            self.events.borrow_mut().program_change(c, p)
        }
        fn note_on(&mut self, c: u8, n: Note, v: u8) -> Result<()> {
            self.events.borrow_mut().note_on(c, n, v)
        }
        fn note_off(&mut self, c: u8, n: Note, v: u8) -> Result<()> {
            self.journal.borrow_mut().push(format!("note off {}", n));
            self.events.borrow_mut().note_off(c, n, v)
        }
        fn close(&mut self) {
            self.journal.borrow_mut().push("close midi".into());
        }
    }

    /// Hand with only the index tip placed at pixel `(x, y)`; the other four
    /// tips sit in the top-left corner, outside the key area.  Aimed at the
    /// pixel centre so truncation lands on `(x, y)`.
    fn hand_at(x: i32, y: i32) -> Hand {
        let mut tips = [NormPoint::new(0.0, 0.0); 5];
        tips[1] = NormPoint::new(
            (x as f64 + 0.5) / W as f64,
            (y as f64 + 0.5) / H as f64,
        );
        Hand::new(tips)
    }

    struct Rig {
        session: Session<JournalSink>,
        events:  Rc<RefCell<RecordingSink>>,
        journal: Journal,
        reads:   Reads,
    }

    fn rig(
        frames:     usize,
        top:        Vec<Vec<Hand>>,
        front:      Vec<Vec<Hand>>,
        quit_after: Option<usize>,
    ) -> Rig {
        rig_split((frames, frames), top, front, quit_after)
    }

    /// Like `rig`, with separate frame budgets for the top and front cameras.
    fn rig_split(
        (top_frames, front_frames): (usize, usize),
        top:        Vec<Vec<Hand>>,
        front:      Vec<Vec<Hand>>,
        quit_after: Option<usize>,
    ) -> Rig {
        let journal: Journal = Rc::default();
        let reads: Reads = Rc::default();
        let events: Rc<RefCell<RecordingSink>> = Rc::default();
        let cam = |label, frames| Box::new(ScriptedCamera {
            label,
            frames,
            journal: journal.clone(),
            reads:   reads.clone(),
        });
        let session = Session::new(
            View::new(cam("top", top_frames),     Box::new(ScriptedDetector::new(top))),
            View::new(cam("front", front_frames), Box::new(ScriptedDetector::new(front))),
            PressDetector::standard(KeyLayout::new(W), H),
            Dispatcher::new(JournalSink { events: events.clone(), journal: journal.clone() }, 0),
            Box::new(MockDisplay { quit_after, shown: 0, journal: journal.clone() }),
        );
        Rig { session, events, journal, reads }
    }

    #[test]
    fn press_then_lift_emits_on_then_off() {
        // Frame 1: pushed (front y 450 > 432).  Frame 2: lifted (front y 400).
        let top   = vec![vec![hand_at(100, 550)], vec![hand_at(100, 550)]];
        let front = vec![vec![hand_at(100, 450)], vec![hand_at(100, 400)]];
        let mut r = rig(2, top, front, None);

        assert_eq!(r.session.run().unwrap(), ExitReason::CaptureFailed);
        let ev = r.events.borrow();
        assert_eq!(ev.notes_on(),  vec![25]);
        assert_eq!(ev.notes_off(), vec![25]);
        assert_eq!(r.session.frames(), 2);
    }

    #[test]
    fn shallow_finger_never_sounds() {
        let top   = vec![vec![hand_at(100, 550)]; 3];
        let front = vec![vec![hand_at(100, 432)]; 3];
        let mut r = rig(3, top, front, None);
        r.session.run().unwrap();
        assert!(r.events.borrow().notes_on().is_empty());
    }

    #[test]
    fn quit_flushes_held_notes() {
        let top   = vec![vec![hand_at(100, 550)]];
        let front = vec![vec![hand_at(100, 700)]];
        let mut r = rig(10, top, front, Some(1));

        assert_eq!(r.session.run().unwrap(), ExitReason::Quit);
        let ev = r.events.borrow();
        assert_eq!(ev.notes_on(),  vec![25]);
        assert_eq!(ev.notes_off(), vec![25]);
        assert!(r.session.notes().is_idle());
    }

    #[test]
    fn finalizer_order_is_flush_release_midi_display() {
        let top   = vec![vec![hand_at(100, 550)]];
        let front = vec![vec![hand_at(100, 700)]];
        let mut r = rig(10, top, front, Some(1));
        r.session.run().unwrap();
        assert_eq!(
            *r.journal.borrow(),
            vec!["note off 25", "release top", "release front", "close midi", "close display"],
        );
    }

    #[test]
    fn two_fingers_flushed_on_shutdown() {
        // Two hands: index tips over notes 40 and 44.
        let top   = vec![vec![hand_at(19 * 24, 600), hand_at(23 * 24, 600)]];
        let front = vec![vec![hand_at(0, 700),       hand_at(0, 700)]];
        let mut r = rig(10, top, front, Some(1));
        r.session.run().unwrap();

        let ev = r.events.borrow();
        let mut on = ev.notes_on();
        on.sort();
        assert_eq!(on, vec![40, 44]);
        let mut off = ev.notes_off();
        off.sort();
        assert_eq!(off, vec![40, 44]);
    }

    #[test]
    fn detector_error_still_finalizes() {
        let journal: Journal = Rc::default();
        let events: Rc<RefCell<RecordingSink>> = Rc::default();
        let mut front = ScriptedDetector::new(vec![vec![hand_at(100, 700)]]);
        front.fail_at = Some(2);
        let cam = |label| Box::new(ScriptedCamera {
            label,
            frames:  10,
            journal: journal.clone(),
            reads:   Rc::default(),
        });
        let mut session = Session::new(
            View::new(cam("top"), Box::new(ScriptedDetector::new(vec![vec![hand_at(100, 550)]; 2]))),
            View::new(cam("front"), Box::new(front)),
            PressDetector::standard(KeyLayout::new(W), H),
            Dispatcher::new(JournalSink { events: events.clone(), journal: journal.clone() }, 0),
            Box::new(MockDisplay { quit_after: None, shown: 0, journal: journal.clone() }),
        );

        assert!(matches!(session.run(), Err(KeysError::Detector(_))));
        assert_eq!(events.borrow().notes_off(), vec![25]);
        assert!(journal.borrow().contains(&"close midi".to_string()));
    }

    #[test]
    fn finalize_runs_once() {
        let mut r = rig(0, vec![], vec![], None);
        r.session.finalize().unwrap();
        r.session.finalize().unwrap();
        drop(r.session);
        let j = r.journal.borrow();
        assert_eq!(j.iter().filter(|s| *s == "close midi").count(), 1);
    }

    #[test]
    fn drop_without_run_finalizes() {
        let r = rig(0, vec![], vec![], None);
        let journal = r.journal.clone();
        drop(r);
        assert!(journal.borrow().contains(&"close display".to_string()));
    }

    #[test]
    fn capture_failure_on_first_frame() {
        let mut r = rig(0, vec![], vec![], None);
        assert_eq!(r.session.run().unwrap(), ExitReason::CaptureFailed);
        assert_eq!(r.session.frames(), 0);
        assert!(r.events.borrow().events.is_empty());
    }

    #[test]
    fn front_camera_failure_ends_run_and_flushes() {
        let top   = vec![vec![hand_at(100, 550)]; 3];
        let front = vec![vec![hand_at(100, 450)]; 3];
        let mut r = rig_split((3, 1), top, front, None);

        assert_eq!(r.session.run().unwrap(), ExitReason::CaptureFailed);
        assert_eq!(r.session.frames(), 1);
        assert_eq!(r.events.borrow().notes_on(), vec![25]);
        assert!(r.journal.borrow().contains(&"note off 25".to_string()));
        assert!(r.session.notes().is_idle());
    }

    #[test]
    fn top_camera_failure_still_reads_front_once() {
        let mut r = rig_split((0, 5), vec![], vec![], None);
        assert_eq!(r.session.run().unwrap(), ExitReason::CaptureFailed);
        assert_eq!(*r.reads.borrow(), vec!["top", "front"]);
    }

    #[test]
    fn cameras_read_top_then_front_each_frame() {
        let mut r = rig(2, vec![], vec![], None);
        r.session.run().unwrap();
        assert_eq!(*r.reads.borrow(), vec!["top", "front", "top", "front", "top", "front"]);
    }

    #[test]
    fn failed_capture_names_the_camera() {
        let journal: Journal = Rc::default();
        let view = |label| View::new(
            Box::new(ScriptedCamera { label, frames: 0, journal: journal.clone(), reads: Rc::default() }),
            Box::new(ScriptedDetector::new(vec![])),
        );
        let (top, front) = (view("top"), view("front"));
        let frame = Some(Frame::solid(1, 1, [0, 0, 0]));

        assert_eq!(failed_sources(&[(&frame, &top), (&None, &front)]), vec!["front"]);
        assert_eq!(failed_sources(&[(&None, &top), (&None, &front)]), vec!["top", "front"]);
        assert!(failed_sources(&[(&frame, &top), (&frame, &front)]).is_empty());
    }

    #[test]
    fn program_change_is_not_sent_by_session() {
        let mut r = rig(1, vec![], vec![], None);
        r.session.run().unwrap();
        assert!(!r.events.borrow().events.iter().any(|e| matches!(e, MidiEvent::ProgramChange { .. })));
    }
}
