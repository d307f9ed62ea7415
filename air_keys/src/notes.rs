//! Per-finger note state.
//!
//! [`NoteStateMachine`] owns the record of which notes each finger is
//! sounding.  Each frame it diffs the press set against that record:
//!
//! 1. a pressing finger whose note is not yet held gets a note-on, then the
//!    note is recorded;
//! 2. a finger that stopped pressing gets a note-off for every held note, then
//!    its entry is removed.
//!
//! A finger that keeps pressing while sliding onto another key only ever hits
//! rule 1, so its old note keeps sounding and the held set grows.  That is the
//! intended behaviour for now: notes are added on slide, never replaced.

use std::collections::{BTreeMap, BTreeSet};

use crate::dispatch::{Dispatcher, MidiSink};
use crate::error::Result;
use crate::finger::FingerId;
use crate::layout::Note;
use crate::press::PressSet;

/// Note changes produced by one call to [`NoteStateMachine::apply`] or
/// [`NoteStateMachine::flush`], in emission order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transitions {
    pub started: Vec<(FingerId, Note)>,
    pub stopped: Vec<(FingerId, Note)>,
}

impl Transitions {
    pub fn is_empty(&self) -> bool {
        self.started.is_empty() && self.stopped.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct NoteStateMachine {
    playing: BTreeMap<FingerId, BTreeSet<Note>>,
}

impl NoteStateMachine {
    pub fn new() -> Self { Self::default() }

    /// Notes held by `finger`, if any.
    pub fn held(&self, finger: &FingerId) -> Option<&BTreeSet<Note>> {
        self.playing.get(finger)
    }

    /// All sounding notes across fingers (a note held twice appears once).
    pub fn sounding(&self) -> BTreeSet<Note> {
        self.playing.values().flatten().copied().collect()
    }

    pub fn is_idle(&self) -> bool { self.playing.is_empty() }

    /// Advance one frame.
    ///
    /// On a dispatcher error the state reflects every event sent so far.
    pub fn apply<S: MidiSink>(
        &mut self,
        presses:    &PressSet,
        dispatcher: &mut Dispatcher<S>,
    ) -> Result<Transitions> {
        let mut t = Transitions::default();

        for (&finger, &note) in presses {
            let already = self.playing.get(&finger).is_some_and(|held| held.contains(&note));
            if already { continue; }
            dispatcher.play(note)?;
            log::debug!("note on  {:>3}  {}", note, finger);
            self.playing.entry(finger).or_default().insert(note);
            t.started.push((finger, note));
        }

        let released: Vec<FingerId> = self.playing.keys()
            .filter(|f| !presses.contains_key(f))
            .copied()
            .collect();
        for finger in released {
            self.release(finger, dispatcher, &mut t)?;
        }

        Ok(t)
    }

    /// Shutdown: release every finger unconditionally.
    ///
    /// Keeps going past a failing note-off so that one bad message does not
    /// leave the rest sounding; the first error is returned after the state
    /// has been emptied.
    pub fn flush<S: MidiSink>(&mut self, dispatcher: &mut Dispatcher<S>) -> Result<Transitions> {
        let mut t = Transitions::default();
        let mut first_err = None;

        for (finger, notes) in std::mem::take(&mut self.playing) {
            for note in notes {
                match dispatcher.stop(note) {
                    Ok(()) => {
                        log::debug!("note off {:>3}  {} (flush)", note, finger);
                        t.stopped.push((finger, note));
                    }
                    Err(e) => {
                        log::warn!("note off {} for {} failed during flush: {}", note, finger, e);
                        first_err.get_or_insert(e);
                    }
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None    => Ok(t),
        }
    }

    fn release<S: MidiSink>(
        &mut self,
        finger:     FingerId,
        dispatcher: &mut Dispatcher<S>,
        t:          &mut Transitions,
    ) -> Result<()> {
        let Some(held) = self.playing.get_mut(&finger) else { return Ok(()) };
        while let Some(note) = held.first().copied() {
            dispatcher.stop(note)?;
            log::debug!("note off {:>3}  {}", note, finger);
            held.remove(&note);
            t.stopped.push((finger, note));
        }
        self.playing.remove(&finger);
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{MidiEvent, RecordingSink};
    use crate::error::KeysError;
    use crate::finger::Finger;

    fn dispatcher() -> Dispatcher<RecordingSink> {
        Dispatcher::new(RecordingSink::default(), 0)
    }

    fn f(hand: usize, finger: Finger) -> FingerId { FingerId::new(hand, finger) }

    fn presses(entries: &[(FingerId, Note)]) -> PressSet {
        entries.iter().copied().collect()
    }

    /// Sink that fails every note-off for one specific note.
    #[derive(Default)]
    struct FailOff { bad: Note, log: RecordingSink }

    impl MidiSink for FailOff {
        fn program_change(&mut self, c: u8, p: u8) -> Result<()> { self.log.program_change(c, p) }
        fn note_on(&mut self, c: u8, n: Note, v: u8) -> Result<()> { self.log.note_on(c, n, v) }
        fn note_off(&mut self, c: u8, n: Note, v: u8) -> Result<()> {
            if n == self.bad { return Err(KeysError::Midi("port gone".into())); }
            self.log.note_off(c, n, v)
        }
    }

    #[test]
    fn press_emits_one_note_on() {
        let mut sm = NoteStateMachine::new();
        let mut d = dispatcher();
        let a = f(0, Finger::Index);
        let t = sm.apply(&presses(&[(a, 60)]), &mut d).unwrap();
        assert_eq!(t.started, vec![(a, 60)]);
        assert_eq!(d.sink().notes_on(), vec![60]);
        assert_eq!(sm.held(&a).map(|s| s.len()), Some(1));
    }

    #[test]
    fn repeated_press_is_idempotent() {
        let mut sm = NoteStateMachine::new();
        let mut d = dispatcher();
        let p = presses(&[(f(0, Finger::Index), 60)]);
        for _ in 0..5 {
            sm.apply(&p, &mut d).unwrap();
        }
        assert_eq!(d.sink().notes_on(), vec![60]);
        assert!(d.sink().notes_off().is_empty());
    }

    #[test]
    fn release_emits_note_off_and_clears_entry() {
        let mut sm = NoteStateMachine::new();
        let mut d = dispatcher();
        let a = f(0, Finger::Index);
        sm.apply(&presses(&[(a, 60)]), &mut d).unwrap();
        let t = sm.apply(&PressSet::new(), &mut d).unwrap();
        assert_eq!(t.stopped, vec![(a, 60)]);
        assert_eq!(d.sink().notes_off(), vec![60]);
        assert!(sm.held(&a).is_none());
        assert!(sm.is_idle());
    }

    #[test]
    fn release_only_affects_missing_fingers() {
        let mut sm = NoteStateMachine::new();
        let mut d = dispatcher();
        let a = f(0, Finger::Index);
        let b = f(0, Finger::Middle);
        sm.apply(&presses(&[(a, 60), (b, 62)]), &mut d).unwrap();
        sm.apply(&presses(&[(b, 62)]), &mut d).unwrap();
        assert_eq!(d.sink().notes_off(), vec![60]);
        assert!(sm.held(&b).is_some_and(|s| s.contains(&62)));
    }

    #[test]
    fn slide_while_pressed_adds_note() {
        let mut sm = NoteStateMachine::new();
        let mut d = dispatcher();
        let a = f(0, Finger::Index);
        sm.apply(&presses(&[(a, 60)]), &mut d).unwrap();
        sm.apply(&presses(&[(a, 61)]), &mut d).unwrap();
        assert_eq!(d.sink().notes_on(), vec![60, 61]);
        assert!(d.sink().notes_off().is_empty());
        let held: Vec<Note> = sm.held(&a).unwrap().iter().copied().collect();
        assert_eq!(held, vec![60, 61]);

        // Lifting releases both.
        sm.apply(&PressSet::new(), &mut d).unwrap();
        let mut off = d.sink().notes_off();
        off.sort();
        assert_eq!(off, vec![60, 61]);
    }

    #[test]
    fn hand_reorder_looks_like_new_finger() {
        let mut sm = NoteStateMachine::new();
        let mut d = dispatcher();
        sm.apply(&presses(&[(f(0, Finger::Index), 60)]), &mut d).unwrap();
        // Same physical finger now reported as hand 1.
        sm.apply(&presses(&[(f(1, Finger::Index), 60)]), &mut d).unwrap();
        assert_eq!(
            d.sink().events,
            vec![
                MidiEvent::NoteOn  { channel: 0, note: 60, velocity: 127 },
                MidiEvent::NoteOn  { channel: 0, note: 60, velocity: 127 },
                MidiEvent::NoteOff { channel: 0, note: 60, velocity: 0 },
            ],
        );
    }

    #[test]
    fn flush_stops_every_held_note() {
        let mut sm = NoteStateMachine::new();
        let mut d = dispatcher();
        sm.apply(&presses(&[(f(0, Finger::Index), 40), (f(1, Finger::Thumb), 44)]), &mut d).unwrap();
        d.sink_mut().clear();

        let t = sm.flush(&mut d).unwrap();
        let mut off = d.sink().notes_off();
        off.sort();
        assert_eq!(off, vec![40, 44]);
        assert_eq!(t.stopped.len(), 2);
        assert!(sm.is_idle());
    }

    #[test]
    fn flush_on_idle_is_silent() {
        let mut sm = NoteStateMachine::new();
        let mut d = dispatcher();
        assert!(sm.flush(&mut d).unwrap().is_empty());
        assert!(d.sink().events.is_empty());
    }

    #[test]
    fn flush_continues_past_failures() {
        let mut sm = NoteStateMachine::new();
        let mut d = Dispatcher::new(FailOff { bad: 40, ..Default::default() }, 0);
        sm.apply(&presses(&[(f(0, Finger::Index), 40), (f(0, Finger::Ring), 44)]), &mut d).unwrap();

        assert!(sm.flush(&mut d).is_err());
        assert_eq!(d.sink().log.notes_off(), vec![44]);
        assert!(sm.is_idle());
    }

    #[test]
    fn failed_note_on_leaves_note_unheld() {
        struct Deaf;
        impl MidiSink for Deaf {
            fn program_change(&mut self, _: u8, _: u8) -> Result<()> { Ok(()) }
            fn note_on(&mut self, _: u8, _: Note, _: u8) -> Result<()> {
                Err(KeysError::Midi("no device".into()))
            }
            fn note_off(&mut self, _: u8, _: Note, _: u8) -> Result<()> { Ok(()) }
        }
        let mut sm = NoteStateMachine::new();
        let mut d = Dispatcher::new(Deaf, 0);
        assert!(sm.apply(&presses(&[(f(0, Finger::Index), 60)]), &mut d).is_err());
        assert!(sm.is_idle());
    }

    #[test]
    fn sounding_merges_fingers() {
        let mut sm = NoteStateMachine::new();
        let mut d = dispatcher();
        sm.apply(&presses(&[(f(0, Finger::Index), 60), (f(1, Finger::Index), 60)]), &mut d).unwrap();
        assert_eq!(sm.sounding().into_iter().collect::<Vec<_>>(), vec![60]);
        assert_eq!(sm.held(&f(0, Finger::Index)), Some(&BTreeSet::from([60])));
        assert_eq!(sm.held(&f(1, Finger::Index)), Some(&BTreeSet::from([60])));
    }
}
