use super::*;
use crate::ast::{Letter, PitchSpec};
use crate::engine::{OfflineSpec, SampleBuffer, SoundEngine, SoundProducer};
use crate::error::PlayerError;
use crate::instrument::{InstrumentConfig, SynthKind};
use crate::timeline::Cue;
use std::cell::RefCell;
use std::rc::Rc;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
struct Trigger {
    producer: usize,
    pitch: PitchSpec,
    length: f64,
    at_time: f64,
}

#[derive(Debug, Default)]
struct EngineLog {
    triggers: Vec<Trigger>,
    created: Vec<SynthKind>,
    released: Vec<usize>,
    disposed: Vec<usize>,
    volumes: Vec<(usize, f64)>,
    activation_requests: usize,
}

struct MockEngine {
    log: Rc<RefCell<EngineLog>>,
    ready: bool,
    fail_on: Option<PitchSpec>,
    /// Producers that can be created before `create_producer` starts failing
    producer_limit: Option<usize>,
}

impl MockEngine {
    fn new() -> (Self, Rc<RefCell<EngineLog>>) {
        let log = Rc::new(RefCell::new(EngineLog::default()));
        let engine = Self {
            log: log.clone(),
            ready: true,
            fail_on: None,
            producer_limit: None,
        };
        (engine, log)
    }
}

struct MockProducer {
    id: usize,
    log: Rc<RefCell<EngineLog>>,
    fail_on: Option<PitchSpec>,
}

impl SoundProducer for MockProducer {
    fn trigger_attack_release(
        &mut self,
        pitches: &[PitchSpec],
        length: f64,
        at_time: f64,
    ) -> Result<(), PlayerError> {
        for pitch in pitches {
            if Some(*pitch) == self.fail_on {
                return Err(PlayerError::Trigger(format!("cannot play {}", pitch)));
            }
            self.log.borrow_mut().triggers.push(Trigger {
                producer: self.id,
                pitch: *pitch,
                length,
                at_time,
            });
        }
        Ok(())
    }

    fn release_all(&mut self) {
        self.log.borrow_mut().released.push(self.id);
    }

    fn set_volume(&mut self, gain: f64) {
        self.log.borrow_mut().volumes.push((self.id, gain));
    }

    fn dispose(&mut self) {
        self.log.borrow_mut().disposed.push(self.id);
    }
}

impl SoundEngine for MockEngine {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn request_activation(&mut self) -> Result<(), PlayerError> {
        self.log.borrow_mut().activation_requests += 1;
        Ok(())
    }

    fn create_producer(
        &mut self,
        config: &InstrumentConfig,
    ) -> Result<Box<dyn SoundProducer>, PlayerError> {
        let mut log = self.log.borrow_mut();
        if Some(log.created.len()) == self.producer_limit {
            return Err(PlayerError::Config(format!(
                "cannot build {:?}",
                config.synth_type
            )));
        }
        log.created.push(config.synth_type);
        Ok(Box::new(MockProducer {
            id: log.created.len() - 1,
            log: self.log.clone(),
            fail_on: self.fail_on,
        }))
    }

    fn enter_offline(&mut self, _spec: OfflineSpec) -> Result<(), PlayerError> {
        Err(PlayerError::Render("not supported".to_string()))
    }

    fn render_offline(&mut self) -> Result<SampleBuffer, PlayerError> {
        Err(PlayerError::Render("not supported".to_string()))
    }

    fn restore_realtime(&mut self) {}
}

fn pitch(letter: Letter) -> PitchSpec {
    PitchSpec::new(letter, 4)
}

fn new_player(engine: MockEngine, clock: &ManualClock) -> Player<MockEngine, ManualClock> {
    Player::new(
        engine,
        clock.clone(),
        InstrumentConfig::default(),
        PlayerOptions::default(),
    )
}

#[test]
fn test_playback_fires_instructions_at_offsets() {
    let (engine, log) = MockEngine::new();
    let clock = ManualClock::new(5.0);
    let mut player = new_player(engine, &clock);

    assert_eq!(player.play("BPM:100\n1-1 2-1 0-2\n").unwrap(), Readiness::Ready);
    assert_eq!(player.state(), PlayerState::Playing);
    assert!((player.session().unwrap().total_duration - 1.0).abs() < EPSILON);

    let events = player.tick();
    assert_eq!(
        events,
        vec![PlayerEvent::Cue {
            cue: Cue::Note(pitch(Letter::C)),
            event_index: 0
        }]
    );

    clock.advance(0.25);
    let events = player.tick();
    assert!(events.contains(&PlayerEvent::Cue {
        cue: Cue::Note(pitch(Letter::D)),
        event_index: 1
    }));
    assert!(events.contains(&PlayerEvent::Progress(0.25)));

    clock.advance(0.25);
    let events = player.tick();
    assert!(events.contains(&PlayerEvent::Cue {
        cue: Cue::Rest,
        event_index: 2
    }));
    assert_eq!(player.current_cue(), Some(&Cue::Rest));

    let log = log.borrow();
    assert_eq!(log.triggers.len(), 2);
    assert_eq!(log.triggers[0].pitch, pitch(Letter::C));
    assert!((log.triggers[0].at_time - 5.0).abs() < EPSILON);
    assert!((log.triggers[0].length - 0.25 * 0.95).abs() < EPSILON);
    assert_eq!(log.triggers[1].pitch, pitch(Letter::D));
    assert!((log.triggers[1].at_time - 5.25).abs() < EPSILON);
}

#[test]
fn test_playback_finishes_and_stops() {
    let (engine, _log) = MockEngine::new();
    let clock = ManualClock::new(0.0);
    let mut player = new_player(engine, &clock);

    player.play("1-2 2-2").unwrap();
    clock.advance(0.5);
    player.tick();
    assert_eq!(player.state(), PlayerState::Playing);

    clock.advance(0.75);
    let events = player.tick();
    assert_eq!(
        &events[events.len() - 2..],
        &[PlayerEvent::Progress(1.0), PlayerEvent::Finished]
    );
    assert_eq!(player.state(), PlayerState::Stopped);
    assert_eq!(player.progress(), 0.0);
    assert!(!player.is_polling());
    assert!(player.session().is_none());
}

#[test]
fn test_chord_triggers_share_start_time() {
    let (engine, log) = MockEngine::new();
    let clock = ManualClock::new(0.0);
    let mut player = new_player(engine, &clock);

    player.play("1-2\\3-4").unwrap();
    let events = player.tick();
    assert_eq!(
        events[0],
        PlayerEvent::Cue {
            cue: Cue::Chord(vec![pitch(Letter::C), pitch(Letter::E)]),
            event_index: 0
        }
    );

    let log = log.borrow();
    assert_eq!(log.triggers.len(), 2);
    assert_eq!(log.triggers[0].at_time, log.triggers[1].at_time);
    assert!((log.triggers[0].length - 0.475).abs() < EPSILON);
    assert!((log.triggers[1].length - 0.95).abs() < EPSILON);
}

#[test]
fn test_stop_twice_is_stable() {
    let (engine, _log) = MockEngine::new();
    let clock = ManualClock::new(0.0);
    let mut player = new_player(engine, &clock);

    player.play("1-4 2-4").unwrap();
    clock.advance(0.3);
    player.tick();

    player.stop();
    assert_eq!(player.state(), PlayerState::Stopped);
    assert_eq!(player.position(), 0.0);
    assert!(!player.is_polling());

    player.stop();
    assert_eq!(player.state(), PlayerState::Stopped);
    assert_eq!(player.position(), 0.0);
    assert!(!player.is_polling());
    assert_eq!(player.progress(), 0.0);

    clock.advance(5.0);
    assert!(player.tick().is_empty());
}

#[test]
fn test_pause_resume_keeps_offsets() {
    let (engine, log) = MockEngine::new();
    let clock = ManualClock::new(0.0);
    let mut player = new_player(engine, &clock);

    player.play("1-1 2-1 3-1").unwrap();
    clock.advance(0.3);
    player.tick();
    assert_eq!(log.borrow().triggers.len(), 2);

    player.pause();
    assert_eq!(player.state(), PlayerState::Paused);
    assert!(!player.is_polling());
    assert!((player.position() - 0.3).abs() < EPSILON);

    clock.advance(10.0);
    assert!(player.tick().is_empty());
    assert!((player.position() - 0.3).abs() < EPSILON);
    assert!((player.elapsed() - 0.3).abs() < EPSILON);

    player.resume();
    assert_eq!(player.state(), PlayerState::Playing);
    assert!(player.is_polling());
    let session = *player.session().unwrap();
    assert!((session.start_wall_clock - 10.0).abs() < EPSILON);

    clock.advance(0.25);
    player.tick();

    let log = log.borrow();
    assert_eq!(log.triggers.len(), 3);
    assert_eq!(log.triggers[2].pitch, pitch(Letter::E));
    // score offset 0.5 lands 0.5s after the adjusted start
    assert!((log.triggers[2].at_time - 10.5).abs() < EPSILON);
}

#[test]
fn test_trigger_failure_does_not_abort_schedule() {
    let (mut engine, log) = MockEngine::new();
    engine.fail_on = Some(pitch(Letter::D));
    let clock = ManualClock::new(0.0);
    let mut player = new_player(engine, &clock);

    player.play("1-1 2-1 3-1").unwrap();
    clock.advance(0.6);
    let events = player.tick();

    assert!(events.iter().any(|e| matches!(
        e,
        PlayerEvent::TriggerFailed { pitch: p, .. } if *p == pitch(Letter::D)
    )));
    let played: Vec<_> = log.borrow().triggers.iter().map(|t| t.pitch).collect();
    assert_eq!(played, vec![pitch(Letter::C), pitch(Letter::E)]);
    assert_eq!(player.state(), PlayerState::Playing);
}

#[test]
fn test_deferred_start_runs_exactly_once() {
    let (mut engine, log) = MockEngine::new();
    engine.ready = false;
    let clock = ManualClock::new(0.0);
    let mut player = new_player(engine, &clock);

    assert_eq!(player.play("1-1").unwrap(), Readiness::Pending);
    assert_eq!(player.state(), PlayerState::Stopped);
    assert!(player.has_pending_action());
    assert_eq!(log.borrow().activation_requests, 1);
    assert!(log.borrow().created.is_empty());

    player.engine_mut().ready = true;
    player.on_engine_activated().unwrap();
    assert_eq!(player.state(), PlayerState::Playing);
    assert!(!player.has_pending_action());

    player.on_engine_activated().unwrap();
    assert_eq!(log.borrow().created.len(), 1);
}

#[test]
fn test_activation_that_never_completes_is_not_retried() {
    let (mut engine, log) = MockEngine::new();
    engine.ready = false;
    let clock = ManualClock::new(0.0);
    let mut player = new_player(engine, &clock);

    player.play("1-1").unwrap();
    assert!(matches!(player.on_engine_activated(), Err(PlayerError::NotReady)));
    assert!(!player.has_pending_action());
    assert!(player.on_engine_activated().is_ok());
    assert_eq!(log.borrow().activation_requests, 1);
    assert_eq!(player.state(), PlayerState::Stopped);
}

#[test]
fn test_instrument_switch_reschedules_only_remaining_notes() {
    let (engine, log) = MockEngine::new();
    let clock = ManualClock::new(0.0);
    let mut player = new_player(engine, &clock);

    player.play("1-1 2-1 3-1").unwrap();
    clock.advance(0.3);
    player.tick();

    player
        .set_instrument(InstrumentConfig::builtin("piano").unwrap())
        .unwrap();
    {
        let log = log.borrow();
        assert_eq!(log.created, vec![SynthKind::Synth, SynthKind::AmSynth]);
        assert!(log.released.contains(&0));
        assert_eq!(log.disposed, vec![0]);
    }

    clock.advance(1.0);
    player.tick();

    let log = log.borrow();
    let played: Vec<_> = log.triggers.iter().map(|t| (t.producer, t.pitch)).collect();
    assert_eq!(
        played,
        vec![
            (0, pitch(Letter::C)),
            (0, pitch(Letter::D)),
            (1, pitch(Letter::E)),
        ]
    );
}

#[test]
fn test_failed_instrument_switch_stops_and_keeps_previous_instrument() {
    let (mut engine, log) = MockEngine::new();
    engine.producer_limit = Some(1);
    let clock = ManualClock::new(0.0);
    let mut player = new_player(engine, &clock);

    player.play("1-1 2-1 3-1 4-1").unwrap();
    clock.advance(0.3);
    player.tick();

    let err = player
        .set_instrument(InstrumentConfig::builtin("piano").unwrap())
        .unwrap_err();
    assert!(matches!(err, PlayerError::Config(_)));
    assert_eq!(player.state(), PlayerState::Stopped);
    assert_eq!(player.instrument().synth_type, SynthKind::Synth);
    assert!(player.session().is_none());
    assert_eq!(log.borrow().disposed, vec![0]);

    // nothing left to fire
    clock.advance(1.0);
    assert!(player.tick().is_empty());
    assert_eq!(log.borrow().triggers.len(), 2);

    // replayable once the engine can build producers again
    player.engine_mut().producer_limit = None;
    player.play("5-1").unwrap();
    assert_eq!(player.state(), PlayerState::Playing);
    player.tick();
    let log = log.borrow();
    assert_eq!(log.created, vec![SynthKind::Synth, SynthKind::Synth]);
    let last = log.triggers.last().map(|t| (t.producer, t.pitch));
    assert_eq!(last, Some((1, pitch(Letter::G))));
}

#[test]
fn test_instrument_switch_while_stopped_only_stores_config() {
    let (engine, log) = MockEngine::new();
    let clock = ManualClock::new(0.0);
    let mut player = new_player(engine, &clock);

    let flute = InstrumentConfig::builtin("flute").unwrap();
    player.set_instrument(flute.clone()).unwrap();
    assert!(log.borrow().created.is_empty());
    assert_eq!(player.instrument(), &flute);

    player.play("1-1").unwrap();
    assert_eq!(log.borrow().created, vec![SynthKind::FmSynth]);
}

#[test]
fn test_restart_disposes_previous_producer_first() {
    let (engine, log) = MockEngine::new();
    let clock = ManualClock::new(0.0);
    let mut player = new_player(engine, &clock);

    player.play("1-1").unwrap();
    player.play("2-1").unwrap();

    let log = log.borrow();
    assert_eq!(log.created.len(), 2);
    assert_eq!(log.disposed, vec![0]);
}

#[test]
fn test_toggle_cycles_states() {
    let (engine, _log) = MockEngine::new();
    let clock = ManualClock::new(0.0);
    let mut player = new_player(engine, &clock);

    player.toggle("1-8").unwrap();
    assert_eq!(player.state(), PlayerState::Playing);
    clock.advance(0.5);
    player.toggle("1-8").unwrap();
    assert_eq!(player.state(), PlayerState::Paused);
    player.toggle("1-8").unwrap();
    assert_eq!(player.state(), PlayerState::Playing);
    assert!((player.position() - 0.5).abs() < EPSILON);
}

#[test]
fn test_volume_applies_to_current_and_future_producers() {
    let (engine, log) = MockEngine::new();
    let clock = ManualClock::new(0.0);
    let mut player = new_player(engine, &clock);

    player.play("1-1").unwrap();
    player.set_volume(0.5);
    player.play("1-1").unwrap();

    let volumes = log.borrow().volumes.clone();
    assert_eq!(volumes, vec![(0, 0.8), (0, 0.5), (1, 0.5)]);
}

#[test]
fn test_empty_score_finishes_on_first_poll() {
    let (engine, _log) = MockEngine::new();
    let clock = ManualClock::new(0.0);
    let mut player = new_player(engine, &clock);

    player.play("   \n").unwrap();
    assert_eq!(player.state(), PlayerState::Playing);
    clock.advance(0.1);
    let events = player.tick();
    assert_eq!(events, vec![PlayerEvent::Progress(1.0), PlayerEvent::Finished]);
}

#[test]
fn test_format_time() {
    assert_eq!(format_time(0.0), "00:00");
    assert_eq!(format_time(59.99), "00:59");
    assert_eq!(format_time(61.0), "01:01");
    assert_eq!(format_time(-3.0), "00:00");
}
