use std::sync::Arc;

use approx::assert_relative_eq;
use lipsync_core::BlinkDirection;
use lipsync_session::{
    parse_cues, AudioClock, AvatarSession, Component, MorphRig, PlaybackClock, PlaybackCursor,
    SessionConfig, SessionError, VisemeCue,
};
use lipsync_test_fixtures::{configs, cues, rigs, ManualTime, ManualTimer};

fn rig(name: &str) -> MorphRig {
    MorphRig::from_spec(rigs::load(name).expect("rig fixture")).expect("rig")
}

fn cue_fixture(name: &str) -> Vec<VisemeCue> {
    parse_cues(&cues::json(name).expect("cue fixture")).expect("cues")
}

fn session(config: SessionConfig) -> AvatarSession<MorphRig> {
    AvatarSession::new(rig("arkit-head"), config, 0.0)
        .expect("session")
        .with_blink_seed(7, 0.0)
}

fn playback(rate: f64) -> (PlaybackCursor, Arc<AudioClock>) {
    let cursor = PlaybackCursor::new();
    let clock = Arc::new(AudioClock::from(PlaybackClock::new(cursor.clone(), rate)));
    (cursor, clock)
}

fn weight(s: &AvatarSession<MorphRig>, name: &str) -> f32 {
    s.with_rig(|r| r.weight_of(name).expect("target on rig"))
}

#[test]
fn hello_plays_through_on_the_audio_clock() {
    let mut s = session(SessionConfig::default());
    let (cursor, clock) = playback(1000.0);
    assert_eq!(s.play_visemes(clock, &cue_fixture("hello")), 4);

    cursor.set(10);
    s.frame(0.016, 0.0);
    assert_eq!(weight(&s, "viseme_E"), 0.7);

    cursor.set(100);
    s.frame(0.016, 0.0);
    assert_eq!(weight(&s, "viseme_E"), 0.0);
    // No weight on the cue: session default.
    assert_eq!(weight(&s, "viseme_aa"), 0.9);

    cursor.set(250);
    s.frame(0.016, 0.0);
    assert_eq!(weight(&s, "viseme_aa"), 0.0);
    assert_eq!(weight(&s, "viseme_O"), 0.8);

    cursor.set(450);
    s.frame(0.016, 0.0);
    assert!(s.scheduler().expect("bound").is_idle());
    assert!(s.with_rig(|r| r.weights().iter().all(|w| *w == 0.0)));
}

#[test]
fn unknown_cue_ids_are_skipped() {
    let mut s = session(SessionConfig::default());
    let (cursor, clock) = playback(1000.0);
    assert_eq!(s.play_visemes(clock, &cue_fixture("unknown-ids")), 2);
    assert_eq!(s.scheduler().expect("bound").pending_len(), 2);

    cursor.set(0);
    s.frame(0.016, 0.0);
    assert_eq!(weight(&s, "viseme_aa"), 0.9);
}

#[test]
fn playing_on_another_clock_replaces_the_queue() {
    let mut s = session(SessionConfig::default());
    let (_, first) = playback(1000.0);
    let (cursor, second) = playback(1000.0);
    s.play_visemes(first.clone(), &cue_fixture("hello"));
    s.play_visemes(first, &cue_fixture("unknown-ids"));
    assert_eq!(s.scheduler().expect("bound").pending_len(), 6);

    s.play_visemes(second, &[VisemeCue::new("viseme_U", 0.0, 0.1).with_weight(0.4)]);
    assert_eq!(s.scheduler().expect("bound").pending_len(), 1);
    cursor.set(0);
    s.frame(0.016, 0.0);
    assert_eq!(weight(&s, "viseme_U"), 0.4);
}

#[test]
fn blink_runs_alongside_visemes() {
    let cfg = SessionConfig::from_json_str(&configs::json("fast-blink").expect("config"))
        .expect("config parses");
    let mut s = session(cfg);
    let (cursor, clock) = playback(1000.0);
    s.play_visemes(clock, &cue_fixture("hello"));
    cursor.set(100);

    s.frame(0.05, 0.0);
    assert_eq!(weight(&s, "eyeBlinkLeft"), 0.0);
    s.frame(0.05, 0.05);
    assert_relative_eq!(weight(&s, "eyeBlinkLeft"), 0.5);
    s.frame(0.05, 0.10);
    assert_eq!(weight(&s, "eyeBlinkLeft"), 1.0);
    assert_eq!(weight(&s, "eyeBlinkRight"), 1.0);
    assert_eq!(
        s.blink().expect("eyes on rig").direction(),
        BlinkDirection::Opening
    );

    // Cue without weight takes the configured default.
    assert_eq!(weight(&s, "viseme_aa"), 0.75);
}

#[test]
fn emotion_is_composited_with_max() {
    let mut s = session(SessionConfig::default());
    let (cursor, clock) = playback(1000.0);
    s.set_emotion("viseme_aa", 0.5).expect("target exists");
    s.set_emotion("mouthSmileLeft", 0.3).expect("target exists");
    s.play_visemes(clock, &cue_fixture("hello"));

    cursor.set(100);
    s.frame(0.016, 0.0);
    assert_eq!(weight(&s, "viseme_aa"), 0.9);
    assert_eq!(weight(&s, "mouthSmileLeft"), 0.3);

    cursor.set(450);
    s.frame(0.016, 0.0);
    assert_eq!(weight(&s, "viseme_aa"), 0.5);
    assert_eq!(s.component(Component::Viseme)[6], 0.0);

    s.clear_emotion();
    s.frame(0.016, 0.0);
    assert_eq!(weight(&s, "viseme_aa"), 0.0);

    let err = s.set_emotion("browInnerUp", 1.0).unwrap_err();
    assert!(matches!(err, SessionError::UnknownTarget { .. }));
}

#[test]
fn emotion_vector_replaces_the_layer() {
    let mut s = session(SessionConfig::default());
    let mut layer = vec![0.0; 10];
    layer[2] = 0.6;
    s.set_emotion_weights(layer);
    s.frame(0.016, 0.0);
    assert_eq!(weight(&s, "jawOpen"), 0.6);
}

#[test]
fn speak_restarts_the_speech_clock() {
    let time = Arc::new(ManualTime::new(5.0));
    let mut s = AvatarSession::new(rig("arkit-head"), SessionConfig::default(), 0.0)
        .expect("session")
        .with_speech_time_source(time.clone());

    time.advance(1.0);
    assert_eq!(s.speak(&cue_fixture("hello")), 4);
    s.frame(0.016, 0.0);
    assert_eq!(weight(&s, "viseme_E"), 0.7);

    time.advance(0.1);
    s.frame(0.016, 0.0);
    assert_eq!(weight(&s, "viseme_E"), 0.0);
    assert_eq!(weight(&s, "viseme_aa"), 0.9);

    // A new utterance drops the old one and starts from zero again.
    s.speak(&[VisemeCue::new("viseme_O", 0.0, 0.5).with_weight(1.0)]);
    s.frame(0.016, 0.0);
    assert_eq!(weight(&s, "viseme_aa"), 0.0);
    assert_eq!(weight(&s, "viseme_O"), 1.0);
    assert_eq!(s.scheduler().expect("bound").pending_len(), 0);
}

#[test]
fn trigger_uses_configured_weight_and_deferred_release() {
    let cfg = SessionConfig::from_json_str(&configs::json("fast-blink").expect("config"))
        .expect("config parses");
    let timer = Arc::new(ManualTimer::new());
    let time = Arc::new(ManualTime::new(0.0));
    let mut s = AvatarSession::new(rig("arkit-head"), cfg, 0.0)
        .expect("session")
        .with_timer(timer.clone())
        .with_speech_time_source(time);

    s.trigger_viseme("jawOpen", 0.25, None).expect("target exists");
    s.trigger_viseme("viseme_O", 0.25, Some(0.95))
        .expect("target exists");
    s.frame(0.0, 0.0);
    assert_eq!(weight(&s, "jawOpen"), 0.6);
    assert_eq!(weight(&s, "viseme_O"), 0.95);
    assert_eq!(timer.pending(), 2);

    assert_eq!(timer.fire_all(), 2);
    s.frame(0.0, 0.0);
    assert_eq!(weight(&s, "jawOpen"), 0.0);
    assert_eq!(weight(&s, "viseme_O"), 0.0);

    let err = s.trigger_viseme("viseme_TH", 0.1, None).unwrap_err();
    assert_eq!(err.category(), "lookup");
}

#[test]
fn stop_neutralizes_the_mouth_but_keeps_emotion() {
    let mut s = session(SessionConfig::default());
    let (cursor, clock) = playback(1000.0);
    s.set_emotion("mouthSmileRight", 0.4).expect("target exists");
    s.play_visemes(clock, &cue_fixture("overlap"));
    cursor.set(120);
    s.frame(0.016, 0.0);
    assert_eq!(weight(&s, "viseme_aa"), 0.9);
    assert_eq!(weight(&s, "viseme_O"), 0.5);

    s.stop();
    s.frame(0.016, 0.0);
    assert_eq!(weight(&s, "viseme_aa"), 0.0);
    assert_eq!(weight(&s, "viseme_O"), 0.0);
    assert_eq!(weight(&s, "mouthSmileRight"), 0.4);
    assert_eq!(s.scheduler().expect("bound").pending_len(), 0);
}

#[test]
fn dispose_zeroes_everything() {
    let mut s = session(SessionConfig::default());
    let (cursor, clock) = playback(1000.0);
    s.set_emotion("jawOpen", 0.2).expect("target exists");
    s.play_visemes(clock, &cue_fixture("hello"));
    cursor.set(10);
    s.frame(0.016, 0.0);

    s.dispose();
    assert!(s.scheduler().is_none());
    assert!(s.blink().is_none());
    assert!(s.with_rig(|r| r.weights().iter().all(|w| *w == 0.0)));
    assert!(s.component(Component::Emotion).iter().all(|w| *w == 0.0));
}

#[test]
fn swapping_to_a_rig_without_eyes_disables_blink() {
    let mut s = session(SessionConfig::default());
    let (cursor, clock) = playback(1000.0);
    s.play_visemes(clock.clone(), &cue_fixture("hello"));
    cursor.set(100);
    s.frame(0.016, 0.0);

    let old = s.swap_rig(rig("no-eyes"), 0.0);
    assert_eq!(old.name(), "Head_Mesh");
    assert_eq!(old.weight_of("viseme_aa"), Some(0.9));
    assert!(s.blink().is_none());
    assert!(s.scheduler().is_none());
    assert_eq!(s.component(Component::Blink).len(), 3);

    assert_eq!(s.play_visemes(clock, &cue_fixture("hello")), 2);
    s.frame(0.016, 0.0);
    assert_eq!(s.with_rig(|r| r.name().to_string()), "Teeth_Mesh");
    assert_eq!(weight(&s, "viseme_aa"), 0.9);
}

#[test]
fn invalid_config_is_rejected() {
    let mut cfg = SessionConfig::default();
    cfg.core.free_running_sample_rate = 0.0;
    let err = AvatarSession::new(rig("arkit-head"), cfg, 0.0).unwrap_err();
    assert_eq!(err.category(), "config");
}
