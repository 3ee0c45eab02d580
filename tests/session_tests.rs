//! Session configuration, live control and lifecycle.

mod helpers;

use cadenza::prelude::*;
use cadenza::{Error, StandardKind};
use helpers::tolerances::*;
use helpers::*;
use std::thread;

const CONFIG: &str = r#"
dialect = "relative"
pitch_standard = "scientific"

[engine]
sample_rate = 8000.0
channels = 1
block_size = 100

[[tempo]]
beat = 0
bpm = 60.0

[[tempo]]
beat = "1/2"
bpm = 120.0
"#;

#[test]
fn test_session_from_toml() {
    init_tracing();
    let config = SessionConfig::from_toml_str(CONFIG).unwrap();
    assert_eq!(config.pitch_standard, StandardKind::Scientific);
    assert_eq!(config.tempo.len(), 2);

    let mut session = Session::builder()
        .config(config)
        .notation("1 1")
        .build(frequency_instrument())
        .unwrap();
    assert_eq!(session.engine_config().sample_rate, 8000.0);

    // Half a beat at 60 bpm, then another half at 120 bpm, then a full beat
    // at 120 bpm: 0.5 s + 0.25 s, then 0.5 s.
    let samples = render_to_end(&mut session);
    assert_eq!(samples.len(), 10000);
    assert_constant(&samples, 0..10000, 256.0, FLOAT_EPSILON);
}

#[test]
fn test_builder_tempo_appends_to_loaded_config() {
    let config = SessionConfig::from_toml_str(CONFIG).unwrap();
    let session = Session::builder()
        .config(config)
        .tempo(Beat::from_integer(4), 30.0)
        .build(frequency_instrument())
        .unwrap();
    assert_eq!(session.metronome().len(), 3);
    assert_eq!(session.metronome().tempo_at(Beat::from_integer(5)).unwrap(), 30.0);
}

#[test]
fn test_invalid_toml_is_a_config_error() {
    let err = SessionConfig::from_toml_str("[engine]\nsample_rate = \"fast\"").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().starts_with("Config:"));
}

#[test]
fn test_out_of_range_engine_config() {
    let err = SessionConfig::from_toml_str("[engine]\nsample_rate = 100.0").unwrap_err();
    assert!(matches!(err, Error::Core(cadenza::core::Error::InvalidConfig(_))));
}

#[test]
fn test_syntax_error_position_survives_wrapping() {
    let err = Session::builder()
        .notation("1 2\n3 ?")
        .build(frequency_instrument())
        .unwrap_err();
    match err {
        Error::Notation(cadenza::notation::Error::Syntax(syntax)) => {
            assert_eq!(syntax.position.line, 2);
            assert_eq!(syntax.position.column, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_handle_from_another_thread() {
    let mut session = frequency_session("");
    assert!(session.is_finished());

    let handle = session.handle();
    thread::spawn(move || {
        let tone = Tone::new(Timestamp::ZERO, Duration::from_seconds(0.05), 440.0);
        handle.add_tone(tone).unwrap();
    })
    .join()
    .unwrap();

    assert!(!session.is_finished());
    let samples = render_to_end(&mut session);
    assert_eq!(samples.len(), 400);
    assert_constant(&samples, 0..400, A4, FREQUENCY_EPSILON);
}

#[test]
fn test_handle_clear_silences() {
    let mut session = frequency_session("1,4");
    let first = render_blocks(&mut session, 1);
    assert_constant(&first, 0..FREQUENCY_BLOCK_SIZE, C4, FREQUENCY_EPSILON);

    session.handle().clear().unwrap();
    let second = render_blocks(&mut session, 1);
    assert_silence(&second, SILENCE_THRESHOLD);
    assert!(session.is_finished());
}

#[test]
fn test_handle_outliving_session_reports_disconnect() {
    let session = frequency_session("");
    let handle = session.handle();
    drop(session);

    let tone = Tone::new(Timestamp::ZERO, Duration::from_seconds(1.0), 440.0);
    assert!(matches!(
        handle.add_tone(tone),
        Err(cadenza::synth::Error::Disconnected)
    ));
}

#[test]
fn test_schedule_mid_playback_and_repeat() {
    let mut session = frequency_session("1");
    render_blocks(&mut session, 40);

    // Starts at the current position, overlapping the rest of the first note.
    assert_eq!(session.schedule("=(3 5),0.5").unwrap(), 2);
    let samples = render_to_end(&mut session);
    assert_eq!(samples.len(), 4000);
    assert_constant(&samples, 0..4000, C4 + E4 + G4, FREQUENCY_EPSILON);
}

#[test]
fn test_failed_schedule_leaves_nothing_queued() {
    let mut session = frequency_session("");
    let err = session.schedule("1 2 9").unwrap_err();
    assert!(matches!(
        err,
        Error::Notation(cadenza::notation::Error::Resolution(_))
    ));

    let samples = render_blocks(&mut session, 1);
    assert_silence(&samples, SILENCE_THRESHOLD);
    assert!(session.is_finished());
}

#[test]
fn test_schedule_overflowing_lengths_is_an_error() {
    let mut session = frequency_session("");
    let err = session.schedule("1,18446744073709551615 1").unwrap_err();
    assert!(matches!(
        err,
        Error::Notation(cadenza::notation::Error::Resolution(
            cadenza::notation::ResolutionError::BeatOverflow { .. }
        ))
    ));
    assert!(session.is_finished());
}

#[test]
fn test_reset_then_schedule_again() {
    let mut session = frequency_session("1 2");
    render_blocks(&mut session, 10);
    session.reset();
    assert!(session.is_finished());
    assert_eq!(session.position(), Timestamp::ZERO);

    session.schedule("6+").unwrap();
    let samples = render_to_end(&mut session);
    assert_eq!(samples.len(), 8000);
    assert_constant(&samples, 0..8000, A4, FREQUENCY_EPSILON);
}
