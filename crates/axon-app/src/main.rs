//! AXON demo harness.
//!
//! Drives the input pipeline end to end without hardware: a scripted pad
//! plays a deterministic pattern while every core read is recorded into a
//! movie, then the movie is replayed and checked against the recording.
//! Turbo fire and the save-state hotkey are exercised along the way.
//!
//! Pass a path as the first argument to keep the movie file around;
//! otherwise a temporary file is used and removed on success.

mod synthetic;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use axon_input::{AutoconfProfile, InputContext};
use axon_movie::timestamp_identifier;
use axon_types::binds::BindId;
use axon_types::device::{DeviceClass, ID_ANALOG_X, ID_JOYPAD_MASK, INDEX_ANALOG_LEFT};
use axon_types::keys::{Key, KeyMods};
use axon_types::settings::{InputSettings, TurboSettings};

use synthetic::SyntheticPad;

/// Frames in the demo session.
const FRAMES: u64 = 120;

/// Autoconfig profile for the scripted pad.
const PAD_PROFILE: &str = r#"
device_name = "AXON Synthetic Pad"

[[binds]]
bind = "b"
button = "0"
label = "Cross"

[[binds]]
bind = "a"
button = "1"
label = "Circle"

[[binds]]
bind = "x"
button = "2"
label = "Triangle"

[[binds]]
bind = "l_x_plus"
axis = "+0"

[[binds]]
bind = "l_x_minus"
axis = "-0"
"#;

/// The core reads issued each frame, in a fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameSample {
    mask: u16,
    b: i16,
    stick_x: i16,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (path, keep) = match std::env::args().nth(1) {
        Some(arg) => (PathBuf::from(arg), true),
        None => (std::env::temp_dir().join("axon-demo.movie"), false),
    };

    log::info!("Recording {FRAMES} frames to {}", path.display());
    let recorded = record_session(&path)?;

    let turbo_window = &recorded[46..=90];
    let pulsed = turbo_window.iter().filter(|s| s.b != 0).count();
    log::info!(
        "Turbo held for {} frames, B pulsed on {pulsed} of them",
        turbo_window.len()
    );

    log::info!("Replaying {}", path.display());
    let replayed = replay_session(&path)?;

    if recorded != replayed {
        let frame = recorded
            .iter()
            .zip(&replayed)
            .position(|(a, b)| a != b)
            .unwrap_or(recorded.len().min(replayed.len()));
        bail!("replay diverged from the recording at frame {frame}");
    }
    log::info!("Replay matched all {FRAMES} recorded frames");

    if keep {
        log::info!("Movie kept at {}", path.display());
    } else {
        std::fs::remove_file(&path).ok();
    }
    Ok(())
}

/// A context with the scripted pad on port 0, autoconfigured binds and a
/// fast turbo cycle. Turbo enable goes on the T key since the pad has no
/// button to spare.
fn build_context() -> Result<InputContext> {
    let settings = InputSettings {
        turbo: TurboSettings { period: 6, duty_cycle: 3, ..TurboSettings::default() },
        ..InputSettings::default()
    };
    let mut ctx = InputContext::new(settings);
    ctx.set_joypad(0, Box::new(SyntheticPad::new()));

    let profile = AutoconfProfile::from_toml(PAD_PROFILE).context("parsing the pad profile")?;
    ctx.autoconfigure(&[profile]);

    if let Some(slot) = ctx.binds_mut().configured_mut(0, BindId::TurboEnable) {
        slot.key = Key::T;
    }
    Ok(ctx)
}

/// Keyboard activity scripted into the recording: a turbo stretch and one
/// save-state chord.
fn frontend_events(ctx: &mut InputContext, frame: u64) {
    match frame {
        45 => ctx.keyboard_event(true, Key::T, 0, KeyMods::NONE),
        60 => ctx.keyboard_event(true, Key::F2, 0, KeyMods::NONE),
        61 => ctx.keyboard_event(false, Key::F2, 0, KeyMods::NONE),
        90 => ctx.keyboard_event(false, Key::T, 0, KeyMods::NONE),
        _ => {}
    }
    if ctx.hotkey_pressed(BindId::SaveState) {
        log::info!("Save-state hotkey fired at frame {frame}");
    }
}

/// The fixed per-frame read sequence. Playback substitutes these reads, so
/// record and replay must issue them in the same order.
fn sample_frame(ctx: &mut InputContext) -> FrameSample {
    FrameSample {
        mask: ctx.query(0, DeviceClass::Joypad, 0, ID_JOYPAD_MASK) as u16,
        b: ctx.query(0, DeviceClass::Joypad, 0, BindId::B.index() as u32),
        stick_x: ctx.query(0, DeviceClass::Analog, INDEX_ANALOG_LEFT, ID_ANALOG_X),
    }
}

fn record_session(path: &Path) -> Result<Vec<FrameSample>> {
    let mut ctx = build_context()?;
    let stream = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("creating {}", path.display()))?;
    ctx.start_recording(Box::new(stream), timestamp_identifier())?;

    let mut frames = Vec::with_capacity(FRAMES as usize);
    for frame in 0..FRAMES {
        ctx.poll(None)?;
        frontend_events(&mut ctx, frame);
        ctx.take_key_events();
        frames.push(sample_frame(&mut ctx));
    }
    ctx.stop_movie()?;
    Ok(frames)
}

fn replay_session(path: &Path) -> Result<Vec<FrameSample>> {
    let mut ctx = build_context()?;
    let stream = OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    ctx.start_playback(Box::new(stream))?;

    let mut delivered = 0;
    let mut frames = Vec::with_capacity(FRAMES as usize);
    for _ in 0..FRAMES {
        ctx.poll(None)?;
        delivered += ctx.take_key_events().len();
        frames.push(sample_frame(&mut ctx));
    }
    log::info!("Replay delivered {delivered} keyboard transitions to the core queue");

    // Two polls past the end: the first consumes the final frame epilogue,
    // the second hits end of stream and retires the movie.
    ctx.poll(None)?;
    ctx.poll(None)?;
    if ctx.movie_mode().is_some() {
        bail!("playback did not end after the recorded frames");
    }
    Ok(frames)
}
