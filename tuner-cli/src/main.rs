//! # Ukulele Tuner - Terminal Front-End
//!
//! This binary wires the headless tuner core to the terminal. It runs a
//! dedicated audio worker thread for capture and analysis, reads target
//! string selections from stdin, and renders the tuning status and a
//! needle-style deviation gauge per update.
//!
//! ## Architecture
//! - **Main Thread**: rendering and stdin command handling
//! - **Audio Thread**: capture, per-frame analysis, owns the tuning session
//! - **Communication**: Crossbeam channels for thread-safe data exchange
//!
//! The audible in-tune confirmation is the terminal bell, emitted only
//! when the session reports `play_confirmation` (the 2000 ms cooldown is
//! applied inside the core).

use anyhow::{Context, Result};
use cpal::traits::StreamTrait;
use crossbeam_channel::Sender;
use std::io::BufRead;
use std::thread::{self, JoinHandle};
use tuner_core::{
    TuningUpdate, audio,
    config::TunerConfig,
    session::{self, TuningSession, TuningStatus},
    tuning::ReferenceTuning,
};

/// Width of the rendered needle gauge in characters. Odd so the
/// in-tune center column sits exactly in the middle.
const NEEDLE_WIDTH: usize = 41;

/// Commands flowing from the stdin reader into the main loop.
#[derive(Debug, Clone)]
enum Command {
    /// Select a target note (`None` means "match any note").
    Select(Option<String>),
    /// Shut the application down.
    Quit,
}

/// Audio worker thread management structure.
///
/// Handles the dedicated audio processing thread and provides
/// a way to shut it down gracefully.
struct AudioWorker {
    shutdown_tx: Sender<()>,
    selection_tx: Sender<Option<String>>,
    thread_handle: Option<JoinHandle<()>>,
}

fn main() -> Result<()> {
    let config = load_config_from_args()?;
    let tuning = ReferenceTuning::ukulele().clone();

    println!("Ukulele tuner — strings: {}", note_names(&tuning));
    println!("Type a note name (e.g. g4) to select a string, 'any' to match any note, 'quit' to exit.");

    let (update_tx, update_rx) = crossbeam_channel::unbounded::<TuningUpdate>();
    let (command_tx, command_rx) = crossbeam_channel::unbounded::<Command>();

    let mut worker = start_audio_worker(config.clone(), tuning.clone(), update_tx);
    spawn_stdin_reader(command_tx);

    loop {
        crossbeam_channel::select! {
            recv(update_rx) -> msg => match msg {
                Ok(update) => render_update(&update, &config),
                Err(_) => {
                    eprintln!("[MAIN] Audio worker stopped unexpectedly");
                    break;
                }
            },
            recv(command_rx) -> msg => match msg {
                Ok(Command::Select(target)) => {
                    match target.as_deref() {
                        Some(note) if !tuning.contains(note) => {
                            println!("Unknown note '{}'. Strings: {}", note, note_names(&tuning));
                        }
                        Some(note) => {
                            println!("Target string: {}", note);
                            let _ = worker.selection_tx.send(target.clone());
                        }
                        None => {
                            println!("Matching any note.");
                            let _ = worker.selection_tx.send(None);
                        }
                    }
                }
                Ok(Command::Quit) | Err(_) => break,
            },
        }
    }

    eprintln!("[MAIN] Shutting down audio worker...");
    let _ = worker.shutdown_tx.send(());
    if let Some(handle) = worker.thread_handle.take() {
        let _ = handle.join();
    }
    eprintln!("[MAIN] Done");
    Ok(())
}

/// Starts the dedicated audio processing thread.
///
/// The thread starts capture, owns the [`TuningSession`], and loops over
/// {frames, selections, shutdown}. When the analysis falls behind the
/// capture cadence, queued frames are discarded and only the most recent
/// one is processed — stale pitch data is worse than a skipped update.
fn start_audio_worker(
    config: TunerConfig,
    tuning: ReferenceTuning,
    update_tx: Sender<TuningUpdate>,
) -> AudioWorker {
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    let (selection_tx, selection_rx) = crossbeam_channel::unbounded::<Option<String>>();

    let thread_handle = thread::spawn(move || {
        eprintln!("[AUDIO-THREAD] Starting audio thread...");
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Vec<f32>>(4);

        let (stream, sample_rate) = match audio::start_audio_capture(frame_tx) {
            Ok(tuple) => {
                eprintln!("[AUDIO-THREAD] Audio capture started successfully");
                tuple
            }
            Err(e) => {
                eprintln!("[AUDIO-THREAD] Fatal error starting audio: {}", e);
                return;
            }
        };

        let mut session = TuningSession::new(config, tuning);

        loop {
            crossbeam_channel::select! {
                recv(frame_rx) -> msg => match msg {
                    Ok(mut frame) => {
                        // Drop any backlog and analyze only the latest frame.
                        while let Ok(newer) = frame_rx.try_recv() {
                            frame = newer;
                        }
                        if let Some(update) = session.process_frame(&frame, sample_rate) {
                            if update_tx.send(update).is_err() {
                                eprintln!("[AUDIO-THREAD] Update channel closed");
                                break;
                            }
                        }
                    }
                    Err(_) => {
                        eprintln!("[AUDIO-THREAD] Audio channel closed");
                        break;
                    }
                },
                recv(selection_rx) -> msg => match msg {
                    Ok(target) => {
                        eprintln!("[AUDIO-THREAD] Target selection: {:?}", target);
                        session.select_target(target);
                    }
                    Err(_) => break,
                },
                recv(shutdown_rx) -> _ => {
                    eprintln!("[AUDIO-THREAD] Received shutdown signal");
                    break;
                }
            }
        }

        eprintln!("[AUDIO-THREAD] Stopping stream and exiting...");
        if let Err(e) = stream.pause() {
            eprintln!("[AUDIO-THREAD] Error pausing stream: {}", e);
        }
        drop(stream);
        eprintln!("[AUDIO-THREAD] Audio thread finished");
    });

    AudioWorker {
        shutdown_tx,
        selection_tx,
        thread_handle: Some(thread_handle),
    }
}

/// Spawns the stdin reader thread, translating lines into [`Command`]s.
fn spawn_stdin_reader(command_tx: Sender<Command>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            let command = match line.trim().to_uppercase().as_str() {
                "" => continue,
                "QUIT" | "Q" | "EXIT" => Command::Quit,
                "ANY" => Command::Select(None),
                note => Command::Select(Some(note.to_string())),
            };
            let quit = matches!(command, Command::Quit);
            if command_tx.send(command).is_err() || quit {
                break;
            }
        }
    });
}

/// Renders one tuning update: frequency, needle gauge, status line.
///
/// Emits the terminal bell when the session's cooldown-filtered
/// confirmation signal fires.
fn render_update(update: &TuningUpdate, config: &TunerConfig) {
    let angle = session::needle_angle(update.matched.deviation_hz, config);
    let needle = render_needle(angle, config.needle_range_degrees, NEEDLE_WIDTH);
    let status = describe_status(&update.status);
    let bell = if update.play_confirmation { "\x07" } else { "" };
    println!(
        "{:7.1} Hz  (target {:6.2} Hz)  {}  {}{}",
        update.smoothed_frequency, update.matched.target_frequency, needle, status, bell
    );
}

/// Builds a fixed-width gauge with a `|` needle, e.g. `[----|----^--------]`.
///
/// The `^` marks the in-tune center; the needle position maps the
/// clamped angle linearly onto the gauge width.
fn render_needle(angle: f32, range: f32, width: usize) -> String {
    let center = width / 2;
    let offset = (angle / range) * center as f32;
    let position = (center as f32 + offset).round() as usize;
    let position = position.min(width - 1);

    let mut gauge: Vec<char> = vec!['-'; width];
    gauge[center] = '^';
    gauge[position] = '|';
    format!("[{}]", gauge.into_iter().collect::<String>())
}

/// One-line human description of a tuning status, in the product's voice.
fn describe_status(status: &TuningStatus) -> String {
    match status {
        TuningStatus::OffTarget { detected, selected } => {
            format!("Detected: {} — play {}", detected, selected)
        }
        TuningStatus::InTune(note) => format!("{} is in tune!", note),
        TuningStatus::Sharp(note) => format!("{} — Too Sharp → Loosen", note),
        TuningStatus::Flat(note) => format!("{} — Too Flat → Tighten", note),
    }
}

fn note_names(tuning: &ReferenceTuning) -> String {
    tuning
        .notes()
        .iter()
        .map(|note| note.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolves the tuner configuration from the command line.
///
/// * `--config <path>` loads a JSON [`TunerConfig`]
/// * `--init-config <path>` writes the defaults to a JSON file and exits
/// * no arguments: built-in defaults
fn load_config_from_args() -> Result<TunerConfig> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config requires a file path")?;
                return load_config(&path);
            }
            "--init-config" => {
                let path = args.next().context("--init-config requires a file path")?;
                save_config(&TunerConfig::default(), &path)?;
                println!("Wrote default configuration to {}", path);
                std::process::exit(0);
            }
            other => {
                anyhow::bail!("unknown argument '{}'", other);
            }
        }
    }
    Ok(TunerConfig::default())
}

/// Loads a tuner configuration from a JSON file.
fn load_config(path: &str) -> Result<TunerConfig> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path))?;
    let config: TunerConfig = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse config file {}", path))?;
    Ok(config)
}

/// Saves a tuner configuration to a JSON file.
fn save_config(config: &TunerConfig, path: &str) -> Result<()> {
    let json_string = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json_string)
        .with_context(|| format!("failed to write config file {}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needle_centers_on_zero_deviation() {
        let gauge = render_needle(0.0, 45.0, 41);
        // The needle overwrites the center marker when in tune.
        assert_eq!(gauge.chars().nth(1 + 20), Some('|'));
    }

    #[test]
    fn needle_pins_at_range_limits() {
        let sharp = render_needle(45.0, 45.0, 41);
        assert_eq!(sharp.chars().nth(1 + 40), Some('|'));
        let flat = render_needle(-45.0, 45.0, 41);
        assert_eq!(flat.chars().nth(1), Some('|'));
    }

    #[test]
    fn status_lines_match_product_wording() {
        assert_eq!(
            describe_status(&TuningStatus::Sharp("A4".to_string())),
            "A4 — Too Sharp → Loosen"
        );
        assert_eq!(
            describe_status(&TuningStatus::OffTarget {
                detected: "A4".to_string(),
                selected: "C4".to_string(),
            }),
            "Detected: A4 — play C4"
        );
    }
}
