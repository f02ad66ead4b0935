use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use ask_core::{update, AppState, Msg};
use ask_logging::{ask_info, ask_warn};

use super::config::{self, AppConfig, DEFAULT_CONFIG_PATH};
use super::effects::EffectRunner;
use super::logging;
use super::ui::commands::{self, UserCommand};
use super::ui::render::TerminalRenderer;

const TICK_INTERVAL: Duration = Duration::from_millis(75);

/// Everything the main loop reacts to.
pub enum LoopEvent {
    Msg(Msg),
    Line(String),
    InputClosed,
}

pub fn run_app() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let (config, config_problem) = match config::load(&config_path) {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };

    if !logging::initialize(config.log_destination, config.log_level) {
        eprintln!("Warning: logging is disabled for this session");
    }
    if let Some(problem) = config_problem {
        ask_warn!("{}; using defaults", problem);
    }
    ask_info!("ask starting against {}", config.client.base_url);

    let (tx, rx) = mpsc::channel::<LoopEvent>();
    let effects =
        EffectRunner::new(config.client, tx.clone()).context("failed to start request engine")?;
    spawn_input_reader(tx.clone());
    spawn_ticker(tx);

    let mut state = AppState::new();
    let mut renderer = TerminalRenderer::new();
    let mut stdout = io::stdout();
    write_frame(&mut stdout, &renderer.render(&state.view()))?;

    while let Ok(event) = rx.recv() {
        match event {
            LoopEvent::Msg(Msg::Tick) => {
                if state.consume_dirty() {
                    write_frame(&mut stdout, &renderer.render(&state.view()))?;
                }
            }
            LoopEvent::Msg(msg) => state = dispatch(state, msg, &effects),
            LoopEvent::Line(line) => {
                let command = commands::parse(&line);
                if command == UserCommand::Quit {
                    break;
                }
                match commands::to_messages(command, &state.view()) {
                    Ok(msgs) => {
                        for msg in msgs {
                            state = dispatch(state, msg, &effects);
                        }
                    }
                    Err(hint) => write_frame(&mut stdout, &format!("{hint}\n"))?,
                }
            }
            LoopEvent::InputClosed => break,
        }
    }

    // Drop any in-flight turn before the runtime goes away.
    let (_, effects_out) = update(state, Msg::ResetClicked);
    effects.run(effects_out);
    ask_info!("ask shutting down");
    Ok(())
}

fn dispatch(state: AppState, msg: Msg, effects: &EffectRunner) -> AppState {
    let (state, out) = update(state, msg);
    effects.run(out);
    state
}

fn write_frame(stdout: &mut io::Stdout, frame: &str) -> io::Result<()> {
    if frame.is_empty() {
        return Ok(());
    }
    let mut lock = stdout.lock();
    lock.write_all(frame.as_bytes())?;
    lock.flush()
}

fn spawn_input_reader(tx: mpsc::Sender<LoopEvent>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(LoopEvent::Line(line)).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    ask_warn!("stdin read failed: {}", err);
                    break;
                }
            }
        }
        let _ = tx.send(LoopEvent::InputClosed);
    });
}

// Background tick to throttle rendering while answers stream in.
fn spawn_ticker(tx: mpsc::Sender<LoopEvent>) {
    thread::spawn(move || {
        while tx.send(LoopEvent::Msg(Msg::Tick)).is_ok() {
            thread::sleep(TICK_INTERVAL);
        }
    });
}
