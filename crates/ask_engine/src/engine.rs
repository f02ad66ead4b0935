use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;

use ask_logging::{ask_debug, ask_info};
use tokio_util::sync::CancellationToken;

use crate::client::{AssistantApi, ClientSettings, ReqwestApi};
use crate::orchestrator::{run_turn, EventSink};
use crate::{EngineError, TurnId};

enum EngineCommand {
    StartTurn { turn: TurnId, question: String },
    CancelTurn { turn: TurnId },
}

type ActiveTurns = Arc<Mutex<HashMap<TurnId, CancellationToken>>>;

/// Owns the IO runtime; turns are started and cancelled through commands.
///
/// Starting a turn cancels every other active turn, so at most one turn's
/// requests are in flight at a time.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn new(settings: ClientSettings, sink: Arc<dyn EventSink>) -> Result<Self, EngineError> {
        let api: Arc<dyn AssistantApi> = Arc::new(ReqwestApi::new(settings)?);
        Self::with_api(api, sink)
    }

    pub fn with_api(
        api: Arc<dyn AssistantApi>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;
        let active: ActiveTurns = Arc::new(Mutex::new(HashMap::new()));

        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                handle_command(&runtime, &api, &sink, &active, command);
            }
            ask_debug!("engine command channel closed");
            cancel_all(&active);
        });

        Ok(Self { cmd_tx })
    }

    pub fn start_turn(&self, turn: TurnId, question: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::StartTurn {
            turn,
            question: question.into(),
        });
    }

    pub fn cancel_turn(&self, turn: TurnId) {
        let _ = self.cmd_tx.send(EngineCommand::CancelTurn { turn });
    }
}

fn handle_command(
    runtime: &tokio::runtime::Runtime,
    api: &Arc<dyn AssistantApi>,
    sink: &Arc<dyn EventSink>,
    active: &ActiveTurns,
    command: EngineCommand,
) {
    match command {
        EngineCommand::StartTurn { turn, question } => {
            cancel_all(active);
            let cancel = CancellationToken::new();
            lock(active).insert(turn, cancel.clone());

            let api = api.clone();
            let sink = sink.clone();
            let active = active.clone();
            runtime.spawn(async move {
                run_turn(api.as_ref(), turn, &question, sink.as_ref(), &cancel).await;
                lock(&active).remove(&turn);
            });
        }
        EngineCommand::CancelTurn { turn } => {
            if let Some(cancel) = lock(active).remove(&turn) {
                ask_info!(turn = turn; "cancel requested");
                cancel.cancel();
            }
        }
    }
}

fn cancel_all(active: &ActiveTurns) {
    for (_, cancel) in lock(active).drain() {
        cancel.cancel();
    }
}

fn lock(active: &ActiveTurns) -> std::sync::MutexGuard<'_, HashMap<TurnId, CancellationToken>> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}
