//! Command loop for an interactive shell.
//!
//! A shell that reacts to user input (drag, click, double-click) sends
//! [`Command`]s to a [`Controller`] instead of calling the session
//! directly. Commands are applied strictly in arrival order. A merge takes
//! its snapshot in that order too, then runs in a task of its own so later
//! edits are applied while it is in flight.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::error::{PdfCollateError, Result};
use crate::merge::Merger;
use crate::session::{Command, Session};

/// Commands buffered before senders wait.
const COMMAND_BUFFER: usize = 256;

/// Spawns the command loop.
pub struct Controller;

impl Controller {
    /// Start a command loop for `session` on the current tokio runtime.
    ///
    /// Outcomes are reported through the session's events; failed collection
    /// commands are logged and the loop keeps going.
    pub fn spawn(session: Session, merger: Arc<Merger>) -> ControllerHandle {
        let (sender, mut commands) = mpsc::channel::<Command>(COMMAND_BUFFER);

        let task = tokio::spawn(async move {
            let mut merges = JoinSet::new();

            while let Some(command) = commands.recv().await {
                match command {
                    Command::StartMerge => {
                        // Rejections have already been reported as events.
                        let Ok(prepared) = merger.prepare(&session).await else {
                            continue;
                        };
                        let session = session.clone();
                        let merger = merger.clone();
                        merges.spawn(async move {
                            // Failures have already been reported as events.
                            let _ = merger.run(&session, prepared).await;
                        });
                    }
                    command => {
                        let name = command.name();
                        if let Err(e) = session.apply(command).await {
                            warn!(command = name, error = %e, "command failed");
                        }
                    }
                }

                while merges.try_join_next().is_some() {}
            }

            debug!(in_flight = merges.len(), "command channel closed");
            while merges.join_next().await.is_some() {}
        });

        ControllerHandle { sender, task }
    }
}

/// Handle to a running command loop.
#[derive(Debug)]
pub struct ControllerHandle {
    sender: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl ControllerHandle {
    /// Queue a command.
    ///
    /// # Errors
    ///
    /// Fails only if the loop has stopped.
    pub async fn send(&self, command: Command) -> Result<()> {
        self.sender
            .send(command)
            .await
            .map_err(|e| PdfCollateError::other(format!("controller stopped, dropped {}", e.0.name())))
    }

    /// A sender for other tasks to queue commands with.
    pub fn sender(&self) -> mpsc::Sender<Command> {
        self.sender.clone()
    }

    /// Stop accepting commands and wait for queued commands and running
    /// merges to finish.
    ///
    /// Clones obtained from [`sender`](Self::sender) keep the loop alive
    /// until they are dropped.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.sender);
        self.task
            .await
            .map_err(|e| PdfCollateError::other(format!("controller task failed: {e}")))
    }
}
