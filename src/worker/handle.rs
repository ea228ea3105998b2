//! Background worker thread

use crate::error::{IngestError, Result};
use crate::worker::config::IngestConfig;
use crate::worker::dispatch::{Dispatcher, ReplySink};
use crate::worker::protocol::{Command, Reply};
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};

/// Entry point for starting workers
pub struct Worker;

impl Worker {
    /// Start a worker on its own OS thread
    ///
    /// The thread runs a single-threaded runtime and processes commands one
    /// at a time in arrival order. Workers share no state.
    pub fn spawn(config: IngestConfig) -> Result<WorkerHandle> {
        config.validate()?;

        let (command_tx, command_rx) = mpsc::unbounded_channel::<Command>();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel::<Reply>();
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("ingest-worker".to_string())
            .spawn(move || {
                let replies = ReplySink::new(reply_tx);

                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        replies.send(Reply::feedback(format!("Worker failed to start: {}", e)));
                        return;
                    }
                };

                runtime.block_on(async move {
                    let dispatcher = Dispatcher::new(config, replies);
                    tokio::select! {
                        _ = dispatcher.run(command_rx) => {
                            log::debug!("Worker finished");
                        }
                        _ = kill_rx => {
                            log::warn!("Worker terminated");
                        }
                    }
                });
            })
            .map_err(|e| IngestError::session_error(format!("Failed to spawn worker: {}", e)))?;

        Ok(WorkerHandle {
            commands: Some(command_tx),
            replies: reply_rx,
            kill: Some(kill_tx),
            thread: Some(thread),
        })
    }
}

/// Controlling side of a worker
pub struct WorkerHandle {
    commands: Option<mpsc::UnboundedSender<Command>>,
    replies: mpsc::UnboundedReceiver<Reply>,
    kill: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Queue a command
    pub fn send(&self, command: Command) -> Result<()> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| IngestError::session_error("Worker is stopped"))?;

        commands
            .send(command)
            .map_err(|_| IngestError::session_error("Worker is no longer running"))
    }

    /// Decode and queue a JSON command
    pub fn send_json(&self, json: &str) -> Result<()> {
        self.send(Command::from_json(json)?)
    }

    /// Stop accepting commands; queued commands still run
    pub fn close(&mut self) {
        self.commands.take();
    }

    /// Wait for the next reply; `None` once the worker has stopped and
    /// every reply has been received
    pub async fn recv(&mut self) -> Option<Reply> {
        self.replies.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Reply> {
        self.replies.try_recv().ok()
    }

    /// Blocking variant of [`recv`](Self::recv) for callers outside a runtime
    pub fn blocking_recv(&mut self) -> Option<Reply> {
        self.replies.blocking_recv()
    }

    /// Finish queued commands, stop the worker and return the replies not
    /// yet received
    pub fn shutdown(mut self) -> Result<Vec<Reply>> {
        self.commands.take();
        self.join()?;
        Ok(self.drain())
    }

    /// Stop the worker at its next suspension point, abandoning any
    /// in-flight command
    pub fn terminate(mut self) -> Result<Vec<Reply>> {
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
        self.commands.take();
        self.join()?;
        Ok(self.drain())
    }

    fn join(&mut self) -> Result<()> {
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| IngestError::session_error("Worker thread panicked"))?;
        }
        Ok(())
    }

    fn drain(&mut self) -> Vec<Reply> {
        let mut replies = Vec::new();
        while let Ok(reply) = self.replies.try_recv() {
            replies.push(reply);
        }
        replies
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
        self.commands.take();
        let _ = self.join();
    }
}
