//! Dispatch bridge: moves commands from concurrent callers onto the host's
//! single mutation thread and carries each result back to its caller.
//!
//! [`DispatchBridge`] is the cloneable producer side. Any number of async
//! callers submit through it and suspend on a oneshot keyed by a ticket the
//! bridge assigns per submit, so a reused correlation id never picks up
//! another command's result.
//! [`CommandPump`] is the single consumer; whoever owns it (the host loop)
//! drains the queue once per tick, strictly FIFO, never re-entrantly.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandResult, CorrelationId, SessionId};
use crate::error::CommandError;
use crate::host::Host;
use crate::registry::HandlerRegistry;
use crate::session::{SessionError, SessionTable};

type Ticket = u64;

struct Waiter {
    correlation: CorrelationId,
    tx: oneshot::Sender<CommandResult>,
}

struct Queued {
    ticket: Ticket,
    command: Command,
}

struct Channel {
    accepting: bool,
    next_ticket: Ticket,
    queue: VecDeque<Queued>,
    waiters: HashMap<Ticket, Waiter>,
}

struct Shared {
    channel: Mutex<Channel>,
    sessions: Arc<SessionTable>,
}

impl Shared {
    /// Complete a waiting caller, if there still is one.
    fn complete(&self, ticket: Ticket, result: CommandResult) -> bool {
        let waiter = self.channel.lock().waiters.remove(&ticket);
        match waiter {
            Some(waiter) => waiter.tx.send(result).is_ok(),
            None => false,
        }
    }
}

/// Producer handle. Cheap to clone; all clones feed the same queue.
#[derive(Clone)]
pub struct DispatchBridge {
    shared: Arc<Shared>,
}

/// The only consumer of the command queue.
pub struct CommandPump {
    shared: Arc<Shared>,
}

/// What one drain step did. `abandoned` commands also count as executed:
/// they ran, but their caller had already given up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub executed: usize,
    pub skipped: usize,
    pub abandoned: usize,
}

impl DrainReport {
    pub fn is_empty(&self) -> bool {
        self.executed == 0 && self.skipped == 0
    }
}

/// Cleans up after a caller, whether it got its result, timed out, or was
/// dropped mid-await.
struct InFlight<'a> {
    shared: &'a Shared,
    ticket: Ticket,
    session: SessionId,
    correlation: CorrelationId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.shared.channel.lock().waiters.remove(&self.ticket);
        self.shared.sessions.untrack(&self.session, &self.correlation);
    }
}

impl DispatchBridge {
    pub fn new(sessions: Arc<SessionTable>) -> (DispatchBridge, CommandPump) {
        let shared = Arc::new(Shared {
            channel: Mutex::new(Channel {
                accepting: true,
                next_ticket: 0,
                queue: VecDeque::new(),
                waiters: HashMap::new(),
            }),
            sessions,
        });
        (
            DispatchBridge {
                shared: Arc::clone(&shared),
            },
            CommandPump { shared },
        )
    }

    pub fn sessions(&self) -> &Arc<SessionTable> {
        &self.shared.sessions
    }

    /// Queue `command` for the host thread and wait at most `deadline` for its
    /// result. A timed-out command stays queued and may still run; its late
    /// result is dropped.
    pub async fn submit(&self, mut command: Command, deadline: Duration) -> CommandResult {
        if command.correlation_id.is_empty() {
            command.correlation_id = CorrelationId::generate();
        }
        let correlation = command.correlation_id.clone();
        let session = command.session_id.clone();
        let command_type = command.command_type.clone();

        let (ticket, rx) = match self.enqueue(command) {
            Ok(queued) => queued,
            Err(e) => {
                debug!(command = %command_type, correlation = %correlation, error = %e, "submit rejected");
                return CommandResult::failure(correlation, e);
            }
        };
        let _in_flight = InFlight {
            shared: &self.shared,
            ticket,
            session,
            correlation: correlation.clone(),
        };
        debug!(command = %command_type, correlation = %correlation, "command queued");

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => CommandResult::failure(
                correlation,
                CommandError::host_unavailable("The host dropped the command"),
            ),
            Err(_) => {
                warn!(command = %command_type, correlation = %correlation, deadline_ms = deadline.as_millis(), "command timed out");
                CommandResult::failure(correlation, CommandError::timeout(deadline))
            }
        }
    }

    fn enqueue(
        &self,
        command: Command,
    ) -> Result<(Ticket, oneshot::Receiver<CommandResult>), CommandError> {
        let session = &command.session_id;
        let correlation = &command.correlation_id;
        self.shared
            .sessions
            .track(session, correlation)
            .map_err(|e| match e {
                SessionError::NotOpen(id) => CommandError::session_closed(id),
                other => CommandError::invalid_argument(other.to_string()),
            })?;

        let mut channel = self.shared.channel.lock();
        let rejection = if !channel.accepting {
            Some(CommandError::host_unavailable("The host is shutting down"))
        } else if !self.shared.sessions.is_tracked(correlation) {
            // The session was closed between tracking and queueing.
            Some(CommandError::session_closed(session))
        } else if channel
            .queue
            .iter()
            .any(|queued| &queued.command.correlation_id == correlation)
        {
            Some(CommandError::invalid_argument(format!(
                "Correlation id {correlation} is still queued"
            )))
        } else {
            None
        };
        if let Some(e) = rejection {
            drop(channel);
            self.shared.sessions.untrack(session, correlation);
            return Err(e);
        }

        let ticket = channel.next_ticket;
        channel.next_ticket += 1;
        let (tx, rx) = oneshot::channel();
        channel.waiters.insert(
            ticket,
            Waiter {
                correlation: correlation.clone(),
                tx,
            },
        );
        channel.queue.push_back(Queued { ticket, command });
        Ok((ticket, rx))
    }

    /// Close a session. Every caller still waiting on it receives
    /// `SessionClosed`; returns how many were pending.
    pub fn close_session(&self, id: &SessionId) -> Result<usize, CommandError> {
        let pending = self.shared.sessions.close(id).map_err(|e| match e {
            SessionError::NotOpen(id) => CommandError::session_closed(id),
            other => CommandError::invalid_argument(other.to_string()),
        })?;
        let waiters: Vec<Waiter> = {
            let mut channel = self.shared.channel.lock();
            let tickets: Vec<Ticket> = channel
                .waiters
                .iter()
                .filter(|(_, waiter)| pending.contains(&waiter.correlation))
                .map(|(ticket, _)| *ticket)
                .collect();
            tickets
                .iter()
                .filter_map(|ticket| channel.waiters.remove(ticket))
                .collect()
        };
        for waiter in waiters {
            let _ = waiter.tx.send(CommandResult::failure(
                waiter.correlation,
                CommandError::session_closed(id),
            ));
        }
        Ok(pending.len())
    }

    /// Stop accepting work, clear the queue, and fail every waiting caller
    /// with `HostUnavailable`. Idempotent.
    pub fn shutdown(&self) {
        let (dropped, waiters) = {
            let mut channel = self.shared.channel.lock();
            if !channel.accepting {
                return;
            }
            channel.accepting = false;
            let dropped = channel.queue.len();
            channel.queue.clear();
            (dropped, std::mem::take(&mut channel.waiters))
        };
        let failed = waiters.len();
        for waiter in waiters.into_values() {
            let _ = waiter.tx.send(CommandResult::failure(
                waiter.correlation,
                CommandError::host_unavailable("The host is shutting down"),
            ));
        }
        info!(dropped, failed, "dispatch bridge shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        !self.shared.channel.lock().accepting
    }

    pub fn queued(&self) -> usize {
        self.shared.channel.lock().queue.len()
    }

    pub fn in_flight(&self) -> usize {
        self.shared.channel.lock().waiters.len()
    }
}

impl CommandPump {
    /// Run the commands that were queued when this call began, in order.
    /// Commands queued while draining wait for the next tick.
    pub fn drain(&mut self, registry: &HandlerRegistry, host: &mut dyn Host) -> DrainReport {
        let mut report = DrainReport::default();
        let budget = self.shared.channel.lock().queue.len();
        for _ in 0..budget {
            let next = {
                let mut channel = self.shared.channel.lock();
                if !channel.accepting {
                    break;
                }
                channel.queue.pop_front()
            };
            let Some(Queued { ticket, command }) = next else {
                break;
            };

            if !self.shared.sessions.is_open(&command.session_id) {
                report.skipped += 1;
                let session = command.session_id.clone();
                self.shared.complete(
                    ticket,
                    CommandResult::failure(
                        command.correlation_id,
                        CommandError::session_closed(session),
                    ),
                );
                continue;
            }

            let result = registry.dispatch(command, host);
            report.executed += 1;
            let correlation = result.correlation_id.clone();
            if !self.shared.complete(ticket, result) {
                report.abandoned += 1;
                debug!(correlation = %correlation, "late result discarded");
            }
        }
        if !report.is_empty() {
            debug!(
                executed = report.executed,
                skipped = report.skipped,
                abandoned = report.abandoned,
                "drained command queue"
            );
        }
        report
    }

    pub fn is_shut_down(&self) -> bool {
        !self.shared.channel.lock().accepting
    }
}
