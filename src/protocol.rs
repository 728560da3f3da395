use anyhow::Result;
use std::io::{BufRead, Write};

use crate::commands::{self, fetch::FetchRequest, push::PushSpec};
use crate::error::Error;
use crate::git::LocalRepository;
use crate::session::Session;
use crate::storage::RemoteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Push,
    Fetch,
}

/// Where the engine is in the command stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    AwaitingCommand,
    /// Inside a run of push or fetch commands, closed by a blank line.
    InBatch(BatchKind),
    Terminated,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Clean,
    Failed,
}

/// Line-driven remote helper state machine.
pub struct Engine<'a, L, R> {
    session: Session<'a, L, R>,
    state: State,
    outcome: Outcome,
}

impl<'a, L, R> Engine<'a, L, R>
where
    L: LocalRepository,
    R: RemoteStore,
{
    pub fn new(session: Session<'a, L, R>) -> Self {
        Engine {
            session,
            state: State::AwaitingCommand,
            outcome: Outcome::Clean,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> State {
        self.state
    }

    /// Consume one input line, write its response and flush.
    ///
    /// Command failures end the session with [`Outcome::Failed`]; only
    /// errors writing the response are returned as `Err`.
    pub fn step<W: Write>(&mut self, line: &str, output: &mut W) -> Result<State> {
        if self.state == State::Terminated {
            return Ok(self.state);
        }

        let line = line.trim_end();
        tracing::debug!("INPUT '{}'", line);
        let parts: Vec<&str> = line.split_whitespace().collect();

        let next = match (self.state, parts.as_slice()) {
            (State::InBatch(kind), []) => {
                tracing::debug!("closing {:?} batch", kind);
                writeln!(output)?;
                State::AwaitingCommand
            }
            (State::AwaitingCommand, []) => State::Terminated,
            (State::AwaitingCommand, ["capabilities"]) => {
                commands::capabilities::handle(output)?;
                State::AwaitingCommand
            }
            (State::AwaitingCommand, ["list"] | ["list", "for-push"]) => {
                commands::list::handle(self.session, output)?;
                State::AwaitingCommand
            }
            (State::AwaitingCommand | State::InBatch(BatchKind::Push), ["push", refspec]) => {
                match PushSpec::parse(refspec) {
                    Ok(spec) => {
                        if commands::push::handle(self.session, output, &spec)? {
                            State::InBatch(BatchKind::Push)
                        } else {
                            self.fail()
                        }
                    }
                    Err(e) => self.protocol_error(e),
                }
            }
            (State::AwaitingCommand | State::InBatch(BatchKind::Fetch), ["fetch", args @ ..]) => {
                match FetchRequest::parse(args) {
                    Ok(request) => match commands::fetch::handle(self.session, &request) {
                        Ok(()) => State::InBatch(BatchKind::Fetch),
                        Err(e) => {
                            tracing::error!("fetch {} failed: {:#}", request.id, e);
                            self.fail()
                        }
                    },
                    Err(e) => self.protocol_error(e),
                }
            }
            _ => self.protocol_error(Error::Protocol(format!(
                "unexpected input '{}' while {:?}",
                line, self.state
            ))),
        };

        output.flush()?;
        self.state = next;
        Ok(next)
    }

    /// Process lines until the session terminates or input runs out.
    pub fn run<B: BufRead, W: Write>(mut self, input: B, output: &mut W) -> Result<Outcome> {
        for line in input.lines() {
            let line = line?;
            if self.step(&line, output)? == State::Terminated {
                break;
            }
        }

        if let State::InBatch(kind) = self.state {
            tracing::warn!("input ended inside an open {:?} batch", kind);
        }
        Ok(self.outcome)
    }

    fn fail(&mut self) -> State {
        self.outcome = Outcome::Failed;
        State::Terminated
    }

    fn protocol_error(&mut self, e: Error) -> State {
        tracing::error!("{}", e);
        self.fail()
    }
}

/// Main protocol handler - reads commands from `input` and answers on `output`
pub fn handle_commands<L, R, B, W>(session: Session<'_, L, R>, input: B, output: &mut W) -> Result<Outcome>
where
    L: LocalRepository,
    R: RemoteStore,
    B: BufRead,
    W: Write,
{
    Engine::new(session).run(input, output)
}
