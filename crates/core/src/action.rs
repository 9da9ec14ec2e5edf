//! Cooperative action scheduling for agent behaviors.
//! This module exists so multi-step behaviors can pause on timers, jobs and
//! events without threads, and so a behavior can delegate to a sub-behavior.
//! It does not own what behaviors do; it only drives them and routes wakes.
//!
//! A behavior is a `Coroutine` that returns one `Step` per resumption. A
//! `Runner` keeps the stack of suspended callers and parks the top coroutine on
//! the `Dispatcher` until exactly one of its pending keys fires.

use std::mem;

use crate::grid::GridError;
use crate::types::*;

mod dispatch;

pub use dispatch::{Dispatcher, EventLoop, Signal, Wake, WakeKey};

/// Value handed back to a caller when a sub-behavior returns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Pos(Pos),
}

/// Why a coroutine is being resumed.
#[derive(Clone, Debug, PartialEq)]
pub enum Resume {
    /// First resumption of a freshly started or freshly called coroutine.
    Start,
    /// A wait elapsed, a job ended, or a callee finished without a value.
    Ready,
    /// One event of a suspended event set fired.
    Event(String),
    Returned(Value),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Clip {
    Hit,
    PostHit,
    PreJump,
    PostJump,
    PickUp,
    FallForward,
    FallBackward,
}

#[derive(Clone, Debug, PartialEq)]
pub enum JobKind {
    Move { from: Pos, to: Pos },
    Rotate { from: Direction, to: Direction },
    Clip(Clip),
    Fade { visible: bool },
}

/// Work handed to the presentation side; it signals completion once played.
#[derive(Clone, Debug, PartialEq)]
pub struct Job {
    pub agent: AgentId,
    pub kind: JobKind,
    pub duration: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Suspend {
    Wait(f64),
    Job(Job),
    Events(Vec<String>),
}

pub enum Step<C> {
    Suspend(Suspend),
    Call(Box<dyn Coroutine<C>>),
    Return(Value),
    Done,
    Fail(ActionError),
}

pub trait Coroutine<C> {
    fn resume(&mut self, ctx: &mut C, input: Resume) -> Step<C>;
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("returned a value with no caller to receive it")]
    NoParent,
    #[error("suspended on an empty event set")]
    EmptyEventSet,
    #[error("cannot wait {0} seconds")]
    InvalidWait(f64),
    #[error("cannot start {requested} while {running} is running")]
    Busy { requested: ActionName, running: ActionName },
    #[error("{role:?} agents cannot {action}")]
    Unsupported { role: Role, action: ActionName },
    #[error("dead agents cannot {0}")]
    Dead(ActionName),
    #[error("resumed with {got:?} while expecting {expected}")]
    UnexpectedResume { expected: &'static str, got: Resume },
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Context a runner needs from whoever owns it.
pub trait Host {
    fn dispatcher(&mut self) -> &mut dyn Dispatcher;
    /// Seconds to keep waiting for a job after its nominal duration.
    fn resume_grace(&self) -> f64;
}

/// How a drive of the coroutine stack ended.
#[derive(Debug)]
pub enum Drive {
    Parked,
    Finished,
    Failed(ActionError),
}

#[derive(Debug)]
enum Pending {
    Timer(WakeKey),
    Job { done: WakeKey, timeout: WakeKey },
    Events(Vec<(String, WakeKey)>),
}

pub struct Runner<C> {
    current: Box<dyn Coroutine<C>>,
    parents: Vec<Box<dyn Coroutine<C>>>,
    pending: Option<Pending>,
    missed_signals: u32,
}

impl<C: Host> Runner<C> {
    pub fn new(root: Box<dyn Coroutine<C>>) -> Self {
        Self { current: root, parents: Vec::new(), pending: None, missed_signals: 0 }
    }

    pub fn start(&mut self, ctx: &mut C) -> Drive {
        self.drive(ctx, Resume::Start)
    }

    /// Keys that can resume this runner right now.
    pub fn pending_keys(&self) -> Vec<WakeKey> {
        match &self.pending {
            None => Vec::new(),
            Some(Pending::Timer(key)) => vec![*key],
            Some(Pending::Job { done, timeout }) => vec![*done, *timeout],
            Some(Pending::Events(subs)) => subs.iter().map(|(_, key)| *key).collect(),
        }
    }

    pub fn is_parked(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of coroutines on the stack, the running one included.
    pub fn depth(&self) -> usize {
        self.parents.len() + 1
    }

    /// Jobs whose completion never arrived and were resumed by their timeout.
    pub fn missed_signals(&self) -> u32 {
        self.missed_signals
    }

    /// Resumes the parked coroutine if `wake` is one of its pending keys.
    /// Returns `None` and stays parked otherwise.
    pub fn deliver(&mut self, ctx: &mut C, wake: &Wake) -> Option<Drive> {
        let pending = self.pending.take()?;
        match self.accept(ctx, pending, wake) {
            Ok(input) => Some(self.drive(ctx, input)),
            Err(pending) => {
                self.pending = Some(pending);
                None
            }
        }
    }

    /// Drops whatever the runner is parked on.
    pub fn abandon(&mut self, ctx: &mut C) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let dispatcher = ctx.dispatcher();
        match pending {
            Pending::Timer(key) => dispatcher.cancel(key),
            Pending::Job { done, timeout } => {
                dispatcher.cancel(done);
                dispatcher.cancel(timeout);
            }
            Pending::Events(subs) => {
                for (name, key) in &subs {
                    dispatcher.ignore(name, *key);
                }
            }
        }
    }

    fn accept(&mut self, ctx: &mut C, pending: Pending, wake: &Wake) -> Result<Resume, Pending> {
        match pending {
            Pending::Timer(key) if key == wake.key => Ok(Resume::Ready),
            Pending::Job { done, timeout } if wake.key == done || wake.key == timeout => {
                let dispatcher = ctx.dispatcher();
                if wake.key == done {
                    dispatcher.cancel(timeout);
                } else {
                    log::warn!("job signal {done:?} never arrived, resuming after timeout");
                    self.missed_signals += 1;
                    dispatcher.cancel(done);
                }
                Ok(Resume::Ready)
            }
            Pending::Events(mut subs) => {
                let Some(fired) = subs.iter().position(|(_, key)| *key == wake.key) else {
                    return Err(Pending::Events(subs));
                };
                let (name, _) = subs.swap_remove(fired);
                let dispatcher = ctx.dispatcher();
                for (sibling, key) in &subs {
                    dispatcher.ignore(sibling, *key);
                }
                Ok(Resume::Event(name))
            }
            other => Err(other),
        }
    }

    fn drive(&mut self, ctx: &mut C, mut input: Resume) -> Drive {
        loop {
            input = match self.current.resume(ctx, input) {
                Step::Suspend(request) => {
                    return match self.park(ctx, request) {
                        Ok(()) => Drive::Parked,
                        Err(err) => self.fail(err),
                    };
                }
                Step::Call(child) => {
                    let caller = mem::replace(&mut self.current, child);
                    self.parents.push(caller);
                    Resume::Start
                }
                Step::Return(value) => match self.parents.pop() {
                    Some(caller) => {
                        self.current = caller;
                        Resume::Returned(value)
                    }
                    None => return self.fail(ActionError::NoParent),
                },
                Step::Done => match self.parents.pop() {
                    Some(caller) => {
                        self.current = caller;
                        Resume::Ready
                    }
                    None => return Drive::Finished,
                },
                Step::Fail(err) => return self.fail(err),
            };
        }
    }

    fn park(&mut self, ctx: &mut C, request: Suspend) -> Result<(), ActionError> {
        let grace = ctx.resume_grace();
        let dispatcher = ctx.dispatcher();
        let pending = match request {
            Suspend::Wait(secs) => {
                check_delay(secs)?;
                let key = dispatcher.next_key();
                dispatcher.call_later(secs, key);
                Pending::Timer(key)
            }
            Suspend::Job(job) => {
                check_delay(job.duration)?;
                let done = dispatcher.next_key();
                let timeout = dispatcher.next_key();
                dispatcher.call_later(job.duration + grace, timeout);
                dispatcher.start_job(&job, done);
                Pending::Job { done, timeout }
            }
            Suspend::Events(names) => {
                if names.is_empty() {
                    return Err(ActionError::EmptyEventSet);
                }
                let subs = names
                    .into_iter()
                    .map(|name| {
                        let key = dispatcher.next_key();
                        dispatcher.accept_once(&name, key);
                        (name, key)
                    })
                    .collect();
                Pending::Events(subs)
            }
        };
        self.pending = Some(pending);
        Ok(())
    }

    fn fail(&mut self, err: ActionError) -> Drive {
        self.parents.clear();
        Drive::Failed(err)
    }
}

fn check_delay(secs: f64) -> Result<(), ActionError> {
    if secs.is_finite() && secs >= 0.0 { Ok(()) } else { Err(ActionError::InvalidWait(secs)) }
}
