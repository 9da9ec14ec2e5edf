//! Timer, event and job primitives behind the scheduler, plus a headless loop.
//! This module exists so the scheduler can run against a real engine or a
//! virtual clock without knowing which.
//! It does not own behavior state; it only remembers keys and when they fire.

use std::collections::{BTreeMap, VecDeque};

use super::*;

/// Identifies one pending resumption; never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WakeKey(u64);

#[derive(Clone, Debug, PartialEq)]
pub enum Signal {
    Timer,
    JobDone,
    Event(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Wake {
    pub key: WakeKey,
    pub signal: Signal,
}

/// The collaborator primitives a scheduler is driven by.
pub trait Dispatcher {
    fn next_key(&mut self) -> WakeKey;
    /// Fires `key` once after `delay` seconds.
    fn call_later(&mut self, delay: f64, key: WakeKey);
    /// Drops a timer or job completion that has not fired yet.
    fn cancel(&mut self, key: WakeKey);
    /// Fires `key` the next time `event` is emitted, then forgets it.
    fn accept_once(&mut self, event: &str, key: WakeKey);
    fn ignore(&mut self, event: &str, key: WakeKey);
    /// Starts `job` and fires `done` when it completes.
    fn start_job(&mut self, job: &Job, done: WakeKey);
    fn emit(&mut self, event: &str);
    /// Moves the clock forward and returns every wake that became due, in order.
    fn advance(&mut self, dt: f64) -> Vec<Wake>;
    /// Seconds since the dispatcher was created.
    fn now(&self) -> f64;
}

const MICROS: f64 = 1_000_000.0;

fn micros(secs: f64) -> u64 {
    (secs.max(0.0) * MICROS).round() as u64
}

/// Deterministic dispatcher on a virtual clock. Jobs complete exactly after
/// their duration unless signals are configured to be lost.
#[derive(Debug, Default)]
pub struct EventLoop {
    clock: u64,
    next_key: u64,
    seq: u64,
    timers: BTreeMap<(u64, u64), Wake>,
    listeners: BTreeMap<String, Vec<WakeKey>>,
    ready: VecDeque<Wake>,
    started: Vec<Job>,
    lose_job_signals: bool,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, started jobs never report completion.
    pub fn lose_job_signals(&mut self, lose: bool) {
        self.lose_job_signals = lose;
    }

    /// Jobs started since the last call.
    pub fn take_started_jobs(&mut self) -> Vec<Job> {
        mem::take(&mut self.started)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    fn schedule(&mut self, delay: f64, wake: Wake) {
        self.seq += 1;
        self.timers.insert((self.clock + micros(delay), self.seq), wake);
    }
}

impl Dispatcher for EventLoop {
    fn next_key(&mut self) -> WakeKey {
        self.next_key += 1;
        WakeKey(self.next_key)
    }

    fn call_later(&mut self, delay: f64, key: WakeKey) {
        self.schedule(delay, Wake { key, signal: Signal::Timer });
    }

    fn cancel(&mut self, key: WakeKey) {
        self.timers.retain(|_, wake| wake.key != key);
    }

    fn accept_once(&mut self, event: &str, key: WakeKey) {
        self.listeners.entry(event.to_string()).or_default().push(key);
    }

    fn ignore(&mut self, event: &str, key: WakeKey) {
        if let Some(keys) = self.listeners.get_mut(event) {
            keys.retain(|k| *k != key);
            if keys.is_empty() {
                self.listeners.remove(event);
            }
        }
    }

    fn start_job(&mut self, job: &Job, done: WakeKey) {
        self.started.push(job.clone());
        if !self.lose_job_signals {
            self.schedule(job.duration, Wake { key: done, signal: Signal::JobDone });
        }
    }

    fn emit(&mut self, event: &str) {
        let Some(keys) = self.listeners.remove(event) else {
            return;
        };
        for key in keys {
            self.ready.push_back(Wake { key, signal: Signal::Event(event.to_string()) });
        }
    }

    fn advance(&mut self, dt: f64) -> Vec<Wake> {
        self.clock += micros(dt);
        let mut due: Vec<Wake> = self.ready.drain(..).collect();
        while let Some(entry) = self.timers.first_entry() {
            if entry.key().0 > self.clock {
                break;
            }
            due.push(entry.remove());
        }
        due
    }

    fn now(&self) -> f64 {
        self.clock as f64 / MICROS
    }
}
