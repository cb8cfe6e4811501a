use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};

use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::{EventKind, RecursiveMode, Watcher};

use crate::error::{Chainable, Result};
use crate::pipeline::Pipeline;
use crate::util::path_key;

/// The rebuild state machine. Any number of events observed while a run is
/// in flight collapse into exactly one queued run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Watching, no run in flight.
    Idle,
    /// A run is in flight.
    Rebuilding,
    /// A run is in flight and a single further run is queued behind it.
    PendingRebuild,
}

impl State {
    /// A relevant event arrived. Returns whether a run should start now.
    fn event(&mut self) -> bool {
        match *self {
            State::Idle => {
                *self = State::Rebuilding;
                true
            }
            State::Rebuilding | State::PendingRebuild => {
                *self = State::PendingRebuild;
                false
            }
        }
    }

    /// The in-flight run finished. Returns whether the queued run should
    /// start now.
    fn complete(&mut self) -> bool {
        match *self {
            State::PendingRebuild => {
                *self = State::Rebuilding;
                true
            }
            State::Idle | State::Rebuilding => {
                *self = State::Idle;
                false
            }
        }
    }
}

type EventStream = Receiver<notify::Result<notify::Event>>;

/// Watches a directory tree and drives a pipeline: a burst of relevant
/// filesystem events triggers one full run, events observed mid-run queue
/// at most one further run, and runs never overlap.
///
/// A failed run is handed to the outcome callback and watching continues.
/// Only a failure of the watch mechanism itself ends the loop.
pub struct Coordinator {
    pipeline: Pipeline,
    base: PathBuf,
    filter: GlobSet,
    state: State,
    report: Box<dyn FnMut(&Result<()>)>,
}

impl Coordinator {
    /// A coordinator watching `base` recursively. Only events on paths
    /// matching one of `patterns`, resolved relative to `base`, trigger
    /// runs; with no patterns, every path triggers.
    pub fn new<P, I>(pipeline: Pipeline, base: P, patterns: I) -> Result<Self>
        where P: Into<PathBuf>, I: IntoIterator, I::Item: AsRef<str>
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            builder.add(Glob::new(pattern).chain_with(|| error! {
                "invalid watch pattern",
                "pattern" => pattern,
            })?);
        }

        Ok(Coordinator {
            pipeline,
            base: base.into(),
            filter: builder.build()?,
            state: State::Idle,
            report: Box::new(|_| ()),
        })
    }

    /// Install a callback invoked with the outcome of every triggered run.
    pub fn on_outcome<F>(mut self, report: F) -> Self
        where F: FnMut(&Result<()>) + 'static
    {
        self.report = Box::new(report);
        self
    }

    /// Watch and rebuild until the watch mechanism fails. The returned
    /// error describes that failure; run errors go to the outcome callback
    /// and do not end the loop.
    pub fn watch(mut self) -> Result<()> {
        let (sender, events) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |event| {
            let _ = sender.send(event);
        }).chain("failed to start filesystem watcher")?;

        watcher.watch(&self.base, RecursiveMode::Recursive).chain_with(|| error! {
            "failed to watch directory",
            "path" => self.base.display(),
        })?;

        self.run_loop(&events)
    }

    fn run_loop(&mut self, events: &EventStream) -> Result<()> {
        loop {
            let event = match events.recv() {
                Ok(event) => event.chain("filesystem watch stream failed")?,
                Err(_) => return err!("filesystem watch stream closed"),
            };

            if !self.relevant(&event) {
                continue;
            }

            // The rest of the burst collapses into this one trigger.
            self.absorb(events)?;
            let mut starting = self.state.event();
            while starting {
                let outcome = self.pipeline.run();
                (self.report)(&outcome);

                // Events that arrived mid-run queue exactly one more run.
                if self.absorb(events)? {
                    self.state.event();
                }

                starting = self.state.complete();
            }
        }
    }

    /// Drain every queued event, reporting whether any was relevant. A
    /// closed stream is left for the blocking receive to surface.
    fn absorb(&mut self, events: &EventStream) -> Result<bool> {
        let mut relevant = false;
        loop {
            match events.try_recv() {
                Ok(event) => {
                    let event = event.chain("filesystem watch stream failed")?;
                    relevant |= self.relevant(&event);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                    return Ok(relevant);
                }
            }
        }
    }

    fn relevant(&self, event: &notify::Event) -> bool {
        let mutation = matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_),
        );

        mutation && event.paths.iter().any(|path| self.matches(path))
    }

    fn matches(&self, path: &Path) -> bool {
        if self.filter.is_empty() {
            return true;
        }

        let relative = path.strip_prefix(&self.base).unwrap_or(path);
        self.filter.is_match(path_key(relative))
    }
}
