//! The orchestrator: owns the active selector set, drives
//! parse → evaluate → classify → apply, and reacts to document mutations
//! through the throttle.
//!
//! Everything runs on one cooperative task; a pass runs to completion once
//! started, so it never observes a torn document state and its output is
//! applied atomically relative to other passes.

use crate::evaluate::{Scope, evaluate};
use crate::throttle::Throttle;
use crate::{DocumentAdapter, DomMutation, HideSink, RuleSink, StyleResolver};
use anyhow::Error;
use elemhide_selectors::{ExtendedSelector, parse};
use log::{debug, warn};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{Instant, sleep_until};

/// Default minimum interval between automatic re-evaluation passes.
pub const DEFAULT_MIN_INVOCATION_INTERVAL: Duration = Duration::from_millis(3000);

/// Engine configuration.
#[derive(Clone, Copy, Debug)]
pub struct EmulationConfig {
    /// Minimum time between automatic re-evaluation passes. Mutations
    /// arriving inside the window collapse into one trailing pass.
    pub min_invocation_interval: Duration,
}

impl Default for EmulationConfig {
    fn default() -> Self {
        Self {
            min_invocation_interval: DEFAULT_MIN_INVOCATION_INTERVAL,
        }
    }
}

/// A selector accepted by [`HidingEmulator::apply`], parsed exactly once.
struct ActiveSelector {
    text: String,
    parsed: ExtendedSelector,
}

/// The element-hiding emulation engine for one document.
///
/// Selector texts enter through [`apply`](Self::apply); mutation batches
/// arrive on the channel handed to [`new`](Self::new). Matches from
/// predicate-bearing selectors go to the direct-hide sink; predicate-free
/// selectors are forwarded verbatim to the native-rule sink, since the
/// native engine produces identical results for them.
pub struct HidingEmulator<D, S>
where
    D: DocumentAdapter,
    S: StyleResolver<D::Handle>,
{
    document: D,
    styles: S,
    mutations: mpsc::UnboundedReceiver<Vec<DomMutation<D::Handle>>>,
    rule_sink: Box<dyn RuleSink>,
    hide_sink: Box<dyn HideSink<D::Handle>>,
    selectors: Vec<ActiveSelector>,
    throttle: Throttle,
}

impl<D, S> HidingEmulator<D, S>
where
    D: DocumentAdapter,
    S: StyleResolver<D::Handle>,
{
    pub fn new(
        document: D,
        styles: S,
        mutations: mpsc::UnboundedReceiver<Vec<DomMutation<D::Handle>>>,
        rule_sink: impl RuleSink + 'static,
        hide_sink: impl HideSink<D::Handle> + 'static,
        config: EmulationConfig,
    ) -> Self {
        Self {
            document,
            styles,
            mutations,
            rule_sink: Box::new(rule_sink),
            hide_sink: Box::new(hide_sink),
            selectors: Vec::new(),
            throttle: Throttle::new(config.min_invocation_interval),
        }
    }

    /// Replace the active selector set and evaluate it over the whole
    /// document.
    ///
    /// Each text parses independently; a selector that fails to parse is
    /// logged and dropped while the rest of the batch still applies. The
    /// pass is deferred by one cooperative turn, so other queued work runs
    /// before the first results land and a pending throttled pass that
    /// fires later always sees this set, never the one it was armed under.
    pub async fn apply(&mut self, texts: &[String]) -> Result<(), Error> {
        let mut active = Vec::with_capacity(texts.len());
        for text in texts {
            match parse(text) {
                Ok(parsed) => active.push(ActiveSelector {
                    text: text.clone(),
                    parsed,
                }),
                Err(error) => warn!("dropping selector {text:?}: {error}"),
            }
        }
        debug!(
            "applying {} of {} selectors",
            active.len(),
            texts.len()
        );
        self.selectors = active;
        tokio::task::yield_now().await;
        self.run_pass()
    }

    /// Drain pending mutation batches without blocking, dirtying the match
    /// state and arming the throttle.
    pub fn drain_mutations(&mut self) {
        loop {
            match self.mutations.try_recv() {
                Ok(batch) => self.note_batch(&batch),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Wait for the armed deadline (if any) and run the trailing pass over
    /// the current document. No-op while the state is clean.
    pub async fn run_due(&mut self) -> Result<(), Error> {
        if let Some(deadline) = self.throttle.deadline() {
            sleep_until(deadline).await;
            self.drain_mutations();
            if self.throttle.is_dirty() {
                self.run_pass()?;
            }
        }
        Ok(())
    }

    /// Drive the engine until the mutation channel closes: collect
    /// notifications as they arrive and re-evaluate once per armed
    /// deadline.
    pub async fn run(&mut self) -> Result<(), Error> {
        loop {
            if let Some(deadline) = self.throttle.deadline() {
                tokio::select! {
                    batch = self.mutations.recv() => match batch {
                        Some(batch) => self.note_batch(&batch),
                        None => return Ok(()),
                    },
                    () = sleep_until(deadline) => {
                        if self.throttle.is_dirty() {
                            self.run_pass()?;
                        }
                    }
                }
            } else {
                match self.mutations.recv().await {
                    Some(batch) => self.note_batch(&batch),
                    None => return Ok(()),
                }
            }
        }
    }

    fn note_batch(&mut self, batch: &[DomMutation<D::Handle>]) {
        for mutation in batch {
            debug!("document changed: {mutation:?}");
        }
        if !batch.is_empty() {
            self.throttle.note_mutation(Instant::now());
        }
    }

    /// One full evaluation pass over the current document. On failure the
    /// selector set survives and the throttle re-arms on its normal
    /// cadence; the error is the caller's to handle.
    fn run_pass(&mut self) -> Result<(), Error> {
        match self.evaluate_all() {
            Ok((plain, matched)) => {
                debug!(
                    "pass complete: {} native selectors, {} elements to hide",
                    plain.len(),
                    matched.len()
                );
                if !plain.is_empty() {
                    self.rule_sink.add_selectors(&plain);
                }
                if !matched.is_empty() {
                    self.hide_sink.hide_elements(&matched);
                }
                self.throttle.pass_completed(Instant::now());
                Ok(())
            }
            Err(error) => {
                self.throttle.pass_failed(Instant::now());
                Err(error)
            }
        }
    }

    /// Classify and evaluate the active set: predicate-free selector texts
    /// for the native sink, the union of predicate-bearing matches for the
    /// direct-hide sink.
    fn evaluate_all(&self) -> Result<(Vec<String>, Vec<D::Handle>), Error> {
        let root = self.document.root();
        let mut plain = Vec::new();
        let mut matched = Vec::new();
        let mut seen: HashSet<D::Handle> = HashSet::new();
        for selector in &self.selectors {
            if selector.parsed.has_predicate() {
                let matches =
                    evaluate(&self.document, &self.styles, root, Scope::Subtree, &selector.parsed)?;
                for element in matches {
                    if seen.insert(element) {
                        matched.push(element);
                    }
                }
            } else {
                plain.push(selector.text.clone());
            }
        }
        Ok((plain, matched))
    }
}
