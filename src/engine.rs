//! Stepper engine
//!
//! This module owns all navigation state of one wizard: the registered steps,
//! the current position, per-step statuses, visited flags, the set of errors
//! the engine applied on its own ("synthetic" errors) and the per-step data
//! store.
//!
//! # Transition protocol
//!
//! ```text
//! go_to(target)
//!     resolve target (index or alias), reject if out of range
//!     ↓
//!     exit guard of the current step: Ok(false) rejects, Err is ignored
//!     ↓
//!     forward:  unvisited steps before target → error (synthetic)
//!               visited steps → finished, unless they hold a real error
//!     backward: current step active → finished
//!     ↓
//!     target pending/active → active, mark visited, commit
//! ```
//!
//! # Invariants
//!
//! - Aliases are unique among registered steps
//! - `current_index < step_count()` whenever at least one step is registered
//! - A non-synthetic error is only cleared by `set_status` or `reset`
//!
//! The engine is single-owner: `go_to` takes `&mut self`, so overlapping
//! navigations cannot be expressed. A guard that never resolves stalls that
//! navigation; there is no timeout and no cancellation.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, warn};

use crate::error::{Result, StepperError};
use crate::registration::{StepMetadata, StepRegistration};
use crate::types::{ResetOptions, StepChangeEvent, StepKey, StepStatus};

/// Navigation and persistence state of one wizard.
///
/// # Example
///
/// ```
/// use stepflow::{StepMetadata, StepStatus, StepperEngine};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let mut engine = StepperEngine::new();
///     engine.register_step(0, Some("basic-info"), StepMetadata::new()).unwrap();
///     engine.register_step(1, Some("collateral"), StepMetadata::new()).unwrap();
///     engine.register_step(2, Some("review"), StepMetadata::new()).unwrap();
///
///     // Jumping over "collateral" flags it
///     assert!(engine.go_to("review").await);
///     assert_eq!(engine.status(1), StepStatus::Error);
///     assert_eq!(engine.current_index(), 2);
/// }
/// ```
#[derive(Debug, Default)]
pub struct StepperEngine {
    /// Registrations in mount order
    steps: Vec<StepRegistration>,

    /// Authoritative position of the wizard
    current_index: usize,

    /// Status per index; missing entries read as pending
    statuses: BTreeMap<usize, StepStatus>,

    /// Indices that have been the target of a transition or a reset
    visited: BTreeSet<usize>,

    /// Indices whose error status was applied by a forward jump
    synthetic_errors: BTreeSet<usize>,

    /// Per-step payloads, independent of step lifecycle
    data: BTreeMap<StepKey, Value>,

    linear: bool,
    debug: bool,

    subscribers: Vec<Sender<StepChangeEvent>>,

    /// (current_index, step_count) seen by the last reconciliation pass
    reconciled: Option<(usize, usize)>,
}

impl StepperEngine {
    /// Create an empty engine positioned at index 0
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a step, or update the metadata of an already registered index.
    ///
    /// An empty alias is treated as no alias.
    ///
    /// # Errors
    ///
    /// - `DuplicateAlias` if another index already owns `alias`; nothing is
    ///   registered in that case
    pub fn register_step(
        &mut self,
        index: usize,
        alias: Option<&str>,
        metadata: StepMetadata,
    ) -> Result<()> {
        let alias = alias.filter(|a| !a.is_empty());
        if let Some(alias) = alias {
            if let Some(existing) = self.index_of_alias(alias) {
                if existing != index {
                    warn!(alias, existing, requested = index, "Duplicate step alias rejected");
                    return Err(StepperError::DuplicateAlias {
                        alias: alias.to_string(),
                        existing,
                        requested: index,
                    });
                }
            }
        }

        match self.steps.iter_mut().find(|s| s.index == index) {
            Some(step) => {
                step.metadata.merge(metadata);
                if self.debug {
                    debug!(index, "Step registration updated");
                }
            }
            None => {
                self.steps.push(StepRegistration::new(
                    index,
                    alias.map(str::to_string),
                    metadata,
                ));
                if self.debug {
                    debug!(index, alias, "Step registered");
                }
            }
        }

        self.statuses.entry(index).or_insert(StepStatus::Pending);

        self.clamp_current_index();
        self.reconcile_if_changed();
        Ok(())
    }

    /// Remove the step registered at `index`.
    ///
    /// `alias` is only used for diagnostics. The status entry of the index is
    /// dropped, so a later registration at the same index starts as pending.
    pub fn unregister_step(&mut self, index: usize, alias: Option<&str>) {
        let before = self.steps.len();
        self.steps.retain(|s| s.index != index);
        self.statuses.remove(&index);

        if self.debug {
            debug!(
                index,
                alias,
                removed = before != self.steps.len(),
                "Step unregistered"
            );
        }

        self.clamp_current_index();
        self.reconcile_if_changed();
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Navigate to a step by index or alias.
    ///
    /// Returns `false`, leaving every piece of state untouched, when the
    /// target does not resolve to `[0, step_count())` or when the exit guard
    /// of the current step answers `Ok(false)`. A failing guard does not block.
    pub async fn go_to(&mut self, target: impl Into<StepKey>) -> bool {
        let target = target.into();
        let count = self.step_count();
        if count == 0 {
            if self.debug {
                debug!(key = %target, "Navigation rejected: no steps registered");
            }
            return false;
        }

        let Some(to) = self.resolve(&target).filter(|&i| i < count) else {
            if self.debug {
                debug!(key = %target, count, "Navigation rejected: target out of range");
            }
            return false;
        };

        let from = self.current_index;
        let exit_guard = self
            .registration(from)
            .and_then(|step| step.metadata.can_exit().cloned());

        if let Some(guard) = exit_guard {
            match guard.check(self).await {
                Ok(false) => {
                    if self.debug {
                        debug!(from, to, "Navigation blocked by exit guard");
                    }
                    return false;
                }
                Ok(true) => {}
                Err(err) => {
                    if self.debug {
                        debug!(from, to, error = %err, "Exit guard failed, navigation continues");
                    }
                }
            }
        }

        self.visited.insert(from);

        if to > from {
            self.settle_steps_before(to);
        } else if to < from && self.statuses.get(&from) == Some(&StepStatus::Active) {
            self.statuses.insert(from, StepStatus::Finished);
        }

        match self.statuses.get(&to) {
            None | Some(StepStatus::Pending) | Some(StepStatus::Active) => {
                self.statuses.insert(to, StepStatus::Active);
            }
            Some(_) => {}
        }

        self.visited.insert(to);
        self.current_index = to;

        if self.debug {
            debug!(from, to, statuses = ?self.statuses, "Navigation committed");
        }

        self.emit_change(from, to);
        self.reconcile_if_changed();
        true
    }

    /// Navigate to `current_index() + 1`
    pub async fn next(&mut self) -> bool {
        let target = self.current_index + 1;
        self.go_to(target).await
    }

    /// Navigate to `current_index() - 1`; `false` when already at the first step
    pub async fn prev(&mut self) -> bool {
        match self.current_index.checked_sub(1) {
            Some(target) => self.go_to(target).await,
            None => {
                if self.debug {
                    debug!("Navigation rejected: already at the first step");
                }
                false
            }
        }
    }

    /// Forward jump bookkeeping for every index in `[0, to)`
    fn settle_steps_before(&mut self, to: usize) {
        for i in 0..to {
            if !self.visited.contains(&i) {
                self.statuses.insert(i, StepStatus::Error);
                self.synthetic_errors.insert(i);
                if self.debug {
                    debug!(index = i, "Unvisited step skipped, marked as error");
                }
                continue;
            }

            let status = self.status(i);
            if status == StepStatus::Error && self.synthetic_errors.remove(&i) {
                // With custom validation the error now belongs to the guard
                let validated = self
                    .registration(i)
                    .is_some_and(StepRegistration::has_custom_validation);
                if !validated {
                    self.statuses.insert(i, StepStatus::Finished);
                }
            } else if status != StepStatus::Error {
                self.statuses.insert(i, StepStatus::Finished);
            }
        }
    }

    /// Evaluate the enter guard of a step, failing open like exit guards.
    ///
    /// The engine never calls this itself; it is offered to collaborators
    /// that want to honour `can_enter`.
    pub async fn can_enter(&self, key: impl Into<StepKey>) -> bool {
        let key = key.into();
        let guard = self
            .resolve(&key)
            .and_then(|index| self.registration(index))
            .and_then(|step| step.metadata.can_enter().cloned());

        match guard {
            Some(guard) => match guard.check(self).await {
                Ok(allowed) => allowed,
                Err(err) => {
                    if self.debug {
                        debug!(%key, error = %err, "Enter guard failed, treating as allowed");
                    }
                    true
                }
            },
            None => true,
        }
    }

    // =========================================================================
    // Status and reset
    // =========================================================================

    /// Overwrite the status of a step. No guard, visited or synthetic
    /// bookkeeping; an unknown alias is ignored.
    pub fn set_status(&mut self, key: impl Into<StepKey>, status: StepStatus) {
        let key = key.into();
        let Some(index) = self.resolve(&key) else {
            if self.debug {
                debug!(%key, "set_status ignored: unknown alias");
            }
            return;
        };
        self.statuses.insert(index, status);
    }

    /// Hard reset of statuses, visited flags and synthetic errors.
    ///
    /// The target index (default 0) is clamped into the registered range and
    /// becomes the only active and visited step. The data store is cleared
    /// unless `keep_data` is set.
    pub fn reset(&mut self, options: ResetOptions) {
        let count = self.step_count();
        let index = options.index.unwrap_or(0).min(count.saturating_sub(1));

        self.statuses = self
            .steps
            .iter()
            .map(|s| (s.index, StepStatus::Pending))
            .collect();
        if count > 0 {
            self.statuses.insert(index, StepStatus::Active);
        }

        self.visited = BTreeSet::from([index]);
        self.synthetic_errors.clear();

        if !options.keep_data {
            self.data.clear();
        }

        self.current_index = index;

        if self.debug {
            debug!(index, keep_data = options.keep_data, "Stepper reset");
        }

        self.reconcile_if_changed();
    }

    // =========================================================================
    // Data store
    // =========================================================================

    pub fn save_data(&mut self, key: impl Into<StepKey>, payload: Value) {
        self.data.insert(key.into(), payload);
    }

    /// Serialize `payload` and store it under `key`
    pub fn save_typed<T: Serialize>(&mut self, key: impl Into<StepKey>, payload: &T) -> Result<()> {
        let value = serde_json::to_value(payload)?;
        self.save_data(key, value);
        Ok(())
    }

    pub fn get_data(&self, key: impl Into<StepKey>) -> Option<&Value> {
        self.data.get(&key.into())
    }

    /// Read a payload back into a typed value.
    ///
    /// Returns `Ok(None)` for a missing key and a `Json` error when the
    /// stored payload does not fit `T`.
    pub fn get_typed<T: DeserializeOwned>(&self, key: impl Into<StepKey>) -> Result<Option<T>> {
        self.get_data(key)
            .map(|value| T::deserialize(value))
            .transpose()
            .map_err(StepperError::from)
    }

    /// Diagnostic dump of one payload (only visible with debug enabled)
    pub fn log_data(&self, key: impl Into<StepKey>) {
        let key = key.into();
        let payload = self.data.get(&key);
        if self.debug {
            debug!(%key, ?payload, "[Stepper] step data");
        }
    }

    /// Snapshot of the whole data store
    pub fn data(&self) -> BTreeMap<StepKey, Value> {
        self.data.clone()
    }

    // =========================================================================
    // Flags
    // =========================================================================

    /// Record whether the wizard is linear. Navigation does not branch on it.
    pub fn set_linear(&mut self, flag: bool) {
        self.linear = flag;
    }

    #[inline]
    pub fn is_linear(&self) -> bool {
        self.linear
    }

    /// Enable diagnostic logging
    pub fn set_debug(&mut self, flag: bool) {
        self.debug = flag;
    }

    #[inline]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Receive a [`StepChangeEvent`] for every completed transition
    pub fn subscribe(&mut self) -> Receiver<StepChangeEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    /// Registrations in mount order, borrowed
    pub fn steps(&self) -> &[StepRegistration] {
        &self.steps
    }

    /// Snapshot of the registrations
    pub fn get_steps(&self) -> Vec<StepRegistration> {
        self.steps.clone()
    }

    #[inline]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn registration(&self, index: usize) -> Option<&StepRegistration> {
        self.steps.iter().find(|s| s.index == index)
    }

    /// Status of an index, `Pending` when unknown
    pub fn status(&self, index: usize) -> StepStatus {
        self.statuses.get(&index).copied().unwrap_or_default()
    }

    pub fn step_statuses(&self) -> BTreeMap<usize, StepStatus> {
        self.statuses.clone()
    }

    pub fn is_visited(&self, index: usize) -> bool {
        self.visited.contains(&index)
    }

    pub fn visited_steps(&self) -> BTreeMap<usize, bool> {
        self.visited.iter().map(|&i| (i, true)).collect()
    }

    /// True when the error on `index` was applied by a forward jump
    pub fn is_synthetic_error(&self, index: usize) -> bool {
        self.synthetic_errors.contains(&index)
    }

    pub fn alias_to_index(&self) -> BTreeMap<String, usize> {
        self.steps
            .iter()
            .filter_map(|s| s.alias.clone().map(|alias| (alias, s.index)))
            .collect()
    }

    /// Resolve a key to an index. Indices resolve to themselves, even when
    /// nothing is registered there.
    pub fn resolve(&self, key: &StepKey) -> Option<usize> {
        match key {
            StepKey::Index(index) => Some(*index),
            StepKey::Alias(alias) => self.index_of_alias(alias),
        }
    }

    fn index_of_alias(&self, alias: &str) -> Option<usize> {
        self.steps
            .iter()
            .find(|s| s.alias.as_deref() == Some(alias))
            .map(|s| s.index)
    }

    fn key_of(&self, index: usize) -> StepKey {
        self.registration(index)
            .map(StepRegistration::key)
            .unwrap_or(StepKey::Index(index))
    }

    // =========================================================================
    // Internal bookkeeping
    // =========================================================================

    fn clamp_current_index(&mut self) {
        let count = self.step_count();
        if self.current_index >= count {
            self.current_index = count.saturating_sub(1);
        }
    }

    fn emit_change(&mut self, from: usize, to: usize) {
        if self.subscribers.is_empty() {
            return;
        }
        let event = StepChangeEvent {
            from: self.key_of(from),
            to: self.key_of(to),
        };
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Run the reconciliation pass if the position or the step count moved
    /// since the last pass.
    fn reconcile_if_changed(&mut self) {
        let snapshot = (self.current_index, self.step_count());
        if self.reconciled == Some(snapshot) {
            return;
        }
        self.reconciled = Some(snapshot);
        self.reconcile();
    }

    /// Current step: visited, and active if it was pending.
    /// Other registered steps: pending if they had no status yet.
    fn reconcile(&mut self) {
        let current = self.current_index;
        for step in &self.steps {
            let status = self.statuses.entry(step.index).or_insert(StepStatus::Pending);
            if step.index == current {
                self.visited.insert(step.index);
                if *status == StepStatus::Pending {
                    *status = StepStatus::Active;
                }
            }
        }
    }
}
