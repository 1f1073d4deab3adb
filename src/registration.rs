//! Step registrations and their guards
//!
//! A registration is the engine's record of one mounted step: its index, its
//! optional alias and an open bag of display metadata. The engine never looks
//! inside the bag except for the two guards, so views can pass whatever they
//! render (titles, icons, tooltips, ...) and get it back verbatim.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::engine::StepperEngine;
use crate::types::StepKey;

/// Well-known metadata field names read by the shell
pub mod fields {
    pub const TITLE: &str = "title";
    pub const TOOLTIP: &str = "tooltip";
    pub const CSS_CLASS: &str = "cssClass";
    pub const SUCCESS_ICON: &str = "successIcon";
    pub const ERROR_ICON: &str = "errorIcon";
    pub const SUCCESS_ICON_CLASS: &str = "successIconClass";
    pub const ERROR_ICON_CLASS: &str = "errorIconClass";
    pub const SUCCESS_ICON_COLOR: &str = "successIconColor";
    pub const ERROR_ICON_COLOR: &str = "errorIconColor";
    pub const SUCCESS_TITLE_CLASS: &str = "successTitleClass";
    pub const ERROR_TITLE_CLASS: &str = "errorTitleClass";
    pub const SUCCESS_TITLE_COLOR: &str = "successTitleColor";
    pub const ERROR_TITLE_COLOR: &str = "errorTitleColor";
    pub const SUCCESS_TOOLTIP: &str = "successTooltip";
    pub const ERROR_TOOLTIP: &str = "errorTooltip";
    pub const SHOW_ICON_ON_FINISHED: &str = "showIconOnFinished";
    pub const SHOW_ICON_ON_ERROR: &str = "showIconOnError";
}

/// Navigation guard attached to a step.
///
/// The engine passes itself as context. `Ok(false)` blocks the transition;
/// `Ok(true)` allows it; an `Err` is a guard fault and is treated as `Ok(true)`.
#[async_trait]
pub trait StepGuard: Send + Sync {
    async fn check(&self, engine: &StepperEngine) -> anyhow::Result<bool>;
}

/// Adapter turning a synchronous closure into a [`StepGuard`]
pub struct FnGuard<F>(F);

#[async_trait]
impl<F> StepGuard for FnGuard<F>
where
    F: Fn(&StepperEngine) -> anyhow::Result<bool> + Send + Sync,
{
    async fn check(&self, engine: &StepperEngine) -> anyhow::Result<bool> {
        (self.0)(engine)
    }
}

/// Wrap a synchronous closure as a guard
pub fn guard_fn<F>(f: F) -> FnGuard<F>
where
    F: Fn(&StepperEngine) -> anyhow::Result<bool> + Send + Sync + 'static,
{
    FnGuard(f)
}

/// Open metadata bag passed on registration.
///
/// `null` values count as absent: they never overwrite an existing field
/// when merged into a registration.
#[derive(Clone, Default)]
pub struct StepMetadata {
    fields: Map<String, Value>,
    can_enter: Option<Arc<dyn StepGuard>>,
    can_exit: Option<Arc<dyn StepGuard>>,
}

impl StepMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build metadata from an existing JSON object
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.with_field(fields::TITLE, title.into())
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_can_enter(mut self, guard: impl StepGuard + 'static) -> Self {
        self.can_enter = Some(Arc::new(guard));
        self
    }

    pub fn with_can_exit(mut self, guard: impl StepGuard + 'static) -> Self {
        self.can_exit = Some(Arc::new(guard));
        self
    }

    /// Shorthand for `with_can_exit(guard_fn(f))`
    pub fn with_exit_check<F>(self, f: F) -> Self
    where
        F: Fn(&StepperEngine) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.with_can_exit(guard_fn(f))
    }

    /// Shorthand for `with_can_enter(guard_fn(f))`
    pub fn with_enter_check<F>(self, f: F) -> Self
    where
        F: Fn(&StepperEngine) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.with_can_enter(guard_fn(f))
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.field(key).and_then(Value::as_bool)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn can_enter(&self) -> Option<&Arc<dyn StepGuard>> {
        self.can_enter.as_ref()
    }

    pub fn can_exit(&self) -> Option<&Arc<dyn StepGuard>> {
        self.can_exit.as_ref()
    }

    /// Merge `update` over `self`, field by field: a present value wins,
    /// an absent (or `null`) one keeps what was there.
    pub fn merge(&mut self, update: StepMetadata) {
        for (key, value) in update.fields {
            if !value.is_null() {
                self.fields.insert(key, value);
            }
        }
        if update.can_enter.is_some() {
            self.can_enter = update.can_enter;
        }
        if update.can_exit.is_some() {
            self.can_exit = update.can_exit;
        }
    }
}

impl fmt::Debug for StepMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepMetadata")
            .field("fields", &self.fields)
            .field("can_enter", &self.can_enter.is_some())
            .field("can_exit", &self.can_exit.is_some())
            .finish()
    }
}

/// One registered step
#[derive(Debug, Clone)]
pub struct StepRegistration {
    pub index: usize,
    pub alias: Option<String>,
    pub metadata: StepMetadata,
}

impl StepRegistration {
    pub fn new(index: usize, alias: Option<String>, metadata: StepMetadata) -> Self {
        Self {
            index,
            alias,
            metadata,
        }
    }

    /// Key used for events and teardown payloads: the alias when there is one
    pub fn key(&self) -> StepKey {
        match &self.alias {
            Some(alias) => StepKey::Alias(alias.clone()),
            None => StepKey::Index(self.index),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.str_field(fields::TITLE)
    }

    pub fn tooltip(&self) -> Option<&str> {
        self.metadata.str_field(fields::TOOLTIP)
    }

    pub fn css_class(&self) -> Option<&str> {
        self.metadata.str_field(fields::CSS_CLASS)
    }

    /// A step with an exit guard is considered to carry custom validation
    pub fn has_custom_validation(&self) -> bool {
        self.metadata.can_exit().is_some()
    }
}
