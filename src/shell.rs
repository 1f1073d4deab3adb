//! Stepper shell
//!
//! The part of the wizard shell that does not depend on a rendering
//! technology: mounting step declarations in order, click and keyboard
//! navigation, progress computation, and resolving what each step header
//! should look like for its current status.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::engine::StepperEngine;
use crate::error::Result;
use crate::registration::{StepMetadata, StepRegistration, fields};
use crate::types::{NavKey, StepKey, StepStatus};

const DEFAULT_SUCCESS_ICON: &str = "bi bi-check-circle-fill";
const DEFAULT_ERROR_ICON: &str = "bi bi-exclamation-circle-fill";
const DEFAULT_SUCCESS_TOOLTIP: &str = "STEPPER_SUCCESS_TOOLTIP";
const DEFAULT_ERROR_TOOLTIP: &str = "STEPPER_ERROR_TOOLTIP";
const DEFAULT_STEP_TOOLTIP: &str = "STEPPER_STEP_TOOLTIP";

/// Shell-level options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOptions {
    /// Forwarded to the engine's linear flag
    pub linear: bool,
    /// Whether clicks and arrow keys on step headers navigate
    pub navigable: bool,
    /// Number of progress bar segments; defaults to the step count
    pub segments: Option<usize>,
    /// Extra class added to every step header
    pub item_class: Option<String>,
    /// Extra class added to every step title
    pub title_class: Option<String>,
}

/// One step as declared by the host, before it has an index
#[derive(Debug, Clone, Default)]
pub struct StepDeclaration {
    pub alias: Option<String>,
    pub metadata: StepMetadata,
}

impl StepDeclaration {
    pub fn new(alias: Option<&str>, metadata: StepMetadata) -> Self {
        Self {
            alias: alias.map(str::to_string),
            metadata,
        }
    }
}

/// What a step header shows for its current status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepAppearance {
    pub index: usize,
    pub status: StepStatus,
    pub active: bool,
    pub status_class: String,
    pub classes: Vec<String>,
    pub title: Option<String>,
    pub title_classes: Vec<String>,
    pub title_color: Option<String>,
    pub icon_class: Option<String>,
    pub icon_color: Option<String>,
    pub show_icon: bool,
    pub tooltip: String,
}

/// Owns the engine of one wizard and the shell options around it
#[derive(Debug, Default)]
pub struct StepperShell {
    engine: StepperEngine,
    options: ShellOptions,
}

impl StepperShell {
    pub fn new(options: ShellOptions) -> Self {
        let mut engine = StepperEngine::new();
        engine.set_linear(options.linear);
        Self { engine, options }
    }

    pub fn engine(&self) -> &StepperEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut StepperEngine {
        &mut self.engine
    }

    pub fn options(&self) -> &ShellOptions {
        &self.options
    }

    /// Replace the options, re-syncing the linear flag
    pub fn set_options(&mut self, options: ShellOptions) {
        self.engine.set_linear(options.linear);
        self.options = options;
    }

    /// Register declarations with indices assigned by declaration order.
    ///
    /// # Errors
    ///
    /// Stops at the first duplicate alias; earlier steps stay registered.
    pub fn mount(&mut self, steps: impl IntoIterator<Item = StepDeclaration>) -> Result<()> {
        for (index, step) in steps.into_iter().enumerate() {
            self.engine
                .register_step(index, step.alias.as_deref(), step.metadata)?;
        }
        debug!(count = self.engine.step_count(), "Steps mounted");
        Ok(())
    }

    /// Step view teardown: persist the payload, then unregister.
    ///
    /// The payload defaults to `{"visited": true}` and is stored under the
    /// step's alias, or its index when it has none.
    pub fn teardown_step(&mut self, index: usize, payload: Option<Value>) {
        let alias = self
            .engine
            .registration(index)
            .and_then(|step| step.alias.clone());
        let key = match &alias {
            Some(alias) => StepKey::Alias(alias.clone()),
            None => StepKey::Index(index),
        };

        let payload = payload.unwrap_or_else(|| json!({ "visited": true }));
        self.engine.save_data(key, payload);
        self.engine.unregister_step(index, alias.as_deref());
    }

    /// Header click; ignored unless the shell is navigable
    pub async fn click(&mut self, index: usize) -> bool {
        if !self.options.navigable {
            return false;
        }
        self.engine.go_to(index).await
    }

    /// Keyboard navigation from the header at `index`; ignored unless navigable
    pub async fn key(&mut self, key: NavKey, index: usize) -> bool {
        if !self.options.navigable {
            return false;
        }

        let target = match key {
            NavKey::ArrowRight | NavKey::ArrowDown => index.checked_add(1),
            NavKey::ArrowLeft | NavKey::ArrowUp => index.checked_sub(1),
            NavKey::Home => Some(0),
            NavKey::End => self.engine.step_count().checked_sub(1),
        };

        match target {
            Some(target) => self.engine.go_to(target).await,
            None => false,
        }
    }

    pub async fn next(&mut self) -> bool {
        self.engine.next().await
    }

    pub async fn prev(&mut self) -> bool {
        self.engine.prev().await
    }

    /// Progress bar fill, unrounded so it lands exactly on segment edges
    pub fn progress_percent(&self) -> f64 {
        let total = self.options.segments.unwrap_or(self.engine.step_count());
        if total == 0 {
            return 0.0;
        }
        (self.engine.current_index() + 1) as f64 / total as f64 * 100.0
    }

    pub fn is_first(&self) -> bool {
        self.engine.current_index() == 0
    }

    pub fn is_last(&self) -> bool {
        self.engine.current_index() + 1 >= self.engine.step_count()
    }

    /// Header appearance of every registered step, in mount order
    pub fn appearances(&self) -> Vec<StepAppearance> {
        self.engine
            .steps()
            .iter()
            .map(|step| self.appearance_of(step))
            .collect()
    }

    pub fn appearance(&self, index: usize) -> Option<StepAppearance> {
        self.engine
            .registration(index)
            .map(|step| self.appearance_of(step))
    }

    fn appearance_of(&self, step: &StepRegistration) -> StepAppearance {
        let status = self.engine.status(step.index);
        let meta = &step.metadata;
        let text = |key: &str| meta.str_field(key).map(str::to_string);

        let status_class = format!("step-status-{}", status);
        let mut classes = vec!["step".to_string(), status_class.clone()];
        classes.extend(self.options.item_class.clone());
        classes.extend(text(fields::CSS_CLASS));

        let mut title_classes: Vec<String> = self.options.title_class.iter().cloned().collect();
        let (title_color, icon_color, icon_class, show_icon, tooltip) = match status {
            StepStatus::Finished => {
                title_classes.extend(text(fields::SUCCESS_TITLE_CLASS));
                (
                    text(fields::SUCCESS_TITLE_COLOR),
                    text(fields::SUCCESS_ICON_COLOR),
                    Some(icon_class(
                        meta.str_field(fields::SUCCESS_ICON).unwrap_or(DEFAULT_SUCCESS_ICON),
                        meta.str_field(fields::SUCCESS_ICON_CLASS),
                    )),
                    meta.bool_field(fields::SHOW_ICON_ON_FINISHED).unwrap_or(true),
                    text(fields::SUCCESS_TOOLTIP)
                        .or_else(|| text(fields::TOOLTIP))
                        .unwrap_or_else(|| DEFAULT_SUCCESS_TOOLTIP.to_string()),
                )
            }
            StepStatus::Error => {
                title_classes.extend(text(fields::ERROR_TITLE_CLASS));
                (
                    text(fields::ERROR_TITLE_COLOR),
                    text(fields::ERROR_ICON_COLOR),
                    Some(icon_class(
                        meta.str_field(fields::ERROR_ICON).unwrap_or(DEFAULT_ERROR_ICON),
                        meta.str_field(fields::ERROR_ICON_CLASS),
                    )),
                    meta.bool_field(fields::SHOW_ICON_ON_ERROR).unwrap_or(true),
                    text(fields::ERROR_TOOLTIP)
                        .or_else(|| text(fields::TOOLTIP))
                        .unwrap_or_else(|| DEFAULT_ERROR_TOOLTIP.to_string()),
                )
            }
            StepStatus::Pending | StepStatus::Active => (
                None,
                None,
                None,
                false,
                text(fields::TOOLTIP).unwrap_or_else(|| DEFAULT_STEP_TOOLTIP.to_string()),
            ),
        };

        StepAppearance {
            index: step.index,
            status,
            active: self.engine.current_index() == step.index,
            status_class,
            classes,
            title: text(fields::TITLE),
            title_classes,
            title_color,
            icon_class,
            icon_color,
            show_icon,
            tooltip,
        }
    }
}

fn icon_class(base: &str, extra: Option<&str>) -> String {
    match extra.filter(|e| !e.is_empty()) {
        Some(extra) => format!("{} {}", base, extra),
        None => base.to_string(),
    }
}
