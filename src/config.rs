//! Wizard definition files
//!
//! A wizard can be described in JSON and turned into a mounted
//! [`StepperShell`]. Closures cannot live in a file, so exit and enter guards
//! are picked from a small set of declarative kinds.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use strum::{Display, EnumIter, EnumString};

use crate::engine::StepperEngine;
use crate::error::StepperError;
use crate::registration::{StepGuard, StepMetadata, fields};
use crate::shell::{ShellOptions, StepDeclaration, StepperShell};
use crate::types::{ResetOptions, StepKey};

/// Declarative guard behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GuardKind {
    /// Always allows; marks the step as carrying custom validation
    Allow,
    /// Always blocks
    Deny,
    /// Allows once data has been saved under the step's key
    RequireData,
}

/// A [`GuardKind`] bound to the key of the step it protects
#[derive(Debug, Clone)]
pub struct ConfiguredGuard {
    kind: GuardKind,
    key: StepKey,
}

impl ConfiguredGuard {
    pub fn new(kind: GuardKind, key: StepKey) -> Self {
        Self { kind, key }
    }
}

#[async_trait]
impl StepGuard for ConfiguredGuard {
    async fn check(&self, engine: &StepperEngine) -> anyhow::Result<bool> {
        Ok(match self.kind {
            GuardKind::Allow => true,
            GuardKind::Deny => false,
            GuardKind::RequireData => engine.get_data(self.key.clone()).is_some(),
        })
    }
}

/// One step of a wizard definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_guard: Option<GuardKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enter_guard: Option<GuardKind>,
    /// Any other display field, passed through to the metadata bag
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StepDefinition {
    pub fn new(alias: Option<&str>, title: &str) -> Self {
        Self {
            alias: alias.map(str::to_string),
            title: title.to_string(),
            exit_guard: None,
            enter_guard: None,
            extra: Map::new(),
        }
    }

    /// Build the declaration mounted at `index`
    pub fn to_declaration(&self, index: usize) -> StepDeclaration {
        let key = match &self.alias {
            Some(alias) => StepKey::Alias(alias.clone()),
            None => StepKey::Index(index),
        };

        let mut metadata =
            StepMetadata::from_fields(self.extra.clone()).with_field(fields::TITLE, self.title.clone());
        if let Some(kind) = self.exit_guard {
            metadata = metadata.with_can_exit(ConfiguredGuard::new(kind, key.clone()));
        }
        if let Some(kind) = self.enter_guard {
            metadata = metadata.with_can_enter(ConfiguredGuard::new(kind, key));
        }

        StepDeclaration {
            alias: self.alias.clone(),
            metadata,
        }
    }
}

/// Wizard definition that can be saved/loaded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepperConfig {
    #[serde(default)]
    pub linear: bool,
    #[serde(default)]
    pub navigable: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_class: Option<String>,
    pub steps: Vec<StepDefinition>,
}

impl StepperConfig {
    /// Save the definition to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize wizard definition to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write wizard definition to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load a definition from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read wizard definition from {:?}", path.as_ref()))?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse wizard definition JSON")
    }

    /// Validate the definition
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.steps.is_empty() {
            return Err(StepperError::config("At least one step must be defined"));
        }

        if self.segments == Some(0) {
            return Err(StepperError::config("Segments must be greater than zero"));
        }

        let mut seen = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            if step.title.trim().is_empty() {
                return Err(StepperError::config(format!(
                    "Step {} must have a title",
                    index
                )));
            }
            if let Some(alias) = &step.alias {
                if alias.trim().is_empty() {
                    return Err(StepperError::config(format!(
                        "Step {} has an empty alias",
                        index
                    )));
                }
                if !seen.insert(alias.as_str()) {
                    return Err(StepperError::config(format!(
                        "Duplicate alias '{}' at step {}",
                        alias, index
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn shell_options(&self) -> ShellOptions {
        ShellOptions {
            linear: self.linear,
            navigable: self.navigable,
            segments: self.segments,
            item_class: self.item_class.clone(),
            title_class: self.title_class.clone(),
        }
    }

    /// Build a mounted shell positioned at the first step
    pub fn build_shell(&self) -> Result<StepperShell> {
        self.validate()?;

        let mut shell = StepperShell::new(self.shell_options());
        shell.engine_mut().set_debug(self.debug);
        shell
            .mount(
                self.steps
                    .iter()
                    .enumerate()
                    .map(|(index, step)| step.to_declaration(index)),
            )
            .context("Failed to mount wizard steps")?;
        shell.engine_mut().reset(ResetOptions::default());

        Ok(shell)
    }
}
