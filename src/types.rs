//! Core value types shared by the engine, the shell and the configuration layer
//!
//! Statuses and keys are proper Rust enums so that a step can be addressed
//! either by its position or by its alias without stringly-typed lookups.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};

/// Status of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StepStatus {
    /// Not reached yet (also the status of unknown indices)
    #[default]
    Pending,
    /// The step currently shown
    Active,
    /// Left behind in a good state
    Finished,
    /// Skipped without a visit, or flagged by validation
    Error,
}

impl StepStatus {
    /// Returns true for the statuses that carry a persistent icon
    #[inline]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }
}

/// Address of a step: its position or its alias.
///
/// Also used as the key of the data store, where `Index(0)` and
/// `Alias("0")` are distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepKey {
    Index(usize),
    Alias(String),
}

impl From<usize> for StepKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for StepKey {
    fn from(alias: &str) -> Self {
        Self::Alias(alias.to_string())
    }
}

impl From<String> for StepKey {
    fn from(alias: String) -> Self {
        Self::Alias(alias)
    }
}

impl From<&String> for StepKey {
    fn from(alias: &String) -> Self {
        Self::Alias(alias.clone())
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{}", index),
            Self::Alias(alias) => write!(f, "{}", alias),
        }
    }
}

/// Parses `"3"` as an index and anything else as an alias.
impl FromStr for StepKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<usize>() {
            Ok(index) => Self::Index(index),
            Err(_) => Self::Alias(s.to_string()),
        })
    }
}

/// Options for [`StepperEngine::reset`](crate::engine::StepperEngine::reset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetOptions {
    /// Keep the data store instead of clearing it
    pub keep_data: bool,
    /// Step to restart from (defaults to 0, clamped to the registered range)
    pub index: Option<usize>,
}

impl ResetOptions {
    /// Restart from the given index
    pub fn at(index: usize) -> Self {
        Self {
            keep_data: false,
            index: Some(index),
        }
    }

    /// Keep stored payloads across the reset
    pub fn keeping_data(mut self) -> Self {
        self.keep_data = true;
        self
    }
}

/// Emitted after every completed transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepChangeEvent {
    pub from: StepKey,
    pub to: StepKey,
}

/// Keyboard keys the shell reacts to, named after DOM key values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, EnumString, EnumIter)]
pub enum NavKey {
    ArrowRight,
    ArrowDown,
    ArrowLeft,
    ArrowUp,
    Home,
    End,
}

impl NavKey {
    /// Returns true for keys that move towards the end of the wizard
    pub const fn is_forward(self) -> bool {
        matches!(self, Self::ArrowRight | Self::ArrowDown)
    }

    /// Returns true for keys that move towards the start of the wizard
    pub const fn is_backward(self) -> bool {
        matches!(self, Self::ArrowLeft | Self::ArrowUp)
    }
}
