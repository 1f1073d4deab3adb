use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::StepperError;
use crate::shell::{StepAppearance, StepperShell};
use crate::types::{NavKey, ResetOptions, StepKey, StepStatus};

/// stepflow - drive a multi-step wizard definition from the command line
#[derive(Parser)]
#[command(name = "stepflow")]
#[command(about = "Validate wizard definitions and replay navigation scripts against them")]
#[command(version)]
pub struct Cli {
    /// Enable engine diagnostics (debug-level logging)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a wizard definition file
    Validate {
        /// Path to the wizard definition (JSON)
        config: PathBuf,
    },
    /// Replay a navigation script and print the resulting state as JSON
    Walk {
        /// Path to the wizard definition (JSON)
        config: PathBuf,

        /// Script commands: next, prev, goto:<key>, click:<index>, key:<Key>,
        /// status:<key>=<status>, save:<key>=<json>, teardown:<index>,
        /// reset, reset:<index>, reset-keep:<index>
        commands: Vec<String>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// One step of a navigation script
#[derive(Debug, Clone, PartialEq)]
pub enum WalkCommand {
    Next,
    Prev,
    GoTo(StepKey),
    Click(usize),
    /// Key press on the header of the current step
    Key(NavKey),
    Status(StepKey, StepStatus),
    Save(StepKey, Value),
    Teardown(usize),
    Reset(ResetOptions),
}

impl FromStr for WalkCommand {
    type Err = StepperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (s, None),
        };

        let index = |arg: &str| {
            arg.parse::<usize>()
                .map_err(|_| StepperError::command(format!("'{}' is not a step index", arg)))
        };

        match (name, arg) {
            ("next", None) => Ok(Self::Next),
            ("prev", None) => Ok(Self::Prev),
            ("reset", None) => Ok(Self::Reset(ResetOptions::default())),
            ("goto", Some(key)) => Ok(Self::GoTo(parse_key(key))),
            ("click", Some(arg)) => Ok(Self::Click(index(arg)?)),
            ("teardown", Some(arg)) => Ok(Self::Teardown(index(arg)?)),
            ("reset", Some(arg)) => Ok(Self::Reset(ResetOptions::at(index(arg)?))),
            ("reset-keep", Some(arg)) => Ok(Self::Reset(ResetOptions::at(index(arg)?).keeping_data())),
            ("key", Some(arg)) => arg
                .parse::<NavKey>()
                .map(Self::Key)
                .map_err(|_| StepperError::command(format!("unknown key '{}'", arg))),
            ("status", Some(arg)) => {
                let (key, status) = split_assignment(s, arg)?;
                let status = status
                    .parse::<StepStatus>()
                    .map_err(|_| StepperError::command(format!("unknown status '{}'", status)))?;
                Ok(Self::Status(parse_key(key), status))
            }
            ("save", Some(arg)) => {
                let (key, payload) = split_assignment(s, arg)?;
                Ok(Self::Save(parse_key(key), serde_json::from_str(payload)?))
            }
            _ => Err(StepperError::command(format!("unknown command '{}'", s))),
        }
    }
}

fn split_assignment<'a>(command: &str, arg: &'a str) -> Result<(&'a str, &'a str), StepperError> {
    arg.split_once('=').ok_or_else(|| {
        StepperError::command(format!("'{}' must look like <key>=<value>", command))
    })
}

fn parse_key(raw: &str) -> StepKey {
    match raw.parse::<StepKey>() {
        Ok(key) => key,
        Err(never) => match never {},
    }
}

impl WalkCommand {
    /// Apply the command; navigation commands report whether they moved
    pub async fn apply(&self, shell: &mut StepperShell) -> bool {
        match self {
            Self::Next => shell.next().await,
            Self::Prev => shell.prev().await,
            Self::GoTo(key) => shell.engine_mut().go_to(key.clone()).await,
            Self::Click(index) => shell.click(*index).await,
            Self::Key(key) => {
                let current = shell.engine().current_index();
                shell.key(*key, current).await
            }
            Self::Status(key, status) => {
                shell.engine_mut().set_status(key.clone(), *status);
                true
            }
            Self::Save(key, payload) => {
                shell.engine_mut().save_data(key.clone(), payload.clone());
                true
            }
            Self::Teardown(index) => {
                shell.teardown_step(*index, None);
                true
            }
            Self::Reset(options) => {
                shell.engine_mut().reset(*options);
                true
            }
        }
    }
}

/// One data store entry; `key` serializes as a number for indices and a
/// string for aliases, so `0` and `"0"` stay apart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataEntry {
    pub key: StepKey,
    pub payload: Value,
}

/// JSON view of a shell after a walk
#[derive(Debug, Clone, Serialize)]
pub struct WalkSnapshot {
    pub current_index: usize,
    pub step_count: usize,
    pub progress_percent: f64,
    pub statuses: BTreeMap<usize, StepStatus>,
    pub visited: BTreeMap<usize, bool>,
    pub data: Vec<DataEntry>,
    pub steps: Vec<StepAppearance>,
}

impl WalkSnapshot {
    pub fn capture(shell: &StepperShell) -> Self {
        let engine = shell.engine();
        Self {
            current_index: engine.current_index(),
            step_count: engine.step_count(),
            progress_percent: shell.progress_percent(),
            statuses: engine.step_statuses(),
            visited: engine.visited_steps(),
            data: engine
                .data()
                .into_iter()
                .map(|(key, payload)| DataEntry { key, payload })
                .collect(),
            steps: shell.appearances(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StepDefinition, StepperConfig};
    use serde_json::json;

    fn shell(navigable: bool) -> StepperShell {
        StepperConfig {
            navigable,
            steps: vec![
                StepDefinition::new(Some("basic-info"), "Basic info"),
                StepDefinition::new(None, "Collateral"),
                StepDefinition::new(Some("review"), "Review"),
            ],
            ..StepperConfig::default()
        }
        .build_shell()
        .expect("build shell")
    }

    async fn walk(shell: &mut StepperShell, script: &[&str]) -> Vec<bool> {
        let mut results = Vec::new();
        for raw in script {
            let command: WalkCommand = raw.parse().expect("parse");
            results.push(command.apply(shell).await);
        }
        results
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!("next".parse::<WalkCommand>().unwrap(), WalkCommand::Next);
        assert_eq!(" prev ".parse::<WalkCommand>().unwrap(), WalkCommand::Prev);
        assert_eq!(
            "reset".parse::<WalkCommand>().unwrap(),
            WalkCommand::Reset(ResetOptions::default())
        );
    }

    #[test]
    fn test_parse_goto_index_and_alias() {
        assert_eq!(
            "goto:2".parse::<WalkCommand>().unwrap(),
            WalkCommand::GoTo(StepKey::Index(2))
        );
        assert_eq!(
            "goto:review".parse::<WalkCommand>().unwrap(),
            WalkCommand::GoTo(StepKey::from("review"))
        );
    }

    #[test]
    fn test_parse_assignments() {
        assert_eq!(
            "status:collateral=error".parse::<WalkCommand>().unwrap(),
            WalkCommand::Status(StepKey::from("collateral"), StepStatus::Error)
        );
        assert_eq!(
            r#"save:0={"x":1}"#.parse::<WalkCommand>().unwrap(),
            WalkCommand::Save(StepKey::Index(0), json!({"x": 1}))
        );
    }

    #[test]
    fn test_parse_resets() {
        assert_eq!(
            "reset:2".parse::<WalkCommand>().unwrap(),
            WalkCommand::Reset(ResetOptions::at(2))
        );
        assert_eq!(
            "reset-keep:1".parse::<WalkCommand>().unwrap(),
            WalkCommand::Reset(ResetOptions::at(1).keeping_data())
        );
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["jump", "click:x", "key:PageUp", "status:1", "status:1=done", "save:a={"] {
            assert!(bad.parse::<WalkCommand>().is_err(), "{} should not parse", bad);
        }
        assert!(matches!(
            "save:a={".parse::<WalkCommand>().unwrap_err(),
            StepperError::Json(_)
        ));
        assert!(matches!(
            "jump".parse::<WalkCommand>().unwrap_err(),
            StepperError::Command(_)
        ));
    }

    #[tokio::test]
    async fn test_walk_script_snapshot() {
        let mut shell = shell(false);

        let results = walk(&mut shell, &["goto:2", "status:1=finished", "teardown:2"]).await;
        assert_eq!(results, vec![true, true, true]);

        let snapshot = WalkSnapshot::capture(&shell);
        assert_eq!(snapshot.current_index, 1);
        assert_eq!(snapshot.step_count, 2);
        assert_eq!(
            snapshot.statuses,
            BTreeMap::from([(0, StepStatus::Finished), (1, StepStatus::Finished)])
        );
        assert_eq!(
            snapshot.data,
            vec![DataEntry {
                key: StepKey::from("review"),
                payload: json!({"visited": true}),
            }]
        );

        // Header navigation is off, so only the reset applies
        let results = walk(&mut shell, &["key:End", "click:1", "reset-keep:0"]).await;
        assert_eq!(results, vec![false, false, true]);

        let snapshot = WalkSnapshot::capture(&shell);
        assert_eq!(snapshot.current_index, 0);
        assert_eq!(
            snapshot.statuses,
            BTreeMap::from([(0, StepStatus::Active), (1, StepStatus::Pending)])
        );
        assert_eq!(snapshot.visited, BTreeMap::from([(0, true)]));
        assert_eq!(snapshot.progress_percent, 50.0);
        assert_eq!(snapshot.data.len(), 1);
        assert_eq!(snapshot.steps.len(), 2);
    }

    #[tokio::test]
    async fn test_walk_navigable_header_keys() {
        let mut shell = shell(true);
        let results = walk(&mut shell, &["key:End", "click:1", "prev", "next"]).await;
        assert_eq!(results, vec![true, true, true, true]);

        let snapshot = WalkSnapshot::capture(&shell);
        assert_eq!(snapshot.current_index, 1);
        assert_eq!(snapshot.statuses.get(&2), Some(&StepStatus::Finished));
        assert!(snapshot.data.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_keeps_index_and_alias_keys_apart() {
        let mut shell = shell(false);
        walk(&mut shell, &[r#"save:0={"a":1}"#]).await;
        shell
            .engine_mut()
            .save_data(StepKey::Alias("0".to_string()), json!({"b": 2}));

        let snapshot = WalkSnapshot::capture(&shell);
        assert_eq!(snapshot.data.len(), 2);

        let rendered = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            rendered["data"],
            json!([
                {"key": 0, "payload": {"a": 1}},
                {"key": "0", "payload": {"b": 2}},
            ])
        );
    }
}
