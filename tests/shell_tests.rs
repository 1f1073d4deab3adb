//! Tests for the Stepper Shell
//!
//! These tests verify the host-facing layer:
//! - Mounting, clicks and keyboard navigation
//! - Teardown persistence
//! - Header appearance per status, with metadata overrides and defaults
//! - Progress and first/last flags

use serde_json::json;

use stepflow::registration::fields;
use stepflow::{
    NavKey, ShellOptions, StepChangeEvent, StepDeclaration, StepKey, StepMetadata, StepStatus,
    StepperShell,
};

fn wizard(navigable: bool) -> StepperShell {
    let mut shell = StepperShell::new(ShellOptions {
        navigable,
        ..ShellOptions::default()
    });
    shell
        .mount(vec![
            StepDeclaration::new(Some("basic-info"), StepMetadata::new().with_title("Basic info")),
            StepDeclaration::new(None, StepMetadata::new().with_title("Collateral")),
            StepDeclaration::new(Some("review"), StepMetadata::new().with_title("Review")),
        ])
        .expect("mount");
    shell
}

// =============================================================================
// Mounting
// =============================================================================

#[test]
fn test_mount_assigns_indices_in_order() {
    let shell = wizard(true);
    let engine = shell.engine();
    assert_eq!(engine.step_count(), 3);
    assert_eq!(engine.registration(1).and_then(|s| s.title()), Some("Collateral"));
    assert_eq!(engine.alias_to_index().get("review"), Some(&2));
    assert!(shell.is_first());
    assert!(!shell.is_last());
}

#[test]
fn test_mount_stops_at_duplicate_alias() {
    let mut shell = StepperShell::default();
    let result = shell.mount(vec![
        StepDeclaration::new(Some("a"), StepMetadata::new()),
        StepDeclaration::new(Some("a"), StepMetadata::new()),
        StepDeclaration::new(Some("c"), StepMetadata::new()),
    ]);
    assert!(result.unwrap_err().is_duplicate_alias());
    assert_eq!(shell.engine().step_count(), 1);
}

// =============================================================================
// Click and keyboard navigation
// =============================================================================

#[tokio::test]
async fn test_click_ignored_when_not_navigable() {
    let mut shell = wizard(false);
    assert!(!shell.click(2).await);
    assert!(!shell.key(NavKey::End, 0).await);
    assert_eq!(shell.engine().current_index(), 0);

    // Programmatic navigation still works
    assert!(shell.next().await);
    assert_eq!(shell.engine().current_index(), 1);
}

#[tokio::test]
async fn test_click_jumps_and_flags_skipped_steps() {
    let mut shell = wizard(true);
    assert!(shell.click(2).await);
    assert_eq!(shell.engine().status(1), StepStatus::Error);
    assert!(shell.is_last());
    assert!(!shell.click(7).await);
}

#[tokio::test]
async fn test_arrow_right_past_last_step_is_rejected() {
    let mut shell = wizard(true);
    assert!(shell.key(NavKey::End, 0).await);
    assert!(!shell.key(NavKey::ArrowRight, 2).await);
    assert_eq!(shell.engine().current_index(), 2);
}

#[tokio::test]
async fn test_change_events_carry_aliases() {
    let mut shell = wizard(true);
    let events = shell.engine_mut().subscribe();

    shell.next().await;
    shell.next().await;

    let received: Vec<StepChangeEvent> = events.try_iter().collect();
    assert_eq!(
        received,
        vec![
            StepChangeEvent {
                from: StepKey::from("basic-info"),
                to: StepKey::Index(1),
            },
            StepChangeEvent {
                from: StepKey::Index(1),
                to: StepKey::from("review"),
            },
        ]
    );
}

// =============================================================================
// Teardown
// =============================================================================

#[test]
fn test_teardown_saves_default_payload_under_alias() {
    let mut shell = wizard(true);
    shell.teardown_step(2, None);

    let engine = shell.engine();
    assert_eq!(engine.get_data("review"), Some(&json!({"visited": true})));
    assert_eq!(engine.step_count(), 2);
    assert!(!engine.alias_to_index().contains_key("review"));
}

#[test]
fn test_teardown_saves_payload_under_index_without_alias() {
    let mut shell = wizard(true);
    shell.teardown_step(1, Some(json!({"items": ["car"]})));

    assert_eq!(shell.engine().get_data(1), Some(&json!({"items": ["car"]})));
    assert!(shell.engine().registration(1).is_none());
}

#[tokio::test]
async fn test_teardown_of_current_last_step_clamps_position() {
    let mut shell = wizard(true);
    shell.click(2).await;
    shell.teardown_step(2, None);
    assert_eq!(shell.engine().current_index(), 1);
    assert!(shell.is_last());
}

// =============================================================================
// Appearance
// =============================================================================

#[tokio::test]
async fn test_finished_appearance_defaults() {
    let mut shell = wizard(true);
    shell.next().await;

    let look = shell.appearance(0).unwrap();
    assert_eq!(look.status, StepStatus::Finished);
    assert_eq!(look.status_class, "step-status-finished");
    assert_eq!(look.icon_class.as_deref(), Some("bi bi-check-circle-fill"));
    assert!(look.show_icon);
    assert_eq!(look.tooltip, "STEPPER_SUCCESS_TOOLTIP");
    assert!(!look.active);
    assert!(shell.appearance(1).unwrap().active);
}

#[tokio::test]
async fn test_error_appearance_uses_overrides() {
    let mut shell = StepperShell::new(ShellOptions {
        navigable: true,
        item_class: Some("wizard-item".to_string()),
        title_class: Some("wizard-title".to_string()),
        ..ShellOptions::default()
    });
    shell
        .mount(vec![
            StepDeclaration::new(None, StepMetadata::new().with_title("Start")),
            StepDeclaration::new(
                None,
                StepMetadata::new()
                    .with_title("Documents")
                    .with_field(fields::CSS_CLASS, "docs")
                    .with_field(fields::ERROR_ICON, "bi bi-x-octagon")
                    .with_field(fields::ERROR_ICON_CLASS, "pulse")
                    .with_field(fields::ERROR_ICON_COLOR, "#c00")
                    .with_field(fields::ERROR_TITLE_CLASS, "strike")
                    .with_field(fields::ERROR_TITLE_COLOR, "red")
                    .with_field(fields::ERROR_TOOLTIP, "Documents missing"),
            ),
            StepDeclaration::new(None, StepMetadata::new().with_title("End")),
        ])
        .unwrap();

    assert!(shell.click(2).await);

    let look = shell.appearance(1).unwrap();
    assert_eq!(look.status, StepStatus::Error);
    assert_eq!(look.classes, vec!["step", "step-status-error", "wizard-item", "docs"]);
    assert_eq!(look.title.as_deref(), Some("Documents"));
    assert_eq!(look.title_classes, vec!["wizard-title", "strike"]);
    assert_eq!(look.title_color.as_deref(), Some("red"));
    assert_eq!(look.icon_class.as_deref(), Some("bi bi-x-octagon pulse"));
    assert_eq!(look.icon_color.as_deref(), Some("#c00"));
    assert!(look.show_icon);
    assert_eq!(look.tooltip, "Documents missing");
}

#[tokio::test]
async fn test_icon_can_be_hidden_and_tooltip_falls_back() {
    let mut shell = StepperShell::new(ShellOptions::default());
    shell
        .mount(vec![
            StepDeclaration::new(
                None,
                StepMetadata::new()
                    .with_field(fields::SHOW_ICON_ON_FINISHED, false)
                    .with_field(fields::TOOLTIP, "First step"),
            ),
            StepDeclaration::new(None, StepMetadata::new()),
        ])
        .unwrap();

    shell.next().await;
    let look = shell.appearance(0).unwrap();
    assert!(!look.show_icon);
    assert_eq!(look.tooltip, "First step");
}

// =============================================================================
// Progress
// =============================================================================

#[tokio::test]
async fn test_progress_follows_current_index() {
    let mut shell = wizard(true);
    assert!((shell.progress_percent() - 100.0 / 3.0).abs() < 1e-9);
    shell.next().await;
    shell.next().await;
    assert_eq!(shell.progress_percent(), 100.0);
}

#[test]
fn test_progress_of_empty_shell() {
    let shell = StepperShell::default();
    assert_eq!(shell.progress_percent(), 0.0);
    assert!(shell.is_first());
    assert!(shell.is_last());
    assert!(shell.appearances().is_empty());
}
