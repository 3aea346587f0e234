use anyhow::anyhow;
use mockall::Sequence;

use cloud_deck::api::MockApiClientTrait;
use cloud_deck::state::backup_drawer::{
    enable_all_backups, enable_auto_enroll, reduce, report_batch_failure, Accumulator,
    BackupAction, BackupDrawerState, BackupError, BATCH_FAILURE_ERROR, DEFAULT_AUTO_ENROLL_ERROR,
    DEFAULT_ENABLE_ERROR,
};
use cloud_deck::state::Store;
use cloud_deck::types::{
    AccountSettings, ApiErrorReason, ApiErrorResponse, BackupSchedule, Linode, LinodeBackups,
    LinodeSpecs,
};

fn make_linode(id: u64, label: &str, backups_enabled: bool) -> Linode {
    Linode {
        id,
        label: label.to_string(),
        tags: vec![],
        region: "us-east".to_string(),
        status: "running".to_string(),
        created: None,
        image: None,
        type_id: None,
        specs: LinodeSpecs {
            memory: 1024,
            disk: 25600,
            vcpus: 1,
        },
        backups: LinodeBackups {
            enabled: backups_enabled,
            schedule: BackupSchedule::default(),
        },
    }
}

fn api_error(reason: &str) -> anyhow::Error {
    anyhow::Error::new(ApiErrorResponse {
        errors: vec![ApiErrorReason {
            reason: reason.to_string(),
            field: None,
        }],
    })
}

fn store_with_linodes(linodes: Vec<Linode>) -> Store {
    let mut store = Store::new();
    store.resources.linodes = linodes;
    store
}

#[test]
fn test_default_state() {
    let state = BackupDrawerState::default();
    assert!(!state.open);
    assert!(!state.enabling);
    assert!(state.error.is_none());
    assert!(state.enable_errors.is_empty());
    assert!(!state.enable_success);
    assert_eq!(state.updated_count, 0);
    assert!(!state.auto_enroll);
    assert!(state.last_updated.is_none());
}

#[test]
fn test_open_clears_prior_outcome() {
    let mut state = BackupDrawerState {
        error: Some("boom".to_string()),
        enable_errors: vec![BackupError {
            linode_id: 1,
            reason: "failed".to_string(),
        }],
        auto_enroll_error: Some("nope".to_string()),
        updated_count: 3,
        auto_enroll: true,
        ..Default::default()
    };

    reduce(&mut state, BackupAction::Open);

    assert!(state.open);
    assert!(state.error.is_none());
    assert!(state.enable_errors.is_empty());
    assert!(state.auto_enroll_error.is_none());
    assert_eq!(state.updated_count, 0);
    assert!(!state.auto_enroll);
    assert!(state.last_updated.is_some());
}

#[test]
fn test_close_preserves_outcome() {
    let mut state = BackupDrawerState::default();
    reduce(&mut state, BackupAction::Open);
    reduce(
        &mut state,
        BackupAction::EnableError(Accumulator {
            success: vec![make_linode(1, "a", false)],
            errors: vec![BackupError {
                linode_id: 2,
                reason: "failed".to_string(),
            }],
        }),
    );

    reduce(&mut state, BackupAction::Close);

    // The outcome survives Close; only a new Open wipes it.
    assert!(!state.open);
    assert_eq!(state.updated_count, 1);
    assert_eq!(state.enable_errors.len(), 1);
}

#[test]
fn test_enable_clears_previous_batch() {
    let mut state = BackupDrawerState {
        enable_errors: vec![BackupError {
            linode_id: 1,
            reason: "failed".to_string(),
        }],
        enable_success: true,
        ..Default::default()
    };

    reduce(&mut state, BackupAction::Enable);

    assert!(state.enabling);
    assert!(state.enable_errors.is_empty());
    assert!(!state.enable_success);
}

#[test]
fn test_enable_success_records_count() {
    let mut state = BackupDrawerState::default();
    reduce(&mut state, BackupAction::Enable);
    reduce(
        &mut state,
        BackupAction::EnableSuccess(vec![make_linode(1, "a", false), make_linode(2, "b", false)]),
    );

    assert!(!state.enabling);
    assert!(state.enable_success);
    assert_eq!(state.updated_count, 2);
    assert_eq!(state.data.as_ref().map(|d| d.len()), Some(2));
}

#[test]
fn test_enable_error_counts_successes_not_failures() {
    let mut state = BackupDrawerState::default();
    reduce(
        &mut state,
        BackupAction::EnableError(Accumulator {
            success: vec![make_linode(1, "a", false), make_linode(3, "c", false)],
            errors: vec![BackupError {
                linode_id: 2,
                reason: "quota exceeded".to_string(),
            }],
        }),
    );

    assert!(!state.enabling);
    assert_eq!(state.updated_count, 2);
    assert_eq!(state.enable_errors.len(), 1);
    assert_eq!(state.enable_errors[0].reason, "quota exceeded");
}

#[test]
fn test_reset_errors_and_success() {
    let mut state = BackupDrawerState {
        error: Some("boom".to_string()),
        enable_errors: vec![BackupError {
            linode_id: 1,
            reason: "failed".to_string(),
        }],
        enable_success: true,
        updated_count: 4,
        ..Default::default()
    };

    reduce(&mut state, BackupAction::ResetErrors);
    assert!(state.enable_errors.is_empty());
    assert!(state.error.is_none());
    assert!(state.enable_success);

    reduce(&mut state, BackupAction::ResetSuccess);
    assert!(!state.enable_success);
    assert_eq!(state.updated_count, 0);
}

#[test]
fn test_auto_enroll_toggle_and_outcomes() {
    let mut state = BackupDrawerState::default();

    reduce(&mut state, BackupAction::AutoEnrollToggle);
    assert!(state.auto_enroll);
    reduce(&mut state, BackupAction::AutoEnrollToggle);
    assert!(!state.auto_enroll);

    reduce(&mut state, BackupAction::AutoEnroll);
    assert!(state.enrolling);
    reduce(
        &mut state,
        BackupAction::AutoEnrollError("bad token".to_string()),
    );
    assert!(!state.enrolling);
    assert_eq!(state.auto_enroll_error.as_deref(), Some("bad token"));

    reduce(&mut state, BackupAction::AutoEnroll);
    reduce(&mut state, BackupAction::AutoEnrollSuccess);
    assert!(!state.enrolling);
    assert!(state.auto_enroll_error.is_none());
}

#[tokio::test]
async fn test_enable_all_backups_full_success() {
    let mut client = MockApiClientTrait::new();
    client
        .expect_enable_backups()
        .times(2)
        .returning(|_| Ok(()));

    let mut store = store_with_linodes(vec![
        make_linode(1, "a", false),
        make_linode(2, "b", false),
    ]);

    let accumulator = enable_all_backups(&client, &mut store).await;

    assert_eq!(accumulator.success.len(), 2);
    assert!(accumulator.errors.is_empty());
    assert!(store.backups.enable_success);
    assert_eq!(store.backups.updated_count, 2);
    assert!(store.resources.linodes.iter().all(|l| l.backups.enabled));
}

#[tokio::test]
async fn test_enable_all_backups_partial_failure() {
    let mut client = MockApiClientTrait::new();
    client
        .expect_enable_backups()
        .withf(|id| *id == 1 || *id == 3)
        .times(2)
        .returning(|_| Ok(()));
    client
        .expect_enable_backups()
        .withf(|id| *id == 2)
        .times(1)
        .returning(|_| Err(api_error("quota exceeded")));

    let mut store = store_with_linodes(vec![
        make_linode(1, "a", false),
        make_linode(2, "b", false),
        make_linode(3, "c", false),
    ]);

    let accumulator = enable_all_backups(&client, &mut store).await;

    let success_ids: Vec<u64> = accumulator.success.iter().map(|l| l.id).collect();
    assert_eq!(success_ids, vec![1, 3]);
    assert_eq!(
        accumulator.errors,
        vec![BackupError {
            linode_id: 2,
            reason: "quota exceeded".to_string(),
        }]
    );

    assert!(!store.backups.enable_success);
    assert_eq!(store.backups.updated_count, 2);
    assert_eq!(store.backups.enable_errors.len(), 1);

    // The store reflects only the linodes that actually succeeded.
    let enabled: Vec<u64> = store
        .resources
        .linodes
        .iter()
        .filter(|l| l.backups.enabled)
        .map(|l| l.id)
        .collect();
    assert_eq!(enabled, vec![1, 3]);
}

#[tokio::test]
async fn test_enable_all_backups_skips_already_enabled() {
    let mut client = MockApiClientTrait::new();
    // Only linode 2 lacks backups, so only one call may go out.
    client
        .expect_enable_backups()
        .withf(|id| *id == 2)
        .times(1)
        .returning(|_| Ok(()));

    let mut store = store_with_linodes(vec![
        make_linode(1, "a", true),
        make_linode(2, "b", false),
        make_linode(3, "c", true),
    ]);

    let accumulator = enable_all_backups(&client, &mut store).await;

    assert_eq!(accumulator.success.len(), 1);
    assert_eq!(accumulator.success[0].id, 2);
}

#[tokio::test]
async fn test_enable_all_backups_calls_are_sequential_in_input_order() {
    let mut client = MockApiClientTrait::new();
    let mut seq = Sequence::new();
    for id in [5u64, 6, 7] {
        client
            .expect_enable_backups()
            .withf(move |got| *got == id)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
    }

    let mut store = store_with_linodes(vec![
        make_linode(5, "a", false),
        make_linode(6, "b", false),
        make_linode(7, "c", false),
    ]);

    enable_all_backups(&client, &mut store).await;
}

#[tokio::test]
async fn test_enable_error_default_reason_for_unstructured_errors() {
    let mut client = MockApiClientTrait::new();
    client
        .expect_enable_backups()
        .times(1)
        .returning(|_| Err(anyhow!("connection reset")));

    let mut store = store_with_linodes(vec![make_linode(1, "a", false)]);

    let accumulator = enable_all_backups(&client, &mut store).await;

    assert_eq!(accumulator.errors[0].reason, DEFAULT_ENABLE_ERROR);
}

#[tokio::test]
async fn test_enable_all_backups_with_no_candidates() {
    let client = MockApiClientTrait::new();
    let mut store = store_with_linodes(vec![make_linode(1, "a", true)]);

    let accumulator = enable_all_backups(&client, &mut store).await;

    assert!(accumulator.success.is_empty());
    assert!(accumulator.errors.is_empty());
    assert!(store.backups.enable_success);
    assert_eq!(store.backups.updated_count, 0);
}

#[test]
fn test_report_batch_failure_synthesizes_single_entry() {
    let mut store = Store::new();
    report_batch_failure(&mut store);

    assert_eq!(store.backups.enable_errors.len(), 1);
    assert_eq!(store.backups.enable_errors[0].linode_id, 0);
    assert_eq!(store.backups.enable_errors[0].reason, BATCH_FAILURE_ERROR);
    assert_eq!(store.backups.updated_count, 0);
}

#[tokio::test]
async fn test_auto_enroll_success_runs_bulk_enable() {
    let mut client = MockApiClientTrait::new();
    client
        .expect_update_account_settings()
        .withf(|enabled| *enabled)
        .times(1)
        .returning(|_| {
            Ok(AccountSettings {
                backups_enabled: true,
            })
        });
    client
        .expect_enable_backups()
        .times(1)
        .returning(|_| Ok(()));

    let mut store = store_with_linodes(vec![make_linode(1, "a", false)]);
    store.dispatch(BackupAction::AutoEnrollToggle);

    enable_auto_enroll(&client, &mut store).await;

    assert!(!store.backups.enrolling);
    assert!(store.backups.auto_enroll_error.is_none());
    assert!(store.backups.enable_success);
    assert_eq!(
        store
            .resources
            .account_settings
            .as_ref()
            .map(|s| s.backups_enabled),
        Some(true)
    );
}

#[tokio::test]
async fn test_auto_enroll_failure_halts_flow() {
    let mut client = MockApiClientTrait::new();
    client
        .expect_update_account_settings()
        .times(1)
        .returning(|_| Err(api_error("insufficient permissions")));
    // No enable_backups expectation: the flow must stop at the settings error.

    let mut store = store_with_linodes(vec![make_linode(1, "a", false)]);
    store.dispatch(BackupAction::AutoEnrollToggle);

    enable_auto_enroll(&client, &mut store).await;

    assert!(!store.backups.enrolling);
    assert_eq!(
        store.backups.auto_enroll_error.as_deref(),
        Some("insufficient permissions")
    );
    assert!(!store.backups.enable_success);
}

#[tokio::test]
async fn test_auto_enroll_failure_default_reason() {
    let mut client = MockApiClientTrait::new();
    client
        .expect_update_account_settings()
        .times(1)
        .returning(|_| Err(anyhow!("timeout")));

    let mut store = Store::new();
    enable_auto_enroll(&client, &mut store).await;

    assert_eq!(
        store.backups.auto_enroll_error.as_deref(),
        Some(DEFAULT_AUTO_ENROLL_ERROR)
    );
}

#[test]
fn test_reopen_after_error_clears_outcome() {
    let mut store = Store::new();
    store.dispatch(BackupAction::Open);
    store.dispatch(BackupAction::EnableError(Accumulator {
        success: vec![make_linode(1, "a", false)],
        errors: vec![BackupError {
            linode_id: 2,
            reason: "failed".to_string(),
        }],
    }));
    store.dispatch(BackupAction::Close);

    store.dispatch(BackupAction::Open);

    assert!(store.backups.enable_errors.is_empty());
    assert!(store.backups.error.is_none());
    assert_eq!(store.backups.updated_count, 0);
}

#[test]
fn test_set_backups_enabled_matches_by_id() {
    let mut store = store_with_linodes(vec![
        make_linode(1, "web-01", true),
        make_linode(2, "db-01", true),
    ]);

    store.resources.set_backups_enabled(2, false);

    assert!(store.resources.linodes[0].backups.enabled);
    assert!(!store.resources.linodes[1].backups.enabled);

    // Unknown ids are a no-op.
    store.resources.set_backups_enabled(99, false);
    assert!(store.resources.linodes[0].backups.enabled);
}

#[test]
fn test_set_backup_schedule_stores_day_and_window() {
    let mut store = store_with_linodes(vec![make_linode(1, "web-01", true)]);

    store.resources.set_backup_schedule(1, "Tuesday", "W10");

    let schedule = &store.resources.linodes[0].backups.schedule;
    assert_eq!(schedule.day.as_deref(), Some("Tuesday"));
    assert_eq!(schedule.window.as_deref(), Some("W10"));

    store.resources.set_backup_schedule(99, "Friday", "W0");
    assert_eq!(
        store.resources.linodes[0].backups.schedule.day.as_deref(),
        Some("Tuesday")
    );
}
