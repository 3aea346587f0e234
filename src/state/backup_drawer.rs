use chrono::{DateTime, Utc};

use crate::api::ApiClientTrait;
use crate::state::Store;
use crate::types::Linode;

pub const DEFAULT_ENABLE_ERROR: &str = "Backups could not be enabled for this Linode.";
pub const BATCH_FAILURE_ERROR: &str = "There was an error enabling backups.";
pub const DEFAULT_AUTO_ENROLL_ERROR: &str =
    "Your account settings could not be updated. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub struct BackupError {
    pub linode_id: u64,
    pub reason: String,
}

/// Running outcome of a bulk-enable batch. Folding one linode at a time
/// keeps the invariant that every input ends up in exactly one of the two
/// lists, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    pub success: Vec<Linode>,
    pub errors: Vec<BackupError>,
}

#[derive(Debug, Clone)]
pub enum BackupAction {
    Open,
    Close,
    Enable,
    EnableSuccess(Vec<Linode>),
    EnableError(Accumulator),
    ResetErrors,
    ResetSuccess,
    AutoEnroll,
    AutoEnrollToggle,
    AutoEnrollSuccess,
    AutoEnrollError(String),
}

#[derive(Debug, Clone, Default)]
pub struct BackupDrawerState {
    pub open: bool,
    pub enabling: bool,
    pub error: Option<String>,
    pub enable_errors: Vec<BackupError>,
    pub enable_success: bool,
    pub updated_count: usize,
    pub data: Option<Vec<Linode>>,
    pub auto_enroll: bool,
    pub enrolling: bool,
    pub auto_enroll_error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Single entry point for backup-drawer state changes.
///
/// Close deliberately leaves the batch outcome in place so a reopened drawer
/// can still show it; Open is what wipes the previous outcome.
pub fn reduce(state: &mut BackupDrawerState, action: BackupAction) {
    match action {
        BackupAction::Open => {
            state.open = true;
            state.error = None;
            state.enable_errors.clear();
            state.auto_enroll_error = None;
            state.updated_count = 0;
            state.auto_enroll = false;
            state.last_updated = Some(Utc::now());
        }
        BackupAction::Close => {
            state.open = false;
            state.last_updated = Some(Utc::now());
        }
        BackupAction::Enable => {
            state.enabling = true;
            state.enable_errors.clear();
            state.enable_success = false;
            state.last_updated = Some(Utc::now());
        }
        BackupAction::EnableSuccess(success) => {
            state.enabling = false;
            state.enable_success = true;
            state.updated_count = success.len();
            state.data = Some(success);
            state.last_updated = Some(Utc::now());
        }
        BackupAction::EnableError(accumulator) => {
            state.enabling = false;
            state.enable_errors = accumulator.errors;
            state.updated_count = accumulator.success.len();
            state.last_updated = Some(Utc::now());
        }
        BackupAction::ResetErrors => {
            state.enable_errors.clear();
            state.error = None;
            state.last_updated = Some(Utc::now());
        }
        BackupAction::ResetSuccess => {
            state.enable_success = false;
            state.updated_count = 0;
            state.last_updated = Some(Utc::now());
        }
        BackupAction::AutoEnroll => {
            state.enrolling = true;
        }
        BackupAction::AutoEnrollToggle => {
            state.auto_enroll = !state.auto_enroll;
        }
        BackupAction::AutoEnrollSuccess => {
            state.auto_enroll_error = None;
            state.enrolling = false;
        }
        BackupAction::AutoEnrollError(error) => {
            state.auto_enroll_error = Some(error);
            state.enrolling = false;
        }
    }
}

/// Pulls the human-readable message out of an API error, falling back to
/// the given default when the error carries no structured body.
pub fn reason_from_error(error: &anyhow::Error, default: &str) -> String {
    error
        .downcast_ref::<crate::types::ApiErrorResponse>()
        .and_then(|response| response.errors.first())
        .map(|e| e.reason.clone())
        .unwrap_or_else(|| default.to_string())
}

/// Folds one linode's enable outcome into the accumulator. A rejected call
/// becomes an error entry; it never unwinds the surrounding loop.
pub async fn gather_responses_and_errors(
    client: &dyn ApiClientTrait,
    mut accumulator: Accumulator,
    linode: Linode,
) -> Accumulator {
    match client.enable_backups(linode.id).await {
        Ok(()) => accumulator.success.push(linode),
        Err(error) => accumulator.errors.push(BackupError {
            linode_id: linode.id,
            reason: reason_from_error(&error, DEFAULT_ENABLE_ERROR),
        }),
    }
    accumulator
}

/// Enables backups for every linode in the store that lacks them.
///
/// Calls are issued strictly one at a time as a courtesy to the API's rate
/// limits: linode i+1's request starts only once linode i's has settled.
/// Linodes already covered by backups never reach the network.
pub async fn enable_all_backups(client: &dyn ApiClientTrait, store: &mut Store) -> Accumulator {
    let linodes_without_backups = store.resources.linodes_without_backups();

    store.dispatch(BackupAction::Enable);

    let mut accumulator = Accumulator::default();
    for linode in linodes_without_backups {
        accumulator = gather_responses_and_errors(client, accumulator, linode).await;
    }

    apply_enable_outcome(store, accumulator.clone());

    accumulator
}

/// Reports the finished batch and propagates the successful subset to the
/// resource store so other views see the flipped flag.
pub fn apply_enable_outcome(store: &mut Store, accumulator: Accumulator) {
    if accumulator.errors.is_empty() {
        store.dispatch(BackupAction::EnableSuccess(accumulator.success.clone()));
    } else {
        store.dispatch(BackupAction::EnableError(accumulator.clone()));
    }

    let enabled: Vec<Linode> = accumulator
        .success
        .into_iter()
        .map(|mut linode| {
            linode.backups.enabled = true;
            linode
        })
        .collect();
    store.resources.update_multiple_linodes(&enabled);
}

/// Reports a batch that failed before any per-linode outcome existed, as a
/// single synthetic error entry.
pub fn report_batch_failure(store: &mut Store) {
    store.dispatch(BackupAction::EnableError(Accumulator {
        success: Vec::new(),
        errors: vec![BackupError {
            linode_id: 0,
            reason: BATCH_FAILURE_ERROR.to_string(),
        }],
    }));
}

/// Persists the pending auto-enroll flag as the account-level default, then
/// runs the bulk enablement for existing linodes. A settings failure halts
/// the flow with a single top-level error and touches nothing else.
pub async fn enable_auto_enroll(client: &dyn ApiClientTrait, store: &mut Store) {
    let backups_enabled = store.backups.auto_enroll;

    store.dispatch(BackupAction::AutoEnroll);

    match client.update_account_settings(backups_enabled).await {
        Ok(settings) => {
            store.dispatch(BackupAction::AutoEnrollSuccess);
            store.resources.update_account_settings(settings);
            enable_all_backups(client, store).await;
        }
        Err(error) => {
            let reason = reason_from_error(&error, DEFAULT_AUTO_ENROLL_ERROR);
            store.dispatch(BackupAction::AutoEnrollError(reason));
        }
    }
}
