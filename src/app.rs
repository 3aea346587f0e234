use anyhow::Result;
use chrono::Utc;

use crate::api::ApiClientTrait;
use crate::search::{search_all, SearchResult, SearchResults};
use crate::state::backup_drawer::{
    self, enable_auto_enroll, gather_responses_and_errors, Accumulator, BackupAction,
};
use crate::state::Store;
use crate::types::{
    AppState, BackupSchedule, Domain, Image, InputMode, Linode, LinodeBackups, LinodeSpecs,
    LinodeType, NetworkUtilization, NodeBalancer, Volume,
};

pub const SCHEDULE_DAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// The two-hour backup windows the API accepts, one per even hour.
pub fn backup_windows() -> Vec<String> {
    (0..24).step_by(2).map(|hour| format!("W{}", hour)).collect()
}

/// Which kind of resource a flattened dashboard row points at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResultKind {
    Linode,
    Volume,
    NodeBalancer,
    Domain,
    Image,
}

pub struct App {
    pub state: AppState,
    pub dry_run_mode: bool,
    pub input_mode: InputMode,
    pub client: Box<dyn ApiClientTrait>,
    pub store: Store,
    pub search_query: String,
    pub search_results: SearchResults,
    pub selected_result_index: usize,
    pub show_help: bool,
    pub error: Option<String>,
    pub manual_input_active: bool,
    pub manual_input_buffer: String,
    pub manual_input_type: String, // "search", "snapshot_label", "backup_schedule"
    pub transfer: Option<NetworkUtilization>,
    pub cancel_backups_alert_open: bool,
    // Cleared on teardown; async outcomes arriving after that are discarded.
    pub alive: bool,
}

impl App {
    pub fn new(client: Box<dyn ApiClientTrait>, dry_run_mode: bool) -> Self {
        Self {
            state: AppState::Loading,
            dry_run_mode,
            input_mode: InputMode::Normal,
            client,
            store: Store::new(),
            search_query: String::new(),
            search_results: SearchResults::default(),
            selected_result_index: 0,
            show_help: false,
            error: None,
            manual_input_active: false,
            manual_input_buffer: String::new(),
            manual_input_type: String::new(),
            transfer: None,
            cancel_backups_alert_open: false,
            alive: true,
        }
    }

    /// Materializes every resource list from the API. In dry-run mode a
    /// small sample fleet is loaded instead so the UI stays drivable.
    pub async fn initialize(&mut self) -> Result<()> {
        self.state = AppState::Loading;

        if self.dry_run_mode {
            self.load_sample_resources();
            self.state = AppState::Dashboard;
            self.run_search();
            return Ok(());
        }

        let loaded = self.load_resources().await;
        match loaded {
            Ok(()) => {
                self.state = AppState::Dashboard;
                self.run_search();
            }
            Err(e) => {
                self.state = AppState::Error(format!("Failed to load resources: {}", e));
            }
        }

        Ok(())
    }

    async fn load_resources(&mut self) -> Result<()> {
        self.store.resources.linodes = self.client.list_linodes().await?;
        self.store.resources.volumes = self.client.list_volumes().await?;
        self.store.resources.nodebalancers = self.client.list_nodebalancers().await?;
        self.store.resources.domains = self.client.list_domains().await?;
        self.store.resources.images = self.client.list_images().await?;
        self.store.resources.types = self.client.list_types().await?;
        // The transfer pool readout is decorative; a failure here never
        // blocks the dashboard.
        self.transfer = self.client.get_network_utilization().await.ok();
        Ok(())
    }

    pub async fn refresh(&mut self) -> Result<()> {
        if self.dry_run_mode {
            return Ok(());
        }
        match self.load_resources().await {
            Ok(()) => self.run_search(),
            Err(e) => self.error = Some(format!("Refresh failed: {}", e)),
        }
        Ok(())
    }

    /// Re-runs the dashboard query against the in-memory resource lists.
    pub fn run_search(&mut self) {
        let resources = &self.store.resources;
        self.search_results = search_all(
            &resources.linodes,
            &resources.volumes,
            &resources.nodebalancers,
            &resources.domains,
            &resources.images,
            &self.search_query,
            &resources.types,
        );
        if self.selected_result_index >= self.search_results.len() {
            self.selected_result_index = 0;
        }
    }

    /// The dashboard renders results grouped by kind, in a fixed order; the
    /// selection index walks that flattened list.
    pub fn flattened_results(&self) -> Vec<(ResultKind, &SearchResult)> {
        let r = &self.search_results;
        r.linodes
            .iter()
            .map(|item| (ResultKind::Linode, item))
            .chain(r.volumes.iter().map(|item| (ResultKind::Volume, item)))
            .chain(
                r.nodebalancers
                    .iter()
                    .map(|item| (ResultKind::NodeBalancer, item)),
            )
            .chain(r.domains.iter().map(|item| (ResultKind::Domain, item)))
            .chain(r.images.iter().map(|item| (ResultKind::Image, item)))
            .collect()
    }

    pub fn selected_linode_id(&self) -> Option<u64> {
        let flattened = self.flattened_results();
        match flattened.get(self.selected_result_index) {
            Some((ResultKind::Linode, item)) => item.value.parse().ok(),
            _ => None,
        }
    }

    pub fn move_selection_up(&mut self) {
        if self.selected_result_index > 0 {
            self.selected_result_index -= 1;
        }
    }

    pub fn move_selection_down(&mut self) {
        let len = self.search_results.len();
        if len > 0 && self.selected_result_index < len - 1 {
            self.selected_result_index += 1;
        }
    }

    pub fn open_backup_drawer(&mut self) {
        self.store.dispatch(BackupAction::Open);
    }

    pub fn close_backup_drawer(&mut self) {
        self.store.dispatch(BackupAction::Close);
    }

    pub fn toggle_auto_enroll(&mut self) {
        self.store.dispatch(BackupAction::AutoEnrollToggle);
    }

    /// Confirms the backup drawer: either the plain bulk enablement, or the
    /// auto-enroll flow when the pending flag is set (which persists the
    /// account default first, then enables existing linodes).
    pub async fn confirm_backup_drawer(&mut self) {
        if self.store.backups.auto_enroll {
            if self.dry_run_mode {
                self.store.dispatch(BackupAction::AutoEnroll);
                self.store.dispatch(BackupAction::AutoEnrollSuccess);
                self.fabricate_enable_success();
                return;
            }
            enable_auto_enroll(self.client.as_ref(), &mut self.store).await;
        } else {
            self.run_backup_enable().await;
        }
    }

    /// Runs the bulk enablement batch. The fold happens away from the store
    /// so the outcome can be discarded when the app was torn down while the
    /// batch was still in flight.
    pub async fn run_backup_enable(&mut self) {
        if self.dry_run_mode {
            self.fabricate_enable_success();
            return;
        }

        // The batch is derived from a fresh listing so a stale mirror cannot
        // re-enable linodes handled elsewhere. A failure at this point means
        // the whole batch failed, before any per-linode outcome exists.
        match self.client.list_linodes().await {
            Ok(linodes) => self.store.resources.linodes = linodes,
            Err(_) => {
                backup_drawer::report_batch_failure(&mut self.store);
                return;
            }
        }

        let linodes_without_backups = self.store.resources.linodes_without_backups();
        self.store.dispatch(BackupAction::Enable);

        let mut accumulator = Accumulator::default();
        for linode in linodes_without_backups {
            accumulator =
                gather_responses_and_errors(self.client.as_ref(), accumulator, linode).await;
        }

        if !self.alive {
            return;
        }
        backup_drawer::apply_enable_outcome(&mut self.store, accumulator);
    }

    fn fabricate_enable_success(&mut self) {
        let success = self.store.resources.linodes_without_backups();
        self.store.dispatch(BackupAction::Enable);
        self.store
            .dispatch(BackupAction::EnableSuccess(success.clone()));

        let enabled: Vec<Linode> = success
            .into_iter()
            .map(|mut linode| {
                linode.backups.enabled = true;
                linode
            })
            .collect();
        self.store.resources.update_multiple_linodes(&enabled);
    }

    pub async fn take_snapshot(&mut self, label: String) {
        let Some(linode_id) = self.selected_linode_id() else {
            return;
        };
        if self.dry_run_mode {
            return;
        }
        if let Err(e) = self.client.take_snapshot(linode_id, &label).await {
            self.error = Some(format!("Snapshot failed: {}", e));
        }
    }

    /// Persists a new backup window for the selected linode. The input is a
    /// day name and a window token separated by whitespace, e.g.
    /// "Tuesday W10"; both are matched case-insensitively and stored in
    /// their canonical form.
    pub async fn update_backup_schedule(&mut self, input: &str) {
        let Some(linode_id) = self.selected_linode_id() else {
            return;
        };

        let mut parts = input.split_whitespace();
        let (Some(day_input), Some(window_input), None) =
            (parts.next(), parts.next(), parts.next())
        else {
            self.error = Some("Schedule must be \"<day> <window>\", e.g. Tuesday W10.".to_string());
            return;
        };

        let Some(day) = SCHEDULE_DAYS
            .iter()
            .copied()
            .find(|d| d.eq_ignore_ascii_case(day_input))
        else {
            self.error = Some(format!("\"{}\" is not a day of the week.", day_input));
            return;
        };
        let Some(window) = backup_windows()
            .into_iter()
            .find(|w| w.eq_ignore_ascii_case(window_input))
        else {
            self.error = Some(format!(
                "\"{}\" is not a backup window (W0, W2, ... W22).",
                window_input
            ));
            return;
        };

        if self.dry_run_mode {
            self.store
                .resources
                .set_backup_schedule(linode_id, day, &window);
            return;
        }

        match self.client.update_backup_schedule(linode_id, day, &window).await {
            Ok(()) => {
                self.store
                    .resources
                    .set_backup_schedule(linode_id, day, &window);
            }
            Err(e) => self.error = Some(format!("Could not update backup schedule: {}", e)),
        }
    }

    pub async fn cancel_backups(&mut self) {
        self.cancel_backups_alert_open = false;
        let Some(linode_id) = self.selected_linode_id() else {
            return;
        };
        if self.dry_run_mode {
            return;
        }
        match self.client.cancel_backups(linode_id).await {
            Ok(()) => {
                self.store.resources.set_backups_enabled(linode_id, false);
                self.run_search();
            }
            Err(e) => self.error = Some(format!("Could not cancel backups: {}", e)),
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn start_manual_input(&mut self, input_type: &str) {
        self.manual_input_active = true;
        self.manual_input_type = input_type.to_string();
        self.manual_input_buffer.clear();
        self.input_mode = InputMode::Editing;
    }

    pub async fn finish_manual_input(&mut self) -> Result<()> {
        let input_value = self.manual_input_buffer.trim().to_string();
        match self.manual_input_type.as_str() {
            "search" => {
                self.search_query = input_value;
                self.manual_input_active = false;
                self.input_mode = InputMode::Normal;
                self.selected_result_index = 0;
                self.run_search();
            }
            "snapshot_label" => {
                self.manual_input_active = false;
                self.input_mode = InputMode::Normal;
                if !input_value.is_empty() {
                    self.take_snapshot(input_value).await;
                }
            }
            "backup_schedule" => {
                self.manual_input_active = false;
                self.input_mode = InputMode::Normal;
                if !input_value.is_empty() {
                    self.update_backup_schedule(&input_value).await;
                }
            }
            _ => {
                self.manual_input_active = false;
                self.input_mode = InputMode::Normal;
            }
        }
        Ok(())
    }

    pub fn cancel_manual_input(&mut self) {
        self.manual_input_active = false;
        self.manual_input_buffer.clear();
        self.input_mode = InputMode::Normal;
    }

    pub fn shutdown(&mut self) {
        self.alive = false;
    }

    fn load_sample_resources(&mut self) {
        let resources = &mut self.store.resources;
        resources.types = vec![
            LinodeType {
                id: "g6-nanode-1".to_string(),
                label: "Nanode 1GB".to_string(),
                memory: 1024,
                disk: 25600,
                vcpus: 1,
            },
            LinodeType {
                id: "g6-standard-2".to_string(),
                label: "Linode 4GB".to_string(),
                memory: 4096,
                disk: 81920,
                vcpus: 2,
            },
        ];
        resources.images = vec![
            Image {
                id: "linode/debian12".to_string(),
                label: "Debian 12".to_string(),
                description: None,
                is_public: true,
                created: Some(Utc::now()),
            },
            Image {
                id: "private/1001".to_string(),
                label: "golden-web".to_string(),
                description: Some("Hardened web server image".to_string()),
                is_public: false,
                created: Some(Utc::now()),
            },
        ];
        resources.linodes = vec![
            Linode {
                id: 1,
                label: "web-01".to_string(),
                tags: vec!["production".to_string(), "web".to_string()],
                region: "us-east".to_string(),
                status: "running".to_string(),
                created: Some(Utc::now()),
                image: Some("linode/debian12".to_string()),
                type_id: Some("g6-standard-2".to_string()),
                specs: LinodeSpecs {
                    memory: 4096,
                    disk: 81920,
                    vcpus: 2,
                },
                backups: LinodeBackups {
                    enabled: false,
                    schedule: BackupSchedule::default(),
                },
            },
            Linode {
                id: 2,
                label: "db-01".to_string(),
                tags: vec!["production".to_string(), "database".to_string()],
                region: "us-east".to_string(),
                status: "running".to_string(),
                created: Some(Utc::now()),
                image: Some("linode/debian12".to_string()),
                type_id: Some("g6-standard-2".to_string()),
                specs: LinodeSpecs {
                    memory: 4096,
                    disk: 81920,
                    vcpus: 2,
                },
                backups: LinodeBackups {
                    enabled: true,
                    schedule: BackupSchedule::default(),
                },
            },
            Linode {
                id: 3,
                label: "staging-01".to_string(),
                tags: vec!["staging".to_string()],
                region: "eu-west".to_string(),
                status: "offline".to_string(),
                created: Some(Utc::now()),
                image: Some("private/1001".to_string()),
                type_id: Some("g6-nanode-1".to_string()),
                specs: LinodeSpecs {
                    memory: 1024,
                    disk: 25600,
                    vcpus: 1,
                },
                backups: LinodeBackups {
                    enabled: false,
                    schedule: BackupSchedule::default(),
                },
            },
        ];
        resources.volumes = vec![Volume {
            id: 10,
            label: "db-data".to_string(),
            tags: vec!["database".to_string()],
            size: 100,
            region: "us-east".to_string(),
            created: Some(Utc::now()),
        }];
        resources.nodebalancers = vec![NodeBalancer {
            id: 20,
            label: "web-lb".to_string(),
            tags: vec!["production".to_string()],
            hostname: "nb-192-0-2-1.newark.nodebalancer.linode.com".to_string(),
            created: Some(Utc::now()),
        }];
        resources.domains = vec![Domain {
            id: 30,
            domain: "example.com".to_string(),
            tags: vec!["production".to_string()],
            status: "active".to_string(),
            description: None,
        }];
        self.transfer = Some(NetworkUtilization {
            used: 421,
            quota: 5000,
            billable: 0,
        });
    }
}
