use crate::types::{
    AccountSettings, BackupSchedule, Domain, Image, Linode, LinodeType, NodeBalancer, Volume,
};

/// Mirror of the account's server-side resources, materialized at startup
/// and patched in place as operations complete.
#[derive(Debug, Default)]
pub struct ResourcesState {
    pub linodes: Vec<Linode>,
    pub volumes: Vec<Volume>,
    pub nodebalancers: Vec<NodeBalancer>,
    pub domains: Vec<Domain>,
    pub images: Vec<Image>,
    pub types: Vec<LinodeType>,
    pub account_settings: Option<AccountSettings>,
}

impl ResourcesState {
    /// Replaces the stored copy of each given linode, matched by id.
    /// Linodes not already in the store are ignored.
    pub fn update_multiple_linodes(&mut self, updated: &[Linode]) {
        for linode in updated {
            if let Some(existing) = self.linodes.iter_mut().find(|l| l.id == linode.id) {
                *existing = linode.clone();
            }
        }
    }

    /// Flips the backups flag on the stored linode, if present.
    pub fn set_backups_enabled(&mut self, linode_id: u64, enabled: bool) {
        if let Some(linode) = self.linodes.iter_mut().find(|l| l.id == linode_id) {
            linode.backups.enabled = enabled;
        }
    }

    pub fn set_backup_schedule(&mut self, linode_id: u64, day: &str, window: &str) {
        if let Some(linode) = self.linodes.iter_mut().find(|l| l.id == linode_id) {
            linode.backups.schedule = BackupSchedule {
                day: Some(day.to_string()),
                window: Some(window.to_string()),
            };
        }
    }

    pub fn update_account_settings(&mut self, settings: AccountSettings) {
        self.account_settings = Some(settings);
    }

    pub fn linodes_without_backups(&self) -> Vec<Linode> {
        self.linodes
            .iter()
            .filter(|linode| !linode.backups.enabled)
            .cloned()
            .collect()
    }
}
