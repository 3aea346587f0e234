pub mod backup_drawer;
pub mod resources;

use self::backup_drawer::{BackupAction, BackupDrawerState};
use self::resources::ResourcesState;

/// Application-wide state tree. Every write goes through a slice's reducer;
/// nothing mutates the slices directly.
#[derive(Debug, Default)]
pub struct Store {
    pub backups: BackupDrawerState,
    pub resources: ResourcesState,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&mut self, action: BackupAction) {
        backup_drawer::reduce(&mut self.backups, action);
    }
}
