pub mod commands;
pub mod error;
pub mod events;
pub mod pager;
pub mod query;
pub mod recorder;
pub mod registry;
pub mod report;
pub mod roster;
pub mod store;

use crate::modules::{Module, ModuleDefinition};
use recorder::ActivityRecorder;
use registry::ReportRegistry;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use store::ActivityStore;

pub const DEFINITION: ModuleDefinition = ModuleDefinition {
    id: "activity",
    name_key: "module-activity-name",
    desc_key: "module-activity-desc",
};

pub fn module() -> Module {
    Module {
        definition: DEFINITION,
        commands: commands::commands(),
        event_handlers: vec![events::handler],
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ActivitySettings {
    pub report_capacity: usize,
    pub report_idle: Duration,
    pub rescan_concurrency: usize,
}

/// Everything the activity commands and events share.
pub struct ActivityService {
    pub store: ActivityStore,
    pub recorder: ActivityRecorder,
    pub reports: Arc<ReportRegistry>,
}

impl ActivityService {
    pub fn new(db: DatabaseConnection, settings: ActivitySettings) -> Self {
        let store = ActivityStore::new(db);
        Self {
            recorder: ActivityRecorder::new(store.clone(), settings.rescan_concurrency),
            store,
            reports: Arc::new(ReportRegistry::new(
                settings.report_capacity,
                settings.report_idle,
            )),
        }
    }
}
