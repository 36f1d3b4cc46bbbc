pub mod api;
pub mod config;
pub mod error;
pub mod listener;
pub mod logging;
pub mod run;
pub mod runner;
pub mod signature;
pub mod trigger;
pub mod webhook;

use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};

pub use config::{LitePipeConfig, load_config};

use crate::run::Run;
use crate::runner::TaskRunner;
use crate::trigger::PathMatcher;

/// Capacity of the finished-run broadcast channel
const RUN_EVENTS_CAPACITY: usize = 64;

pub struct AppState {
    /// Held for the duration of a task run when runs are serialized
    pub run_execution_lock: Mutex<()>,
    /// Every finished run (skipped ones included) is published here
    pub run_events: broadcast::Sender<Run>,
    pub config: LitePipeConfig,
    pub matcher: PathMatcher,
    pub runner: TaskRunner,
}

impl AppState {
    pub fn new(config: LitePipeConfig) -> Self {
        let (run_events, _) = broadcast::channel(RUN_EVENTS_CAPACITY);
        Self {
            run_execution_lock: Mutex::new(()),
            run_events,
            matcher: PathMatcher::new(config.trigger_paths.as_slice()),
            runner: TaskRunner::from_config(&config),
            config,
        }
    }
}

pub type SharedState = Arc<AppState>;
