use std::sync::Arc;

use crate::config::Config;
use crate::process::{ProcessRunner, SystemRunner};

/// Shared context handed to every flow.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Every `git`, `gh` and `claude` invocation goes through this runner.
    pub runner: Arc<dyn ProcessRunner>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            runner: Arc::new(SystemRunner),
        }
    }
}
