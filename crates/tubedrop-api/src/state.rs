//! Shared handler state.

use std::path::PathBuf;

use tubedrop_telemetry::Metrics;

use crate::workflow::SharedWorkflow;

pub(crate) struct ApiState {
    pub(crate) downloads: SharedWorkflow,
    pub(crate) telemetry: Metrics,
    pub(crate) downloads_dir: Option<PathBuf>,
}

impl ApiState {
    pub(crate) const fn new(
        downloads: SharedWorkflow,
        telemetry: Metrics,
        downloads_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            downloads,
            telemetry,
            downloads_dir,
        }
    }
}
