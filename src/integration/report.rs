// src/integration/report.rs

//! Error-reporting collaborator

use tracing::{error, warn};

/// Receives failures that the user should see
///
/// Each failure is reported once, right before the operation gives up.
pub trait ErrorReporter {
    fn error(&self, message: &str);
    fn warning(&self, message: &str);
}

/// Reports through the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn error(&self, message: &str) {
        error!("{}", message);
    }

    fn warning(&self, message: &str) {
        warn!("{}", message);
    }
}
