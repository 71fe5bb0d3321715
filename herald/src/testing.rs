use async_trait::async_trait;
use herald_core::Report;
use herald_delivery::{Transport, TransportError};
use parking_lot::Mutex;
use std::sync::Arc;

/// Accepts every report and keeps it.
#[derive(Default)]
pub(crate) struct Recording {
    reports: Mutex<Vec<Report>>,
}

impl Recording {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }
}

#[async_trait]
impl Transport for Recording {
    async fn transmit(&self, report: &Report) -> Result<(), TransportError> {
        self.reports.lock().push(report.clone());
        Ok(())
    }
}
