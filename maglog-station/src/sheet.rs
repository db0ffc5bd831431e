use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use maglog_core::DeviceId;

use crate::logger::{DeviceLog, SummaryEntry, TimeAnchor};

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("spreadsheet request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// One finished (or interrupted) day, shaped for the spreadsheet service:
/// a summary matrix and an event-timestamp column per device.
#[derive(Debug, Serialize)]
pub struct DayReport {
    pub date: String,
    pub summaries: BTreeMap<String, Vec<SummaryEntry>>,
    pub events: BTreeMap<String, Vec<f64>>,
    pub anchors: BTreeMap<String, TimeAnchor>,
}

impl DayReport {
    pub fn build(date: &str, devices: &BTreeMap<DeviceId, DeviceLog>) -> Self {
        let mut summaries = BTreeMap::new();
        let mut events = BTreeMap::new();
        let mut anchors = BTreeMap::new();

        for (device, log) in devices {
            let key = device.to_string();
            if !log.summaries.is_empty() {
                summaries.insert(key.clone(), log.summaries.clone());
            }
            if !log.events.is_empty() {
                events.insert(key.clone(), log.events.clone());
            }
            if let Some(anchor) = log.anchor {
                anchors.insert(key, anchor);
            }
        }

        Self {
            date: date.to_owned(),
            summaries,
            events,
            anchors,
        }
    }
}

/// Client for the external spreadsheet collaborator. One JSON POST per day
/// report; the caller treats every failure as non-fatal.
pub struct SheetClient {
    endpoint: String,
    http: reqwest::Client,
}

impl SheetClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn upload(&self, report: &DayReport) -> Result<(), SheetError> {
        let response = self.http.post(&self.endpoint).json(report).send().await?;
        response.error_for_status()?;
        Ok(())
    }
}
