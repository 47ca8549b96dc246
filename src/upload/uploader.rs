//! Record builder and submitter

use crate::remote::DataApi;
use chrono::{DateTime, Local};
use sensehat_shared::{
    fields, format_timestamp, ApiFault, ScriptRequest, SensorSnapshot, SubmitResult, UploadRecord,
};
use tracing::{error, info};

/// Builds one record per cycle and submits it with the current token
#[derive(Debug, Clone)]
pub struct RecordUploader {
    /// Script run server-side after the record is created; empty disables it
    script_name: String,
}

impl RecordUploader {
    pub fn new(script_name: impl Into<String>) -> Self {
        Self {
            script_name: script_name.into(),
        }
    }

    /// Build the record for one snapshot, omitting every absent reading
    pub fn build_record(
        &self,
        snapshot: &SensorSnapshot,
        started_at: &DateTime<Local>,
        submitted_at: &DateTime<Local>,
    ) -> UploadRecord {
        let mut record = UploadRecord::new();
        let identity = &snapshot.identity;

        record.add_optional(fields::RPI_PROCESSOR, identity.processor_name.as_deref());
        record.add_optional(fields::RPI_MODEL, identity.model_name.as_deref());
        record.add_optional(fields::RPI_SERIAL, identity.serial_number.as_deref());
        record.add_field(fields::WHEN_START, format_timestamp(started_at));
        record.add_optional(fields::HUMIDITY, snapshot.humidity.map(format_reading));
        record.add_optional(fields::TEMPERATURE, snapshot.temperature.map(format_reading));
        record.add_optional(fields::PRESSURE, snapshot.pressure.map(format_reading));
        record.add_field(fields::WHEN, format_timestamp(submitted_at));

        if !self.script_name.is_empty() {
            record.set_script(ScriptRequest::after(self.script_name.clone()));
        }

        record
    }

    /// Submit a record and log both error channels
    ///
    /// A request that never got an answer is reported on the record channel.
    pub async fn submit(&self, api: &dyn DataApi, token: &str, record: &UploadRecord) -> SubmitResult {
        let result = match api.create_record(token, record).await {
            Ok(result) => result,
            Err(e) => SubmitResult {
                record_error: Some(ApiFault::transport(format!("{:#}", e))),
                ..Default::default()
            },
        };

        match &result.record_error {
            Some(fault) => error!("[UPLOAD] CRITICAL: record not created: {}", fault),
            None => info!(
                "[UPLOAD] Record {} created",
                result.record_id.as_deref().unwrap_or("?")
            ),
        }

        if let Some(fault) = &result.script_error {
            error!("[UPLOAD] Script {} failed: {}", self.script_name, fault);
        }

        result
    }
}

/// Two decimals are well below the sensors' resolution
fn format_reading(value: f64) -> String {
    format!("{:.2}", value)
}
