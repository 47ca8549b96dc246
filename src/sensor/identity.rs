//! Host identity from procfs

use crate::sensor::traits::HostIdentity;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sensehat_shared::BoardIdentity;
use std::path::PathBuf;

/// Reads processor, model and serial number of a Raspberry Pi
pub struct ProcIdentity {
    cpuinfo_path: PathBuf,
    model_path: PathBuf,
}

impl ProcIdentity {
    pub fn new(cpuinfo_path: PathBuf, model_path: PathBuf) -> Self {
        Self {
            cpuinfo_path,
            model_path,
        }
    }
}

/// Extract the identity fields from `/proc/cpuinfo` text
///
/// The processor comes from `Hardware` (SoC name on Raspberry Pi kernels),
/// falling back to the first `model name`.
pub fn parse_cpuinfo(text: &str) -> BoardIdentity {
    let mut identity = BoardIdentity::default();
    let mut cpu_model = None;

    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match key.trim() {
            "Hardware" => identity.processor_name = Some(value.to_string()),
            "model name" if cpu_model.is_none() => cpu_model = Some(value.to_string()),
            "Model" => identity.model_name = Some(value.to_string()),
            "Serial" => identity.serial_number = Some(value.to_string()),
            _ => {}
        }
    }

    if identity.processor_name.is_none() {
        identity.processor_name = cpu_model;
    }
    identity
}

/// Device tree strings end with a NUL byte
fn clean_model(raw: &str) -> Option<String> {
    let model = raw.trim_end_matches('\0').trim();
    (!model.is_empty()).then(|| model.to_string())
}

#[async_trait]
impl HostIdentity for ProcIdentity {
    async fn identity(&self) -> Result<BoardIdentity> {
        let cpuinfo = tokio::fs::read_to_string(&self.cpuinfo_path)
            .await
            .with_context(|| format!("Failed to read {}", self.cpuinfo_path.display()))?;

        let mut identity = parse_cpuinfo(&cpuinfo);
        if identity.model_name.is_none() {
            // Older kernels have no Model line in cpuinfo
            if let Ok(raw) = tokio::fs::read_to_string(&self.model_path).await {
                identity.model_name = clean_model(&raw);
            }
        }

        Ok(identity)
    }
}
