//! Data API abstraction for pluggable server backends

use anyhow::Result;
use async_trait::async_trait;
use sensehat_shared::{SubmitResult, UploadRecord};

/// Operations the agent needs from the remote tabular-data server
#[async_trait]
pub trait DataApi: Send + Sync {
    /// Log in with the configured credentials, returning a session token
    async fn authenticate(&self) -> Result<String>;

    /// Log the given token out
    async fn logout(&self, token: &str) -> Result<()>;

    /// Create one record; `Err` means no answer was received at all
    async fn create_record(&self, token: &str, record: &UploadRecord) -> Result<SubmitResult>;

    /// Re-read connection settings before the next login
    async fn reload(&mut self) -> Result<()> {
        Ok(())
    }

    /// Human-readable name of the server endpoint
    fn endpoint(&self) -> String;
}
