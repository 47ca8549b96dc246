//! Test doubles for the remote API, sensors, matrix, clock and log output

use crate::clock::Clock;
use crate::display::{DisplayGrid, LedMatrix};
use crate::remote::DataApi;
use crate::sensor::{EnvironmentSensors, HostIdentity};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone};
use sensehat_shared::{BoardIdentity, SubmitResult, UploadRecord};
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::subscriber::DefaultGuard;

/// Calls received by [`MockApi`]
#[derive(Debug, Default)]
pub struct ApiLog {
    pub auth_calls: usize,
    pub logouts: Vec<String>,
    pub uploads: Vec<(String, UploadRecord)>,
    pub reloads: usize,
}

/// Scripted behaviour of [`MockApi`]
#[derive(Debug)]
pub struct ApiScript {
    pub fail_auth: Option<String>,
    pub empty_token: bool,
    pub fail_logout: bool,
    pub unreachable: bool,
    pub submit: SubmitResult,
}

impl Default for ApiScript {
    fn default() -> Self {
        Self {
            fail_auth: None,
            empty_token: false,
            fail_logout: false,
            unreachable: false,
            submit: SubmitResult {
                record_id: Some("1".into()),
                ..Default::default()
            },
        }
    }
}

/// Data API double; clones share their log and script
#[derive(Debug, Clone, Default)]
pub struct MockApi {
    log: Arc<Mutex<ApiLog>>,
    script: Arc<Mutex<ApiScript>>,
}

impl MockApi {
    pub fn log(&self) -> MutexGuard<'_, ApiLog> {
        self.log.lock().unwrap()
    }

    pub fn script(&self) -> MutexGuard<'_, ApiScript> {
        self.script.lock().unwrap()
    }
}

#[async_trait]
impl DataApi for MockApi {
    async fn authenticate(&self) -> Result<String> {
        let calls = {
            let mut log = self.log();
            log.auth_calls += 1;
            log.auth_calls
        };

        let script = self.script();
        if let Some(reason) = &script.fail_auth {
            return Err(anyhow!("{}", reason));
        }
        if script.empty_token {
            return Ok(String::new());
        }
        Ok(format!("token-{}", calls))
    }

    async fn logout(&self, token: &str) -> Result<()> {
        self.log().logouts.push(token.to_string());
        if self.script().fail_logout {
            return Err(anyhow!("Logout rejected"));
        }
        Ok(())
    }

    async fn create_record(&self, token: &str, record: &UploadRecord) -> Result<SubmitResult> {
        self.log().uploads.push((token.to_string(), record.clone()));
        let script = self.script();
        if script.unreachable {
            return Err(anyhow!("connection refused"));
        }
        Ok(script.submit.clone())
    }

    async fn reload(&mut self) -> Result<()> {
        self.log().reloads += 1;
        Ok(())
    }

    fn endpoint(&self) -> String {
        "mock/SenseHat".into()
    }
}

/// Sensors with fixed readings and switchable failures
#[derive(Debug, Clone, Default)]
pub struct MockSensors {
    pub fail_refresh: bool,
    pub fail_humidity: bool,
    pub fail_pressure: bool,
}

#[async_trait]
impl EnvironmentSensors for MockSensors {
    async fn refresh(&mut self) -> Result<()> {
        if self.fail_refresh {
            return Err(anyhow!("i2c bus error"));
        }
        Ok(())
    }

    async fn humidity(&mut self) -> Result<f64> {
        if self.fail_humidity {
            return Err(anyhow!("humidity not ready"));
        }
        Ok(45.0)
    }

    async fn temperature(&mut self) -> Result<f64> {
        Ok(22.5)
    }

    async fn pressure(&mut self) -> Result<f64> {
        if self.fail_pressure {
            return Err(anyhow!("pressure not ready"));
        }
        Ok(1012.5)
    }
}

/// Identity with fixed values
#[derive(Debug, Clone, Default)]
pub struct MockIdentity {
    pub fail: bool,
}

#[async_trait]
impl HostIdentity for MockIdentity {
    async fn identity(&self) -> Result<BoardIdentity> {
        if self.fail {
            return Err(anyhow!("cpuinfo unreadable"));
        }
        Ok(BoardIdentity {
            processor_name: Some("BCM2835".into()),
            model_name: Some("Raspberry Pi 3 Model B Rev 1.2".into()),
            serial_number: Some("00000000a3e2b1c4".into()),
        })
    }
}

#[derive(Debug, Default)]
struct MatrixState {
    frames: Vec<DisplayGrid>,
    failing: bool,
}

/// Matrix recording every pushed frame
#[derive(Debug, Clone, Default)]
pub struct MockMatrix {
    state: Arc<Mutex<MatrixState>>,
}

impl MockMatrix {
    pub fn frames(&self) -> Vec<DisplayGrid> {
        self.state.lock().unwrap().frames.clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    pub fn clear_frames(&self) {
        self.state.lock().unwrap().frames.clear();
    }
}

#[async_trait]
impl LedMatrix for MockMatrix {
    async fn update(&mut self, grid: &DisplayGrid) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing {
            return Err(anyhow!("framebuffer gone"));
        }
        state.frames.push(grid.clone());
        Ok(())
    }

    fn name(&self) -> String {
        "mock matrix".into()
    }
}

#[derive(Debug)]
struct ClockState {
    now: DateTime<Local>,
    sleeps: Vec<Duration>,
}

/// Clock whose sleep advances its time instantly
#[derive(Debug, Clone)]
pub struct ManualClock {
    state: Arc<Mutex<ClockState>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(ClockState {
                now: Local.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
                sleeps: Vec::new(),
            })),
        }
    }
}

impl ManualClock {
    pub fn advance(&self, by: TimeDelta) {
        self.state.lock().unwrap().now += by;
    }

    /// Every sleep requested so far
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().unwrap().sleeps.clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        self.state.lock().unwrap().now
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap();
        state.now += TimeDelta::from_std(duration).unwrap_or_default();
        state.sleeps.push(duration);
    }
}

/// In-memory log sink for asserting on emitted lines
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    /// Route this thread's events here until the guard drops
    pub fn install(&self) -> DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.text().contains(needle)
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
