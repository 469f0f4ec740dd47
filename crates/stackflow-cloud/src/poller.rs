//! Async job polling
//!
//! Mutating CloudStack commands usually answer with a `jobid` instead of the
//! finished object. [`JobPoller::wait`] queries the job until it succeeds,
//! fails, or the configured time budget runs out.

use crate::error::{ReconcileError, Result};
use serde_json::Value;
use stackflow_api::args::scalar_text;
use stackflow_api::{Args, Gateway};
use std::time::Duration;
use tokio::time::{Instant, sleep};

const JOB_PENDING: i64 = 0;
const JOB_SUCCEEDED: i64 = 1;
const JOB_FAILED: i64 = 2;

/// Poll timing
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Delay before the second check
    pub interval: Duration,

    /// Upper bound for a single delay
    pub max_interval: Duration,

    /// Backoff multiplier (1.0 = fixed interval)
    pub multiplier: f64,

    /// Total time budget for one job
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(10),
            multiplier: 1.0,
            timeout: Duration::from_secs(600),
        }
    }
}

impl PollConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Delay after the `attempt`-th check (0-based), capped at `max_interval`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay = self.interval.as_secs_f64() * self.multiplier.powi(exponent);
        // NaN and infinity fall through to the cap
        if !delay.is_finite() || delay >= self.max_interval.as_secs_f64() {
            return self.max_interval;
        }
        Duration::try_from_secs_f64(delay.max(0.0)).unwrap_or(self.max_interval)
    }
}

/// Pending async job of a mutating call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: String,

    /// Field of `jobresult` holding the finished object
    pub result_key: Option<String>,
}

impl JobHandle {
    pub fn new(job_id: impl Into<String>, result_key: Option<&str>) -> Self {
        Self {
            job_id: job_id.into(),
            result_key: result_key.map(str::to_string),
        }
    }

    /// Handle for the job started by `response`; `None` when the call
    /// completed synchronously
    pub fn from_response(response: &Value, result_key: Option<&str>) -> Option<Self> {
        response
            .get("jobid")
            .filter(|id| !id.is_null())
            .map(|id| Self::new(scalar_text(id), result_key))
    }
}

/// Object carried by a synchronous response
pub fn sync_result(response: Value, result_key: Option<&str>) -> Value {
    match result_key.and_then(|key| response.get(key)) {
        Some(inner) => inner.clone(),
        None => response,
    }
}

#[derive(Clone)]
pub struct JobPoller {
    gateway: Gateway,
    config: PollConfig,
}

impl JobPoller {
    pub fn new(gateway: Gateway, config: PollConfig) -> Self {
        Self { gateway, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Wait for the job of `response` if it started one, otherwise return
    /// the synchronous result right away
    pub async fn settle(&self, response: Value, result_key: Option<&str>) -> Result<Value> {
        match JobHandle::from_response(&response, result_key) {
            Some(handle) => self.wait(&handle).await,
            None => Ok(sync_result(response, result_key)),
        }
    }

    /// Block until the job finishes
    pub async fn wait(&self, handle: &JobHandle) -> Result<Value> {
        let started = Instant::now();
        let args = Args::new().with("jobid", handle.job_id.as_str());
        let mut attempt = 0u32;

        loop {
            let status = self.gateway.invoke("queryAsyncJobResult", &args).await?;

            match job_status(&status) {
                JOB_SUCCEEDED => {
                    tracing::debug!("Job {} succeeded after {} checks", handle.job_id, attempt + 1);
                    let result = status.get("jobresult").cloned().unwrap_or(Value::Null);
                    return Ok(sync_result(result, handle.result_key.as_deref()));
                }
                JOB_FAILED => {
                    let message = status
                        .get("jobresult")
                        .and_then(|r| r.get("errortext"))
                        .map(scalar_text)
                        .unwrap_or_else(|| "unknown error".to_string());
                    return Err(ReconcileError::JobFailed {
                        job_id: handle.job_id.clone(),
                        message,
                    });
                }
                _ => {}
            }

            let elapsed = started.elapsed();
            if elapsed >= self.config.timeout {
                return Err(ReconcileError::Timeout {
                    job_id: handle.job_id.clone(),
                    elapsed,
                });
            }

            let delay = self
                .config
                .delay_for_attempt(attempt)
                .min(self.config.timeout - elapsed);
            tracing::debug!("Job {} pending, next check in {:?}", handle.job_id, delay);
            sleep(delay).await;
            attempt += 1;
        }
    }
}

fn job_status(status: &Value) -> i64 {
    match status.get("jobstatus") {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(JOB_PENDING),
        Some(Value::String(s)) => s.parse().unwrap_or(JOB_PENDING),
        _ => JOB_PENDING,
    }
}
