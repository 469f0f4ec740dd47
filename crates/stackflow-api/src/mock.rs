//! In-memory transport for tests
//!
//! Responses are scripted per command. A response queued with
//! [`MockTransport::respond_once`] is consumed by the next call; otherwise
//! the standing response set with [`MockTransport::respond`] is returned.
//! Every call is recorded so tests can assert which commands were issued.

use crate::args::Args;
use crate::error::{ApiError, Result};
use crate::transport::Transport;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Scripted {
    Payload(Value),
    Failure(String),
}

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub command: String,
    pub args: Args,
}

#[derive(Default)]
pub struct MockTransport {
    standing: Mutex<HashMap<String, Scripted>>,
    queued: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call to `command` with `payload`
    pub fn respond(&self, command: &str, payload: Value) -> &Self {
        self.lock_standing()
            .insert(command.to_string(), Scripted::Payload(payload));
        self
    }

    /// Answer the next call to `command` with `payload`
    pub fn respond_once(&self, command: &str, payload: Value) -> &Self {
        self.lock_queued()
            .entry(command.to_string())
            .or_default()
            .push_back(Scripted::Payload(payload));
        self
    }

    /// Make every call to `command` fail at the transport level
    pub fn fail(&self, command: &str, message: &str) -> &Self {
        self.lock_standing()
            .insert(command.to_string(), Scripted::Failure(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Arguments of every call to `command`, in order
    pub fn calls_to(&self, command: &str) -> Vec<Args> {
        self.calls()
            .into_iter()
            .filter(|c| c.command == command)
            .map(|c| c.args)
            .collect()
    }

    pub fn count(&self, command: &str) -> usize {
        self.calls_to(command).len()
    }

    /// Commands issued, in order
    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn lock_standing(&self) -> std::sync::MutexGuard<'_, HashMap<String, Scripted>> {
        self.standing.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_queued(&self) -> std::sync::MutexGuard<'_, HashMap<String, VecDeque<Scripted>>> {
        self.queued.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(&self, command: &str, args: &Args) -> Result<Value> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                command: command.to_string(),
                args: args.clone(),
            });
        }

        let queued = self
            .lock_queued()
            .get_mut(command)
            .and_then(VecDeque::pop_front);
        let scripted = match queued {
            Some(s) => Some(s),
            None => self.lock_standing().get(command).cloned(),
        };

        match scripted {
            Some(Scripted::Payload(payload)) => Ok(payload),
            Some(Scripted::Failure(message)) => Err(ApiError::Transport(message)),
            None => Err(ApiError::Transport(format!(
                "no scripted response for {}",
                command
            ))),
        }
    }
}
