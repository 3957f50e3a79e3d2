//! In-memory oracle fakes (testing only)
//!
//! Provide `ScriptedOracle`, `StageRoutedOracle`, `FlakyOracle` and
//! `SlowOracle`, which satisfy the [`Oracle`] contract without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AttemptError;
use crate::Oracle;

// ---------------------------------------------------------------------------
// ScriptedOracle
// ---------------------------------------------------------------------------

/// Replays a queue of canned outcomes in order and records every prompt.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    script: Mutex<VecDeque<Result<String, AttemptError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oracle that answers with each of `responses` in turn.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let oracle = Self::new();
        for r in responses {
            oracle.push_ok(r);
        }
        oracle
    }

    pub fn push_ok(&self, text: impl Into<String>) {
        self.script.lock().unwrap().push_back(Ok(text.into()));
    }

    pub fn push_err(&self, err: AttemptError) {
        self.script.lock().unwrap().push_back(Err(err));
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn generate(&self, prompt: &str) -> Result<String, AttemptError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AttemptError::Fatal("script exhausted".to_string())))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// StageRoutedOracle
// ---------------------------------------------------------------------------

/// Answers according to the first marker contained in the prompt.
///
/// Lets a test script a whole pipeline without caring about call order.
#[derive(Debug, Default)]
pub struct StageRoutedOracle {
    routes: Vec<(String, Result<String, AttemptError>)>,
    prompts: Mutex<Vec<String>>,
}

impl StageRoutedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `text` to any prompt containing `marker`.
    pub fn route(mut self, marker: &str, text: impl Into<String>) -> Self {
        self.routes.push((marker.to_string(), Ok(text.into())));
        self
    }

    /// Fail any prompt containing `marker` with `err`.
    pub fn fail_on(mut self, marker: &str, err: AttemptError) -> Self {
        self.routes.push((marker.to_string(), Err(err)));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for StageRoutedOracle {
    async fn generate(&self, prompt: &str) -> Result<String, AttemptError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.routes
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(|| Err(AttemptError::Fatal("no route matched prompt".to_string())))
    }

    fn name(&self) -> &str {
        "stage-routed"
    }
}

// ---------------------------------------------------------------------------
// FlakyOracle
// ---------------------------------------------------------------------------

/// Fails transiently `failures` times, then answers `text` forever.
#[derive(Debug)]
pub struct FlakyOracle {
    failures: u32,
    text: String,
    calls: AtomicU32,
}

impl FlakyOracle {
    pub fn new(failures: u32, text: impl Into<String>) -> Self {
        FlakyOracle {
            failures,
            text: text.into(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for FlakyOracle {
    async fn generate(&self, _prompt: &str) -> Result<String, AttemptError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            Err(AttemptError::Transient(format!("HTTP 503 (call {})", n + 1)))
        } else {
            Ok(self.text.clone())
        }
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

// ---------------------------------------------------------------------------
// SlowOracle
// ---------------------------------------------------------------------------

/// Sleeps for `delay` before answering.
#[derive(Debug)]
pub struct SlowOracle {
    delay: Duration,
    text: String,
}

impl SlowOracle {
    pub fn new(delay: Duration, text: impl Into<String>) -> Self {
        SlowOracle {
            delay,
            text: text.into(),
        }
    }
}

#[async_trait]
impl Oracle for SlowOracle {
    async fn generate(&self, _prompt: &str) -> Result<String, AttemptError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.text.clone())
    }

    fn name(&self) -> &str {
        "slow"
    }
}
