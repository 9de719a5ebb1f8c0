//! In-process fakes for the store and translator collaborators.
//!
//! Compiled for this crate's tests and, via the `testing` feature, for
//! downstream crates' tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::Error;
use crate::dataset::{DatasetSource, RawRecord};
use crate::translator::Translator;

/// Build a raw store row with the standard LPI columns.
pub fn lpi_row(id: i64, country: &str, region: &str, lpi_score: Value, year: Value) -> RawRecord {
    match json!({"id": id, "country": country, "region": region, "lpi_score": lpi_score, "year": year}) {
        Value::Object(map) => map,
        _ => RawRecord::new(),
    }
}

/// Store fake that counts reads and can be switched to failing.
#[derive(Debug)]
pub struct FakeSource {
    rows: Mutex<Result<Vec<RawRecord>, String>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeSource {
    pub fn with_rows(rows: Vec<RawRecord>) -> Self {
        Self { rows: Mutex::new(Ok(rows)), calls: AtomicUsize::new(0), delay: None }
    }

    pub fn failing(message: &str) -> Self {
        Self { rows: Mutex::new(Err(message.to_string())), calls: AtomicUsize::new(0), delay: None }
    }

    /// Sleep this long inside every read.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_rows(&self, rows: Vec<RawRecord>) {
        *self.rows.lock().unwrap_or_else(|p| p.into_inner()) = Ok(rows);
    }

    pub fn fail_with(&self, message: &str) {
        *self.rows.lock().unwrap_or_else(|p| p.into_inner()) = Err(message.to_string());
    }

    /// Number of reads so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatasetSource for FakeSource {
    async fn fetch_rows(&self) -> Result<Vec<RawRecord>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.rows.lock().unwrap_or_else(|p| p.into_inner()).clone().map_err(Error::StoreFetch)
    }
}

type Script = dyn Fn(&str, &str) -> Result<String, Error> + Send + Sync;

/// Translator fake driven by a closure over `(instructions, question)`.
///
/// Every brief it receives is kept for later assertions.
pub struct ScriptedTranslator {
    script: Box<Script>,
    briefs: Mutex<Vec<String>>,
}

impl ScriptedTranslator {
    pub fn new(script: impl Fn(&str, &str) -> Result<String, Error> + Send + Sync + 'static) -> Self {
        Self { script: Box::new(script), briefs: Mutex::new(Vec::new()) }
    }

    /// Always answer with the same text.
    pub fn replying(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(move |_, _| Ok(reply.clone()))
    }

    /// Briefs received so far, oldest first.
    pub fn briefs(&self) -> Vec<String> {
        self.briefs.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn calls(&self) -> usize {
        self.briefs.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    async fn translate(&self, instructions: &str, question: &str) -> Result<String, Error> {
        self.briefs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(instructions.to_string());
        (self.script)(instructions, question)
    }
}
