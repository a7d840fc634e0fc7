#![allow(dead_code)]

use anyhow::{Result, bail};
use chrono::NaiveDate;
use courtside::config::{AppConfig, FetchMode};
use courtside::fetch::{FetchedPage, PageFetcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn read_fixture(name: &str) -> Result<String> {
    Ok(std::fs::read_to_string(fixture_path(name))?)
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

/// Defaults with no network fetcher and no snapshot file.
pub fn offline_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.fetch.mode = FetchMode::Disabled;
    config.storage.snapshot_path = None;
    config
}

/// Serves pages keyed by date, counting every call.
pub struct StaticFetcher {
    pages: Vec<(NaiveDate, String)>,
    fallback: Option<String>,
    failure: Option<String>,
    delay: Duration,
    date_delays: Vec<(NaiveDate, Duration)>,
    calls: Arc<AtomicUsize>,
    fetched: Arc<Mutex<Vec<NaiveDate>>>,
}

impl StaticFetcher {
    pub fn serving(body: impl Into<String>) -> Self {
        Self {
            pages: Vec::new(),
            fallback: Some(body.into()),
            failure: None,
            delay: Duration::ZERO,
            date_delays: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
            fetched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            pages: Vec::new(),
            fallback: None,
            failure: Some(message.into()),
            delay: Duration::ZERO,
            date_delays: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
            fetched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_page(mut self, date: NaiveDate, body: impl Into<String>) -> Self {
        self.pages.push((date, body.into()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay applied only when fetching `date`.
    pub fn with_date_delay(mut self, date: NaiveDate, delay: Duration) -> Self {
        self.date_delays.push((date, delay));
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Dates passed to `fetch`, in call order.
    pub fn fetched(&self) -> Arc<Mutex<Vec<NaiveDate>>> {
        Arc::clone(&self.fetched)
    }
}

impl PageFetcher for StaticFetcher {
    fn fetch(&self, date: NaiveDate) -> Result<FetchedPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.fetched
            .lock()
            .expect("fetch log lock")
            .push(date);
        let delay = self
            .date_delays
            .iter()
            .find(|(delayed, _)| *delayed == date)
            .map_or(self.delay, |(_, delay)| *delay);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if let Some(message) = &self.failure {
            bail!("{message}");
        }

        let body = self
            .pages
            .iter()
            .find(|(page_date, _)| *page_date == date)
            .map(|(_, body)| body.clone())
            .or_else(|| self.fallback.clone());
        match body {
            Some(body) => Ok(FetchedPage {
                source_url: format!("stub://{date}"),
                body,
            }),
            None => bail!("no page for {date}"),
        }
    }
}
