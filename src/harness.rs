use crate::config::AppConfig;
use crate::fetch::{FetchedPage, FileFetcher, PageFetcher};
use crate::model::{ExtractionStrategy, ToolOutput};
use crate::normalize::{DocumentAudit, audit_document};
use crate::service::AvailabilityService;
use crate::store::MemorySnapshotStore;
use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub markup_path: PathBuf,
    pub date: NaiveDate,
    pub config: AppConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub strategy: Option<ExtractionStrategy>,
    pub total_courts: usize,
    pub total_slots: usize,
    pub first_query_slots: usize,
    pub second_query_slots: usize,
    pub fetches: usize,
    pub audit: DocumentAudit,
}

/// Fetcher wrapper that counts calls, shared with the harness.
pub struct CountingFetcher<F> {
    inner: F,
    calls: Arc<AtomicUsize>,
}

impl<F: PageFetcher> CountingFetcher<F> {
    pub fn new(inner: F) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl<F: PageFetcher> PageFetcher for CountingFetcher<F> {
    fn fetch(&self, date: NaiveDate) -> Result<FetchedPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(date)
    }
}

/// Queries the same date twice against a saved page. A healthy run
/// fetches once and returns the same slots both times.
pub fn run_harness(options: &HarnessOptions) -> Result<HarnessReport> {
    let (fetcher, calls) = CountingFetcher::new(FileFetcher::new(&options.markup_path));
    let service = AvailabilityService::new(
        options.config.clone(),
        Some(Box::new(fetcher)),
        Box::new(MemorySnapshotStore::new()),
    )?;

    let date = options.date.format("%Y-%m-%d").to_string();
    let first = expect_availability(service.get_court_availability(&date, None, None))?;
    let second = expect_availability(service.get_court_availability(&date, None, None))?;

    let document = match service.load_document(options.date) {
        Ok(document) => document,
        Err(err) => bail!("{err}"),
    };

    Ok(HarnessReport {
        strategy: document.strategy,
        total_courts: document.total_courts,
        total_slots: document.total_slots,
        first_query_slots: first,
        second_query_slots: second,
        fetches: calls.load(Ordering::SeqCst),
        audit: audit_document(&document, &options.config.venue),
    })
}

fn expect_availability(output: ToolOutput) -> Result<usize> {
    match output {
        ToolOutput::Availability(response) => Ok(response.total_slots),
        ToolOutput::Error(doc) => bail!("{}", doc.error),
    }
}
