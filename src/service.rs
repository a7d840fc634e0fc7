use crate::cache::{AvailabilityCache, LoadOutcome};
use crate::config::AppConfig;
use crate::error::AvailabilityError;
use crate::fetch::{PageFetcher, fetcher_from_config};
use crate::model::{AvailabilityDocument, AvailabilityResponse, ToolOutput};
use crate::normalize::{TimeWindow, audit_document, build_document, build_response};
use crate::parser::{ParseContext, parse_markup};
use crate::store::{SnapshotStore, store_from_config};
use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{info, warn};

pub struct AvailabilityService {
    config: AppConfig,
    context: ParseContext,
    fetcher: Option<Box<dyn PageFetcher>>,
    store: Box<dyn SnapshotStore>,
    cache: AvailabilityCache,
}

impl AvailabilityService {
    /// Seeds the cache from the store's snapshot, if one exists. A snapshot
    /// that cannot be read is logged and ignored.
    pub fn new(
        config: AppConfig,
        fetcher: Option<Box<dyn PageFetcher>>,
        store: Box<dyn SnapshotStore>,
    ) -> Result<Self> {
        let context = ParseContext::from_config(&config)?;
        let cache = AvailabilityCache::new();

        match store.load() {
            Ok(Some(document)) => {
                info!(
                    date = %document.date,
                    slots = document.total_slots,
                    "seeded cache from snapshot"
                );
                cache.put(document.date, Ok(Arc::new(document)));
            }
            Ok(None) => {}
            Err(err) => warn!(error = %format!("{err:#}"), "ignoring unreadable snapshot"),
        }

        Ok(Self {
            config,
            context,
            fetcher,
            store,
            cache,
        })
    }

    pub fn from_config(config: AppConfig) -> Result<Self> {
        let fetcher = fetcher_from_config(&config)?;
        let store = store_from_config(&config.storage);
        Self::new(config, fetcher, store)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &AvailabilityCache {
        &self.cache
    }

    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// The remote-callable operation. Every failure becomes an error
    /// document; nothing partial is returned.
    pub fn get_court_availability(
        &self,
        target_date: &str,
        time_after: Option<&str>,
        time_before: Option<&str>,
    ) -> ToolOutput {
        match self.query(target_date, time_after, time_before) {
            Ok(response) => ToolOutput::Availability(response),
            Err(err) => {
                warn!(date = target_date, error = %err, "availability query failed");
                ToolOutput::Error(err.to_document())
            }
        }
    }

    pub fn query(
        &self,
        target_date: &str,
        time_after: Option<&str>,
        time_before: Option<&str>,
    ) -> Result<AvailabilityResponse, AvailabilityError> {
        let date = parse_target_date(target_date)?;
        let window = TimeWindow::parse(time_after, time_before)?;
        let document = self.load_document(date)?;
        Ok(build_response(&document, time_after, time_before, &window))
    }

    /// Cached document for `date`, fetching at most once per date. Only a
    /// load that is still current when it finishes writes the snapshot.
    pub fn load_document(&self, date: NaiveDate) -> LoadOutcome {
        self.cache.get_or_load(
            date,
            || self.fetch_and_parse(date),
            |outcome| self.persist(outcome),
        )
    }

    pub fn parse_page(&self, date: NaiveDate, markup: &str) -> AvailabilityDocument {
        let outcome = parse_markup(markup, &self.context);
        let document = build_document(
            date,
            &self.config.venue.name,
            outcome,
            Some(self.crawl_timestamp()),
        );

        let audit = audit_document(&document, &self.config.venue);
        for violation in &audit.ordering_violations {
            warn!(
                court = %violation.court,
                start = %violation.start_time,
                end = %violation.end_time,
                "slot ends before it starts"
            );
        }
        if !audit.outside_opening_hours.is_empty() {
            warn!(
                slots = audit.outside_opening_hours.len(),
                opening = self.config.venue.opening_hour,
                closing = self.config.venue.closing_hour,
                "slots outside configured opening hours"
            );
        }
        if audit.discovered_courts > audit.configured_courts {
            warn!(
                discovered = audit.discovered_courts,
                configured = audit.configured_courts,
                "more courts than configured"
            );
        }

        document
    }

    fn fetch_and_parse(&self, date: NaiveDate) -> LoadOutcome {
        let Some(fetcher) = self.fetcher.as_deref() else {
            return Err(AvailabilityError::FetcherUnavailable(
                "fetching is disabled (fetch.mode = disabled) and no snapshot covers this date"
                    .to_string(),
            ));
        };

        info!(date = %date, "fetching availability");
        let page = fetcher
            .fetch(date)
            .map_err(|err| AvailabilityError::CrawlFailed(format!("{err:#}")))?;

        let document = self.parse_page(date, &page.body);
        info!(
            date = %date,
            url = %page.source_url,
            courts = document.total_courts,
            slots = document.total_slots,
            "availability loaded"
        );
        Ok(Arc::new(document))
    }

    fn persist(&self, outcome: LoadOutcome) -> LoadOutcome {
        let document = outcome?;
        self.store
            .save(&document)
            .map_err(|err| AvailabilityError::Load(format!("{err:#}")))?;
        Ok(document)
    }

    fn crawl_timestamp(&self) -> DateTime<FixedOffset> {
        let now = Utc::now();
        match self
            .config
            .venue
            .timezone
            .as_deref()
            .and_then(|name| name.parse::<Tz>().ok())
        {
            Some(tz) => now.with_timezone(&tz).fixed_offset(),
            None => now.fixed_offset(),
        }
    }
}

pub fn parse_target_date(value: &str) -> Result<NaiveDate, AvailabilityError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|err| AvailabilityError::InvalidInput(format!("{value}: {err}")))
}
