use crate::config::VenueConfig;
use crate::error::AvailabilityError;
use crate::model::{
    AvailabilityDocument, AvailabilityResponse, Court, OrderingViolation, TimeSlot, parse_clock,
};
use crate::parser::ParseOutcome;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike};
use serde::Serialize;
use std::collections::BTreeMap;

/// Groups slots by court name. Courts come out sorted by name; slots keep
/// source order within each court.
pub fn build_document(
    date: NaiveDate,
    source: &str,
    outcome: ParseOutcome,
    crawl_timestamp: Option<DateTime<FixedOffset>>,
) -> AvailabilityDocument {
    let mut grouped: BTreeMap<String, Vec<TimeSlot>> = BTreeMap::new();
    for extracted in outcome.slots {
        grouped
            .entry(extracted.court)
            .or_default()
            .push(extracted.slot);
    }

    let courts: Vec<Court> = grouped
        .into_iter()
        .filter(|(_, slots)| !slots.is_empty())
        .map(|(name, time_slots)| Court { name, time_slots })
        .collect();

    AvailabilityDocument {
        date,
        total_courts: courts.len(),
        total_slots: count_slots(&courts),
        courts,
        source: source.to_string(),
        strategy: outcome.strategy,
        crawl_timestamp,
    }
}

pub fn count_slots(courts: &[Court]) -> usize {
    courts.iter().map(|court| court.time_slots.len()).sum()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub after: Option<NaiveTime>,
    pub before: Option<NaiveTime>,
}

impl TimeWindow {
    pub fn parse(after: Option<&str>, before: Option<&str>) -> Result<Self, AvailabilityError> {
        Ok(Self {
            after: after.map(parse_bound).transpose()?,
            before: before.map(parse_bound).transpose()?,
        })
    }

    /// Keeps available slots that end after `after` and start before `before`.
    pub fn admits(&self, slot: &TimeSlot) -> bool {
        if !slot.available {
            return false;
        }
        if let Some(after) = self.after {
            match slot.end() {
                Some(end) if end > after => {}
                _ => return false,
            }
        }
        if let Some(before) = self.before {
            match slot.start() {
                Some(start) if start < before => {}
                _ => return false,
            }
        }
        true
    }
}

fn parse_bound(value: &str) -> Result<NaiveTime, AvailabilityError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|err| AvailabilityError::InvalidInput(format!("{value}: {err}")))
}

/// Returns a filtered copy; the input is never modified, so cached data
/// stays whole for later queries.
pub fn filter_courts(courts: &[Court], window: &TimeWindow) -> Vec<Court> {
    courts
        .iter()
        .filter_map(|court| {
            let time_slots: Vec<TimeSlot> = court
                .time_slots
                .iter()
                .filter(|slot| window.admits(slot))
                .cloned()
                .collect();
            (!time_slots.is_empty()).then(|| Court {
                name: court.name.clone(),
                time_slots,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AvailabilitySummary {
    pub available_courts: usize,
    pub total_courts: usize,
    pub total_slots: usize,
}

impl AvailabilitySummary {
    pub fn describe(&self) -> String {
        format!(
            "{}/{} courts with available slots",
            self.available_courts, self.total_courts
        )
    }
}

pub fn summarize(document: &AvailabilityDocument, filtered: &[Court]) -> AvailabilitySummary {
    AvailabilitySummary {
        available_courts: filtered.len(),
        total_courts: document.courts.len(),
        total_slots: count_slots(filtered),
    }
}

pub fn build_response(
    document: &AvailabilityDocument,
    time_after: Option<&str>,
    time_before: Option<&str>,
    window: &TimeWindow,
) -> AvailabilityResponse {
    let courts = filter_courts(&document.courts, window);
    let summary = summarize(document, &courts);
    AvailabilityResponse {
        date: document.date.format("%Y-%m-%d").to_string(),
        query_time_after: time_after.map(str::to_string),
        query_time_before: time_before.map(str::to_string),
        courts,
        summary: summary.describe(),
        data_source: document.data_source(),
        total_slots: summary.total_slots,
        total_courts: summary.total_courts,
        available_courts: summary.available_courts,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutOfHoursSlot {
    pub court: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentAudit {
    pub ordering_violations: Vec<OrderingViolation>,
    pub outside_opening_hours: Vec<OutOfHoursSlot>,
    pub discovered_courts: usize,
    pub configured_courts: usize,
}

impl DocumentAudit {
    pub fn is_clean(&self) -> bool {
        self.ordering_violations.is_empty()
            && self.outside_opening_hours.is_empty()
            && self.discovered_courts <= self.configured_courts
    }
}

/// Flags data the pipeline accepts but downstream filtering assumes away.
pub fn audit_document(document: &AvailabilityDocument, venue: &VenueConfig) -> DocumentAudit {
    let outside_opening_hours = document
        .courts
        .iter()
        .flat_map(|court| {
            court
                .time_slots
                .iter()
                .filter(|slot| !within_opening_hours(slot, venue))
                .map(|slot| OutOfHoursSlot {
                    court: court.name.clone(),
                    start_time: slot.start_time.clone(),
                    end_time: slot.end_time.clone(),
                })
        })
        .collect();

    DocumentAudit {
        ordering_violations: document.ordering_violations(),
        outside_opening_hours,
        discovered_courts: document.courts.len(),
        configured_courts: venue.total_courts,
    }
}

fn within_opening_hours(slot: &TimeSlot, venue: &VenueConfig) -> bool {
    let Some(start) = parse_clock(&slot.start_time) else {
        return false;
    };
    let Some(end) = parse_clock(&slot.end_time) else {
        return false;
    };
    let close_minutes = venue.closing_hour * 60;
    let end_minutes = end.hour() * 60 + end.minute();
    start.hour() >= venue.opening_hour && end_minutes <= close_minutes
}
