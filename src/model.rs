use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_COURT_NAME: &str = "Court 01";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlot {
    pub start_time: String,
    pub end_time: String,
    pub available: bool,
    pub price: f64,
}

impl TimeSlot {
    pub fn start(&self) -> Option<NaiveTime> {
        parse_clock(&self.start_time)
    }

    pub fn end(&self) -> Option<NaiveTime> {
        parse_clock(&self.end_time)
    }

    /// Both times are zero-padded 24h strings, so lexical order is clock order.
    pub fn is_well_ordered(&self) -> bool {
        self.start_time < self.end_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Court {
    pub name: String,
    pub time_slots: Vec<TimeSlot>,
}

/// A slot as produced by one extraction strategy, before grouping by court.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSlot {
    pub court: String,
    pub slot: TimeSlot,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    RowStructured,
    PrimaryTimePattern,
    SecondaryTimePattern,
}

impl ExtractionStrategy {
    /// Precedence order: the first strategy yielding slots wins.
    pub const ORDERED: [ExtractionStrategy; 3] = [
        ExtractionStrategy::RowStructured,
        ExtractionStrategy::PrimaryTimePattern,
        ExtractionStrategy::SecondaryTimePattern,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ExtractionStrategy::RowStructured => "row_structured",
            ExtractionStrategy::PrimaryTimePattern => "primary_time_pattern",
            ExtractionStrategy::SecondaryTimePattern => "secondary_time_pattern",
        }
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityDocument {
    pub date: NaiveDate,
    pub courts: Vec<Court>,
    pub total_courts: usize,
    pub total_slots: usize,
    pub source: String,
    #[serde(default)]
    pub strategy: Option<ExtractionStrategy>,
    #[serde(default)]
    pub crawl_timestamp: Option<DateTime<FixedOffset>>,
}

impl AvailabilityDocument {
    pub fn data_source(&self) -> String {
        match self.strategy {
            Some(strategy) => format!("{} ({strategy})", self.source),
            None => self.source.clone(),
        }
    }

    pub fn ordering_violations(&self) -> Vec<OrderingViolation> {
        self.courts
            .iter()
            .flat_map(|court| {
                court
                    .time_slots
                    .iter()
                    .filter(|slot| !slot.is_well_ordered())
                    .map(|slot| OrderingViolation {
                        court: court.name.clone(),
                        start_time: slot.start_time.clone(),
                        end_time: slot.end_time.clone(),
                    })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OrderingViolation {
    pub court: String,
    pub start_time: String,
    pub end_time: String,
}

/// Candidate prices in extraction order. Keys are arbitrary labels and
/// values may repeat across keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceCandidateSet {
    entries: Vec<(String, f64)>,
}

impl PriceCandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut set = Self::new();
        for value in values {
            set.push_indexed(value);
        }
        set
    }

    pub fn push(&mut self, key: impl Into<String>, value: f64) {
        self.entries.push((key.into(), value));
    }

    pub fn push_indexed(&mut self, value: f64) {
        let key = format!("price_{}", self.entries.len());
        self.entries.push((key, value));
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|(_, value)| *value)
    }

    pub fn contains_value(&self, value: f64) -> bool {
        self.values().any(|v| v == value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct values, ascending.
    pub fn distinct_values(&self) -> Vec<f64> {
        let mut values: Vec<f64> = self.values().collect();
        values.sort_by(f64::total_cmp);
        values.dedup();
        values
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityResponse {
    pub date: String,
    pub query_time_after: Option<String>,
    pub query_time_before: Option<String>,
    pub courts: Vec<Court>,
    pub summary: String,
    pub data_source: String,
    pub total_slots: usize,
    pub total_courts: usize,
    pub available_courts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDocument {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ToolOutput {
    Error(ErrorDocument),
    Availability(AvailabilityResponse),
}

impl ToolOutput {
    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutput::Error(_))
    }
}

pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

pub fn court_label(digits: &str) -> String {
    match digits.parse::<u32>() {
        Ok(number) => format!("Court {number:02}"),
        Err(_) => format!("Court {digits}"),
    }
}
