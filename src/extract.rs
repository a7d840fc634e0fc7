use crate::config::PricingConfig;
use crate::model::{DEFAULT_COURT_NAME, PriceCandidateSet, court_label};
use regex::Regex;
use std::ops::RangeInclusive;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Amounts outside this range are stray numbers, not court prices.
pub const PLAUSIBLE_PRICE_RANGE: RangeInclusive<f64> = 10.0..=1000.0;

const CLOCK: &str = r"(?:[01]\d|2[0-3]):[0-5]\d";

static PRIMARY_TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({CLOCK})\s*(?:às|as|até|ate|a|to)\s*({CLOCK})\b"
    ))
    .expect("primary time range regex must compile")
});

static SECONDARY_TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b({CLOCK})\s*[-–]\s*({CLOCK})\b"))
        .expect("secondary time range regex must compile")
});

static COURT_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:quadra|court)\s*(\d+)").expect("court label regex must compile")
});

static CURRENCY_PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)R\$\s*(\d+[.,]?\d*)").expect("currency price regex must compile")
});

static PRICE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)R\$\s*(\d+[.,]?\d*)",
        r"(?i)(\d+[.,]?\d*)\s*(?:reais|real)\b",
        r"(?i)valor[:\s]*R\$\s*(\d+[.,]?\d*)",
        r"(?i)preço[:\s]*R\$\s*(\d+[.,]?\d*)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("price regex must compile"))
    .collect()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    pub start_time: String,
    pub end_time: String,
}

/// Scans the markup with every price pattern, in order. Falls back to the
/// configured day/night pair when nothing plausible is found.
pub fn extract_prices(markup: &str, pricing: &PricingConfig) -> PriceCandidateSet {
    let mut prices = PriceCandidateSet::new();

    for pattern in PRICE_PATTERNS.iter() {
        for caps in pattern.captures_iter(markup) {
            let Some(value) = caps.get(1).and_then(|m| parse_amount(m.as_str())) else {
                continue;
            };
            if PLAUSIBLE_PRICE_RANGE.contains(&value) {
                prices.push_indexed(value);
            } else {
                trace!(value, "discarding implausible price candidate");
            }
        }
    }

    if prices.is_empty() {
        debug!("no price candidates in markup; using configured day/night prices");
        prices.push("day_price", pricing.day_price);
        prices.push("night_price", pricing.night_price);
    }

    prices
}

pub fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Primary "HH:MM às HH:MM" ranges, or the "HH:MM - HH:MM" form when the
/// primary pattern finds nothing.
pub fn extract_time_ranges(markup: &str) -> Vec<TimeRange> {
    let primary = extract_primary_time_ranges(markup);
    if !primary.is_empty() {
        return primary;
    }
    extract_secondary_time_ranges(markup)
}

pub fn extract_primary_time_ranges(markup: &str) -> Vec<TimeRange> {
    collect_ranges(&PRIMARY_TIME_RANGE, markup)
}

pub fn extract_secondary_time_ranges(markup: &str) -> Vec<TimeRange> {
    collect_ranges(&SECONDARY_TIME_RANGE, markup)
}

fn collect_ranges(pattern: &Regex, text: &str) -> Vec<TimeRange> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| {
            Some(TimeRange {
                start_time: caps.get(1)?.as_str().to_string(),
                end_time: caps.get(2)?.as_str().to_string(),
            })
        })
        .collect()
}

/// Court numbers mentioned anywhere in the markup, in order of appearance.
pub fn discover_court_numbers(markup: &str) -> Vec<String> {
    COURT_LABEL
        .captures_iter(markup)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

pub fn resolve_court(markup: &str, slot_index: usize, start_time: Option<&str>) -> String {
    resolve_court_from(&discover_court_numbers(markup), slot_index, start_time)
}

/// Round-robin over the discovered court numbers. `start_time` is only logged.
pub fn resolve_court_from(
    court_numbers: &[String],
    slot_index: usize,
    start_time: Option<&str>,
) -> String {
    if court_numbers.is_empty() {
        return DEFAULT_COURT_NAME.to_string();
    }
    let number = &court_numbers[slot_index % court_numbers.len()];
    let name = court_label(number);
    trace!(slot_index, start_time = ?start_time, court = %name, "resolved court");
    name
}

pub fn first_primary_time_range(text: &str) -> Option<TimeRange> {
    let caps = PRIMARY_TIME_RANGE.captures(text)?;
    Some(TimeRange {
        start_time: caps.get(1)?.as_str().to_string(),
        end_time: caps.get(2)?.as_str().to_string(),
    })
}

pub fn first_court_label(text: &str) -> Option<String> {
    let caps = COURT_LABEL.captures(text)?;
    caps.get(1).map(|m| court_label(m.as_str()))
}

pub fn first_currency_price(text: &str) -> Option<f64> {
    let caps = CURRENCY_PRICE.captures(text)?;
    caps.get(1).and_then(|m| parse_amount(m.as_str()))
}
