use crate::config::PricingConfig;
use crate::model::PriceCandidateSet;

/// Picks the price that applies at `hour`.
///
/// One distinct candidate is a flat rate. Two distinct candidates are a
/// day/night pair (lower is day). Three or more are noise, so the most
/// frequent value wins, ties going to the value seen first. With no
/// candidates the configured tiers apply.
pub fn assign_price(hour: u32, candidates: &PriceCandidateSet, pricing: &PricingConfig) -> f64 {
    let distinct = candidates.distinct_values();
    match distinct.as_slice() {
        [] => configured_tier_price(hour, pricing),
        [only] => *only,
        [day, night] => tier_price(hour, *day, *night, pricing.night_start_hour),
        _ => most_frequent(candidates).unwrap_or_else(|| configured_tier_price(hour, pricing)),
    }
}

/// Like [`assign_price`] for an `HH:MM` start time. An unreadable hour gets
/// the configured day price.
pub fn assign_price_for_time(
    start_time: &str,
    candidates: &PriceCandidateSet,
    pricing: &PricingConfig,
) -> f64 {
    match parse_hour(start_time) {
        Some(hour) => assign_price(hour, candidates, pricing),
        None => pricing.day_price,
    }
}

pub fn tier_price(hour: u32, day: f64, night: f64, night_start_hour: u32) -> f64 {
    if hour >= night_start_hour { night } else { day }
}

pub fn configured_tier_price(hour: u32, pricing: &PricingConfig) -> f64 {
    tier_price(
        hour,
        pricing.day_price,
        pricing.night_price,
        pricing.night_start_hour,
    )
}

fn parse_hour(time: &str) -> Option<u32> {
    let hour = time.split(':').next()?.trim().parse::<u32>().ok()?;
    (hour < 24).then_some(hour)
}

fn most_frequent(candidates: &PriceCandidateSet) -> Option<f64> {
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for value in candidates.values() {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(f64, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}
