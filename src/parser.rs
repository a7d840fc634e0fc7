use crate::config::{AppConfig, PricingConfig};
use crate::extract::{
    TimeRange, discover_court_numbers, extract_prices, extract_primary_time_ranges,
    extract_secondary_time_ranges, first_court_label, first_currency_price,
    first_primary_time_range, resolve_court_from,
};
use crate::model::{ExtractedSlot, ExtractionStrategy, TimeSlot};
use crate::pricing::assign_price_for_time;
use anyhow::{Result, anyhow};
use scraper::{Html, Selector};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ParseContext {
    pub pricing: PricingConfig,
    pub row_selector: Selector,
}

impl ParseContext {
    pub fn new(pricing: PricingConfig, row_selector: &str) -> Result<Self> {
        let row_selector = Selector::parse(row_selector)
            .map_err(|err| anyhow!("invalid row selector {row_selector}: {err:?}"))?;
        Ok(Self {
            pricing,
            row_selector,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.pricing.clone(), &config.parse.row_selector)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    pub strategy: Option<ExtractionStrategy>,
    pub slots: Vec<ExtractedSlot>,
}

/// Runs the strategies in precedence order and keeps the first non-empty
/// result. Markup nothing recognizes yields an empty outcome, not an error.
pub fn parse_markup(markup: &str, ctx: &ParseContext) -> ParseOutcome {
    for strategy in ExtractionStrategy::ORDERED {
        let slots = run_strategy(strategy, markup, ctx);
        if slots.is_empty() {
            debug!(strategy = %strategy, "strategy produced no slots");
            continue;
        }
        info!(strategy = %strategy, slots = slots.len(), "markup parsed");
        return ParseOutcome {
            strategy: Some(strategy),
            slots,
        };
    }

    info!("no strategy recognized the markup");
    ParseOutcome::default()
}

pub fn run_strategy(
    strategy: ExtractionStrategy,
    markup: &str,
    ctx: &ParseContext,
) -> Vec<ExtractedSlot> {
    match strategy {
        ExtractionStrategy::RowStructured => parse_structured_rows(markup, ctx),
        ExtractionStrategy::PrimaryTimePattern => {
            slots_from_ranges(markup, extract_primary_time_ranges(markup), ctx)
        }
        ExtractionStrategy::SecondaryTimePattern => {
            slots_from_ranges(markup, extract_secondary_time_ranges(markup), ctx)
        }
    }
}

/// Each row must carry its own time range, court label and price; rows
/// missing any of them contribute nothing.
pub fn parse_structured_rows(markup: &str, ctx: &ParseContext) -> Vec<ExtractedSlot> {
    let document = Html::parse_document(markup);
    let mut out = Vec::new();

    for (index, row) in document.select(&ctx.row_selector).enumerate() {
        let text = row.text().collect::<Vec<_>>().join(" ");

        let Some(range) = first_primary_time_range(&text) else {
            debug!(row = index, "row has no time range; skipping");
            continue;
        };
        let Some(court) = first_court_label(&text) else {
            debug!(row = index, "row has no court label; skipping");
            continue;
        };
        let Some(price) = first_currency_price(&text) else {
            debug!(row = index, "row has no price; skipping");
            continue;
        };

        out.push(ExtractedSlot {
            court,
            slot: TimeSlot {
                start_time: range.start_time,
                end_time: range.end_time,
                available: true,
                price,
            },
        });
    }

    out
}

fn slots_from_ranges(
    markup: &str,
    ranges: Vec<TimeRange>,
    ctx: &ParseContext,
) -> Vec<ExtractedSlot> {
    if ranges.is_empty() {
        return Vec::new();
    }

    let court_numbers = discover_court_numbers(markup);
    let prices = extract_prices(markup, &ctx.pricing);
    debug!(
        ranges = ranges.len(),
        courts = court_numbers.len(),
        prices = prices.len(),
        "resolving flat markup"
    );

    ranges
        .into_iter()
        .enumerate()
        .map(|(index, range)| {
            let court = resolve_court_from(&court_numbers, index, Some(&range.start_time));
            let price = assign_price_for_time(&range.start_time, &prices, &ctx.pricing);
            ExtractedSlot {
                court,
                slot: TimeSlot {
                    start_time: range.start_time,
                    end_time: range.end_time,
                    available: true,
                    price,
                },
            }
        })
        .collect()
}
