mod common;

use anyhow::Result;
use common::{date, read_fixture};
use courtside::config::PricingConfig;
use courtside::model::{ExtractionStrategy, TimeSlot};
use courtside::normalize::build_document;
use courtside::parser::{ParseContext, parse_markup, parse_structured_rows, run_strategy};

fn context() -> Result<ParseContext> {
    ParseContext::new(PricingConfig::default(), "div.row.striped-line")
}

fn slot(start: &str, end: &str, price: f64) -> TimeSlot {
    TimeSlot {
        start_time: start.to_string(),
        end_time: end.to_string(),
        available: true,
        price,
    }
}

#[test]
fn single_row_parses_to_one_slot() -> Result<()> {
    let html = r#"
        <div class="row striped-line">
            <div class="col-xs-7 col-md-4 pad-rgt-no">
                Qua, 22/Out - 08:00 às 09:00
                <span class="text-muted">Quadra 01</span>
            </div>
            <div class="col-xs-5 text-right">
                <span class="text-semibold">R$ 80,00</span>
            </div>
        </div>
    "#;

    let outcome = parse_markup(html, &context()?);
    assert_eq!(outcome.strategy, Some(ExtractionStrategy::RowStructured));

    let document = build_document(date(2025, 10, 22), "test", outcome, None);
    assert_eq!(document.total_courts, 1);
    assert_eq!(document.total_slots, 1);
    assert_eq!(document.courts[0].name, "Court 01");
    assert_eq!(document.courts[0].time_slots, vec![slot("08:00", "09:00", 80.0)]);
    Ok(())
}

#[test]
fn rows_missing_a_field_are_skipped() -> Result<()> {
    let html = read_fixture("rows.html")?;

    let slots = parse_structured_rows(&html, &context()?);

    assert_eq!(slots.len(), 3);
    assert!(slots.iter().all(|s| s.slot.start_time != "19:00"));
    Ok(())
}

#[test]
fn row_structure_takes_precedence_over_flat_patterns() -> Result<()> {
    let html = read_fixture("rows.html")?;
    let ctx = context()?;

    let outcome = parse_markup(&html, &ctx);
    assert_eq!(outcome.strategy, Some(ExtractionStrategy::RowStructured));

    let document = build_document(date(2025, 10, 22), "test", outcome, None);
    let names: Vec<&str> = document.courts.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Court 01", "Court 02"]);
    assert_eq!(
        document.courts[0].time_slots,
        vec![slot("08:00", "09:00", 80.0), slot("18:00", "19:00", 104.0)]
    );
    assert_eq!(document.total_slots, 3);

    // The flat chain alone would also pick up the promo line outside the rows.
    let flat = run_strategy(ExtractionStrategy::PrimaryTimePattern, &html, &ctx);
    assert!(flat.iter().any(|s| s.slot.start_time == "06:00"));
    Ok(())
}

#[test]
fn flat_markup_uses_round_robin_courts_and_price_tiers() -> Result<()> {
    let html = read_fixture("flat.html")?;

    let outcome = parse_markup(&html, &context()?);
    assert_eq!(outcome.strategy, Some(ExtractionStrategy::PrimaryTimePattern));

    let assigned: Vec<(&str, &str, f64)> = outcome
        .slots
        .iter()
        .map(|s| (s.court.as_str(), s.slot.start_time.as_str(), s.slot.price))
        .collect();
    assert_eq!(
        assigned,
        vec![
            ("Court 01", "07:00", 80.0),
            ("Court 02", "08:00", 80.0),
            ("Court 03", "18:00", 104.0),
            ("Court 01", "19:00", 104.0),
            ("Court 02", "20:00", 104.0),
        ]
    );
    Ok(())
}

#[test]
fn dashed_markup_falls_through_to_secondary_pattern() -> Result<()> {
    let html = read_fixture("dashed.html")?;

    let outcome = parse_markup(&html, &context()?);
    assert_eq!(
        outcome.strategy,
        Some(ExtractionStrategy::SecondaryTimePattern)
    );

    let document = build_document(date(2025, 10, 22), "test", outcome, None);
    assert_eq!(document.total_courts, 1);
    assert_eq!(document.courts[0].name, "Court 04");
    let prices: Vec<f64> = document.courts[0]
        .time_slots
        .iter()
        .map(|s| s.price)
        .collect();
    assert_eq!(prices, vec![80.0, 80.0, 104.0]);
    Ok(())
}

#[test]
fn unrecognized_markup_yields_an_empty_document() -> Result<()> {
    let html = read_fixture("empty.html")?;

    let outcome = parse_markup(&html, &context()?);
    assert_eq!(outcome.strategy, None);

    let document = build_document(date(2025, 10, 22), "test", outcome, None);
    assert_eq!(document.total_slots, 0);
    assert_eq!(document.total_courts, 0);
    assert!(document.courts.is_empty());
    Ok(())
}

#[test]
fn reversed_ranges_are_kept_and_flagged() -> Result<()> {
    let html = "<p>Quadra 2</p><p>22:00 às 06:00</p><p>08:00 às 09:00</p>";

    let outcome = parse_markup(html, &context()?);
    let document = build_document(date(2025, 10, 22), "test", outcome, None);

    assert_eq!(document.total_slots, 2);
    let violations = document.ordering_violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].court, "Court 02");
    assert_eq!(violations[0].start_time, "22:00");
    Ok(())
}

#[test]
fn invalid_row_selector_is_rejected() {
    assert!(ParseContext::new(PricingConfig::default(), "div[").is_err());
}
