mod common;

use anyhow::Result;
use chrono::NaiveTime;
use common::date;
use courtside::config::VenueConfig;
use courtside::error::AvailabilityError;
use courtside::model::{
    AvailabilityDocument, Court, ExtractedSlot, ExtractionStrategy, TimeSlot,
};
use courtside::normalize::{
    TimeWindow, audit_document, build_document, build_response, filter_courts, summarize,
};
use courtside::parser::ParseOutcome;

fn slot(start: &str, end: &str, available: bool) -> TimeSlot {
    TimeSlot {
        start_time: start.to_string(),
        end_time: end.to_string(),
        available,
        price: 80.0,
    }
}

fn extracted(court: &str, start: &str, end: &str) -> ExtractedSlot {
    ExtractedSlot {
        court: court.to_string(),
        slot: slot(start, end, true),
    }
}

fn sample_document() -> AvailabilityDocument {
    let mut document = build_document(
        date(2025, 10, 22),
        "Villa Park Beach",
        ParseOutcome {
            strategy: Some(ExtractionStrategy::RowStructured),
            slots: vec![
                extracted("Court 02", "07:00", "08:00"),
                extracted("Court 01", "08:00", "09:00"),
                extracted("Court 01", "16:00", "17:00"),
                extracted("Court 01", "17:00", "18:00"),
                extracted("Court 02", "09:00", "10:00"),
                extracted("Court 03", "20:00", "21:00"),
            ],
        },
        None,
    );
    document.courts[2].time_slots[0].available = false;
    document
}

#[test]
fn document_groups_courts_and_counts_slots() {
    let document = sample_document();

    let names: Vec<&str> = document.courts.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Court 01", "Court 02", "Court 03"]);
    assert_eq!(document.total_courts, 3);
    assert_eq!(document.total_slots, 6);
    assert_eq!(
        document.courts[1].time_slots,
        vec![slot("07:00", "08:00", true), slot("09:00", "10:00", true)]
    );
    assert_eq!(document.data_source(), "Villa Park Beach (row_structured)");
}

#[test]
fn after_bound_keeps_only_slots_ending_later() -> Result<()> {
    let document = sample_document();
    let window = TimeWindow::parse(Some("17:00"), None)?;
    let bound = NaiveTime::from_hms_opt(17, 0, 0).expect("valid time");

    let courts = filter_courts(&document.courts, &window);

    assert!(!courts.is_empty());
    for court in &courts {
        for slot in &court.time_slots {
            assert!(slot.end().expect("clock") > bound);
        }
    }
    // 16:00-17:00 ends exactly at the bound and is dropped.
    assert_eq!(courts[0].time_slots, vec![slot("17:00", "18:00", true)]);
    Ok(())
}

#[test]
fn before_bound_keeps_only_slots_starting_earlier() -> Result<()> {
    let document = sample_document();
    let window = TimeWindow::parse(None, Some("10:00"))?;
    let bound = NaiveTime::from_hms_opt(10, 0, 0).expect("valid time");

    let courts = filter_courts(&document.courts, &window);

    for court in &courts {
        for slot in &court.time_slots {
            assert!(slot.start().expect("clock") < bound);
        }
    }
    let names: Vec<&str> = courts.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Court 01", "Court 02"]);
    Ok(())
}

#[test]
fn unavailable_slots_and_empty_courts_are_dropped() -> Result<()> {
    let document = sample_document();

    let courts = filter_courts(&document.courts, &TimeWindow::default());

    let names: Vec<&str> = courts.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Court 01", "Court 02"]);
    let summary = summarize(&document, &courts);
    assert_eq!(summary.available_courts, 2);
    assert_eq!(summary.total_courts, 3);
    assert_eq!(summary.total_slots, 5);
    assert_eq!(summary.describe(), "2/3 courts with available slots");
    Ok(())
}

#[test]
fn filtering_is_idempotent() -> Result<()> {
    let document = sample_document();
    let window = TimeWindow::parse(Some("08:30"), Some("17:30"))?;

    let once = filter_courts(&document.courts, &window);
    let twice = filter_courts(&once, &window);

    assert_eq!(once, twice);
    Ok(())
}

#[test]
fn filtering_leaves_the_source_untouched() -> Result<()> {
    let document = sample_document();
    let before = document.clone();

    let narrow = filter_courts(&document.courts, &TimeWindow::parse(Some("20:00"), None)?);
    assert_eq!(narrow.len(), 0);

    assert_eq!(document, before);
    let wide = filter_courts(&document.courts, &TimeWindow::default());
    assert_eq!(wide.iter().map(|c| c.time_slots.len()).sum::<usize>(), 5);
    Ok(())
}

#[test]
fn malformed_bounds_are_input_errors() {
    let err = TimeWindow::parse(Some("5pm"), None).expect_err("bad bound");
    assert!(matches!(err, AvailabilityError::InvalidInput(_)));
    assert!(err.to_string().starts_with("Invalid date or time format:"));
}

#[test]
fn response_echoes_query_bounds() -> Result<()> {
    let document = sample_document();
    let window = TimeWindow::parse(Some("08:30"), None)?;

    let response = build_response(&document, Some("08:30"), None, &window);

    assert_eq!(response.date, "2025-10-22");
    assert_eq!(response.query_time_after.as_deref(), Some("08:30"));
    assert_eq!(response.query_time_before, None);
    assert_eq!(response.total_courts, 3);
    assert_eq!(response.available_courts, response.courts.len());
    assert_eq!(
        response.total_slots,
        response
            .courts
            .iter()
            .map(|c: &Court| c.time_slots.len())
            .sum::<usize>()
    );
    Ok(())
}

#[test]
fn audit_flags_out_of_hours_and_reversed_slots() {
    let document = build_document(
        date(2025, 10, 22),
        "test",
        ParseOutcome {
            strategy: Some(ExtractionStrategy::PrimaryTimePattern),
            slots: vec![
                extracted("Court 01", "06:00", "07:00"),
                extracted("Court 01", "09:00", "08:00"),
                extracted("Court 01", "21:00", "22:00"),
            ],
        },
        None,
    );
    let venue = VenueConfig {
        total_courts: 1,
        ..VenueConfig::default()
    };

    let audit = audit_document(&document, &venue);

    assert_eq!(audit.ordering_violations.len(), 1);
    assert_eq!(audit.outside_opening_hours.len(), 1);
    assert_eq!(audit.outside_opening_hours[0].start_time, "06:00");
    assert_eq!(audit.discovered_courts, 1);
    assert!(!audit.is_clean());
}
