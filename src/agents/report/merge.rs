//! Date-weighted reconciliation of aggregated data.
//!
//! The aggregation stage is asked to weight recent data over old data, but
//! its output is not trusted to have done so: this pass re-derives the
//! medication classification and ordering deterministically, so conflicts
//! between sources always resolve the same way. Rules:
//! - duplicates collapse by normalized name; the entry with the most
//!   recent date wins;
//! - on equal dates, a prescription entry outranks a conversation mention;
//! - the winner inherits any detail fields it is missing from the losers;
//! - an end date in the past moves an entry to past medications.

use chrono::NaiveDate;
use std::str::FromStr;

use super::types::{MedicationEntry, MedicationOverview, Timeline};
use crate::models::enums::MedicationSource;

/// Parse the date formats agents actually emit.
pub fn parse_flex_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    None
}

fn normalized_name(entry: &MedicationEntry) -> String {
    entry.name.trim().to_lowercase()
}

/// The date that determines an entry's recency: start date if parseable.
fn entry_date(entry: &MedicationEntry) -> Option<NaiveDate> {
    entry.start_date.as_deref().and_then(parse_flex_date)
}

fn source_rank(entry: &MedicationEntry) -> u8 {
    match entry.source.as_deref().and_then(|s| MedicationSource::from_str(s).ok()) {
        Some(MedicationSource::Prescription) => 2,
        Some(MedicationSource::Conversation) => 1,
        None => 0,
    }
}

/// True when `challenger` should replace `incumbent`.
fn outranks(challenger: &MedicationEntry, incumbent: &MedicationEntry) -> bool {
    match (entry_date(challenger), entry_date(incumbent)) {
        (Some(c), Some(i)) if c != i => c > i,
        (Some(_), None) => true,
        (None, Some(_)) => false,
        // Equal dates or both undated: prescriptions beat conversation
        // mentions; otherwise the incumbent stays.
        _ => source_rank(challenger) > source_rank(incumbent),
    }
}

/// Fill the winner's missing detail fields from a losing duplicate.
fn absorb(winner: &mut MedicationEntry, loser: MedicationEntry) {
    winner.dosage = winner.dosage.take().or(loser.dosage);
    winner.frequency = winner.frequency.take().or(loser.frequency);
    winner.duration = winner.duration.take().or(loser.duration);
    winner.start_date = winner.start_date.take().or(loser.start_date);
    winner.end_date = winner.end_date.take().or(loser.end_date);
    winner.special_instructions = winner.special_instructions.take().or(loser.special_instructions);
    winner.source = winner.source.take().or(loser.source);
}

fn is_past(entry: &MedicationEntry, as_of: NaiveDate) -> bool {
    if entry.duration.as_deref().is_some_and(|d| d.eq_ignore_ascii_case("ongoing")) {
        return false;
    }
    entry
        .end_date
        .as_deref()
        .and_then(parse_flex_date)
        .is_some_and(|end| end < as_of)
}

/// Rebuild a `MedicationOverview` with deterministic date-weighted
/// dedup, current/past classification, and a chronological timeline.
pub fn reconcile_medications(raw: MedicationOverview, as_of: NaiveDate) -> MedicationOverview {
    let mut winners: Vec<MedicationEntry> = Vec::new();

    let candidates = raw
        .current_medications
        .into_iter()
        .chain(raw.past_medications)
        .chain(raw.medication_timeline)
        .filter(|entry| !entry.name.trim().is_empty());

    for candidate in candidates {
        let key = normalized_name(&candidate);
        match winners.iter_mut().find(|w| normalized_name(w) == key) {
            None => winners.push(candidate),
            Some(incumbent) => {
                if outranks(&candidate, incumbent) {
                    let loser = std::mem::replace(incumbent, candidate);
                    absorb(incumbent, loser);
                } else {
                    absorb(incumbent, candidate);
                }
            }
        }
    }

    // Chronological timeline: dated entries ascending, undated last.
    let mut timeline = winners.clone();
    timeline.sort_by_key(|entry| entry_date(entry).map_or((1, NaiveDate::MAX), |d| (0, d)));

    let (past, current): (Vec<_>, Vec<_>) =
        winners.into_iter().partition(|entry| is_past(entry, as_of));

    MedicationOverview {
        current_medications: current,
        past_medications: past,
        medication_timeline: timeline,
        medication_summary: raw.medication_summary,
    }
}

/// Sort timeline events chronologically (undated last, order preserved)
/// and drop exact duplicates.
pub fn normalize_timeline(raw: Timeline) -> Timeline {
    let mut seen: Vec<(Option<String>, String, String)> = Vec::new();
    let mut events: Vec<_> = raw
        .events
        .into_iter()
        .filter(|event| {
            let key =
                (event.date.clone(), event.event_type.clone(), event.description.clone());
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        })
        .collect();

    events.sort_by_key(|event| {
        event
            .date
            .as_deref()
            .and_then(parse_flex_date)
            .map_or((1, NaiveDate::MAX), |d| (0, d))
    });

    Timeline { events }
}
