//! # Settlement Arithmetic
//!
//! Derives incidents from hand-off reports and summarizes what a booking owes.
//!
//! ## Checkout Assessment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CheckoutReport { severity, late_minutes, ... }                         │
//! │       │                                                                 │
//! │       ├── late_minutes > 0 ──► late   = ceil(min / 60) × daily / 24    │
//! │       │                         └─► Incident { type: late }             │
//! │       │                                                                 │
//! │       └── severity ≠ none ───► damage = round(replacement × mult)      │
//! │                                 └─► Incident { type: damage }           │
//! │                                                                         │
//! │  Zero-charge results create no incident.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Estimated charges are computed once here; the ledger never recomputes them.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Booking, Incident, IncidentStage, IncidentType, Severity};

/// Hours in a rental day; `hourly_rate = daily_rate / 24`.
pub const HOURS_PER_DAY: i64 = 24;

// =============================================================================
// Reports (inputs from the hand-off screens)
// =============================================================================

/// Optional condition report captured at check-in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct IncidentReport {
    pub severity: Severity,
    pub description: Option<String>,
    pub images: Vec<String>,
}

impl IncidentReport {
    /// A report is empty when it has no severity and no description.
    pub fn is_empty(&self) -> bool {
        self.severity.is_none()
            && self
                .description
                .as_deref()
                .map_or(true, |d| d.trim().is_empty())
    }
}

/// Condition and timing report captured at check-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutReport {
    pub severity: Severity,
    pub issue_description: Option<String>,
    pub late_minutes: i64,
    pub late_reason: Option<String>,
}

/// An incident that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentDraft {
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub stage: IncidentStage,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub estimated_charge: Money,
}

impl IncidentDraft {
    /// Materializes the draft with an id and creation time.
    pub fn into_incident(self, id: String, booking_id: &str, created_at: DateTime<Utc>) -> Incident {
        Incident {
            id,
            booking_id: booking_id.to_string(),
            incident_type: self.incident_type,
            severity: self.severity,
            stage: self.stage,
            description: self.description,
            images: self.images,
            estimated_charge: self.estimated_charge,
            resolution_amount: None,
            outcome: None,
            created_at,
            resolved_at: None,
        }
    }
}

// =============================================================================
// Charges
// =============================================================================

/// `round(replacement_price × multiplier(severity))`.
pub fn damage_charge(replacement_price: Money, severity: Severity) -> Money {
    replacement_price.apply_rate(severity.multiplier())
}

/// `ceil(late_minutes / 60) × daily_rate / 24`, rounded once.
///
/// Non-positive minutes are not late.
pub fn late_charge(daily_rate: Money, late_minutes: i64) -> Money {
    if late_minutes <= 0 {
        return Money::zero();
    }
    let hours = (late_minutes + 59) / 60;
    daily_rate.scale_rounded(hours, HOURS_PER_DAY)
}

/// Minutes between the scheduled return and the actual return.
///
/// Lateness counts from the start of the scheduled end date (00:00 UTC).
/// Grace is not applied here; [`assess_checkout`] deducts it once, so the
/// result can be passed straight through as `lateMinutes`.
pub fn late_minutes(scheduled_end: NaiveDate, returned_at: DateTime<Utc>) -> i64 {
    let due = scheduled_end.and_time(NaiveTime::MIN).and_utc();
    (returned_at - due).num_minutes().max(0)
}

// =============================================================================
// Assessment
// =============================================================================

/// Derives the optional check-in incident.
///
/// A non-`none` severity makes it a damage incident; a description alone
/// makes it `other`. Check-in incidents never block the hand-off.
pub fn assess_checkin(booking: &Booking, report: &IncidentReport) -> Option<IncidentDraft> {
    if report.is_empty() {
        return None;
    }

    let incident_type = if report.severity.is_none() {
        IncidentType::Other
    } else {
        IncidentType::Damage
    };

    Some(IncidentDraft {
        incident_type,
        severity: report.severity,
        stage: IncidentStage::Checkin,
        description: report.description.clone(),
        images: report.images.clone(),
        estimated_charge: damage_charge(booking.replacement_price, report.severity),
    })
}

/// Derives late and damage incidents from a check-out report.
///
/// `grace_minutes` is subtracted from the reported lateness first.
/// Return images are attached to the damage incident as evidence.
pub fn assess_checkout(
    booking: &Booking,
    report: &CheckoutReport,
    images: &[String],
    grace_minutes: i64,
) -> Vec<IncidentDraft> {
    let mut drafts = Vec::with_capacity(2);

    let billable_minutes = (report.late_minutes - grace_minutes.max(0)).max(0);
    let late = late_charge(booking.daily_rate, billable_minutes);
    if late.is_positive() {
        drafts.push(IncidentDraft {
            incident_type: IncidentType::Late,
            severity: Severity::None,
            stage: IncidentStage::Checkout,
            description: report.late_reason.clone(),
            images: Vec::new(),
            estimated_charge: late,
        });
    }

    let damage = damage_charge(booking.replacement_price, report.severity);
    if damage.is_positive() {
        drafts.push(IncidentDraft {
            incident_type: IncidentType::Damage,
            severity: report.severity,
            stage: IncidentStage::Checkout,
            description: report.issue_description.clone(),
            images: images.to_vec(),
            estimated_charge: damage,
        });
    }

    drafts
}

// =============================================================================
// Settlement Summary
// =============================================================================

/// Auditable money picture of one booking.
///
/// `amount_due` only ever folds in *settled* amounts; estimates for open
/// incidents are reported on their own line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Settlement {
    pub booking_id: String,
    pub base_price: Money,
    pub service_fee: Money,
    pub insurance_fee: Money,
    pub quoted_total: Money,
    pub damage_estimated: Money,
    pub late_estimated: Money,
    pub other_estimated: Money,
    pub open_estimated: Money,
    pub settled_surcharges: Money,
    pub open_incidents: usize,
    pub amount_due: Money,
}

/// Combines the quote frozen on the booking with its ledger entries.
pub fn summarize(booking: &Booking, incidents: &[Incident]) -> Settlement {
    let estimated = |kind: IncidentType| -> Money {
        incidents
            .iter()
            .filter(|i| i.incident_type == kind)
            .map(|i| i.estimated_charge)
            .sum()
    };

    let settled: Money = incidents.iter().filter_map(|i| i.resolution_amount).sum();
    let open: Vec<&Incident> = incidents.iter().filter(|i| i.is_open()).collect();

    Settlement {
        booking_id: booking.id.clone(),
        base_price: booking.base_price,
        service_fee: booking.service_fee,
        insurance_fee: booking.insurance_fee,
        quoted_total: booking.total_price,
        damage_estimated: estimated(IncidentType::Damage),
        late_estimated: estimated(IncidentType::Late),
        other_estimated: estimated(IncidentType::Other),
        open_estimated: open.iter().map(|i| i.estimated_charge).sum(),
        settled_surcharges: settled,
        open_incidents: open.len(),
        amount_due: booking.total_price + settled,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::tests::sample_booking;
    use crate::types::{BookingStatus, IncidentOutcome};
    use chrono::TimeZone;

    #[test]
    fn test_damage_charge_by_severity() {
        let replacement = Money::from_units(45_000_000);
        assert_eq!(damage_charge(replacement, Severity::None).units(), 0);
        assert_eq!(damage_charge(replacement, Severity::Minor).units(), 6_750_000);
        assert_eq!(damage_charge(replacement, Severity::Major).units(), 18_000_000);
        assert_eq!(damage_charge(replacement, Severity::Critical).units(), 45_000_000);
        // round(333 × 0.15) = round(49.95) = 50
        assert_eq!(damage_charge(Money::from_units(333), Severity::Minor).units(), 50);
    }

    #[test]
    fn test_late_charge_rounds_hours_up() {
        let daily = Money::from_units(240_000); // H = 10,000
        assert_eq!(late_charge(daily, 0).units(), 0);
        assert_eq!(late_charge(daily, 1).units(), 10_000);
        assert_eq!(late_charge(daily, 60).units(), 10_000);
        assert_eq!(late_charge(daily, 61).units(), 20_000);
        assert_eq!(late_charge(daily, -5).units(), 0);
    }

    #[test]
    fn test_late_charge_rounds_once() {
        // 2 × 800,000 / 24 = 66,666.67 → 66,667 (not 2 × round(33,333.33))
        assert_eq!(late_charge(Money::from_units(800_000), 61).units(), 66_667);
    }

    #[test]
    fn test_late_minutes_from_return_time() {
        let end = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let on_time = Utc.with_ymd_and_hms(2024, 3, 4, 18, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 5, 1, 1, 0).unwrap();

        assert_eq!(late_minutes(end, on_time), 0);
        assert_eq!(late_minutes(end, late), 61);
    }

    #[test]
    fn test_major_damage_creates_single_incident() {
        let booking = sample_booking(BookingStatus::Ongoing);
        let report = CheckoutReport {
            severity: Severity::Major,
            issue_description: Some("cracked lens".to_string()),
            late_minutes: 0,
            late_reason: None,
        };
        let drafts = assess_checkout(&booking, &report, &["back.jpg".to_string()], 0);

        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].incident_type, IncidentType::Damage);
        assert_eq!(drafts[0].estimated_charge.units(), 18_000_000);
        assert_eq!(drafts[0].images, vec!["back.jpg".to_string()]);
    }

    #[test]
    fn test_clean_return_creates_nothing() {
        let booking = sample_booking(BookingStatus::Ongoing);
        let drafts = assess_checkout(&booking, &CheckoutReport::default(), &[], 0);
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_grace_absorbs_short_lateness() {
        let booking = sample_booking(BookingStatus::Ongoing);
        let report = CheckoutReport {
            late_minutes: 20,
            late_reason: Some("traffic".to_string()),
            ..CheckoutReport::default()
        };
        assert!(assess_checkout(&booking, &report, &[], 30).is_empty());

        let drafts = assess_checkout(&booking, &report, &[], 0);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].incident_type, IncidentType::Late);
        assert_eq!(drafts[0].description.as_deref(), Some("traffic"));
    }

    #[test]
    fn test_checkin_incident_classification() {
        let booking = sample_booking(BookingStatus::Confirmed);
        assert!(assess_checkin(&booking, &IncidentReport::default()).is_none());

        let note_only = IncidentReport {
            description: Some("scratch on grip".to_string()),
            ..IncidentReport::default()
        };
        let draft = assess_checkin(&booking, &note_only).unwrap();
        assert_eq!(draft.incident_type, IncidentType::Other);
        assert!(draft.estimated_charge.is_zero());

        let minor = IncidentReport {
            severity: Severity::Minor,
            ..IncidentReport::default()
        };
        let draft = assess_checkin(&booking, &minor).unwrap();
        assert_eq!(draft.incident_type, IncidentType::Damage);
        assert_eq!(draft.stage, IncidentStage::Checkin);
        assert_eq!(draft.estimated_charge.units(), 6_750_000);
    }

    #[test]
    fn test_summary_keeps_estimates_apart_from_settled() {
        let booking = sample_booking(BookingStatus::Reviewing);
        let now = Utc::now();
        let report = CheckoutReport {
            severity: Severity::Major,
            late_minutes: 61,
            ..CheckoutReport::default()
        };
        let mut incidents: Vec<Incident> = assess_checkout(&booking, &report, &[], 0)
            .into_iter()
            .enumerate()
            .map(|(n, d)| d.into_incident(format!("inc-{n}"), &booking.id, now))
            .collect();

        // Settle the late incident for less than estimated
        incidents[0].resolution_amount = Some(Money::from_units(50_000));
        incidents[0].outcome = Some(IncidentOutcome::Adjusted);

        let s = summarize(&booking, &incidents);
        assert_eq!(s.late_estimated.units(), 66_667);
        assert_eq!(s.damage_estimated.units(), 18_000_000);
        assert_eq!(s.settled_surcharges.units(), 50_000);
        assert_eq!(s.open_incidents, 1);
        assert_eq!(s.open_estimated.units(), 18_000_000);
        assert_eq!(s.amount_due.units(), 1_680_000 + 50_000);
        assert_eq!(s.quoted_total, booking.total_price);
    }
}
