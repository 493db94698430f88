//! Request and response shapes for engine operations.
//!
//! Field names are camelCase on the wire to match the booking UI.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use rental_core::{
    settlement::{CheckoutReport, IncidentReport},
    Booking, Incident, IncidentOutcome, Money, PriceBreakdown, Severity,
};

/// Insurance id meaning "no insurance". Always available, never stored.
pub const NO_INSURANCE: &str = "none";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub equipment_id: String,
    /// Serial of a specific unit; omitted for unserialized listings.
    #[serde(default)]
    pub unit_serial: Option<String>,
    pub renter_id: String,
    pub owner_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub quantity: i64,
    #[serde(default)]
    pub insurance_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub equipment_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub insurance_id: Option<String>,
}

impl From<&CreateBookingRequest> for QuoteRequest {
    fn from(req: &CreateBookingRequest) -> Self {
        QuoteRequest {
            equipment_id: req.equipment_id.clone(),
            start_date: req.start_date,
            end_date: req.end_date,
            insurance_id: req.insurance_id.clone(),
        }
    }
}

/// A priced, unreserved preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub equipment_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Package id, `None` when uninsured.
    pub insurance_id: Option<String>,
    pub replacement_price: Money,
    #[serde(flatten)]
    pub breakdown: PriceBreakdown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRequest {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Condition problem noticed at hand-off.
    #[serde(default)]
    pub incident: Option<IncidentReport>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub issue_description: Option<String>,
    #[serde(default)]
    pub late_minutes: i64,
    #[serde(default)]
    pub late_reason: Option<String>,
}

impl CheckoutRequest {
    pub(crate) fn report(&self) -> CheckoutReport {
        CheckoutReport {
            severity: self.severity,
            issue_description: self.issue_description.clone(),
            late_minutes: self.late_minutes,
            late_reason: self.late_reason.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResult {
    pub booking: Booking,
    /// Incidents created by this checkout, late first.
    pub incidents: Vec<Incident>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveIncidentRequest {
    pub resolution_amount: Money,
    pub outcome: IncidentOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_request_defaults_from_sparse_json() {
        let req: CheckoutRequest =
            serde_json::from_str(r#"{ "severity": "major", "lateMinutes": 61 }"#).unwrap();

        assert_eq!(req.severity, Severity::Major);
        assert_eq!(req.late_minutes, 61);
        assert!(req.images.is_empty());
        assert_eq!(req.report().late_minutes, 61);
    }

    #[test]
    fn test_create_request_uses_camel_case() {
        let req: CreateBookingRequest = serde_json::from_str(
            r#"{
                "equipmentId": "cam-1",
                "renterId": "renter-1",
                "ownerId": "owner-1",
                "startDate": "2024-03-01",
                "endDate": "2024-03-05",
                "quantity": 1
            }"#,
        )
        .unwrap();

        assert_eq!(req.equipment_id, "cam-1");
        assert!(req.insurance_id.is_none());
        assert_eq!(QuoteRequest::from(&req).end_date, req.end_date);
    }
}
