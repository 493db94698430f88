//! # Domain Types
//!
//! Core domain types used throughout the rental engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Equipment     │   │    Booking      │   │    Incident     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  daily_rate     │   │  status         │   │  booking_id(FK) │       │
//! │  │  replacement    │   │  total_price    │   │  severity       │       │
//! │  │  owner_id       │   │  reservation_id │   │  estimated      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   DateRange     │   │ BookingStatus   │   │    Severity     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  [start, end)   │   │  pending ...    │   │  none   0%      │       │
//! │  │  start < end    │   │  completed      │   │  minor 15%      │       │
//! │  └─────────────────┘   │  canceled       │   │  major 40%      │       │
//! │                        │  failed         │   │  critical 100%  │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Rate
// =============================================================================

/// A proportional rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 500 bps = 5% (service fee), 4000 bps = 40% (major damage)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }
}

// =============================================================================
// Booking Status
// =============================================================================

/// The lifecycle status of a booking.
///
/// Transition rules live in [`crate::lifecycle`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Reserved, waiting for payment authorization.
    #[default]
    Pending,
    /// Payment captured; waiting for hand-off.
    Confirmed,
    /// Equipment handed to the renter.
    Ongoing,
    /// Returned with open incidents awaiting review.
    Reviewing,
    /// Returned and settled.
    Completed,
    /// Cancelled before hand-off.
    Canceled,
    /// Payment failed or expired.
    Failed,
}

impl BookingStatus {
    /// Lowercase name as stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Ongoing => "ongoing",
            BookingStatus::Reviewing => "reviewing",
            BookingStatus::Completed => "completed",
            BookingStatus::Canceled => "canceled",
            BookingStatus::Failed => "failed",
        }
    }

    /// Terminal statuses accept no further transitions.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Canceled | BookingStatus::Failed
        )
    }

    /// Whether a booking in this status keeps its reservation window active.
    ///
    /// Completed bookings keep their window: the dates were used.
    pub const fn holds_reservation(&self) -> bool {
        !matches!(self, BookingStatus::Canceled | BookingStatus::Failed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Incident Classification
// =============================================================================

/// Damage severity tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    None,
    Minor,
    Major,
    Critical,
}

impl Severity {
    /// Fraction of the replacement price charged for this tier.
    ///
    /// | Severity | Multiplier |
    /// |----------|------------|
    /// | none     | 0          |
    /// | minor    | 0.15       |
    /// | major    | 0.40       |
    /// | critical | 1.00       |
    pub const fn multiplier(&self) -> Rate {
        match self {
            Severity::None => Rate::from_bps(0),
            Severity::Minor => Rate::from_bps(1500),
            Severity::Major => Rate::from_bps(4000),
            Severity::Critical => Rate::from_bps(10000),
        }
    }

    #[inline]
    pub const fn is_none(&self) -> bool {
        matches!(self, Severity::None)
    }
}

/// What an incident records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    Damage,
    Late,
    Other,
}

/// Which hand-off event raised the incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStage {
    Checkin,
    Checkout,
}

/// How an incident was settled by review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum IncidentOutcome {
    /// Renter pays the resolution amount.
    Charged,
    /// Nothing is charged; resolution amount must be zero.
    Waived,
    /// A negotiated amount that differs from the estimate.
    Adjusted,
}

// =============================================================================
// Date Range
// =============================================================================

/// A rental span `[start, end)` in calendar days.
///
/// `start` is the pickup day and `end` is the return day. As a reservation
/// window the range is half-open, so a booking returning on day N does not
/// block another booking picking up on day N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub start: NaiveDate,
    #[ts(as = "String")]
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `start >= end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(DateRange { start, end })
    }

    /// Calendar days between pickup and return (`end - start`).
    #[inline]
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Half-open overlap test: touching endpoints do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Days strictly between pickup and return.
    pub fn interior_days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start
            .succ_opt()
            .into_iter()
            .flat_map(|first| first.iter_days())
            .take_while(move |d| *d < end)
    }
}

// =============================================================================
// Equipment and Insurance (catalog views)
// =============================================================================

/// A physical unit the Availability Index can block.
///
/// Serialized equipment is tracked per serial number; unserialized listings
/// are a single unit keyed by equipment id alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EquipmentUnit {
    pub equipment_id: String,
    pub serial: Option<String>,
}

impl EquipmentUnit {
    /// The whole listing as one unit.
    pub fn listing(equipment_id: impl Into<String>) -> Self {
        EquipmentUnit {
            equipment_id: equipment_id.into(),
            serial: None,
        }
    }

    /// A specific serialized unit.
    pub fn serialized(equipment_id: impl Into<String>, serial: impl Into<String>) -> Self {
        EquipmentUnit {
            equipment_id: equipment_id.into(),
            serial: Some(serial.into()),
        }
    }

    /// Storage key for the unit. Empty string for unserialized listings.
    pub fn serial_key(&self) -> &str {
        self.serial.as_deref().unwrap_or("")
    }
}

/// Equipment terms as supplied by the Equipment Catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Equipment {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub daily_rate: Money,
    pub replacement_price: Money,
    /// Serial numbers of individually tracked units. Empty for listings
    /// booked as a whole.
    #[serde(default)]
    pub serials: Vec<String>,
}

impl Equipment {
    /// True if `serial` is one of this listing's units.
    pub fn has_serial(&self, serial: &str) -> bool {
        self.serials.iter().any(|s| s == serial)
    }
}

/// An insurance package from the Insurance Catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InsurancePackage {
    pub id: String,
    pub name: String,
    pub min_coverage: Money,
    pub max_coverage: Money,
}

/// The renter's insurance choice. `None` is the implicit zero-fee package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "package", rename_all = "snake_case")]
pub enum InsuranceSelection {
    #[default]
    None,
    Package(InsurancePackage),
}

impl InsuranceSelection {
    /// Package id, if a real package was selected.
    pub fn package_id(&self) -> Option<&str> {
        match self {
            InsuranceSelection::None => None,
            InsuranceSelection::Package(p) => Some(p.id.as_str()),
        }
    }
}

// =============================================================================
// Reservation Window
// =============================================================================

/// A date range blocking one equipment unit. Owned by the Availability Index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReservationWindow {
    pub id: String,
    pub unit: EquipmentUnit,
    pub range: DateRange,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub released_at: Option<DateTime<Utc>>,
}

impl ReservationWindow {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.released_at.is_none()
    }
}

// =============================================================================
// Booking
// =============================================================================

/// A rental booking.
///
/// Uses the snapshot pattern: `daily_rate` and `replacement_price` are frozen
/// from the catalog at creation, so settlement uses the agreed terms.
/// `total_price` is fixed at creation; surcharges live in the incident ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Booking {
    pub id: String,
    pub equipment_id: String,
    /// Serial of the reserved unit, if the equipment is serialized.
    pub unit_serial: Option<String>,
    pub renter_id: String,
    pub owner_id: String,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub quantity: i64,
    /// Daily rate at time of booking (frozen).
    pub daily_rate: Money,
    /// Replacement price at time of booking (frozen).
    pub replacement_price: Money,
    pub base_price: Money,
    pub service_fee: Money,
    pub insurance_fee: Money,
    pub total_price: Money,
    pub status: BookingStatus,
    #[ts(as = "Option<String>")]
    pub checkin_time: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub checkout_time: Option<DateTime<Utc>>,
    pub checkin_images: Vec<String>,
    pub checkout_images: Vec<String>,
    pub checkin_notes: Option<String>,
    pub checkout_notes: Option<String>,
    pub insurance_id: Option<String>,
    pub notes: Option<String>,
    /// The reservation window blocking this booking's dates.
    pub reservation_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// The booked date range.
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }

    /// The reserved equipment unit.
    pub fn unit(&self) -> EquipmentUnit {
        EquipmentUnit {
            equipment_id: self.equipment_id.clone(),
            serial: self.unit_serial.clone(),
        }
    }

    /// Whether the actor is the renter or the owner of this booking.
    ///
    /// The engine does not authorize; the calling layer uses this to decide
    /// whether to raise an authorization error before invoking an operation.
    pub fn involves(&self, actor_id: &str) -> bool {
        self.renter_id == actor_id || self.owner_id == actor_id
    }
}

// =============================================================================
// Incident
// =============================================================================

/// An append-only ledger entry tied to a booking.
///
/// `estimated_charge` is written once at creation. `resolution_amount` is set
/// independently by review, keeping "estimated" and "settled" side by side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Incident {
    pub id: String,
    pub booking_id: String,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub stage: IncidentStage,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub estimated_charge: Money,
    pub resolution_amount: Option<Money>,
    pub outcome: Option<IncidentOutcome>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Incident {
    /// An incident is open until review sets its resolution amount.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.resolution_amount.is_none()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
