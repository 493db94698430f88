//! # rental-core: Pure Business Logic for the Rental Engine
//!
//! This crate is the **heart** of the booking lifecycle. It contains the
//! pricing policy, the lifecycle rules and the settlement arithmetic as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Rental Engine Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Booking UI (price preview)                       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ same quote() call                      │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ rental-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  pricing  │  │ lifecycle │  │settlement │  │ validation│  │   │
//! │  │   │ quote()   │  │ Booking   │  │ late/dmg  │  │   rules   │  │   │
//! │  │   │ days      │  │ Status    │  │ charges   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        rental-db (windows, bookings, incident ledger)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Booking, Incident, DateRange, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - Chargeable days and the price breakdown
//! - [`lifecycle`] - Booking state machine
//! - [`settlement`] - Damage / lateness charges and settlement summary
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use rental_core::pricing::quote;
//! use rental_core::{DateRange, InsuranceSelection, Money};
//!
//! let range = DateRange::new(
//!     NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), // Friday
//!     NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(), // Tuesday
//! )
//! .unwrap();
//!
//! let breakdown = quote(&range, Money::from_units(800_000), &InsuranceSelection::None).unwrap();
//! assert_eq!(breakdown.chargeable_days, 2);
//! assert_eq!(breakdown.base_price.units(), 1_600_000);
//! assert_eq!(breakdown.service_fee.units(), 80_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod lifecycle;
pub mod money;
pub mod pricing;
pub mod settlement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use lifecycle::BookingEvent;
pub use money::Money;
pub use pricing::PriceBreakdown;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of evidence images attached to one hand-off event.
pub const MAX_IMAGES_PER_EVENT: usize = 20;

/// Maximum length of free-text notes and incident descriptions.
pub const MAX_TEXT_LEN: usize = 2000;

/// Default upper bound on units requested in a single booking.
pub const DEFAULT_MAX_QUANTITY: i64 = 10;

/// Upper bound on reported lateness (one year in minutes).
pub const MAX_LATE_MINUTES: i64 = 365 * 24 * 60;
