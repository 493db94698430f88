//! # rental-engine: Booking Lifecycle & Settlement
//!
//! Public operations of the rental engine.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Booking         create_booking   quote   get_booking                   │
//! │                  confirm_booking  fail_booking   cancel_booking         │
//! │  Hand-off        checkin          checkout                              │
//! │  Ledger          resolve_incident list_incidents  settlement            │
//! │  Availability    list_booked_ranges                                     │
//! │                                                                         │
//! │  pending ──confirm──► confirmed ──checkin──► ongoing ──checkout──┐      │
//! │     │                    │                                       │      │
//! │     └─cancel/fail────────┴──► canceled | failed      reviewing ◄─┤      │
//! │                                                          │       │      │
//! │                                         resolve last ────┴─► completed  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use rental_engine::{BookingEngine, EngineConfig};
//!
//! let engine = BookingEngine::connect(EngineConfig::from_env()?).await?;
//! let booking = engine.create_booking(request).await?;
//! engine.confirm_booking(&booking.id).await?;
//! ```

pub mod config;
pub mod error;
pub mod request;
pub mod service;
pub mod telemetry;

pub use config::{ConfigError, EngineConfig};
pub use error::{EngineError, EngineResult, ErrorCode};
pub use request::{
    CheckinRequest, CheckoutRequest, CheckoutResult, CreateBookingRequest, Quote, QuoteRequest,
    ResolveIncidentRequest, NO_INSURANCE,
};
pub use service::{ensure_participant, BookingEngine};
