//! # Repository Module
//!
//! Database repository implementations for the rental engine.
//!
//! ## Two Calling Styles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Single-statement reads                                                 │
//! │       db.bookings().get_by_id(id)          ← methods on &self (pool)    │
//! │                                                                         │
//! │  Multi-statement writes that must commit together                       │
//! │       let mut tx = db.begin().await?;                                   │
//! │       ReservationRepository::reserve_in(&mut tx, ..)                    │
//! │       BookingRepository::insert_in(&mut tx, ..)                         │
//! │       tx.commit().await?;                  ← associated fns on a conn   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`reservation::ReservationRepository`] - Availability Index
//! - [`booking::BookingRepository`] - Booking records and lifecycle writes
//! - [`incident::IncidentRepository`] - Incident Ledger
//! - [`catalog::CatalogRepository`] - Equipment and insurance catalog

pub mod booking;
pub mod catalog;
pub mod incident;
pub mod reservation;
