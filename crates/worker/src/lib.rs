//! Background worker: the reservation-timeout reconciler.
//!
//! The binary in `main.rs` is the composition root; the library exposes the
//! reconciler and its configuration so tests and admin tooling can drive a
//! pass synchronously via [`reconciler::ReservationReconciler::run_once`].

pub mod config;
pub mod reconciler;
