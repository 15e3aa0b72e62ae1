//! Core library for the barge-reconcile command line application.
//!
//! A run reads a loosely structured barge log, locates its columns
//! ([`detect`]), picks and filters the requested block of rows ([`select`]),
//! resolves months ([`period`]), nominations ([`canonical`]) and quantities
//! ([`numeric`]), sums them per period and category ([`aggregate`]), and
//! writes the totals into the master ledger ([`ledger`]). [`pipeline::run`]
//! strings the stages together; spreadsheet IO lives under [`io`].

pub mod aggregate;
pub mod canonical;
pub mod config;
pub mod detect;
pub mod error;
pub mod io;
pub mod ledger;
pub mod model;
pub mod numeric;
pub mod period;
pub mod pipeline;
pub mod select;

pub use error::{ReconcileError, Result};
