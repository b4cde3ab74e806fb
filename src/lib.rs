//! FXL: Fixture Ledger
//!
//! A toolkit for cataloguing manufacturing fixtures and their accessories,
//! recording periodic inspection measurements, and analysing the accumulated
//! history, all kept in plain CSV files.

pub mod cli;
pub mod core;
pub mod entities;
