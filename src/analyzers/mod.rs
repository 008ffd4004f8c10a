//! Ridership aggregation over corrected turnstile traffic.
//!
//! This module ranks stations, averages traffic per 3-hour time bin and
//! per day of week, totals traffic per week, and assembles those tables
//! into a report written as CSV and JSON.

pub mod aggregate;
pub mod report;
pub mod timebin;
pub mod types;
pub mod utility;
