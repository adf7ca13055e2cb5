//! Feeding analytics for a networked pet feeder.
//!
//! The feeder records each dispense as a `feedingData/dailyGrams` entry.
//! This crate turns that history into today's feedings, a daily average
//! and per-week averages, and mirrors the results into Postgres.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod report;
pub mod snapshot;
pub mod sync;
pub mod timestamp;
pub mod watch;
