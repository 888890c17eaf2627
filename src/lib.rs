//! Timebeam core: tracker sync, durable job queue, cron scheduling, and
//! inference dispatch over a shared SQLite store.
//!
//! The `timebeam` binary wires these modules together; the trigger/status
//! surface in [`api`] is what an HTTP front end calls into.

pub mod analytics;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
mod migrations;
pub mod ml;
pub mod queue;
pub mod scheduler;
pub mod sync;
pub mod tracker;
