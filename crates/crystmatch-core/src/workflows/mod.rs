//! # Workflows Module
//!
//! High-level entry points that run the engine end to end on crystal
//! structures and queries.
//!
//! ## Overview
//!
//! Workflows are what embedders and the command-line front end call. They
//! validate inputs once, drive the engine components in order, report
//! progress through a [`ProgressReporter`](crate::engine::progress::ProgressReporter)
//! and return plain values.
//!
//! ## Architecture
//!
//! - **Assembly Workflow** ([`assemble`]) - Expands an asymmetric unit into
//!   molecules, optionally completing molecules across cell boundaries.
//! - **Search Workflow** ([`search`]) - Matches query templates against the
//!   target built from each structure, then evaluates geometric conditions
//!   into solution tables.
//!
//! ## Key Capabilities
//!
//! - **Batch search** with one target per structure and optional parallelism
//! - **Pre-filtering** of targets by element counts and structural fingerprints
//! - **Cooperative cancellation** through the reporter's stop flag
//! - **Per-structure error reporting** so one bad input does not end a batch

pub mod assemble;
pub mod search;
