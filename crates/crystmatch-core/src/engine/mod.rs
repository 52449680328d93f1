//! # Engine Module
//!
//! The stateful layer of the crate: it turns an asymmetric unit into
//! searchable molecules, finds template embeddings in them and evaluates
//! geometric conditions over the matches.
//!
//! ## Overview
//!
//! Everything in this module works on values owned by the caller. Working
//! state such as candidate domains, backtracking frames and evaluation caches
//! lives inside a single call or a single [`conditions::ConditionEngine`],
//! so independent targets can be processed on independent workers.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Build, match and search options with a validating builder
//! - **Assembly** ([`assembly`]) - Symmetry expansion, deduplication and periodic molecule growth
//! - **Matching** ([`matcher`]) - Compatibility screening and explicit-frame backtracking
//! - **Conditions** ([`conditions`]) - Packs, predicates, memoised evaluation and joins
//! - **Progress Monitoring** ([`progress`]) - Progress events and the cooperative stop flag
//! - **Error Handling** ([`error`]) - The engine's error taxonomy
//!
//! ## Key Capabilities
//!
//! - **Deterministic output** for molecules, atoms, matches and solution rows
//! - **Cooperative cancellation** by stop flag, time budget or match limit
//! - **Cheap pre-filters** that skip targets unable to hold a template
//! - **Memoised condition rows** invalidated when a pack's matches change

pub mod assembly;
pub mod conditions;
pub mod config;
pub mod error;
pub mod matcher;
pub mod progress;
