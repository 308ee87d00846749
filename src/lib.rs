#![doc(test(attr(deny(warnings))))]

//! Bizsim Core models a business as entities with a hierarchical chart of
//! accounts, steps a clock through discrete periods and lets scheduled
//! activities post double-entry transactions into each entity's ledger.

pub mod canonical;
pub mod cli;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod reporting;
pub mod simulation;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Bizsim tracing initialized.");
    });
}
