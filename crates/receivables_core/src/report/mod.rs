//! Status & reporting engine.
//!
//! # Responsibility
//! - Derive title status from stored dates and payment state.
//! - Fold title sets into dashboard, balance and export read models.
//!
//! # Invariants
//! - Nothing here touches storage; callers pass rows and the evaluation date.

pub mod export;
pub mod status;
pub mod summary;
