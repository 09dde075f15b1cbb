//! Resume decision engine
//!
//! Reconciles a new extraction request against checkpoints already on disk
//! and classifies the outcome three ways: silently continue a prior run
//! (auto-resume), offer it to the caller (suggest), or start fresh.

pub mod decision;

pub use decision::{
    ResumeDecision, ResumeEngine, DEFAULT_MAX_AGE_HOURS, MAX_COUNT_DEVIATION_PCT,
    MIN_AUTO_RESUME_PROGRESS,
};
