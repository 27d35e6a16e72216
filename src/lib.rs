//! Financial Bodyguard
//!
//! A multi-agent fraud-risk engine for Indian retail banking content:
//! - Five pattern-based specialist detectors (UPI payment, credential
//!   phishing, authority impersonation, document terms, investment fraud)
//! - A uniform agent lifecycle (PLAN → EXECUTE → VERIFY → COMPLETE) with
//!   bounded delegation and full error containment
//! - A generic executor for sequential, parallel, and hierarchical runs
//!   with an append-only audit log
//! - An orchestrator that routes content, aggregates findings under a
//!   max-risk rule, matches known fraud trajectories, and renders
//!   bilingual (English/Hindi) guidance
//!
//! Verdicts are deterministic: the generative model only ever adds
//! explanation text, never risk.

pub mod agent;
pub mod detectors;
pub mod error;
pub mod executor;
pub mod gemini;
pub mod models;
pub mod orchestrator;
pub mod patterns;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use orchestrator::Orchestrator;
