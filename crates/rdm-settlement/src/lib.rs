//! # rdm-settlement
//!
//! Turns a completion claim into a settled token split.
//!
//! Everything in this crate is pure: no I/O, no clock, no shared state.
//! Identical inputs always produce identical outputs, so a settlement that
//! fails part-way through persistence can be recomputed and retried.
//!
//! ## Key components
//!
//! - [`OutcomeEvaluator`] — evidence → [`OutcomeDetermination`]
//!   (SUCCESS / PARTIAL / FAILURE, confidence, flags)
//! - [`DistributionEngine`] — pledge + outcome → [`Distribution`]
//!   (reward, remorse, bonus; `reward + remorse == pledge` always)
//! - [`assign_badge`] — completion → [`BadgeTier`]
//! - [`SettlementEngine`] — runs the three in order

pub mod badge;
pub mod config;
pub mod distribution;
pub mod error;
pub mod evaluator;
pub mod evidence;
pub mod percentage;
pub mod settlement;

pub use badge::{assign_badge, Badge, BadgeTier};
pub use config::{DistributionConfig, EvaluationConfig, SettlementConfig};
pub use distribution::{BonusKind, BonusLine, Distribution, DistributionEngine};
pub use error::SettlementError;
pub use evaluator::{OutcomeCategory, OutcomeDetermination, OutcomeEvaluator, OutcomeFlag};
pub use evidence::{EvidencePackage, ReflectionStatus, SelfAssessment};
pub use percentage::Percentage;
pub use settlement::{Settlement, SettlementEngine};
