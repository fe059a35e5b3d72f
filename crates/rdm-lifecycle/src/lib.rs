//! # rdm-lifecycle
//!
//! Orchestrates RDM goals from creation to a settled, paid-out outcome.
//!
//! [`LifecycleController`] owns the per-goal exclusive sections and drives
//! each goal's state machine against the goal store, reflection log and
//! settlement ledger. Settlement is exactly-once per goal: the terminal
//! ledger entry is written at most once and a retried request replays the
//! recorded result.
//!
//! ```rust,no_run
//! use rdm_goal::NewGoal;
//! use rdm_lifecycle::{LifecycleController, RdmConfig, StoreLayout};
//! use rdm_settlement::{EvidencePackage, SelfAssessment};
//!
//! let layout = StoreLayout::for_project(".");
//! let config = RdmConfig::load_or_default(&layout.config_file).unwrap();
//! let rdm = LifecycleController::open(&layout, &config).unwrap();
//!
//! let goal = rdm.create_goal(NewGoal::new("Cycle to work", 100, 30)).unwrap();
//! rdm.pledge(goal.goal_id).unwrap();
//! rdm.activate(goal.goal_id).unwrap();
//! let evidence = EvidencePackage::new(goal.goal_id, SelfAssessment::Done, 85.0);
//! rdm.submit_claim(goal.goal_id, evidence).unwrap();
//! let settlement = rdm.settle(goal.goal_id).unwrap();
//! assert_eq!(settlement.distribution.reward, 85);
//! ```

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod locks;
pub mod payment;
pub mod status;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LifecycleConfig, PledgeConfig, RdmConfig, StoreLayout};
pub use controller::LifecycleController;
pub use error::{ErrorKind, LifecycleError, PaymentError};
pub use payment::{PaymentProvider, TransferReceipt, TransferRequest};
pub use status::{GoalStatus, SettlementSummary};
