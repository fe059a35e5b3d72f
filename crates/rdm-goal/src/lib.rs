//! # rdm-goal
//!
//! Goal records and their lifecycle for RDM.
//!
//! A [`Goal`] is a pledged commitment with a deadline. It moves forward
//! through [`GoalState`] (Created → Pledged → Active → PendingVerification
//! → Verified, or to Expired once overdue) and is persisted through a
//! [`GoalStore`] that only accepts versioned compare-and-set updates.
//!
//! Check-ins are kept in a [`ReflectionLog`] with gapless per-goal sequence
//! numbers. Lifecycle steps are published as [`GoalEvent`]s through an
//! [`EventDispatcher`].

pub mod error;
pub mod events;
pub mod goal;
pub mod reflection;
pub mod store;

pub use error::GoalError;
pub use events::{EventDispatcher, GoalEvent, LogSink, NotificationSink};
pub use goal::{Goal, GoalState, NewGoal};
pub use reflection::{ReflectionEntry, ReflectionLog, ReflectionSubmission};
pub use store::{GoalStore, JsonGoalStore, MemoryGoalStore};
