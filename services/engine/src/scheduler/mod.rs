//! Notification scheduler.
//!
//! On a fixed interval the scheduler walks every stored criterion page by
//! page, re-checks upstream availability, and notifies each subscriber of a
//! criterion that has come into stock. A delivered notice removes that
//! user's subscription, so each user is told at most once.
//!
//! The same worker loop periodically reclaims criteria left without
//! subscribers, so reclamation never races a scan.

mod checker;
mod worker;

pub use checker::{CheckStats, SubscriptionChecker};
pub use worker::{SchedulerConfig, SchedulerWorker};
