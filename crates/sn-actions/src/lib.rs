//! # sn-actions
//!
//! Remediation plan execution for Sentinel.
//!
//! This crate provides the action handler registry, one simulated handler
//! per action type, and [`ActionExecutor`], which implements the
//! [`sn_core::PlanExecutor`] seam used by the orchestrator.

pub mod block_ip;
pub mod clear_cache;
pub mod create_ticket;
pub mod executor;
pub mod notify;
pub mod registry;
pub mod restart_service;
pub mod scale_up;

pub use block_ip::BlockIpAction;
pub use clear_cache::ClearCacheAction;
pub use create_ticket::CreateTicketAction;
pub use executor::{ActionExecutor, ExecutorConfig};
pub use notify::NotifyAction;
pub use registry::{
    ActionContext, ActionError, ActionHandler, ActionRegistry, ActionResult, SimulatedEffect,
};
pub use restart_service::RestartServiceAction;
pub use scale_up::ScaleUpAction;
