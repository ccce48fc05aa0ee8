//! Bulwark call agent
//!
//! Library half of the `bulwark` binary: the call agent, its status report,
//! the interactive session, and the wiring that builds the agent from a
//! [`bulwark_config::BulwarkConfig`].

pub mod agent;
pub mod bootstrap;
pub mod session;
pub mod status;

pub use agent::{
    BatchReport, CallAgent, CallError, CallOutcome, Contact, FailedCall, ServiceSet, AGENT_NAME,
};
pub use bootstrap::{build_agent, build_alerts, build_event_log, build_services};
pub use status::SystemStatus;
