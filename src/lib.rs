//! # faultline
//!
//! A small set of cooperating network services demonstrating
//! traffic-management and fault-isolation patterns for service-to-service
//! calls.
//!
//! ## Architecture
//!
//! ```text
//! Client → Gateway (TargetPool + CircuitBreaker per target)
//!              ├→ Event Service (AdmissionGate → store / cache-aside → notify via breaker)
//!              └→ User Service  (AdmissionGate → notification sink)
//!          Registry (flat name → address directory, consulted once at startup)
//! ```
//!
//! ## Core Components
//!
//! - **Circuit Breaker**: sliding-window failure tracking per downstream
//!   target; trips open and stays open until explicitly reset
//! - **Admission Gate**: bounds concurrent handler executions per process
//! - **Target Pool**: least-loaded selection with RAII completion guards
//! - **Cache-Aside Store**: fixed-capacity LRU for the expensive listing read
//! - **Load Monitor**: periodic request-rate observation with alerting
//!
//! All coordination is local to one process guarding its own downstream
//! calls — there is no cross-process shared state.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod notify;
pub mod pool;
pub mod registry;
pub mod resilience;
pub mod server;
pub mod store;
pub mod users;

// Re-export main types
pub use error::{Error, Result};

use serde::{Deserialize, Serialize};

/// Which faultline service a process is running as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Gateway,
    Events,
    Users,
    Registry,
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gateway => write!(f, "gateway"),
            Self::Events => write!(f, "events"),
            Self::Users => write!(f, "users"),
            Self::Registry => write!(f, "registry"),
        }
    }
}
