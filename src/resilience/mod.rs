//! Resilience primitives shared by the gateway and the services
//!
//! Fault isolation and traffic control: circuit breaking for downstream
//! calls, admission control for handler concurrency, and approximate load
//! observation. Each primitive serializes its own internal mutation and never
//! holds a lock across a network call.

pub mod admission;
pub mod circuit_breaker;
pub mod load_monitor;

pub use admission::{AdmissionGate, AdmissionPermit};
pub use circuit_breaker::CircuitBreaker;
pub use load_monitor::{LoadMonitor, LoadSample};
