//! Field inspection lifecycle: work-item assignment, the out-of-band consent handshake,
//! automatic risk analysis, and the two-tier review state machine.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
