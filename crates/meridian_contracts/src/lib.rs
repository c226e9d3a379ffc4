#![forbid(unsafe_code)]

pub mod codes;
pub mod common;
pub mod decision;
pub mod envelope;
pub mod gate;
pub mod ids;
pub mod persona;
pub mod policy;
pub mod replay;
pub mod scoring;
pub mod territory;

pub use codes::AuthorityCode;
pub use common::{ContractViolation, MonotonicTimeNs, ReasonCodeId, SchemaVersion, Validate};
