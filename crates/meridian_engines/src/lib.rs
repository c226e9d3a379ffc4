#![forbid(unsafe_code)]

//! Deterministic scoring capability engines.
//!
//! Each module hosts one capability runtime: a validated `Config`, a
//! `Runtime` with a single `run(&ScoringRequest) -> ScoringResponse`
//! entrypoint, and a `reason_codes` namespace. Runtimes are pure and
//! side-effect free; given the same request they produce byte-identical
//! responses, which is what makes decision replay meaningful.

pub mod company_quality;
pub mod edge_case;
pub mod product_fit;
pub mod timing;
