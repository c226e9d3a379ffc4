#![forbid(unsafe_code)]

//! Orchestration layer for the authority and replay subsystem.
//!
//! Resolution (persona, territory), envelope sealing and verification, the
//! runtime authority gate, the decision orchestrator, and the replay
//! coordinator all live here, wired over the typed repositories in
//! `meridian_storage`. Time is always injected; nothing in this crate reads
//! a wall clock.

pub mod decision;
pub mod gate;
pub mod persona;
pub mod replay;
pub mod sealer;
pub mod territory;
