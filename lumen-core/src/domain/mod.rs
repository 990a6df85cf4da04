//! Core domain types
//!
//! This module contains the domain structures used across Lumen crates.
//! They describe a tracked generation job independently of how the remote
//! service spells things on the wire.

pub mod job;
pub mod progress;
