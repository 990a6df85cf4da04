//! Data Transfer Objects for the remote generation API
//!
//! This module contains the wire shapes exchanged with the generation
//! service. They mirror the remote documents loosely (most fields optional)
//! and are converted into domain types by the client.

pub mod generation;
pub mod job;
