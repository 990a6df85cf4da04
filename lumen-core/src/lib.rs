//! Lumen Core
//!
//! Core types and abstractions shared by the Lumen generation toolkit.
//!
//! This crate contains:
//! - Domain types: tracked jobs, their status vocabulary and progress heuristics
//! - DTOs: wire shapes of the remote generation API

pub mod domain;
pub mod dto;
