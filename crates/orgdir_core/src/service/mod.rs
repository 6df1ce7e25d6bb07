//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store reads, hierarchy expansion and spatial filtering
//!   into lookup-level APIs.
//! - Keep edge layers (CLI, HTTP) decoupled from storage details.

pub mod geo_params;
pub mod hierarchy;
pub mod lookup_service;
