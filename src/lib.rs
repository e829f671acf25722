//! TaxFix Client - conversational tax assistant, client side.
//!
//! This crate is the session, authentication, and streaming layer a TaxFix
//! frontend process links against to talk to the agent backend.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod observability;
pub mod ports;
