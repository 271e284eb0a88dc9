//! Campus Chat - Peer-to-peer conversation and messaging core
//!
//! This crate implements the messaging subsystem of the campus collaboration
//! platform: conversation identity and dedup, durable message ordering,
//! realtime fan-out, and client-side view reconciliation.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
