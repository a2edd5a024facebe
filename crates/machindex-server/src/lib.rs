//! machindex server library
//!
//! HTTP lookup API, command line configuration and observability setup
//! for the `machindex` binary.

pub mod api;
pub mod config;
pub mod observability;
