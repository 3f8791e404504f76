//! HTTP and CLI transport for the CrewAgent pipeline.
//!
//! Everything in this crate is an adapter. The axum routes and the
//! terminal commands all funnel into [`ca_pipeline::Pipeline`]'s two
//! entry points; no conversation logic lives here.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod state;
