//! Operator console for a Model Context Protocol orchestration backend.
//!
//! The [`api`] module holds the wire contract and the [`api::GatewayClient`]
//! that speaks it; [`mock`] serves the same contract from memory. The
//! remaining modules make up the terminal dashboard.

pub mod api;
pub mod app;
pub mod chat;
pub mod config;
pub mod event;
pub mod form;
pub mod mock;
pub mod ui;
pub mod workflow;
