//! Inference console: control plane for hosted inference models.
//!
//! Browse a catalog, deploy a model onto a simulated cluster, scale it,
//! tear it down, and chat with it in a workspace whose replies are parsed
//! into structured content blocks.

pub mod catalog;
pub mod commands;
pub mod config;
pub mod eventlog;
pub mod lifecycle;
pub mod navigator;
pub mod provider;
pub mod render;
pub mod session;
pub mod view;

mod sync;
