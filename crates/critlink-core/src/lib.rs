//! critlink-core library.
//!
//! Builds the link graph between hierarchical compliance criteria: which
//! criterion's computed status consumes which other criterion, with mutual
//! links broken by code order and downward links tagged as back-references.
//!
//! # Conventions
//!
//! - **Errors**: Library operations return [`error::LinkError`]; configuration
//!   loading uses `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).
//! - **Codes**: Every code is passed through [`code::normalize`] before it is
//!   stored or compared.

pub mod artifact;
pub mod code;
pub mod config;
pub mod edge;
pub mod error;
pub mod extract;
pub mod graph;
pub mod pipeline;
pub mod rewrite;
pub mod universe;

pub use error::{ErrorCode, LinkError};
