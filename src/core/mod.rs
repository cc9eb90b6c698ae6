// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout bagframes.
//!
//! - [`ExtractError`] - Error taxonomy for the extraction pipeline
//! - [`Result`] - Crate-wide result alias

pub mod error;

pub use error::{ExtractError, Result};

/// Nanoseconds per second.
pub const NANOS_PER_SEC: u64 = 1_000_000_000;
