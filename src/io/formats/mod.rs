// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Container format implementations.
//!
//! - [`bag`]: ROS1 bag format support

pub mod bag;
