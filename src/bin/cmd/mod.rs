// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CLI subcommands.

mod clip;
mod images;
mod summary;
mod video;

pub use clip::ClipCmd;
pub use images::ImagesCmd;
pub use summary::SummaryCmd;
pub use video::VideoCmd;
