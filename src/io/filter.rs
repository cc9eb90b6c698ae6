// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Topic filtering for bag iteration.
//!
//! A [`TopicFilter`] decides which connections a reader yields records
//! for. Filtering happens on connection IDs, so rejected records are never
//! copied out of their chunk.

use std::collections::HashSet;

use crate::io::metadata::Connection;

/// Filter for selecting topics during iteration.
#[derive(Debug, Clone, Default)]
pub enum TopicFilter {
    /// Read all topics (no filtering)
    #[default]
    All,
    /// Read only specific topics
    Include(Vec<String>),
}

impl TopicFilter {
    /// Create an include filter from topic names.
    pub fn include<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Include(topics.into_iter().map(Into::into).collect())
    }

    /// Check if a connection should be included.
    pub fn matches(&self, connection: &Connection) -> bool {
        match self {
            TopicFilter::All => true,
            TopicFilter::Include(topics) => topics.iter().any(|t| *t == connection.topic),
        }
    }

    /// Resolve the filter to the set of allowed connection IDs.
    pub fn allowed_ids<'a, I>(&self, connections: I) -> HashSet<u32>
    where
        I: IntoIterator<Item = &'a Connection>,
    {
        connections
            .into_iter()
            .filter(|c| self.matches(c))
            .map(|c| c.id)
            .collect()
    }
}
