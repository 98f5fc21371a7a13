// SPDX-License-Identifier: Apache-2.0

//! Synda status values and the retraction rewrite rules.
//!
//! The store keeps a status as one string: a base word optionally followed by
//! comma-separated annotations (`done,retracted`). [`Status`] holds the two parts apart
//! and serializes back to exactly the string it was parsed from.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::ids::SuffixToken;

pub const DEFAULT_SUFFIX: &str = "retracted";

const RUNNING: &str = "running";
const DONE: &str = "done";
const PUBLISHED: &str = "published";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Status {
    base: String,
    annotations: Vec<String>,
}

impl Status {
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            annotations: Vec::new(),
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(',');
        let base = parts.next().unwrap_or_default().to_string();
        Self {
            base,
            annotations: parts.map(ToString::to_string).collect(),
        }
    }

    #[must_use]
    pub fn with_annotation(mut self, token: &SuffixToken) -> Self {
        self.annotations.push(token.as_str().to_string());
        self
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    #[must_use]
    pub fn annotations(&self) -> &[String] {
        &self.annotations
    }

    #[must_use]
    pub fn to_legacy_string(&self) -> String {
        let mut out = self.base.clone();
        for token in &self.annotations {
            out.push(',');
            out.push_str(token);
        }
        out
    }

    /// True suffix test on the stored string; used for file records.
    #[must_use]
    pub fn ends_with_suffix(&self, suffix: &SuffixToken) -> bool {
        self.to_legacy_string().ends_with(suffix.as_str())
    }

    /// Containment anywhere in the stored string; used for dataset records.
    #[must_use]
    pub fn mentions(&self, suffix: &SuffixToken) -> bool {
        self.to_legacy_string().contains(suffix.as_str())
    }

    fn is_bare(&self, word: &str) -> bool {
        self.annotations.is_empty() && self.base == word
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_legacy_string())
    }
}

impl FromStr for Status {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for Status {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<Status> for String {
    fn from(value: Status) -> Self {
        value.to_legacy_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Rewrite(Status),
}

impl Transition {
    #[must_use]
    pub fn is_rewrite(&self) -> bool {
        matches!(self, Self::Rewrite(_))
    }
}

/// Rewrites a file status to carry `suffix`.
///
/// Rules are checked in order: already suffixed, `running` (refused), `done*`,
/// statuses for data we never got (`error*`, `waiting`, `obsolete`, `_*`), `published*`,
/// and finally plain appending.
pub fn file_transition(current: &Status, suffix: &SuffixToken) -> Result<Transition> {
    if current.ends_with_suffix(suffix) {
        return Ok(Transition::Unchanged);
    }
    if current.is_bare(RUNNING) {
        return Err(Error::StatusConflict {
            status: current.to_legacy_string(),
        });
    }
    let legacy = current.to_legacy_string();
    let next = if legacy.starts_with(DONE) {
        Status::new(DONE).with_annotation(suffix)
    } else if legacy.starts_with("error")
        || current.is_bare("waiting")
        || current.is_bare("obsolete")
        || legacy.starts_with('_')
    {
        Status::new(suffix.as_str())
    } else if legacy.starts_with(PUBLISHED) {
        Status::new(PUBLISHED).with_annotation(suffix)
    } else {
        current.clone().with_annotation(suffix)
    };
    if next == *current {
        return Ok(Transition::Unchanged);
    }
    Ok(Transition::Rewrite(next))
}

/// Rewrites a dataset status to carry `suffix` unless the suffix already appears in it.
#[must_use]
pub fn dataset_transition(current: &Status, suffix: &SuffixToken) -> Transition {
    if current.mentions(suffix) {
        Transition::Unchanged
    } else {
        Transition::Rewrite(current.clone().with_annotation(suffix))
    }
}
