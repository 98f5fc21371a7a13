// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;

use crate::error::StatsResult;

/// Byte total as stored (`Bytes`) or as rendered for reports (`Human`, e.g. `5.6 TB`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SizeValue {
    Bytes(u64),
    Human(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTotals {
    pub file_count: u64,
    pub size: Option<SizeValue>,
}

/// `status -> totals` for one point in time.
pub type StatusSnapshot = BTreeMap<String, StatusTotals>;

/// `timestamp -> snapshot`, ordered by timestamp.
pub type StatusHistory = BTreeMap<String, StatusSnapshot>;

/// Serializes with four-space indentation, the layout downstream plotting expects.
pub fn to_pretty_json<T: Serialize>(value: &T) -> StatsResult<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn write_pretty_json<T: Serialize>(path: &Path, value: &T) -> StatsResult<()> {
    fs::write(path, to_pretty_json(value)?)?;
    Ok(())
}
