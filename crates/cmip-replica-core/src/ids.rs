// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Catalog name of one dataset version, e.g.
/// `CMIP6.CMIP.NCAR.CESM2.historical.r1i1p1f1.Amon.tas.gn.v20190308`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatasetFunctionalId(String);

/// Annotation appended to a status, `retracted` unless told otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SuffixToken(String);

impl DatasetFunctionalId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(Error::InvalidIdentifier {
                kind: "dataset_functional_id",
                value,
                reason: "must not be empty",
            });
        }
        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(Error::InvalidIdentifier {
                kind: "dataset_functional_id",
                value,
                reason: "must not contain whitespace",
            });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing version component, `v20190308` in the example above.
    #[must_use]
    pub fn version_token(&self) -> &str {
        self.0.rsplit_once('.').map_or(self.0.as_str(), |(_, v)| v)
    }
}

impl SuffixToken {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(Error::InvalidIdentifier {
                kind: "suffix",
                value,
                reason: "must not be empty",
            });
        }
        if value.chars().any(|c| c == ',' || c.is_whitespace()) {
            return Err(Error::InvalidIdentifier {
                kind: "suffix",
                value,
                reason: "must not contain commas or whitespace",
            });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SuffixToken {
    fn default() -> Self {
        Self(crate::status::DEFAULT_SUFFIX.to_string())
    }
}

macro_rules! impl_id_traits {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = Error;

            fn try_from(value: String) -> Result<Self> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = Error;

            fn try_from(value: &str) -> Result<Self> {
                Self::new(value)
            }
        }
    };
}

impl_id_traits!(DatasetFunctionalId);
impl_id_traits!(SuffixToken);

const XML_INSTANCE_ID: &str = "<str name=\"instance_id\">";
const XML_ID: &str = "<str name=\"id\">";
const JSON_INSTANCE_ID: &str = "\"instance_id\":";
const JSON_ID: &str = "\"id\":";

/// Pulls a dataset identifier out of one line of a search response or a plain list.
///
/// Understands the Solr XML (`<str name="instance_id">…</str>`) and JSON (`"id": "…|node",`)
/// shapes; anything else is returned trimmed. Blank lines yield `None`.
#[must_use]
pub fn parse_identifier_line(line: &str) -> Option<String> {
    let mut value = line.trim();
    if let Some(rest) = value.strip_prefix(XML_INSTANCE_ID) {
        value = rest;
    } else if let Some(rest) = value.strip_prefix(XML_ID) {
        value = rest;
    } else if let Some(rest) = value.strip_prefix(JSON_INSTANCE_ID) {
        value = rest;
    } else if let Some(rest) = value.strip_prefix(JSON_ID) {
        value = rest;
    } else if let Some(rest) = value.strip_prefix('"') {
        value = rest;
    } else if let Some(rest) = value.strip_suffix("\",") {
        value = rest;
    }
    // `id` values carry the data node after a pipe.
    if let Some(pos) = value.find('|') {
        if pos > 0 {
            value = &value[..pos];
        }
    }
    let cleaned = value.replace("</str>", "");
    let cleaned = cleaned.trim_matches(|c: char| c == '"' || c == ',' || c.is_whitespace());
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
