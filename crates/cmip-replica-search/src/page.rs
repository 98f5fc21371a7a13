// SPDX-License-Identifier: Apache-2.0

//! Response decoding for Solr XML and Solr JSON bodies.

use cmip_replica_core::parse_identifier_line;
use regex::Regex;
use serde_json::Value;

use crate::error::{SearchError, SearchErrorCode, SearchResult};

/// Declared total and the identifiers one response actually carried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPage {
    pub num_found: u64,
    pub identifiers: Vec<String>,
}

impl QueryPage {
    #[must_use]
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    #[must_use]
    pub fn is_truncated(&self) -> bool {
        (self.identifiers.len() as u64) < self.num_found
    }
}

fn pattern(expr: &str) -> SearchResult<Regex> {
    Regex::new(expr).map_err(|e| SearchError::new(SearchErrorCode::Parse, e.to_string()))
}

pub fn parse_page(body: &str) -> SearchResult<QueryPage> {
    if body.trim_start().starts_with('{') {
        parse_json(body)
    } else {
        parse_xml(body)
    }
}

fn parse_xml(body: &str) -> SearchResult<QueryPage> {
    let num_found = pattern(r#"numFound"?\s*[=:]\s*"?(\d+)"#)?
        .captures(body)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .ok_or_else(|| SearchError::new(SearchErrorCode::Parse, "response has no numFound"))?;
    let identifiers = pattern(r#"<str name="instance_id">[^<]*</str>"#)?
        .find_iter(body)
        .filter_map(|m| parse_identifier_line(m.as_str()))
        .collect();
    Ok(QueryPage {
        num_found,
        identifiers,
    })
}

fn parse_json(body: &str) -> SearchResult<QueryPage> {
    let doc: Value = serde_json::from_str(body)
        .map_err(|e| SearchError::new(SearchErrorCode::Parse, format!("invalid json: {e}")))?;
    let response = doc
        .get("response")
        .ok_or_else(|| SearchError::new(SearchErrorCode::Parse, "json has no `response`"))?;
    let num_found = response
        .get("numFound")
        .and_then(Value::as_u64)
        .ok_or_else(|| SearchError::new(SearchErrorCode::Parse, "response has no numFound"))?;
    let mut identifiers = Vec::new();
    for d in response
        .get("docs")
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice)
    {
        match d.get("instance_id") {
            Some(Value::String(s)) => identifiers.push(s.clone()),
            Some(Value::Array(values)) => identifiers.extend(
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string),
            ),
            _ => {}
        }
    }
    Ok(QueryPage {
        num_found,
        identifiers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
<lst name="responseHeader"><int name="status">0</int></lst>
<result name="response" numFound="3" start="0" maxScore="1.0">
<doc>
<str name="instance_id">CMIP6.CMIP.NCAR.CESM2.historical.r1i1p1f1.Amon.tas.gn.v20190308</str>
</doc>
<doc>
<str name="instance_id">CMIP6.CMIP.NCAR.CESM2.historical.r1i1p1f1.Amon.pr.gn.v20190308</str>
</doc>
</result>
</response>
"#;

    #[test]
    fn xml_page_reports_truncation() {
        let page = parse_page(XML).expect("parse");
        assert_eq!(page.num_found, 3);
        assert_eq!(page.len(), 2);
        assert!(page.is_truncated());
        assert_eq!(
            page.identifiers[1],
            "CMIP6.CMIP.NCAR.CESM2.historical.r1i1p1f1.Amon.pr.gn.v20190308"
        );
    }

    #[test]
    fn compact_json_page_is_decoded() {
        let body = r#"{"responseHeader":{"status":0},"response":{"numFound":2,"start":0,"docs":[{"instance_id":"CMIP6.A.v1"},{"instance_id":["CMIP6.B.v2"]}]}}"#;
        let page = parse_page(body).expect("parse");
        assert_eq!(page.num_found, 2);
        assert_eq!(page.identifiers, vec!["CMIP6.A.v1", "CMIP6.B.v2"]);
        assert!(!page.is_truncated());
    }

    #[test]
    fn body_without_count_is_rejected() {
        let err = parse_page("<html>maintenance</html>").expect_err("no count");
        assert_eq!(err.code, SearchErrorCode::Parse);
    }
}
