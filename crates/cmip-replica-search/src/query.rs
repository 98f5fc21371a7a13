// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// Records per response; the index refuses larger pages.
pub const DEFAULT_PAGE_LIMIT: u64 = 10_000;

const PROJECT: &str = "CMIP6";

/// One facet restriction: `facet=value` or `facet!=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Equals { facet: String, value: String },
    NotEquals { facet: String, value: String },
}

impl Constraint {
    #[must_use]
    pub fn eq(facet: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals {
            facet: facet.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn ne(facet: impl Into<String>, value: impl Into<String>) -> Self {
        Self::NotEquals {
            facet: facet.into(),
            value: value.into(),
        }
    }

    fn stem_part(&self) -> String {
        match self {
            Self::Equals { value, .. } => value.clone(),
            Self::NotEquals { value, .. } => format!("NOT{value}"),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals { facet, value } => write!(f, "{facet}={value}"),
            Self::NotEquals { facet, value } => write!(f, "{facet}!={value}"),
        }
    }
}

/// Conjunction of constraints, rendered `&`-joined in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSet(Vec<Constraint>);

impl ConstraintSet {
    #[must_use]
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self(constraints)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.0
    }

    /// New set with `head` ahead of the existing constraints.
    #[must_use]
    pub fn prepend(&self, head: impl IntoIterator<Item = Constraint>) -> Self {
        let mut out: Vec<Constraint> = head.into_iter().collect();
        out.extend(self.0.iter().cloned());
        Self(out)
    }

    /// File-name stem for saved responses: constraint values joined by `_`,
    /// with `NOT` marking exclusions.
    #[must_use]
    pub fn artifact_stem(&self) -> String {
        self.0
            .iter()
            .map(Constraint::stem_part)
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl fmt::Display for ConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// One search request against the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub constraints: ConstraintSet,
    pub limit: u64,
    pub offset: Option<u64>,
}

impl SearchQuery {
    #[must_use]
    pub fn unpaged(constraints: ConstraintSet, limit: u64) -> Self {
        Self {
            constraints,
            limit,
            offset: None,
        }
    }

    #[must_use]
    pub fn paged(constraints: ConstraintSet, limit: u64, offset: u64) -> Self {
        Self {
            constraints,
            limit,
            offset: Some(offset),
        }
    }

    /// Query string without the leading `?`.
    #[must_use]
    pub fn query_string(&self) -> String {
        let mut out = format!("project={PROJECT}&retracted=true");
        if !self.constraints.is_empty() {
            out.push('&');
            out.push_str(&self.constraints.to_string());
        }
        out.push_str(&format!("&fields=instance_id&replica=false&limit={}", self.limit));
        if let Some(offset) = self.offset {
            out.push_str(&format!("&offset={offset}"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_query_carries_offset() {
        let q = SearchQuery::paged(ConstraintSet::default(), DEFAULT_PAGE_LIMIT, 4200);
        assert_eq!(
            q.query_string(),
            "project=CMIP6&retracted=true&fields=instance_id&replica=false&limit=10000&offset=4200"
        );
    }

    #[test]
    fn constraints_sit_between_base_and_fields() {
        let set = ConstraintSet::new(vec![Constraint::eq("realm", "ocean")])
            .prepend([Constraint::eq("frequency", "mon")]);
        let q = SearchQuery::unpaged(set, 10);
        assert_eq!(
            q.query_string(),
            "project=CMIP6&retracted=true&frequency=mon&realm=ocean&fields=instance_id&replica=false&limit=10"
        );
    }

    #[test]
    fn artifact_stem_marks_exclusions() {
        let set = ConstraintSet::new(vec![
            Constraint::ne("data_node", "a.org"),
            Constraint::ne("data_node", "b.org"),
            Constraint::eq("realm", "atmos"),
        ]);
        assert_eq!(set.artifact_stem(), "NOTa.org_NOTb.org_atmos");
        assert_eq!(
            set.to_string(),
            "data_node!=a.org&data_node!=b.org&realm=atmos"
        );
    }
}
