// SPDX-License-Identifier: Apache-2.0

//! Walks the search index for retracted datasets and hands each page to a sink.
//!
//! The index caps a response at [`DEFAULT_PAGE_LIMIT`] records. Sequential
//! pagination works but drifts as the index changes underneath a cursor, so the
//! preferred walk splits the query on facet values until every leaf fits in one
//! response.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use cmip_replica_core::SuffixToken;
use cmip_replica_store::{Reconciler, StoreError, StoreResult};
use tracing::{error, info, warn};

use crate::client::SearchClient;
use crate::error::{SearchError, SearchResult};
use crate::facets::FacetDimension;
use crate::offset::OffsetTracker;
use crate::page::{parse_page, QueryPage};
use crate::query::{Constraint, ConstraintSet, SearchQuery, DEFAULT_PAGE_LIMIT};
use crate::retry::{BackoffPolicy, RetryPolicy};

/// Receiver of discovered dataset identifiers.
pub trait RetractionSink {
    /// Marks the datasets and returns how many were newly marked.
    fn reconcile(&mut self, identifiers: &[String]) -> StoreResult<u64>;
}

impl RetractionSink for Reconciler {
    fn reconcile(&mut self, identifiers: &[String]) -> StoreResult<u64> {
        self.status_retracted(identifiers)
    }
}

/// Opens the tracking store for each page and closes it once the page is committed.
///
/// No connection stays open while the index is being queried, so other writers
/// only wait on the store for the length of one batch.
pub struct BatchReconciler {
    path: PathBuf,
    suffix: SuffixToken,
    changes: u64,
}

impl BatchReconciler {
    /// Checks that the store can be opened, then releases it until the first page.
    pub fn open(path: &Path, suffix: SuffixToken) -> StoreResult<Self> {
        Reconciler::open(path, suffix.clone())?.finish()?;
        Ok(Self {
            path: path.to_path_buf(),
            suffix,
            changes: 0,
        })
    }

    /// Datasets newly marked across all pages so far.
    #[must_use]
    pub fn changes(&self) -> u64 {
        self.changes
    }
}

impl RetractionSink for BatchReconciler {
    fn reconcile(&mut self, identifiers: &[String]) -> StoreResult<u64> {
        let mut reconciler = Reconciler::open(&self.path, self.suffix.clone())?;
        let newly = reconciler.status_retracted(identifiers)?;
        reconciler.finish()?;
        self.changes += newly;
        Ok(newly)
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub page_limit: u64,
    /// Query and log only; nothing is reconciled and the cursor stays put.
    pub test: bool,
    /// Path prefix for saved responses; `None` saves nothing.
    pub artifact_prefix: Option<String>,
    pub retry: RetryPolicy,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            test: false,
            artifact_prefix: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// Declared `numFound` totals and datasets newly marked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    pub num_found: u64,
    pub changes: u64,
}

impl DiscoveryOutcome {
    fn absorb(&mut self, other: Self) {
        self.num_found += other.num_found;
        self.changes += other.changes;
    }
}

pub struct Discoverer<C, S> {
    client: C,
    sink: S,
    options: DiscoveryOptions,
    queries: u64,
}

impl<C: SearchClient, S: RetractionSink> Discoverer<C, S> {
    #[must_use]
    pub fn new(client: C, sink: S, options: DiscoveryOptions) -> Self {
        Self {
            client,
            sink,
            options,
            queries: 0,
        }
    }

    #[must_use]
    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Number of index requests issued so far.
    #[must_use]
    pub fn queries_issued(&self) -> u64 {
        self.queries
    }

    #[must_use]
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Sequential pagination from `starting_offset`, at most `npages` requests.
    pub fn get_retracted(
        &mut self,
        tracker: &mut OffsetTracker,
        starting_offset: u64,
        npages: u32,
    ) -> SearchResult<DiscoveryOutcome> {
        let mut outcome = DiscoveryOutcome::default();
        let mut offset = starting_offset;
        let mut attempt = 0;
        for _ in 0..npages {
            let query = SearchQuery::paged(ConstraintSet::default(), self.options.page_limit, offset);
            let page = self.fetch_page(&query, &offset.to_string())?;
            outcome.num_found = outcome.num_found.max(page.num_found);
            if page.is_empty() {
                info!(offset, "no more retracted datasets");
                break;
            }
            match self.reconcile(&page) {
                Ok(changes) => {
                    outcome.changes += changes;
                    attempt = 0;
                }
                Err(err) => {
                    attempt += 1;
                    self.back_off(&err, attempt);
                    if attempt >= self.options.retry.max_attempts {
                        error!(offset, attempt, "page keeps failing, leaving it for the next run");
                        break;
                    }
                    continue;
                }
            }
            offset += page.len() as u64;
            info!(next_offset = offset, "page reconciled");
            if !self.options.test {
                tracker.save_starting_offset(offset)?;
            }
        }
        info!(num_found = outcome.num_found, changes = outcome.changes, "get_retracted finished");
        Ok(outcome)
    }

    /// One unpaginated query; fails with an overflow when the response is truncated.
    pub fn get_some_retracted(
        &mut self,
        constraints: &ConstraintSet,
    ) -> SearchResult<DiscoveryOutcome> {
        let query = SearchQuery::unpaged(constraints.clone(), self.options.page_limit);
        let page = self.fetch_page(&query, &constraints.artifact_stem())?;
        if page.is_truncated() {
            return Err(SearchError::overflow(
                page.num_found,
                page.len(),
                &constraints.to_string(),
            ));
        }
        let changes = match self.reconcile(&page) {
            Ok(changes) => changes,
            Err(err) => {
                self.back_off(&err, 1);
                0
            }
        };
        Ok(DiscoveryOutcome {
            num_found: page.num_found,
            changes,
        })
    }

    /// Pages through one constrained query until it is exhausted.
    pub fn get_some_retracted_paginated(
        &mut self,
        constraints: &ConstraintSet,
    ) -> SearchResult<DiscoveryOutcome> {
        let mut outcome = DiscoveryOutcome::default();
        let stem = constraints.artifact_stem();
        let mut offset = 0_u64;
        let mut page_no = 0_u32;
        let mut attempt = 0;
        loop {
            let query = SearchQuery::paged(constraints.clone(), self.options.page_limit, offset);
            let page = self.fetch_page(&query, &format!("{stem}.{page_no}"))?;
            outcome.num_found = outcome.num_found.max(page.num_found);
            if page.is_empty() {
                break;
            }
            match self.reconcile(&page) {
                Ok(changes) => {
                    outcome.changes += changes;
                    attempt = 0;
                }
                Err(err) => {
                    attempt += 1;
                    self.back_off(&err, attempt);
                    if attempt < self.options.retry.max_attempts {
                        continue;
                    }
                    error!(offset, attempt, "skipping page after repeated failures");
                    attempt = 0;
                }
            }
            offset += page.len() as u64;
            page_no += 1;
            if offset >= outcome.num_found {
                break;
            }
        }
        if offset < outcome.num_found {
            return Err(SearchError::overflow(
                outcome.num_found,
                usize::try_from(offset).unwrap_or(usize::MAX),
                &constraints.to_string(),
            ));
        }
        Ok(outcome)
    }

    /// One query per facet value plus one for everything else.
    pub fn get_retracted_facet(
        &mut self,
        facet: &FacetDimension,
        constraints: &ConstraintSet,
    ) -> SearchResult<DiscoveryOutcome> {
        let mut outcome = DiscoveryOutcome::default();
        for value in &facet.values {
            let split = constraints.prepend([Constraint::eq(&facet.name, value)]);
            outcome.absorb(self.get_some_retracted(&split)?);
        }
        outcome.absorb(self.get_some_retracted(&complement(facet, constraints))?);
        Ok(outcome)
    }

    /// Tries the query as is and splits on the next facet only when it overflows.
    pub fn get_retracted_multi_facets(
        &mut self,
        facets: &[FacetDimension],
        constraints: &ConstraintSet,
        complement_query: bool,
    ) -> SearchResult<DiscoveryOutcome> {
        if !constraints.is_empty() {
            let attempt = if facets.is_empty() {
                self.get_some_retracted_paginated(constraints)
            } else {
                self.get_some_retracted(constraints)
            };
            match attempt {
                Ok(outcome) => return Ok(outcome),
                Err(err) if err.is_overflow() && !facets.is_empty() => {
                    info!(constraints = %constraints, facet = %facets[0].name, "splitting on facet");
                }
                Err(err) => return Err(err),
            }
        }
        let Some((facet, rest)) = facets.split_first() else {
            return Ok(DiscoveryOutcome::default());
        };
        let mut outcome = DiscoveryOutcome::default();
        for value in &facet.values {
            let split = constraints.prepend([Constraint::eq(&facet.name, value)]);
            outcome.absorb(self.get_retracted_multi_facets(rest, &split, complement_query)?);
        }
        if complement_query {
            let rest_of = complement(facet, constraints);
            outcome.absorb(self.get_retracted_multi_facets(rest, &rest_of, complement_query)?);
        }
        Ok(outcome)
    }

    fn fetch_page(&mut self, query: &SearchQuery, stem: &str) -> SearchResult<QueryPage> {
        self.queries += 1;
        let body = self.client.fetch(query)?;
        let page = parse_page(&body)?;
        info!(
            constraints = %query.constraints,
            offset = ?query.offset,
            num_found = page.num_found,
            retrieved = page.len(),
            "search page"
        );
        if let Some(prefix) = &self.options.artifact_prefix {
            save_artifacts(prefix, stem, &body, &page);
        }
        Ok(page)
    }

    fn reconcile(&mut self, page: &QueryPage) -> StoreResult<u64> {
        if self.options.test || page.is_empty() {
            return Ok(0);
        }
        self.sink.reconcile(&page.identifiers)
    }

    fn back_off(&self, err: &StoreError, attempt: usize) {
        let delay = self.options.retry.delay_for_attempt(attempt);
        error!(
            error = %err,
            transient = err.is_transient(),
            attempt,
            delay_secs = delay.as_secs(),
            "reconciliation failed, waiting before continuing"
        );
        if err.is_transient() && !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}

fn complement(facet: &FacetDimension, constraints: &ConstraintSet) -> ConstraintSet {
    constraints.prepend(
        facet
            .values
            .iter()
            .map(|v| Constraint::ne(&facet.name, v)),
    )
}

fn save_artifacts(prefix: &str, stem: &str, body: &str, page: &QueryPage) {
    let json = format!("{prefix}{stem}.json");
    if let Err(err) = fs::write(&json, body) {
        warn!(path = %json, error = %err, "cannot save response");
    }
    let txt = format!("{prefix}{stem}.txt");
    let mut lines = page.identifiers.join("\n");
    lines.push('\n');
    if let Err(err) = fs::write(&txt, lines) {
        warn!(path = %txt, error = %err, "cannot save identifiers");
    }
}
