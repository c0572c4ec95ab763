//! Step selector result store.
//!
//! A step selector search offers assertions that could justify the step under the cursor. The
//! search feeds candidates into a [`StepSelectorStore`] until it reports full; the host then
//! takes [`StepSelectorStore::into_results`], whose last entry says whether the search was cut
//! short.

use crate::settings::WorksheetSettings;

/// Sentinel line: the store filled up and more candidates may exist.
pub const STEP_SELECTOR_MORE: &str = "***MORE***";
/// Sentinel line: every candidate was returned.
pub const STEP_SELECTOR_END: &str = "***END***";

/// One row of the result list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSelectorItem<C> {
    /// The candidate; `None` for the trailing sentinel.
    pub candidate: Option<C>,
    /// Display lines for the candidate.
    pub lines: Vec<String>,
}

impl<C> StepSelectorItem<C> {
    /// Returns `true` for the trailing MORE/END row.
    pub fn is_sentinel(&self) -> bool {
        self.candidate.is_none()
    }
}

/// Bounded candidate store.
#[derive(Debug, Clone)]
pub struct StepSelectorStore<C> {
    max_results: usize,
    items: Vec<StepSelectorItem<C>>,
}

impl<C> StepSelectorStore<C> {
    /// Create a store holding at most `max_results` candidates.
    pub fn new(max_results: usize) -> Self {
        Self {
            max_results,
            items: Vec::with_capacity(max_results.min(1024)),
        }
    }

    /// Create a store sized from settings.
    pub fn with_settings(settings: &WorksheetSettings) -> Self {
        Self::new(settings.step_selector_max_results)
    }

    /// Add a candidate with its display lines. Returns `true` once the store is full; candidates
    /// offered after that are dropped.
    pub fn add(&mut self, candidate: C, lines: Vec<String>) -> bool {
        if !self.is_full() {
            self.items.push(StepSelectorItem {
                candidate: Some(candidate),
                lines,
            });
        }
        self.is_full()
    }

    /// Returns `true` if no more candidates will be accepted.
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.max_results
    }

    /// Number of stored candidates.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing was stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Capacity.
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Candidates in insertion order, followed by a MORE sentinel if the store is full or an
    /// END sentinel otherwise.
    pub fn into_results(self) -> Vec<StepSelectorItem<C>> {
        let marker = if self.is_full() {
            STEP_SELECTOR_MORE
        } else {
            STEP_SELECTOR_END
        };
        let mut items = self.items;
        items.push(StepSelectorItem {
            candidate: None,
            lines: vec![marker.to_string()],
        });
        items
    }
}
