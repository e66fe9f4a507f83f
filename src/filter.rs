mod debounce;
mod state;

use std::time::Duration;

use self::debounce::Debouncer;
pub use self::state::{FilterDraft, FilterState, SortDir, SortField};

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Collects filter edits and emits one canonical [`FilterState`] after the
/// edits have been quiet for the configured period.
///
/// Every edit restarts the quiet period, even when it leaves the draft
/// unchanged. The consumer receives emissions by awaiting [`next`](Self::next).
pub struct FilterAggregator {
    draft: FilterDraft,
    debouncer: Debouncer<FilterState>,
}

impl FilterAggregator {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            draft: FilterDraft::default(),
            debouncer: Debouncer::new(quiet_period),
        }
    }

    pub fn draft(&self) -> &FilterDraft {
        &self.draft
    }

    /// Whether an emission is waiting for the quiet period to elapse.
    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Resolves with the canonical state once the edits have been quiet for
    /// the full period. Pends while no edit is waiting, so it can sit in a
    /// `select!` loop next to the edit source; a dropped wait loses nothing.
    pub async fn next(&mut self) -> FilterState {
        self.debouncer.next().await
    }

    pub fn set_lower_price(&mut self, value: f64) {
        self.edit(|draft| draft.set_lower_price(value));
    }

    pub fn clear_lower_price(&mut self) {
        self.edit(FilterDraft::clear_lower_price);
    }

    pub fn set_upper_price(&mut self, value: f64) {
        self.edit(|draft| draft.set_upper_price(value));
    }

    pub fn clear_upper_price(&mut self) {
        self.edit(FilterDraft::clear_upper_price);
    }

    pub fn select(&mut self, kind: &str, value: &str) {
        self.edit(|draft| draft.select(kind, value));
    }

    pub fn deselect(&mut self, kind: &str) {
        self.edit(|draft| draft.deselect(kind));
    }

    pub fn set_sort_field(&mut self, field: Option<SortField>) {
        self.edit(|draft| draft.set_sort_field(field));
    }

    pub fn set_sort_dir(&mut self, dir: Option<SortDir>) {
        self.edit(|draft| draft.set_sort_dir(dir));
    }

    pub fn reset(&mut self) {
        self.edit(FilterDraft::reset);
    }

    fn edit(&mut self, apply: impl FnOnce(&mut FilterDraft)) {
        apply(&mut self.draft);
        self.debouncer.schedule(self.draft.canonical());
    }
}
