use std::time::Instant;

use tracing::{debug, info, trace, warn};

use crate::domain::{Message, SortDirection, TVError, ViewConfig, ViewState};
use crate::pipeline::{self, Page};
use crate::record::Record;
use crate::source::DatasetSource;

// Revision counters of the state store. Every change of an input bumps its counter.
#[derive(Debug, Default, Clone, Copy)]
struct Revisions {
    dataset: u64,
    filter: u64,
    sort: u64,
    page: u64,
}

/// A cached stage output and the input key it was computed for.
#[derive(Debug, Default)]
struct Derived<K, T> {
    key: Option<K>,
    value: T,
    revision: u64,
    runs: usize,
}

impl<K: PartialEq, T> Derived<K, T> {
    // Recompute if `key` differs from the cached one. Returns true if it ran.
    fn refresh(&mut self, key: K, compute: impl FnOnce() -> T) -> bool {
        if self.key.as_ref() == Some(&key) {
            return false;
        }
        self.value = compute();
        self.key = Some(key);
        self.revision += 1;
        self.runs += 1;
        true
    }
}

/// How often each stage was recomputed since the view was created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageRuns {
    pub filter: usize,
    pub sort: usize,
    pub paginate: usize,
}

/// Reactive filter/sort/paginate view over a dataset.
///
/// All parameters are changed through the setters (or [`TableView::update`]).
/// Each mutation re-derives the stages depending on it before returning, so
/// readers always observe views consistent with the latest state.
pub struct TableView {
    config: ViewConfig,
    columns: Vec<String>,
    records: Vec<Record>,
    state: ViewState,
    revisions: Revisions,
    filtered: Derived<(u64, u64), Vec<usize>>,
    sorted: Derived<(u64, u64), Vec<usize>>,
    page: Derived<(u64, u64), Page>,
}

impl TableView {
    pub fn new(config: ViewConfig, columns: Vec<String>) -> Result<Self, TVError> {
        if config.page_size == 0 {
            return Err(TVError::InvalidPageSize(config.page_size));
        }
        let mut view = Self {
            config,
            columns,
            records: Vec::new(),
            state: ViewState::default(),
            revisions: Revisions::default(),
            filtered: Derived::default(),
            sorted: Derived::default(),
            page: Derived::default(),
        };
        view.recompute();
        Ok(view)
    }

    /// Create a view and seed it with the single emission of `source`.
    pub fn connect(
        config: ViewConfig,
        columns: Vec<String>,
        source: &dyn DatasetSource,
    ) -> Result<Self, TVError> {
        let mut view = Self::new(config, columns)?;
        let start_time = Instant::now();
        let records = source.fetch()?;
        info!(
            "Fetched {} records from {} in {}ms",
            records.len(),
            source.describe(),
            start_time.elapsed().as_millis()
        );
        view.load(records);
        Ok(view)
    }

    /// Replace the dataset. The view state is kept as is.
    pub fn load(&mut self, records: Vec<Record>) {
        self.check_field_set(&records);
        info!("[{}] Loaded {} records", self.config.name, records.len());
        self.records = records;
        self.revisions.dataset += 1;
        self.recompute();
    }

    // Records are accepted regardless, mismatching shapes only make column
    // based operations less meaningful.
    fn check_field_set(&self, records: &[Record]) {
        let Some(first) = records.first() else {
            return;
        };
        if let Some(pos) = records.iter().position(|r| !r.same_fields(first)) {
            warn!(
                "[{}] Record {} has a different field set than record 0",
                self.config.name, pos
            );
        }
        for column in self.columns.iter() {
            if first.get(column).is_none() {
                warn!("[{}] Column \"{}\" is not a field of the dataset", self.config.name, column);
            }
        }
    }

    pub fn update(&mut self, message: Message) {
        trace!("[{}] Update: {:?}", self.config.name, message);
        match message {
            Message::Load(records) => self.load(records),
            Message::Filter(text) => self.set_filter_text(text),
            Message::Sort(column) => self.set_sort_column(column),
            Message::GoToPage(page) => self.set_page(page),
            Message::NextPage => self.set_page(self.state.page.saturating_add(1)),
            Message::PreviousPage => self.set_page(self.state.page.saturating_sub(1)),
        }
    }

    /// Set the filter text and go back to the first page.
    pub fn set_filter_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        debug!("[{}] Filter: \"{}\"", self.config.name, text);
        if text != self.state.filter_text {
            self.state.filter_text = text;
            self.revisions.filter += 1;
        }
        self.change_page(1);
        self.recompute();
    }

    /// Sort by `column`. Selecting the current sort column again flips the direction.
    pub fn set_sort_column(&mut self, column: impl Into<String>) {
        let column = column.into();
        if column == self.state.sort_column {
            self.state.sort_direction = self.state.sort_direction.toggle();
        } else {
            self.state.sort_column = column;
            self.state.sort_direction = SortDirection::Ascending;
        }
        debug!(
            "[{}] Sort: \"{}\" {}",
            self.config.name, self.state.sort_column, self.state.sort_direction
        );
        self.revisions.sort += 1;
        self.recompute();
    }

    /// Go to page `page`. The value is not checked against the page count.
    pub fn set_page(&mut self, page: i64) {
        debug!("[{}] Page: {}", self.config.name, page);
        self.change_page(page);
        self.recompute();
    }

    fn change_page(&mut self, page: i64) {
        if page != self.state.page {
            self.state.page = page;
            self.revisions.page += 1;
        }
    }

    // Push the current state through the stages. A stage only runs if one of
    // its inputs changed since it last ran.
    fn recompute(&mut self) {
        let records = &self.records;
        let state = &self.state;
        let page_size = self.config.page_size;

        let start_time = Instant::now();
        if self.filtered.refresh((self.revisions.dataset, self.revisions.filter), || {
            pipeline::filter_rows(records, &state.filter_text)
        }) {
            trace!(
                "[{}] Filter kept {}/{} rows in {}us",
                self.config.name,
                self.filtered.value.len(),
                records.len(),
                start_time.elapsed().as_micros()
            );
        }

        let filtered = &self.filtered.value;
        let start_time = Instant::now();
        if self.sorted.refresh((self.filtered.revision, self.revisions.sort), || {
            pipeline::sort_rows(records, filtered, &state.sort_column, state.sort_direction)
        }) {
            trace!(
                "[{}] Sorted {} rows in {}us",
                self.config.name,
                self.sorted.value.len(),
                start_time.elapsed().as_micros()
            );
        }

        let sorted = &self.sorted.value;
        if self.page.refresh((self.sorted.revision, self.revisions.page), || {
            pipeline::paginate(sorted, state.page, page_size)
        }) {
            trace!(
                "[{}] Page {}/{} shows {} rows",
                self.config.name,
                state.page,
                self.page.value.total_pages,
                self.page.value.rows.len()
            );
        }
    }

    fn resolve(&self, rows: &[usize]) -> Vec<&Record> {
        rows.iter().map(|&idx| &self.records[idx]).collect()
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn filter_text(&self) -> &str {
        &self.state.filter_text
    }

    pub fn sort_column(&self) -> Option<&str> {
        Some(self.state.sort_column.as_str()).filter(|c| !c.is_empty())
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.state.sort_direction
    }

    pub fn page(&self) -> i64 {
        self.state.page
    }

    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    /// Records matching the filter text, in dataset order.
    pub fn filtered(&self) -> Vec<&Record> {
        self.resolve(&self.filtered.value)
    }

    /// Filtered records in sort order.
    pub fn sorted(&self) -> Vec<&Record> {
        self.resolve(&self.sorted.value)
    }

    /// Records shown on the current page.
    pub fn visible_slice(&self) -> Vec<&Record> {
        self.resolve(&self.page.value.rows)
    }

    pub fn total_pages(&self) -> usize {
        self.page.value.total_pages
    }

    pub fn stage_runs(&self) -> StageRuns {
        StageRuns {
            filter: self.filtered.runs,
            sort: self.sorted.runs,
            paginate: self.page.runs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{sample_columns, sample_records};

    fn view() -> TableView {
        let mut view = TableView::new(ViewConfig::default(), sample_columns()).unwrap();
        view.load(sample_records());
        view
    }

    fn names(records: &[&Record]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.get("name").map(|v| v.to_string()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let res = TableView::new(ViewConfig::default().page_size(0usize), vec![]);
        assert!(matches!(res, Err(TVError::InvalidPageSize(0))));
    }

    #[test]
    fn empty_view_before_load() {
        let view = TableView::new(ViewConfig::default(), sample_columns()).unwrap();
        assert!(view.visible_slice().is_empty());
        assert_eq!(view.total_pages(), 0);
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn filter_resets_page() {
        let mut view = view();
        view.set_page(2);
        assert_eq!(view.page(), 2);
        view.set_filter_text("ar");
        assert_eq!(view.page(), 1);
        assert_eq!(names(&view.visible_slice()), vec!["Sara", "Zara"]);
        assert_eq!(view.total_pages(), 1);
    }

    #[test]
    fn sort_does_not_reset_page() {
        let mut view = view();
        view.set_page(2);
        view.set_sort_column("name");
        assert_eq!(view.page(), 2);
        assert_eq!(names(&view.visible_slice()), vec!["Zara"]);
    }

    #[test]
    fn new_sort_column_starts_ascending() {
        let mut view = view();
        view.set_sort_column("name");
        view.set_sort_column("name");
        assert_eq!(view.sort_direction(), SortDirection::Descending);
        view.set_sort_column("id");
        assert_eq!(view.sort_column(), Some("id"));
        assert_eq!(view.sort_direction(), SortDirection::Ascending);
    }

    #[test]
    fn messages_drive_the_state() {
        let mut view = TableView::new(ViewConfig::default(), sample_columns()).unwrap();
        view.update(Message::Load(sample_records()));
        view.update(Message::Sort("id".into()));
        view.update(Message::Sort("id".into()));
        view.update(Message::NextPage);
        assert_eq!(view.page(), 2);
        assert_eq!(names(&view.visible_slice()), vec!["Amit"]);
        view.update(Message::PreviousPage);
        view.update(Message::PreviousPage);
        assert_eq!(view.page(), 0);
        assert!(view.visible_slice().is_empty());
        view.update(Message::GoToPage(1));
        view.update(Message::Filter("NINA".into()));
        assert_eq!(names(&view.visible_slice()), vec!["Nina"]);
    }

    #[test]
    fn extreme_pages_show_nothing() {
        let mut view = view();
        view.set_page(i64::MIN);
        assert_eq!(view.page(), i64::MIN);
        assert!(view.visible_slice().is_empty());
        assert_eq!(view.total_pages(), 2);
        view.update(Message::PreviousPage);
        assert_eq!(view.page(), i64::MIN);
        view.set_page(i64::MAX);
        view.update(Message::NextPage);
        assert!(view.visible_slice().is_empty());
    }

    #[test]
    fn only_dependent_stages_rerun() {
        let mut view = view();
        let base = view.stage_runs();

        view.set_page(2);
        let runs = view.stage_runs();
        assert_eq!(runs.filter, base.filter);
        assert_eq!(runs.sort, base.sort);
        assert_eq!(runs.paginate, base.paginate + 1);

        view.set_sort_column("name");
        let after_sort = view.stage_runs();
        assert_eq!(after_sort.filter, base.filter);
        assert_eq!(after_sort.sort, base.sort + 1);
        assert_eq!(after_sort.paginate, base.paginate + 2);

        view.set_filter_text("a");
        let after_filter = view.stage_runs();
        assert_eq!(after_filter.filter, base.filter + 1);
        assert_eq!(after_filter.sort, base.sort + 2);
    }

    #[test]
    fn unchanged_values_do_not_rerun() {
        let mut view = view();
        let base = view.stage_runs();
        view.set_page(1);
        view.set_filter_text("");
        assert_eq!(view.stage_runs(), base);
    }

    #[test]
    fn reload_keeps_state() {
        let mut view = view();
        view.set_filter_text("j");
        view.set_sort_column("name");
        view.load(vec![
            Record::new().with("id", 9).with("name", "Jo"),
            Record::new().with("id", 8).with("name", "Ja"),
            Record::new().with("id", 7).with("name", "Li"),
        ]);
        assert_eq!(view.filter_text(), "j");
        assert_eq!(names(&view.sorted()), vec!["Ja", "Jo"]);
        assert_eq!(names(&view.filtered()), vec!["Jo", "Ja"]);
    }
}
