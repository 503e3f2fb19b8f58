//! Reactive table views: filter, sort and paginate a dataset of records.
//!
//! ```
//! use tv_view::{TableView, ViewConfig, sample};
//!
//! let mut view = TableView::new(ViewConfig::default(), sample::sample_columns()).unwrap();
//! view.load(sample::sample_records());
//! view.set_sort_column("name");
//! view.set_page(2);
//! assert_eq!(view.visible_slice().len(), 1);
//! assert_eq!(view.total_pages(), 2);
//! ```

pub mod controller;
pub mod domain;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod record;
pub mod sample;
pub mod source;
pub mod ui;

pub use domain::{Message, SortDirection, TVError, ViewConfig, ViewState};
pub use model::{StageRuns, TableView};
pub use record::{Record, Value};
pub use source::{DatasetSource, FileSource, JsonSource, StaticSource};
