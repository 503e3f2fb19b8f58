use std::fmt;
use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;
use tracing_error::SpanTrace;

use crate::record::Record;

pub const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Debug)]
pub enum TVError {
    IoError(Error),
    PolarsError(PolarsError),
    JsonError(serde_json::Error),
    LoadingFailed { reason: String, context: SpanTrace },
    InvalidPageSize(usize),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl TVError {
    pub fn loading_failed(reason: impl Into<String>) -> Self {
        TVError::LoadingFailed {
            reason: reason.into(),
            context: SpanTrace::capture(),
        }
    }
}

impl fmt::Display for TVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TVError::IoError(e) => write!(f, "I/O error: {e}"),
            TVError::PolarsError(e) => write!(f, "Could not read data: {e}"),
            TVError::JsonError(e) => write!(f, "Invalid JSON: {e}"),
            TVError::LoadingFailed { reason, context } => {
                write!(f, "Loading failed: {reason}")?;
                if f.alternate() {
                    write!(f, "\n{context}")?;
                }
                Ok(())
            }
            TVError::InvalidPageSize(size) => write!(f, "Invalid page size {size}, must be at least 1"),
            TVError::FileNotFound => f.write_str("File not found"),
            TVError::PermissionDenied => f.write_str("Permission denied"),
            TVError::UnknownFileType => f.write_str("Unknown file type"),
        }
    }
}

impl std::error::Error for TVError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TVError::IoError(e) => Some(e),
            TVError::PolarsError(e) => Some(e),
            TVError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for TVError {
    fn from(err: Error) -> Self {
        TVError::IoError(err)
    }
}

impl From<PolarsError> for TVError {
    fn from(err: PolarsError) -> Self {
        TVError::PolarsError(err)
    }
}

impl From<serde_json::Error> for TVError {
    fn from(err: serde_json::Error) -> Self {
        TVError::JsonError(err)
    }
}

/// Static settings of a view, fixed for its lifetime.
#[derive(Debug, Clone, Setters)]
#[setters(into)]
pub struct ViewConfig {
    /// Used to tag log output of this view.
    pub name: String,
    /// Rows per page.
    pub page_size: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            name: "table".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => f.write_str("asc"),
            SortDirection::Descending => f.write_str("desc"),
        }
    }
}

/// The user controlled parameters driving the derived views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub filter_text: String,
    /// Empty means the filtered order is kept.
    pub sort_column: String,
    pub sort_direction: SortDirection,
    /// Not validated, pages outside `1..=total_pages` show nothing.
    pub page: i64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            filter_text: String::new(),
            sort_column: String::new(),
            sort_direction: SortDirection::Ascending,
            page: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Load(Vec<Record>),
    Filter(String),
    Sort(String),
    GoToPage(i64),
    NextPage,
    PreviousPage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_toggles_back_and_forth() {
        let d = SortDirection::default();
        assert_eq!(d, SortDirection::Ascending);
        assert_eq!(d.toggle(), SortDirection::Descending);
        assert_eq!(d.toggle().toggle(), SortDirection::Ascending);
    }

    #[test]
    fn config_setters() {
        let cfg = ViewConfig::default().page_size(10usize).name("users");
        assert_eq!(cfg.page_size, 10);
        assert_eq!(cfg.name, "users");
        assert_eq!(ViewConfig::default().page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn initial_state_shows_first_page() {
        let state = ViewState::default();
        assert_eq!(state.page, 1);
        assert!(state.filter_text.is_empty());
        assert!(state.sort_column.is_empty());
    }

    #[test]
    fn errors_have_messages() {
        assert_eq!(TVError::InvalidPageSize(0).to_string(), "Invalid page size 0, must be at least 1");
        let e = TVError::loading_failed("Not a file!");
        assert_eq!(e.to_string(), "Loading failed: Not a file!");
        let io: TVError = std::io::Error::other("boom").into();
        assert!(matches!(io, TVError::IoError(_)));
    }
}
