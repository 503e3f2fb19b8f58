use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::trace;

use crate::domain::{DEFAULT_PAGE_SIZE, Message, TVError, ViewConfig};
use crate::record::Record;
use crate::sample::{SAMPLE_COLUMNS, sample_records};
use crate::source::{DatasetSource, FileSource, StaticSource};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Filter, sort and page through tabular data.
#[derive(Debug, Parser)]
#[command(name = "tv", version, about)]
pub struct Args {
    /// Data file (csv, parquet, arrow, json). Uses a built in sample without it.
    pub path: Option<String>,

    /// Comma separated columns to show, defaults to the fields of the first record
    #[arg(short, long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Keep only rows containing this text (case-insensitive)
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Sort by column, repeat the same column to sort descending
    #[arg(short, long)]
    pub sort: Vec<String>,

    /// Page to show
    #[arg(short, long, allow_negative_numbers = true)]
    pub page: Option<i64>,

    /// Rows per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Print every page instead of a single one
    #[arg(long)]
    pub all_pages: bool,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Turns command line arguments into the view setup and the messages to apply.
pub struct Controller {
    args: Args,
}

impl Controller {
    pub fn new(args: Args) -> Self {
        Self { args }
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    pub fn config(&self) -> ViewConfig {
        let name = self.args.path.as_deref().unwrap_or("sample");
        ViewConfig::default()
            .name(name)
            .page_size(self.args.page_size)
    }

    pub fn source(&self) -> Result<Box<dyn DatasetSource>, TVError> {
        match &self.args.path {
            Some(path) => {
                let expanded = shellexpand::full(path)
                    .map_err(|e| TVError::loading_failed(format!("Cannot expand {path}: {e}")))?;
                Ok(Box::new(FileSource::new(PathBuf::from(expanded.as_ref()))))
            }
            None => Ok(Box::new(StaticSource::new("sample", sample_records()))),
        }
    }

    /// Explicit columns, otherwise the field names of the first record.
    pub fn columns(&self, records: &[Record]) -> Vec<String> {
        if !self.args.columns.is_empty() {
            return self.args.columns.clone();
        }
        match (records.first(), &self.args.path) {
            (Some(first), _) => first.field_names().map(str::to_string).collect(),
            (None, None) => SAMPLE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            (None, Some(_)) => Vec::new(),
        }
    }

    /// Filter first (it resets the page), then the sorts in given order, then the page.
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::new();
        if let Some(filter) = &self.args.filter {
            messages.push(Message::Filter(filter.clone()));
        }
        messages.extend(self.args.sort.iter().cloned().map(Message::Sort));
        if let Some(page) = self.args.page {
            messages.push(Message::GoToPage(page));
        }
        trace!("Mapped: {:?} => {:?}", self.args, messages);
        messages
    }
}
