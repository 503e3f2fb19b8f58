//! Built in datasets, used when `tv` is started without a file.

use crate::domain::TVError;
use crate::record::Record;
use crate::source::DatasetSource;

pub const SAMPLE_COLUMNS: [&str; 3] = ["id", "name", "email"];

const SAMPLE_NAMES: [&str; 6] = ["Amit", "Sara", "John", "Nina", "Raj", "Zara"];

pub fn sample_columns() -> Vec<String> {
    SAMPLE_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// Six people with ids 1 to 6 and an `<name>@example.com` address each.
pub fn sample_records() -> Vec<Record> {
    SAMPLE_NAMES
        .iter()
        .zip(1..)
        .map(|(name, id): (&&str, i64)| {
            Record::new()
                .with("id", id)
                .with("name", *name)
                .with("email", format!("{}@example.com", name.to_lowercase()))
        })
        .collect()
}

/// Stand-in for a user backend, serves a fixed list of users.
#[derive(Debug, Default, Clone)]
pub struct UserBackend;

impl UserBackend {
    pub fn columns(&self) -> Vec<String> {
        vec!["id".to_string(), "name".to_string()]
    }
}

impl DatasetSource for UserBackend {
    fn fetch(&self) -> Result<Vec<Record>, TVError> {
        Ok(vec![Record::new().with("id", 1).with("name", "Ashish")])
    }

    fn describe(&self) -> String {
        "user backend".to_string()
    }
}
