use std::fs::{self, File};
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Instant;

use polars::prelude::*;
use tracing::{debug, info, instrument};

use crate::domain::TVError;
use crate::record::{Record, Value};

/// Supplier of the raw dataset. It is asked exactly once, before the view is populated.
pub trait DatasetSource {
    fn fetch(&self) -> Result<Vec<Record>, TVError>;

    /// Short human readable origin, used in logs and status output.
    fn describe(&self) -> String;
}

/// Records held in memory.
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    records: Vec<Record>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }
}

impl DatasetSource for StaticSource {
    fn fetch(&self) -> Result<Vec<Record>, TVError> {
        Ok(self.records.clone())
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// A JSON array of objects, as handed over by a web service.
#[derive(Debug, Clone)]
pub struct JsonSource {
    text: String,
}

impl JsonSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl DatasetSource for JsonSource {
    fn fetch(&self) -> Result<Vec<Record>, TVError> {
        let items: Vec<serde_json::Value> = serde_json::from_str(&self.text)?;
        items.into_iter().map(Record::try_from).collect()
    }

    fn describe(&self) -> String {
        "json".to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
    JSON,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// Tabular data file on disk (csv, parquet, arrow ipc or json).
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn detect_file_type(path: &Path) -> Result<FileType, TVError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            Some("JSON") => Ok(FileType::JSON),
            _ => Err(TVError::UnknownFileType),
        }
    }

    fn get_file_info(path: &Path) -> Result<FileInfo, TVError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TVError::FileNotFound,
            ErrorKind::PermissionDenied => TVError::PermissionDenied,
            _ => TVError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(TVError::loading_failed("Not a file!"));
        }

        Ok(FileInfo {
            path: path.to_path_buf(),
            file_size: metadata.len(),
            file_type: Self::detect_file_type(path)?,
        })
    }

    fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
            .finish()
    }

    fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
    }

    fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_ipc(
            PlPath::Local(path.into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        )
    }

    fn load_json(path: &Path) -> Result<Vec<Record>, TVError> {
        let reader = BufReader::new(File::open(path)?);
        let items: Vec<serde_json::Value> = serde_json::from_reader(reader)?;
        items.into_iter().map(Record::try_from).collect()
    }

    fn is_integer_type(dtype: &DataType) -> bool {
        matches!(
            dtype,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
        )
    }

    fn is_float_type(dtype: &DataType) -> bool {
        matches!(dtype, DataType::Float32 | DataType::Float64)
    }

    // Values go through their string form and are typed back by the column dtype.
    fn cell_value(text: Option<&str>, dtype: &DataType) -> Value {
        let Some(text) = text else {
            return Value::Null;
        };
        if Self::is_integer_type(dtype) {
            if let Ok(i) = text.parse::<i64>() {
                return Value::Int(i);
            }
        } else if Self::is_float_type(dtype) {
            if let Ok(x) = text.parse::<f64>() {
                return Value::Float(x);
            }
        } else if *dtype == DataType::Boolean {
            if let Ok(b) = text.parse::<bool>() {
                return Value::Bool(b);
            }
        }
        Value::Str(text.to_string())
    }

    fn load_column(df: &DataFrame, col_name: &str) -> Result<Vec<Value>, PolarsError> {
        let original_dtype = df.column(col_name)?.dtype().clone();
        let col = df.column(col_name)?.cast(&DataType::String)?;
        let series = col.str()?;
        Ok(series
            .into_iter()
            .map(|value| Self::cell_value(value, &original_dtype))
            .collect())
    }

    fn frame_to_records(frame: LazyFrame) -> Result<Vec<Record>, TVError> {
        let df = frame.collect()?;
        let mut columns = Vec::with_capacity(df.width());
        for name in df.get_column_names() {
            columns.push((name.to_string(), Self::load_column(&df, name)?));
        }
        debug!("Frame has {} columns and {} rows", columns.len(), df.height());

        let records = (0..df.height())
            .map(|row| {
                columns
                    .iter()
                    .map(|(name, data)| (name.clone(), data[row].clone()))
                    .collect::<Record>()
            })
            .collect();
        Ok(records)
    }
}

impl DatasetSource for FileSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn fetch(&self) -> Result<Vec<Record>, TVError> {
        let file_info = Self::get_file_info(&self.path)?;
        let start_time = Instant::now();
        let records = match file_info.file_type {
            FileType::CSV => Self::frame_to_records(Self::load_csv(&file_info.path)?)?,
            FileType::PARQUET => Self::frame_to_records(Self::load_parquet(&file_info.path)?)?,
            FileType::ARROW => Self::frame_to_records(Self::load_arrow(&file_info.path)?)?,
            FileType::JSON => Self::load_json(&file_info.path)?,
        };
        info!(
            "Loading {:?} file ({} bytes) took {}ms ...",
            file_info.file_type,
            file_info.file_size,
            start_time.elapsed().as_millis()
        );
        Ok(records)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
