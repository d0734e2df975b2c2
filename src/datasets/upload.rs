use std::{
    fs::File,
    io::{self, BufReader, Read, Write},
    path::Path,
};

use log::debug;
use tempfile::NamedTempFile;

use crate::manager::report::SUMMARY_KEYS;

use super::{Corpus, Item};

/// A user-uploaded dataset, spooled to a temporary file that is removed on drop
#[derive(Debug)]
pub struct UploadedDataset {
    /// The file name the client supplied
    file_name: String,

    /// Scoped temporary storage for the uploaded bytes
    file: NamedTempFile,
}

impl UploadedDataset {
    /// Spool uploaded bytes into temporary storage
    pub fn spool(file_name: impl Into<String>, bytes: &[u8]) -> io::Result<Self> {
        Self::from_reader(file_name, bytes)
    }

    /// Spool an uploaded stream into temporary storage
    pub fn from_reader(file_name: impl Into<String>, mut reader: impl Read) -> io::Result<Self> {
        let mut file = NamedTempFile::new()?;
        io::copy(&mut reader, &mut file)?;
        file.flush()?;

        Ok(Self {
            file_name: file_name.into(),
            file,
        })
    }

    /// The file name the client supplied
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Location of the spooled bytes
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Upload validation errors. These are user-fixable.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No file was attached, or its name was empty
    #[error("no file was provided")]
    MissingFile,

    /// The file extension is not on the allow-list
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Required header columns are absent
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The file has no header or no data rows
    #[error("the file contains no data rows")]
    EmptyFile,

    /// The file could not be parsed as delimited text
    #[error("malformed file: {0}")]
    Malformed(String),

    /// A label collides with a key of the classification report
    #[error("row {row} uses the reserved label '{label}'")]
    ReservedLabel {
        /// 1-based data row number, not counting the header
        row: usize,

        /// The offending label
        label: String,
    },

    /// A data row has an empty text or label cell
    #[error("row {row} has an empty '{column}' value")]
    MissingValue {
        /// 1-based data row number, not counting the header
        row: usize,

        /// The column with the empty cell
        column: String,
    },
}

/// Checks uploaded data shape and schema before it can touch a corpus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestValidator {
    /// Header of the column holding example text
    text_column: String,

    /// Header of the column holding the class label
    label_column: String,

    /// Lowercase file extensions accepted for upload
    allowed_extensions: Vec<String>,
}

impl IngestValidator {
    /// Create a validator for the given column names and extension allow-list
    pub fn new(
        text_column: impl Into<String>,
        label_column: impl Into<String>,
        allowed_extensions: Vec<String>,
    ) -> Self {
        Self {
            text_column: text_column.into(),
            label_column: label_column.into(),
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Header of the text column
    pub fn text_column(&self) -> &str {
        &self.text_column
    }

    /// Header of the label column
    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    /// Validate an upload and return its rows
    pub fn validate(&self, dataset: &UploadedDataset) -> Result<Corpus, ValidationError> {
        self.check_file_name(dataset.file_name())?;

        let file = File::open(dataset.path())
            .map_err(|e| ValidationError::Malformed(format!("unable to read upload: {}", e)))?;

        let corpus = self.read(BufReader::new(file))?;

        debug!(
            "Validated upload {} with {} rows",
            dataset.file_name(),
            corpus.len()
        );

        Ok(corpus)
    }

    /// Check the file name is present and carries an allowed extension
    pub fn check_file_name(&self, file_name: &str) -> Result<(), ValidationError> {
        if file_name.trim().is_empty() {
            return Err(ValidationError::MissingFile);
        }

        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);

        match extension {
            Some(ext) if self.allowed_extensions.contains(&ext) => Ok(()),
            _ => Err(ValidationError::UnsupportedFormat(file_name.to_string())),
        }
    }

    /// Parse comma-separated rows with a header into a corpus
    pub fn read<R: Read>(&self, reader: R) -> Result<Corpus, ValidationError> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| ValidationError::Malformed(e.to_string()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect::<Vec<_>>();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ValidationError::EmptyFile);
        }

        let position = |name: &str| headers.iter().position(|h| h == name);

        let (text_index, label_index) =
            match (position(&self.text_column), position(&self.label_column)) {
                (Some(text), Some(label)) => (text, label),
                (text, label) => {
                    let mut missing = Vec::new();
                    if text.is_none() {
                        missing.push(self.text_column.clone());
                    }
                    if label.is_none() {
                        missing.push(self.label_column.clone());
                    }

                    return Err(ValidationError::MissingColumns(missing));
                }
            };

        let mut items = Vec::new();

        for (index, record) in reader.records().enumerate() {
            let row = index + 1;
            let record = record.map_err(|e| ValidationError::Malformed(e.to_string()))?;

            let text = record.get(text_index).unwrap_or_default();
            let label = record.get(label_index).unwrap_or_default().trim();

            if text.trim().is_empty() {
                return Err(ValidationError::MissingValue {
                    row,
                    column: self.text_column.clone(),
                });
            }

            if label.is_empty() {
                return Err(ValidationError::MissingValue {
                    row,
                    column: self.label_column.clone(),
                });
            }

            if SUMMARY_KEYS.contains(&label) {
                return Err(ValidationError::ReservedLabel {
                    row,
                    label: label.to_string(),
                });
            }

            items.push(Item::new(text.to_string(), label.to_string()));
        }

        if items.is_empty() {
            return Err(ValidationError::EmptyFile);
        }

        Ok(Corpus::new(items))
    }
}
