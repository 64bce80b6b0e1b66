//! CSV dataset reader with full input validation.

use std::path::{Path, PathBuf};

use arbor_tree::{Dataset, Point};
use tracing::{debug, info, instrument};

use crate::classes::ClassIndexMap;
use crate::IoError;

/// Column holding the class of each row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClassPosition {
    /// Class in the first column, attributes after it.
    First,
    /// Class in the last column, attributes before it.
    #[default]
    Last,
}

/// A loaded dataset together with the names found in the file.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    /// The points, in file order.
    pub dataset: Dataset,
    /// Attribute names from the header, or `a0`, `a1`, ... without one.
    pub attribute_names: Vec<String>,
    /// Class names as written in the file, indexed by dense label.
    pub classes: ClassIndexMap,
}

/// Reads a dataset of continuous attributes and one class column.
///
/// Each row holds the attribute values and a class cell, on the side given
/// by [`ClassPosition`]. A class cell of `-1` marks an unlabelled point in
/// both modes. Other numeric classes must be non-negative integers; string
/// classes may be any text. Either way each distinct class is mapped to a
/// dense [`ClassLabel`](arbor_tree::ClassLabel) in order of first appearance, so labels run from 0 to
/// the number of classes minus one whatever values the file uses.
///
/// | Option | Default |
/// |--------|---------|
/// | `separator` | `b','` |
/// | `class_position` | [`ClassPosition::Last`] |
/// | `has_header` | `false` |
/// | `string_classes` | `false` |
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyDataset`] | No data row |
/// | [`IoError::TooFewColumns`] | Row with fewer than two columns |
/// | [`IoError::InconsistentRowLength`] | Row length differs from the first row |
/// | [`IoError::NonFiniteValue`] | Attribute cell is NaN, Inf, or not a float |
/// | [`IoError::InvalidClass`] | Numeric class cell is not `-1` or a non-negative integer |
#[derive(Debug, Clone)]
pub struct DatasetReader {
    path: PathBuf,
    separator: u8,
    class_position: ClassPosition,
    has_header: bool,
    string_classes: bool,
}

impl DatasetReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            separator: b',',
            class_position: ClassPosition::Last,
            has_header: false,
            string_classes: false,
        }
    }

    /// Set the field separator.
    #[must_use]
    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    /// Set which column holds the class.
    #[must_use]
    pub fn with_class_position(mut self, position: ClassPosition) -> Self {
        self.class_position = position;
        self
    }

    /// Treat the first row as column names.
    #[must_use]
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Read the class column as free-form names instead of integers.
    #[must_use]
    pub fn with_string_classes(mut self, string_classes: bool) -> Self {
        self.string_classes = string_classes;
        self
    }

    /// Read and validate the file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<LoadedDataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets our own row-length check report the error.
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.separator)
            .has_headers(self.has_header)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = if self.has_header {
            let record = rdr.headers().map_err(|e| self.csv_error(e))?;
            Some(record.iter().map(str::to_string).collect::<Vec<_>>())
        } else {
            None
        };

        let mut expected_cols = header.as_ref().map(Vec::len);
        let mut dataset: Option<Dataset> = None;
        let mut classes = ClassIndexMap::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            let got = record.len();
            if got < 2 {
                return Err(IoError::TooFewColumns {
                    path: self.path.clone(),
                    row_index,
                    got,
                });
            }
            let expected = *expected_cols.get_or_insert(got);
            if got != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got,
                });
            }

            let class_col = self.class_column(got);
            let mut values = Vec::with_capacity(got - 1);
            for (col_index, raw) in record.iter().enumerate() {
                if col_index == class_col {
                    continue;
                }
                values.push(self.parse_value(raw, row_index, col_index)?);
            }

            let raw_class = record.get(class_col).unwrap_or("");
            let class = self
                .class_name(raw_class, row_index)?
                .map(|name| classes.get_or_insert(&name));
            let point = match class {
                Some(class) => Point::new(values, class),
                None => Point::unlabelled(values),
            };

            dataset
                .get_or_insert_with(|| Dataset::new(got - 1))
                .add_point(point)
                .map_err(|source| IoError::Dataset {
                    path: self.path.clone(),
                    source,
                })?;
        }

        let Some(dataset) = dataset else {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        };

        let attribute_names = match header {
            Some(names) => {
                let class_col = self.class_column(names.len());
                names
                    .into_iter()
                    .enumerate()
                    .filter(|&(i, _)| i != class_col)
                    .map(|(_, name)| name)
                    .collect()
            }
            None => (0..dataset.n_attributes()).map(|a| format!("a{a}")).collect(),
        };

        debug!(n_labelled = dataset.labelled_indices().len(), "class column read");
        info!(
            n_points = dataset.len(),
            n_attributes = dataset.n_attributes(),
            n_classes = dataset.n_classes(),
            "dataset loaded"
        );

        Ok(LoadedDataset {
            dataset,
            attribute_names,
            classes,
        })
    }

    fn class_column(&self, n_cols: usize) -> usize {
        match self.class_position {
            ClassPosition::First => 0,
            ClassPosition::Last => n_cols - 1,
        }
    }

    fn parse_value(&self, raw: &str, row_index: usize, col_index: usize) -> Result<f64, IoError> {
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(IoError::NonFiniteValue {
                path: self.path.clone(),
                row_index,
                col_index,
                raw: raw.to_string(),
            }),
        }
    }

    /// Canonical class name of a cell, or `None` for an unlabelled point.
    fn class_name(&self, raw: &str, row_index: usize) -> Result<Option<String>, IoError> {
        if raw == "-1" {
            return Ok(None);
        }
        if self.string_classes {
            return Ok(Some(raw.to_string()));
        }
        match raw.parse::<i64>() {
            Ok(-1) => Ok(None),
            Ok(label) if label >= 0 => Ok(Some(label.to_string())),
            _ => Err(self.invalid_class(raw, row_index)),
        }
    }

    fn invalid_class(&self, raw: &str, row_index: usize) -> IoError {
        IoError::InvalidClass {
            path: self.path.clone(),
            row_index,
            raw: raw.to_string(),
        }
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}
