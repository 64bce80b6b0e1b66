//! File I/O for arbor: CSV dataset loading and Graphviz export of trees.

mod classes;
mod dot;
mod error;
mod reader;

pub use classes::ClassIndexMap;
pub use dot::{to_dot, write_dot};
pub use error::IoError;
pub use reader::{ClassPosition, DatasetReader, LoadedDataset};
