#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

use serde_json::{Map, Value};

mod comparator;
mod diff_walker;
mod document;
pub mod report;
mod resolver;
mod types;

pub use comparator::Comparator;
pub use diff_walker::{DiffWalker, DEFINITION_MISMATCH};
pub use document::Document;
pub use resolver::resolve_reference;
pub use types::*;

/// Take two Swagger documents, and compare them.
///
/// `lhs` (left-hand side) is the old document, `rhs` (right-hand side) is the new document.
pub fn diff(lhs: Value, rhs: Value) -> Result<ApiDiff, Error> {
    diff_with_options(lhs, rhs, DiffOptions::default())
}

/// Like [`diff`], with custom options.
pub fn diff_with_options(lhs: Value, rhs: Value, options: DiffOptions) -> Result<ApiDiff, Error> {
    let lhs = Document::from_value(lhs)?;
    let rhs = Document::from_value(rhs)?;

    if let (Some(old), Some(new)) = (lhs.version(), rhs.version()) {
        if old != new {
            return Err(Error::VersionMismatch {
                old: old.to_owned(),
                new: new.to_owned(),
            });
        }
    }

    Ok(Comparator::with_options(&lhs, &rhs, options).compare())
}

/// Compare two schema bodies, resolving references in `lhs_definitions` and
/// `rhs_definitions` respectively.
pub fn compare_trees(
    lhs: &Map<String, Value>,
    rhs: &Map<String, Value>,
    lhs_definitions: &Map<String, Value>,
    rhs_definitions: &Map<String, Value>,
) -> Result<Vec<FieldDifference>, Error> {
    let mut walker = DiffWalker::new(lhs_definitions, rhs_definitions, &DiffOptions::default());
    Ok(walker.compare_trees(lhs, rhs)?)
}

/// Compare two definitions by name. See [`DiffWalker::compare_definitions`].
pub fn compare_definitions(
    lhs_name: Option<&str>,
    rhs_name: Option<&str>,
    lhs_definitions: &Map<String, Value>,
    rhs_definitions: &Map<String, Value>,
) -> Result<Vec<FieldDifference>, Error> {
    let mut walker = DiffWalker::new(lhs_definitions, rhs_definitions, &DiffOptions::default());
    Ok(walker.compare_definitions(lhs_name, rhs_name)?)
}
