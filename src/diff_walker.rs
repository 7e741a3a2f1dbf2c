use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::resolver::resolve_reference;
use crate::{ComparisonError, DiffOptions, Effect, FieldDifference};

/// Path of the record emitted when two references can not be compared because only one of
/// them points at an existing definition.
pub const DEFINITION_MISMATCH: &str = "Definition";

/// Recursive comparison of schema bodies, following `$ref`s into each side's definitions.
///
/// At every level of a comparison, differences are emitted in this order: keys added in
/// the new mapping, keys removed from the old mapping, then for each key present on both
/// sides its own change followed by the changes nested below it. Keys are visited in
/// ascending order.
pub struct DiffWalker<'a> {
    changes: Vec<FieldDifference>,
    lhs_definitions: &'a Map<String, Value>,
    rhs_definitions: &'a Map<String, Value>,
    max_depth: usize,
    /// Definition pairs currently being compared, outermost first.
    in_progress: Vec<(String, String)>,
}

impl<'a> DiffWalker<'a> {
    /// `lhs_definitions` belong to the old document, `rhs_definitions` to the new one.
    pub fn new(
        lhs_definitions: &'a Map<String, Value>,
        rhs_definitions: &'a Map<String, Value>,
        options: &DiffOptions,
    ) -> Self {
        Self {
            changes: vec![],
            lhs_definitions,
            rhs_definitions,
            max_depth: options.max_depth,
            in_progress: vec![],
        }
    }

    /// Compare two field mappings.
    ///
    /// Comparing a mapping with itself never yields differences, unless it leads into a
    /// reference cycle.
    pub fn compare_trees(
        &mut self,
        lhs: &Map<String, Value>,
        rhs: &Map<String, Value>,
    ) -> Result<Vec<FieldDifference>, ComparisonError> {
        self.reset();
        self.diff_trees("", lhs, rhs, 1)?;
        Ok(std::mem::take(&mut self.changes))
    }

    /// Compare the definitions named by two references, `None` meaning "no reference".
    ///
    /// * no reference on either side, or dangling references on both sides: no differences
    /// * a reference (or an existing definition) on one side only: a single
    ///   [`DEFINITION_MISMATCH`] change
    /// * otherwise the differences between the two definition bodies
    pub fn compare_definitions(
        &mut self,
        lhs_name: Option<&str>,
        rhs_name: Option<&str>,
    ) -> Result<Vec<FieldDifference>, ComparisonError> {
        self.reset();
        self.diff_definitions("", lhs_name, rhs_name, 1)?;
        Ok(std::mem::take(&mut self.changes))
    }

    fn reset(&mut self) {
        self.changes.clear();
        self.in_progress.clear();
    }

    fn push(&mut self, json_path: &str, key: &str, effect: Effect) {
        self.changes
            .push(FieldDifference::new(join(json_path, key), effect));
    }

    fn diff_trees(
        &mut self,
        json_path: &str,
        lhs: &Map<String, Value>,
        rhs: &Map<String, Value>,
        depth: usize,
    ) -> Result<(), ComparisonError> {
        if depth > self.max_depth {
            tracing::warn!(path = json_path, limit = self.max_depth, "schema nesting too deep");
            return Err(ComparisonError::DepthLimitExceeded {
                limit: self.max_depth,
            });
        }

        let lhs_keys: BTreeSet<&String> = lhs.keys().collect();
        let rhs_keys: BTreeSet<&String> = rhs.keys().collect();

        for added in rhs_keys.difference(&lhs_keys) {
            self.push(json_path, added, Effect::Added);
        }

        for removed in lhs_keys.difference(&rhs_keys) {
            self.push(json_path, removed, Effect::Removed);
        }

        for common in lhs_keys.intersection(&rhs_keys) {
            let lhs_child = &lhs[common.as_str()];
            let rhs_child = &rhs[common.as_str()];

            match (lhs_child, rhs_child) {
                (Value::Object(lhs_inner), Value::Object(rhs_inner)) => {
                    let new_path = join(json_path, common);
                    self.diff_trees(&new_path, lhs_inner, rhs_inner, depth + 1)?;
                    self.diff_definitions(
                        &new_path,
                        resolve_reference(lhs_child),
                        resolve_reference(rhs_child),
                        depth + 1,
                    )?;
                }
                (lhs_child, rhs_child) if lhs_child != rhs_child => {
                    self.push(json_path, common, Effect::Changed);
                }
                _ => (),
            }
        }

        Ok(())
    }

    fn diff_definitions(
        &mut self,
        json_path: &str,
        lhs_name: Option<&str>,
        rhs_name: Option<&str>,
        depth: usize,
    ) -> Result<(), ComparisonError> {
        let (lhs_name, rhs_name) = match (lhs_name, rhs_name) {
            (None, None) => return Ok(()),
            (Some(lhs_name), Some(rhs_name)) => (lhs_name, rhs_name),
            _ => {
                self.push(json_path, DEFINITION_MISMATCH, Effect::Changed);
                return Ok(());
            }
        };

        let lhs_definitions: &'a Map<String, Value> = self.lhs_definitions;
        let rhs_definitions: &'a Map<String, Value> = self.rhs_definitions;
        let (lhs_body, rhs_body) = match (
            lhs_definitions.get(lhs_name),
            rhs_definitions.get(rhs_name),
        ) {
            (None, None) => return Ok(()),
            (Some(lhs_body), Some(rhs_body)) => (lhs_body, rhs_body),
            _ => {
                self.push(json_path, DEFINITION_MISMATCH, Effect::Changed);
                return Ok(());
            }
        };

        let (lhs_body, rhs_body) = match (lhs_body, rhs_body) {
            (Value::Object(lhs_body), Value::Object(rhs_body)) => (lhs_body, rhs_body),
            (lhs_body, rhs_body) => {
                if lhs_body != rhs_body {
                    self.push(json_path, DEFINITION_MISMATCH, Effect::Changed);
                }
                return Ok(());
            }
        };

        let pair = (lhs_name.to_owned(), rhs_name.to_owned());
        if self.in_progress.contains(&pair) {
            tracing::warn!(
                path = json_path,
                lhs = lhs_name,
                rhs = rhs_name,
                "reference cycle between definitions"
            );
            return Err(ComparisonError::CyclicReference {
                old: pair.0,
                new: pair.1,
            });
        }

        tracing::trace!(path = json_path, lhs = lhs_name, rhs = rhs_name, "comparing definitions");
        self.in_progress.push(pair);
        let result = self.diff_trees(json_path, lhs_body, rhs_body, depth);
        self.in_progress.pop();
        result
    }
}

fn join(json_path: &str, key: &str) -> String {
    if json_path.is_empty() {
        key.to_owned()
    } else {
        format!("{json_path}.{key}")
    }
}
