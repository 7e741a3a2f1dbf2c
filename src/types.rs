use serde::Serialize;
use thiserror::Error;

/// An operation of the API, identified by its path template and HTTP method.
///
/// Ordering is by path first, then by method.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Endpoint {
    /// Path template as written under `paths`, e.g. `/pet/{id}`.
    pub path: String,
    /// HTTP method as spelled in the document, e.g. `get`.
    pub method: String,
}

impl Endpoint {
    /// Create a new endpoint identity.
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
        }
    }
}

/// An "atomic" change found while comparing two schema bodies, going from old to new.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDifference {
    /// Dot-joined chain of keys leading to the differing field, e.g. `properties.code`.
    pub path: String,
    /// What happened to the field.
    pub effect: Effect,
}

impl FieldDifference {
    pub(crate) fn new(path: impl Into<String>, effect: Effect) -> Self {
        Self {
            path: path.into(),
            effect,
        }
    }
}

/// The kind of a [`FieldDifference`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// The field only exists in the new document.
    Added,
    /// The field only exists in the old document.
    Removed,
    /// The field exists on both sides with a different value, or a referenced definition
    /// can not be compared because only one side has it.
    Changed,
}

impl Effect {
    /// The marker used in text reports.
    pub fn marker(self) -> &'static str {
        match self {
            Effect::Added => "+",
            Effect::Removed => "-",
            Effect::Changed => "/",
        }
    }
}

/// A query (non-body) parameter that exists in both documents with different metadata.
///
/// Only the pairs whose raw JSON values differ are populated, everything else stays `None`.
/// Values are kept as text: strings as they are, anything else as its JSON text, so a
/// `required: true` reads `"true"` and an explicit `null` reads `"null"`. `None` on one
/// side of a populated pair means the field is absent there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangedParameter {
    /// Name of the parameter. Parameters are matched by name.
    pub name: String,
    /// Old `type`, if it changed.
    pub old_type: Option<String>,
    /// New `type`, if it changed.
    pub new_type: Option<String>,
    /// Old location (`in`), if it changed.
    pub old_in: Option<String>,
    /// New location (`in`), if it changed.
    pub new_in: Option<String>,
    /// Old description, if it changed.
    pub old_description: Option<String>,
    /// New description, if it changed.
    pub new_description: Option<String>,
    /// Old `required` flag, if it changed.
    pub old_required: Option<String>,
    /// New `required` flag, if it changed.
    pub new_required: Option<String>,
}

/// Everything that changed on an endpoint present in both documents.
#[derive(Debug, PartialEq, Serialize)]
pub struct EndpointChanges {
    /// The endpoint in question.
    pub endpoint: Endpoint,
    /// Names of query parameters only found in the new document.
    pub added_parameters: Vec<String>,
    /// Names of query parameters only found in the old document.
    pub removed_parameters: Vec<String>,
    /// Query parameters found in both documents with different metadata.
    pub changed_parameters: Vec<ChangedParameter>,
    /// Differences of the request body schema.
    pub request_body: Result<Vec<FieldDifference>, ComparisonError>,
    /// Differences of the schema of the `200` response.
    pub response_body: Result<Vec<FieldDifference>, ComparisonError>,
}

impl EndpointChanges {
    /// Whether anything at all changed on this endpoint.
    pub fn is_empty(&self) -> bool {
        self.added_parameters.is_empty()
            && self.removed_parameters.is_empty()
            && self.changed_parameters.is_empty()
            && body_is_empty(&self.request_body)
            && body_is_empty(&self.response_body)
    }
}

fn body_is_empty(body: &Result<Vec<FieldDifference>, ComparisonError>) -> bool {
    matches!(body, Ok(differences) if differences.is_empty())
}

/// The full comparison of two documents.
#[derive(Debug, PartialEq, Serialize)]
pub struct ApiDiff {
    /// Endpoints only found in the new document, sorted.
    pub added: Vec<Endpoint>,
    /// Endpoints only found in the old document, sorted.
    pub removed: Vec<Endpoint>,
    /// Endpoints found in both documents that changed, sorted.
    pub changed: Vec<EndpointChanges>,
}

/// Tunables for a comparison run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
    /// How many nested mappings the tree comparison may descend into before giving up.
    pub max_depth: usize,
}

impl DiffOptions {
    /// Default for [`DiffOptions::max_depth`].
    pub const DEFAULT_MAX_DEPTH: usize = 256;
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}

/// A failure of a single schema comparison.
///
/// These never abort a whole document comparison: they are reported for the endpoint body
/// that triggered them.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComparisonError {
    /// The pair of definitions is already being compared further up, following it again
    /// would never terminate.
    #[error("cyclic reference while comparing definition {old:?} with {new:?}")]
    CyclicReference {
        /// Definition name in the old document.
        old: String,
        /// Definition name in the new document.
        new: String,
    },
    /// The schemas are nested deeper than [`DiffOptions::max_depth`].
    #[error("schemas are nested deeper than {limit} levels")]
    DepthLimitExceeded {
        /// The configured limit.
        limit: usize,
    },
}

/// The errors that can happen in this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to parse a document.
    ///
    /// Any deserialization errors from serde end up here.
    #[error("failed to parse document")]
    Serde(#[from] serde_json::Error),
    /// The document is JSON, but not shaped like an API description.
    #[error("malformed document: {reason}")]
    MalformedDocument {
        /// What exactly is wrong.
        reason: String,
    },
    /// The documents declare different description format versions.
    #[error("can not compare a swagger {old} document with a swagger {new} document")]
    VersionMismatch {
        /// Version declared by the old document.
        old: String,
        /// Version declared by the new document.
        new: String,
    },
    /// A schema comparison failed.
    #[error(transparent)]
    Comparison(#[from] ComparisonError),
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedDocument {
            reason: reason.into(),
        }
    }
}
