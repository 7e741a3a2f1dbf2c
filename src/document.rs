use serde_json::{Map, Value};

use crate::resolver::resolve_reference;
use crate::{Endpoint, Error};

/// Keys of a path item that describe operations. Anything else (`parameters`, `$ref`,
/// vendor extensions) is ignored when enumerating endpoints.
const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// A loaded API description.
///
/// Construction checks the overall shape once, so the accessors never fail: a missing
/// piece of an operation just reads as "nothing there".
#[derive(Debug, Clone)]
pub struct Document {
    version: Option<String>,
    paths: Map<String, Value>,
    definitions: Map<String, Value>,
    endpoints: Vec<Endpoint>,
}

impl Document {
    /// Load a document from an already parsed JSON tree.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        let Value::Object(mut root) = value else {
            return Err(Error::malformed("document root is not an object"));
        };

        let version = match root.get("swagger") {
            Some(Value::String(version)) => Some(version.clone()),
            Some(Value::Number(version)) => Some(version.to_string()),
            _ => None,
        };

        let paths = match root.remove("paths") {
            Some(Value::Object(paths)) => paths,
            Some(_) => return Err(Error::malformed("`paths` is not an object")),
            None => return Err(Error::malformed("`paths` is missing")),
        };

        let definitions = match root.remove("definitions") {
            Some(Value::Object(definitions)) => definitions,
            Some(_) => return Err(Error::malformed("`definitions` is not an object")),
            None => Map::new(),
        };

        let mut endpoints = vec![];
        for (path, item) in &paths {
            let item = item
                .as_object()
                .ok_or_else(|| Error::malformed(format!("path item {path} is not an object")))?;

            for (method, operation) in item {
                if !is_http_method(method) {
                    continue;
                }
                check_operation(path, method, operation)?;
                endpoints.push(Endpoint::new(path.as_str(), method.as_str()));
            }
        }
        endpoints.sort();

        tracing::debug!(
            version = ?version,
            endpoints = endpoints.len(),
            definitions = definitions.len(),
            "loaded document"
        );

        Ok(Self {
            version,
            paths,
            definitions,
            endpoints,
        })
    }

    /// Parse and load a document from JSON text.
    pub fn from_json(content: &str) -> Result<Self, Error> {
        Self::from_value(serde_json::from_str(content)?)
    }

    /// The declared `swagger` version, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// All operations of the document, sorted by path and method.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// The definitions table, empty if the document has none.
    pub fn definitions(&self) -> &Map<String, Value> {
        &self.definitions
    }

    /// Look up a definition body by name.
    pub fn definition(&self, name: &str) -> Option<&Value> {
        self.definitions.get(name)
    }

    fn operation(&self, endpoint: &Endpoint) -> Option<&Map<String, Value>> {
        self.paths
            .get(&endpoint.path)?
            .get(&endpoint.method)?
            .as_object()
    }

    fn parameters(&self, endpoint: &Endpoint) -> impl Iterator<Item = &Value> {
        self.operation(endpoint)
            .and_then(|operation| operation.get("parameters"))
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter(|parameter| parameter.is_object())
    }

    /// Parameters of an operation, without the body parameter.
    pub fn endpoint_query_params(&self, endpoint: &Endpoint) -> Vec<&Map<String, Value>> {
        self.parameters(endpoint)
            .filter(|parameter| !is_body(parameter))
            .filter_map(Value::as_object)
            .collect()
    }

    /// Definition name referenced by the body parameter of an operation.
    pub fn endpoint_request_body_id(&self, endpoint: &Endpoint) -> Option<&str> {
        let body = self.parameters(endpoint).find(|parameter| is_body(parameter))?;
        resolve_reference(body)
    }

    /// Definition name referenced by the `200` response of an operation.
    pub fn endpoint_response_200_id(&self, endpoint: &Endpoint) -> Option<&str> {
        let response = self.operation(endpoint)?.get("responses")?.get("200")?;
        resolve_reference(response)
    }
}

fn is_http_method(key: &str) -> bool {
    HTTP_METHODS
        .iter()
        .any(|method| method.eq_ignore_ascii_case(key))
}

fn is_body(parameter: &Value) -> bool {
    parameter
        .get("in")
        .and_then(Value::as_str)
        .map_or(false, |location| location.eq_ignore_ascii_case("body"))
}

fn check_operation(path: &str, method: &str, operation: &Value) -> Result<(), Error> {
    let operation = operation
        .as_object()
        .ok_or_else(|| Error::malformed(format!("operation {method} {path} is not an object")))?;

    match operation.get("parameters") {
        Some(Value::Array(parameters)) => {
            if !parameters.iter().all(Value::is_object) {
                return Err(Error::malformed(format!(
                    "a parameter of {method} {path} is not an object"
                )));
            }
        }
        Some(_) => {
            return Err(Error::malformed(format!(
                "parameters of {method} {path} are not an array"
            )))
        }
        None => (),
    }

    match operation.get("responses") {
        Some(Value::Object(_)) | None => Ok(()),
        Some(_) => Err(Error::malformed(format!(
            "responses of {method} {path} are not an object"
        ))),
    }
}
