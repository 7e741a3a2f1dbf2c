use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::diff_walker::DiffWalker;
use crate::document::Document;
use crate::{
    ApiDiff, ChangedParameter, ComparisonError, DiffOptions, Endpoint, EndpointChanges,
    FieldDifference,
};

/// Compares two loaded documents, `old` against `new`.
pub struct Comparator<'a> {
    old: &'a Document,
    new: &'a Document,
    options: DiffOptions,
}

impl<'a> Comparator<'a> {
    /// Compare with default [`DiffOptions`].
    pub fn new(old: &'a Document, new: &'a Document) -> Self {
        Self::with_options(old, new, DiffOptions::default())
    }

    /// Compare with custom options.
    pub fn with_options(old: &'a Document, new: &'a Document, options: DiffOptions) -> Self {
        Self { old, new, options }
    }

    fn endpoint_sets(&self) -> (BTreeSet<&'a Endpoint>, BTreeSet<&'a Endpoint>) {
        (
            self.old.endpoints().iter().collect(),
            self.new.endpoints().iter().collect(),
        )
    }

    /// Endpoints only in the new document, sorted.
    pub fn added_endpoints(&self) -> Vec<Endpoint> {
        let (old, new) = self.endpoint_sets();
        new.difference(&old).map(|&ep| ep.clone()).collect()
    }

    /// Endpoints only in the old document, sorted.
    pub fn removed_endpoints(&self) -> Vec<Endpoint> {
        let (old, new) = self.endpoint_sets();
        old.difference(&new).map(|&ep| ep.clone()).collect()
    }

    /// Endpoints in both documents, sorted.
    pub fn same_endpoints(&self) -> Vec<Endpoint> {
        let (old, new) = self.endpoint_sets();
        old.intersection(&new).map(|&ep| ep.clone()).collect()
    }

    /// Names of query parameters of `endpoint` that only the new document has.
    pub fn added_query_parameters(&self, endpoint: &Endpoint) -> Vec<String> {
        let old = self.old.endpoint_query_params(endpoint);
        let new = self.new.endpoint_query_params(endpoint);
        unmatched_names(&new, &old)
    }

    /// Names of query parameters of `endpoint` that only the old document has.
    pub fn removed_query_parameters(&self, endpoint: &Endpoint) -> Vec<String> {
        let old = self.old.endpoint_query_params(endpoint);
        let new = self.new.endpoint_query_params(endpoint);
        unmatched_names(&old, &new)
    }

    /// Query parameters of `endpoint` present in both documents whose type, location,
    /// description or required flag differ.
    pub fn changed_query_parameters(&self, endpoint: &Endpoint) -> Vec<ChangedParameter> {
        let old = self.old.endpoint_query_params(endpoint);
        let new = self.new.endpoint_query_params(endpoint);

        let mut changes = vec![];
        for lhs in &old {
            let Some(name) = parameter_name(lhs) else {
                continue;
            };
            for rhs in new.iter().filter(|rhs| parameter_name(rhs) == Some(name)) {
                changes.extend(compare_parameters(name, lhs, rhs));
            }
        }
        changes
    }

    /// Compare the schemas of the body parameters of `endpoint`.
    pub fn compare_requests(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Vec<FieldDifference>, ComparisonError> {
        self.compare_definitions(
            self.old.endpoint_request_body_id(endpoint),
            self.new.endpoint_request_body_id(endpoint),
        )
    }

    /// Compare the schemas of the `200` responses of `endpoint`.
    pub fn compare_responses(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Vec<FieldDifference>, ComparisonError> {
        self.compare_definitions(
            self.old.endpoint_response_200_id(endpoint),
            self.new.endpoint_response_200_id(endpoint),
        )
    }

    /// Compare two definitions by name, `old_name` looked up in the old document and
    /// `new_name` in the new one.
    pub fn compare_definitions(
        &self,
        old_name: Option<&str>,
        new_name: Option<&str>,
    ) -> Result<Vec<FieldDifference>, ComparisonError> {
        DiffWalker::new(self.old.definitions(), self.new.definitions(), &self.options)
            .compare_definitions(old_name, new_name)
    }

    /// Everything that changed on a single endpoint.
    pub fn endpoint_changes(&self, endpoint: &Endpoint) -> EndpointChanges {
        let request_body = self.compare_requests(endpoint);
        let response_body = self.compare_responses(endpoint);

        for (what, result) in [("request", &request_body), ("response", &response_body)] {
            if let Err(err) = result {
                tracing::warn!(
                    path = %endpoint.path,
                    method = %endpoint.method,
                    error = %err,
                    "{what} body comparison failed"
                );
            }
        }

        EndpointChanges {
            endpoint: endpoint.clone(),
            added_parameters: self.added_query_parameters(endpoint),
            removed_parameters: self.removed_query_parameters(endpoint),
            changed_parameters: self.changed_query_parameters(endpoint),
            request_body,
            response_body,
        }
    }

    /// Run the full comparison.
    ///
    /// A body comparison that fails is recorded on its endpoint and does not stop the
    /// other endpoints from being compared.
    pub fn compare(&self) -> ApiDiff {
        let added = self.added_endpoints();
        let removed = self.removed_endpoints();
        let same = self.same_endpoints();
        tracing::debug!(
            added = added.len(),
            removed = removed.len(),
            same = same.len(),
            "compared endpoints"
        );

        let changed = same
            .iter()
            .map(|endpoint| self.endpoint_changes(endpoint))
            .filter(|changes| !changes.is_empty())
            .collect();

        ApiDiff {
            added,
            removed,
            changed,
        }
    }
}

fn parameter_name(parameter: &Map<String, Value>) -> Option<&str> {
    parameter.get("name").and_then(Value::as_str)
}

/// Names in `params` with no same-named entry in `others`, in `params` order.
fn unmatched_names(params: &[&Map<String, Value>], others: &[&Map<String, Value>]) -> Vec<String> {
    let known: BTreeSet<&str> = others.iter().filter_map(|p| parameter_name(p)).collect();
    params
        .iter()
        .filter_map(|p| parameter_name(p))
        .filter(|name| !known.contains(name))
        .map(str::to_owned)
        .collect()
}

fn compare_parameters(
    name: &str,
    lhs: &Map<String, Value>,
    rhs: &Map<String, Value>,
) -> Option<ChangedParameter> {
    let mut change = ChangedParameter {
        name: name.to_owned(),
        ..Default::default()
    };
    let mut changed = false;

    let fields = [
        ("type", &mut change.old_type, &mut change.new_type),
        ("in", &mut change.old_in, &mut change.new_in),
        (
            "description",
            &mut change.old_description,
            &mut change.new_description,
        ),
        ("required", &mut change.old_required, &mut change.new_required),
    ];
    for (key, old, new) in fields {
        if lhs.get(key) != rhs.get(key) {
            *old = text(lhs.get(key));
            *new = text(rhs.get(key));
            changed = true;
        }
    }

    changed.then_some(change)
}

/// Strings as they are, anything else (`null` included) as its JSON text.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use serde_json::json;

    use super::*;
    use crate::Effect;

    fn endpoints_pair() -> (Document, Document) {
        let old = Document::from_value(json!({
            "swagger": "2.0",
            "paths": {
                "/pet": { "post": {}, "get": {} },
                "/pet/{id}": { "put": {}, "get": {} }
            }
        }))
        .unwrap();
        let new = Document::from_value(json!({
            "swagger": "2.0",
            "paths": {
                "/pet": { "post": {} },
                "/pet/{id}": { "put": {}, "get": {}, "delete": {} }
            }
        }))
        .unwrap();
        (old, new)
    }

    fn parameters_pair() -> (Document, Document) {
        let old = Document::from_value(json!({
            "swagger": "2.0",
            "paths": {
                "/pet/{id}": {
                    "get": {
                        "parameters": [
                            {
                                "name": "id",
                                "in": "path",
                                "description": "ID of pet",
                                "required": true,
                                "type": "integer"
                            },
                            {
                                "name": "name",
                                "in": "query",
                                "description": "Updated name of the pet",
                                "required": false,
                                "type": "string"
                            },
                            { "name": "body", "in": "body", "description": "Some data", "required": true }
                        ]
                    }
                }
            }
        }))
        .unwrap();
        let new = Document::from_value(json!({
            "swagger": "2.0",
            "paths": {
                "/pet/{id}": {
                    "get": {
                        "parameters": [
                            {
                                "name": "id",
                                "in": "path",
                                "description": "Some description",
                                "required": false,
                                "type": "string"
                            },
                            {
                                "name": "title",
                                "in": "query",
                                "description": "Updated name of the pet",
                                "required": false,
                                "type": "string"
                            },
                            { "name": "body", "in": "body", "description": "Some data", "required": true }
                        ]
                    }
                }
            }
        }))
        .unwrap();
        (old, new)
    }

    fn body_document(message_key: &str, code_type: &str) -> Document {
        Document::from_value(json!({
            "swagger": "2.0",
            "paths": {
                "/pet": {
                    "post": {
                        "parameters": [{
                            "name": "body",
                            "in": "body",
                            "schema": { "$ref": "#/definitions/Pet" }
                        }]
                    }
                }
            },
            "definitions": {
                "Pet": {
                    "type": "object",
                    "properties": {
                        "code": { "type": code_type, "format": "int32" },
                        "type": { "type": "string" },
                        message_key: { "type": "string" }
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn added_endpoints() {
        let (old, new) = endpoints_pair();
        let cmp = Comparator::new(&old, &new);
        assert_eq!(cmp.added_endpoints(), vec![Endpoint::new("/pet/{id}", "delete")]);
    }

    #[test]
    fn removed_endpoints() {
        let (old, new) = endpoints_pair();
        let cmp = Comparator::new(&old, &new);
        assert_eq!(cmp.removed_endpoints(), vec![Endpoint::new("/pet", "get")]);
    }

    #[test]
    fn same_endpoints() {
        let (old, new) = endpoints_pair();
        let cmp = Comparator::new(&old, &new);
        assert_eq!(
            cmp.same_endpoints(),
            vec![
                Endpoint::new("/pet", "post"),
                Endpoint::new("/pet/{id}", "get"),
                Endpoint::new("/pet/{id}", "put"),
            ]
        );
    }

    #[test]
    fn added_is_removed_the_other_way_round() {
        let (old, new) = endpoints_pair();
        let forward = Comparator::new(&old, &new);
        let backward = Comparator::new(&new, &old);
        assert_eq!(forward.added_endpoints(), backward.removed_endpoints());
        assert_eq!(forward.removed_endpoints(), backward.added_endpoints());
    }

    #[test]
    fn renamed_parameter_is_removed_and_added() {
        let (old, new) = parameters_pair();
        let cmp = Comparator::new(&old, &new);
        let ep = &cmp.same_endpoints()[0];

        assert_eq!(cmp.added_query_parameters(ep), vec!["title"]);
        assert_eq!(cmp.removed_query_parameters(ep), vec!["name"]);
    }

    #[test]
    fn changed_parameter() {
        let (old, new) = parameters_pair();
        let cmp = Comparator::new(&old, &new);
        let ep = &cmp.same_endpoints()[0];

        assert_eq!(
            cmp.changed_query_parameters(ep),
            vec![ChangedParameter {
                name: "id".to_owned(),
                old_type: Some("integer".to_owned()),
                new_type: Some("string".to_owned()),
                old_in: None,
                new_in: None,
                old_description: Some("ID of pet".to_owned()),
                new_description: Some("Some description".to_owned()),
                old_required: Some("true".to_owned()),
                new_required: Some("false".to_owned()),
            }]
        );
    }

    #[test]
    fn unchanged_parameters_are_not_reported() {
        let (old, _) = parameters_pair();
        let cmp = Comparator::new(&old, &old);
        let ep = &cmp.same_endpoints()[0];

        assert!(cmp.changed_query_parameters(ep).is_empty());
        assert!(cmp.added_query_parameters(ep).is_empty());
        assert!(cmp.removed_query_parameters(ep).is_empty());
    }

    #[test]
    fn parameter_losing_its_type() {
        let old = Document::from_value(json!({
            "paths": { "/pet": { "get": { "parameters": [
                { "name": "limit", "in": "query", "type": "integer", "required": false }
            ] } } }
        }))
        .unwrap();
        let new = Document::from_value(json!({
            "paths": { "/pet": { "get": { "parameters": [
                { "name": "limit", "in": "query" }
            ] } } }
        }))
        .unwrap();
        let cmp = Comparator::new(&old, &new);
        let changes = cmp.changed_query_parameters(&Endpoint::new("/pet", "get"));

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old_type.as_deref(), Some("integer"));
        assert_eq!(changes[0].new_type, None);
        assert_eq!(changes[0].old_required.as_deref(), Some("false"));
        assert_eq!(changes[0].new_required, None);
    }

    fn single_parameter(parameter: Value) -> Document {
        Document::from_value(json!({
            "paths": { "/pet": { "get": { "parameters": [parameter] } } }
        }))
        .unwrap()
    }

    #[test]
    fn non_boolean_required_flag() {
        let old = single_parameter(json!({ "name": "limit", "in": "query", "required": "true" }));
        let new = single_parameter(json!({ "name": "limit", "in": "query", "required": "false" }));
        let cmp = Comparator::new(&old, &new);

        assert_eq!(
            cmp.changed_query_parameters(&Endpoint::new("/pet", "get")),
            vec![ChangedParameter {
                name: "limit".to_owned(),
                old_required: Some("true".to_owned()),
                new_required: Some("false".to_owned()),
                ..Default::default()
            }]
        );
    }

    #[test]
    fn null_description_going_away() {
        let old = single_parameter(json!({ "name": "limit", "in": "query", "description": null }));
        let new = single_parameter(json!({ "name": "limit", "in": "query" }));
        let cmp = Comparator::new(&old, &new);

        assert_eq!(
            cmp.changed_query_parameters(&Endpoint::new("/pet", "get")),
            vec![ChangedParameter {
                name: "limit".to_owned(),
                old_description: Some("null".to_owned()),
                new_description: None,
                ..Default::default()
            }]
        );
    }

    #[test]
    fn request_body_changes() {
        let old = body_document("message", "integer");
        let new = body_document("msg", "string");
        let cmp = Comparator::new(&old, &new);
        let ep = Endpoint::new("/pet", "post");

        let changes = cmp.compare_requests(&ep).unwrap();
        let changes: BTreeSet<_> = changes
            .iter()
            .map(|change| (change.path.as_str(), change.effect))
            .collect();
        assert_eq!(
            changes,
            BTreeSet::from([
                ("properties.code.type", Effect::Changed),
                ("properties.msg", Effect::Added),
                ("properties.message", Effect::Removed),
            ])
        );
        assert_eq!(cmp.compare_responses(&ep).unwrap(), vec![]);
    }

    #[test]
    fn identical_bodies() {
        let old = body_document("message", "integer");
        let cmp = Comparator::new(&old, &old);
        assert_eq!(cmp.compare_requests(&Endpoint::new("/pet", "post")).unwrap(), vec![]);
        assert!(cmp.compare().changed.is_empty());
    }

    #[test]
    fn body_appearing_on_one_side() {
        let (old, _) = parameters_pair();
        let new = body_document("message", "integer");
        let cmp = Comparator::new(&old, &new);

        // `/pet` `post` does not exist in `old`, the lookup just finds no body there
        assert_eq!(
            cmp.compare_requests(&Endpoint::new("/pet", "post")).unwrap(),
            vec![FieldDifference::new("Definition", Effect::Changed)]
        );
    }

    #[test]
    fn cyclic_body_only_fails_its_endpoint() {
        let document = |rename: &str| {
            Document::from_value(json!({
                "paths": {
                    "/node": {
                        "get": {
                            "responses": { "200": { "schema": { "$ref": "#/definitions/Node" } } }
                        }
                    },
                    "/pet": {
                        "get": {
                            "parameters": [{ "name": rename, "in": "query" }]
                        }
                    }
                },
                "definitions": {
                    "Node": { "properties": { "next": { "$ref": "#/definitions/Node" } } }
                }
            }))
            .unwrap()
        };
        let old = document("name");
        let new = document("title");
        let diff = Comparator::new(&old, &new).compare();

        assert_eq!(diff.changed.len(), 2);
        let node = &diff.changed[0];
        assert_eq!(node.endpoint, Endpoint::new("/node", "get"));
        assert_eq!(node.request_body, Ok(vec![]));
        assert_eq!(
            node.response_body,
            Err(ComparisonError::CyclicReference {
                old: "Node".to_owned(),
                new: "Node".to_owned(),
            })
        );

        let pet = &diff.changed[1];
        assert_eq!(pet.added_parameters, vec!["title"]);
        assert_eq!(pet.removed_parameters, vec!["name"]);
    }

    #[test]
    fn full_comparison() {
        let (old, new) = endpoints_pair();
        let diff = Comparator::new(&old, &new).compare();

        assert_eq!(diff.added, vec![Endpoint::new("/pet/{id}", "delete")]);
        assert_eq!(diff.removed, vec![Endpoint::new("/pet", "get")]);
        assert!(diff.changed.is_empty());
    }
}
