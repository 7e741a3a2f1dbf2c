use serde_json::Value;

const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Find the name of the definition a schema fragment points to.
///
/// Tried in order, first match wins:
///
/// 1. a `$ref` directly on `value`,
/// 2. a `$ref` on its `schema`,
/// 3. a `$ref` on `schema.additionalProperties`, or if there is none, on `schema.items`.
///
/// The first string `$ref` found settles the search, even when it names nothing (an empty
/// `$ref` or a bare `#/definitions/`): the fragment then has no reference. Anything else
/// missing or of the wrong type along the way is skipped over.
pub fn resolve_reference(value: &Value) -> Option<&str> {
    if let Some(name) = value.direct_reference() {
        return non_empty(name);
    }

    let schema = value.get("schema")?;
    if let Some(name) = schema.direct_reference() {
        return non_empty(name);
    }

    schema
        .get("additionalProperties")
        .or_else(|| schema.get("items"))?
        .direct_reference()
        .and_then(non_empty)
}

fn non_empty(name: &str) -> Option<&str> {
    (!name.is_empty()).then_some(name)
}

trait MayHaveReference {
    fn direct_reference(&self) -> Option<&str>;
}

impl MayHaveReference for Value {
    fn direct_reference(&self) -> Option<&str> {
        let reference = self.get("$ref")?.as_str()?;
        Some(
            reference
                .strip_prefix(DEFINITIONS_PREFIX)
                .unwrap_or(reference),
        )
    }
}
