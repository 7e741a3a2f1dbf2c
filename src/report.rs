//! Plain text rendering of an [`ApiDiff`].
//!
//! ```text
//! Added endpoints
//! delete /pet/{id}
//!
//!
//! Removed endpoints
//! get /pet
//!
//!
//! Endpoints changes
//! get /pet/{id}
//!   ++title
//!   --name
//!   <>id
//!   request body:
//!   /properties.code.type
//!   +properties.msg
//!   -properties.message
//! ```

use std::fmt;

use crate::{ApiDiff, ComparisonError, Endpoint, EndpointChanges, FieldDifference};

/// Render the report as a string.
pub fn render(diff: &ApiDiff) -> String {
    diff.to_string()
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

impl fmt::Display for FieldDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.effect.marker(), self.path)
    }
}

impl fmt::Display for ApiDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Added endpoints")?;
        for endpoint in &self.added {
            writeln!(f, "{endpoint}")?;
        }
        write!(f, "\n\n")?;

        writeln!(f, "Removed endpoints")?;
        for endpoint in &self.removed {
            writeln!(f, "{endpoint}")?;
        }
        write!(f, "\n\n")?;

        writeln!(f, "Endpoints changes")?;
        for changes in &self.changed {
            write_endpoint_changes(f, changes)?;
        }
        Ok(())
    }
}

fn write_endpoint_changes(f: &mut fmt::Formatter<'_>, changes: &EndpointChanges) -> fmt::Result {
    if changes.is_empty() {
        return Ok(());
    }

    writeln!(f, "{}", changes.endpoint)?;
    for name in &changes.added_parameters {
        writeln!(f, "  ++{name}")?;
    }
    for name in &changes.removed_parameters {
        writeln!(f, "  --{name}")?;
    }
    for parameter in &changes.changed_parameters {
        writeln!(f, "  <>{}", parameter.name)?;
    }
    write_body(f, "request body", &changes.request_body)?;
    write_body(f, "response body", &changes.response_body)
}

fn write_body(
    f: &mut fmt::Formatter<'_>,
    heading: &str,
    body: &Result<Vec<FieldDifference>, ComparisonError>,
) -> fmt::Result {
    match body {
        Ok(differences) if differences.is_empty() => Ok(()),
        Ok(differences) => {
            writeln!(f, "  {heading}:")?;
            for difference in differences {
                writeln!(f, "  {difference}")?;
            }
            Ok(())
        }
        Err(err) => {
            writeln!(f, "  {heading}:")?;
            writeln!(f, "  !{err}")
        }
    }
}
