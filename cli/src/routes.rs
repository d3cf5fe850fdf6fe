#![deny(missing_docs)]

//! # Routes Command
//!
//! Lists the operations a document declares, one `METHOD template` per line.

use std::fs;
use std::path::PathBuf;

use oas_conform_core::load_document;

use crate::error::{CliError, CliResult};

/// Arguments for the routes command.
#[derive(clap::Args, Debug, Clone)]
pub struct RoutesArgs {
    /// Path to the OpenAPI document (YAML or JSON).
    #[clap(long, env = "OAS_CONFORM_SPEC")]
    pub spec: PathBuf,
}

/// Loads the document and lists its operations in document order.
pub fn execute(args: &RoutesArgs) -> CliResult<Vec<String>> {
    let source = fs::read_to_string(&args.spec)
        .map_err(|e| CliError::General(format!("Failed to read {:?}: {}", args.spec, e)))?;
    let document = load_document(&source)?;

    Ok(document
        .operations()
        .map(|op| match op.operation_id() {
            Some(id) => format!("{} {} ({})", op.method(), op.template(), id),
            None => format!("{} {}", op.method(), op.template()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_lists_operations() {
        let dir = tempdir().unwrap();
        let spec = dir.path().join("openapi.yaml");
        fs::write(
            &spec,
            r#"
openapi: 3.0.3
paths:
  /health:
    get:
      operationId: health
      responses:
        "200": {description: ok}
  /users/{id}:
    parameters:
      - {name: id, in: path, required: true, schema: {type: integer}}
    get:
      responses:
        "200": {description: ok}
    delete:
      responses:
        "204": {description: gone}
"#,
        )
        .unwrap();

        let lines = execute(&RoutesArgs { spec }).unwrap();
        assert_eq!(
            lines,
            vec!["GET /health (health)", "GET /users/{id}", "DELETE /users/{id}"]
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = execute(&RoutesArgs {
            spec: dir.path().join("missing.yaml"),
        })
        .unwrap_err();
        assert!(err.to_string().starts_with("Operation failed: Failed to read"));
    }
}
