use jsonschema::validator_for;
use serde_json::Value;

use crate::domain::assertion::Assertion;
use crate::domain::error::SpecError;
use crate::domain::pointer::PointerPath;
use crate::domain::report::{ResponseAspect, SchemaErrorEntry, ValidatorResult};
use crate::domain::response::Response;

use super::validator::Validator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaOutcome {
    pub valid: bool,
    pub errors: Vec<SchemaErrorEntry>,
}

/// Validates `instance` against `schema`. A schema that does not compile is
/// a configuration error rather than a failed check.
pub fn check_schema(instance: &Value, schema: &Value) -> Result<SchemaOutcome, SpecError> {
    let validator = validator_for(schema).map_err(|error| SpecError::InvalidSchema {
        message: error.to_string(),
    })?;

    let mut errors: Vec<SchemaErrorEntry> = validator
        .iter_errors(instance)
        .map(|error| SchemaErrorEntry {
            instance_path: error.instance_path().as_str().to_string(),
            schema_path: error.schema_path().as_str().to_string(),
            message: error.to_string(),
        })
        .collect();
    errors.sort_by(|left, right| {
        (&left.instance_path, &left.schema_path).cmp(&(&right.instance_path, &right.schema_path))
    });

    Ok(SchemaOutcome {
        valid: errors.is_empty(),
        errors,
    })
}

#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Value,
    path: PointerPath,
}

impl SchemaValidator {
    pub fn new(schema: Value) -> Self {
        Self {
            schema,
            path: PointerPath::root(),
        }
    }

    pub fn at(mut self, path: PointerPath) -> Self {
        self.path = path;
        self
    }
}

impl Validator for SchemaValidator {
    fn aspect(&self) -> ResponseAspect {
        ResponseAspect::Schema
    }

    fn validate(&self, response: &Response) -> Result<ValidatorResult, SpecError> {
        let body = response.parsed_body();
        let assertion = Assertion::equality(self.path.clone(), self.schema.clone());

        let outcome = match self.path.resolve(&body) {
            Some(instance) => check_schema(instance, &self.schema)?,
            None => SchemaOutcome {
                valid: false,
                errors: vec![SchemaErrorEntry {
                    instance_path: self.path.to_string(),
                    schema_path: String::new(),
                    message: format!("no value at `{}`", self.path),
                }],
            },
        };

        let failed_assertions = if outcome.valid {
            Vec::new()
        } else {
            vec![assertion.clone()]
        };
        Ok(ValidatorResult {
            key: self.aspect(),
            assertions: vec![assertion],
            failed_assertions,
            diff: Vec::new(),
            valid: outcome.valid,
            errors: outcome.errors,
        })
    }
}
