use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::domain::assertion::{Assertion, AssertionKind, AssertionValue};
use crate::domain::pointer::PointerPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseAspect {
    Status,
    ResponseHeaders,
    Schema,
    ResponseBody,
}

impl ResponseAspect {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::ResponseHeaders => "response_headers",
            Self::Schema => "schema",
            Self::ResponseBody => "response_body",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffOpKind {
    Add,
    Replace,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffOp {
    pub path: PointerPath,
    pub op: DiffOpKind,
    pub expected_value: AssertionValue,
    /// Present whenever the path resolves in the actual data, even to `null`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<Value>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

impl DiffOp {
    pub fn for_assertion(assertion: &Assertion, op: DiffOpKind, current_value: Option<Value>) -> Self {
        let kind = match (assertion.kind, op) {
            (AssertionKind::Equality, _) | (_, DiffOpKind::Remove) => None,
            (other, _) => Some(other.as_str()),
        };
        Self {
            path: assertion.path.clone(),
            op,
            expected_value: assertion.value.clone(),
            current_value,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaErrorEntry {
    pub instance_path: String,
    pub schema_path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatorResult {
    pub key: ResponseAspect,
    pub assertions: Vec<Assertion>,
    pub failed_assertions: Vec<Assertion>,
    pub diff: Vec<DiffOp>,
    pub valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<SchemaErrorEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AspectRecord {
    pub assertions: Vec<Assertion>,
    pub failed_assertions: Vec<Assertion>,
    pub diff: Vec<DiffOp>,
    pub valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<SchemaErrorEntry>,
}

impl From<ValidatorResult> for AspectRecord {
    fn from(result: ValidatorResult) -> Self {
        Self {
            assertions: result.assertions,
            failed_assertions: result.failed_assertions,
            diff: result.diff,
            valid: result.valid,
            errors: result.errors,
        }
    }
}

/// Facts about the captured exchange, echoed next to the expectations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActualFacts {
    pub request_headers: BTreeMap<String, String>,
    pub request_body: Option<Value>,
    pub request_path: String,
    pub request_params: Option<BTreeMap<String, Option<String>>>,
    pub request_url: String,
    pub request_method: String,
    pub response_headers: BTreeMap<String, String>,
    pub response_body: Value,
    pub response_status: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub valid: bool,
    pub expected: BTreeMap<ResponseAspect, AspectRecord>,
    pub actual: ActualFacts,
}

/// Report for one captured response, tagged with the full names of the
/// validations that checked it, in run order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub validations: Vec<String>,
    #[serde(flatten)]
    pub report: Report,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpecReport {
    pub valid: bool,
    pub results: Vec<ValidationReport>,
    pub pending: Vec<String>,
}
