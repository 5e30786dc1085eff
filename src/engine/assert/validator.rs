use std::fmt;
use std::ops::RangeInclusive;
use std::rc::Rc;

use serde_json::{Value, json};
use tracing::debug;

use crate::domain::assertion::{Assertion, AssertionKind, Expected};
use crate::domain::error::SpecError;
use crate::domain::pointer::PointerPath;
use crate::domain::report::{DiffOp, DiffOpKind, ResponseAspect, ValidatorResult};
use crate::domain::response::Response;
use crate::engine::assert::compiler::{compile, compile_headers};
use crate::engine::assert::matcher::{header_value_valid, holds};
use crate::engine::diff::{header_diff, header_name, json_diff};
use crate::engine::spec::registry::Registry;

pub trait Validator {
    fn aspect(&self) -> ResponseAspect;

    fn validate(&self, response: &Response) -> Result<ValidatorResult, SpecError>;
}

fn finish(
    key: ResponseAspect,
    assertions: Vec<Assertion>,
    failed_assertions: Vec<Assertion>,
    diff: Vec<DiffOp>,
) -> ValidatorResult {
    debug!(
        aspect = key.as_str(),
        assertions = assertions.len(),
        failed = failed_assertions.len(),
        "validator finished"
    );
    ValidatorResult {
        key,
        valid: failed_assertions.is_empty(),
        assertions,
        failed_assertions,
        diff,
        errors: Vec::new(),
    }
}

#[derive(Debug, Clone)]
pub enum HeaderExpectation {
    Inline(Vec<(String, Expected)>),
    Named(String),
}

impl HeaderExpectation {
    pub fn inline<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Expected>,
    {
        Self::Inline(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

#[derive(Debug, Clone)]
pub struct HeaderValidator {
    entries: Vec<(String, Expected)>,
}

impl HeaderValidator {
    pub fn new(entries: Vec<(String, Expected)>) -> Self {
        Self { entries }
    }

    /// Resolves named expectations against `registry`; unknown names fail
    /// immediately.
    pub fn resolve(expectation: HeaderExpectation, registry: &Registry) -> Result<Self, SpecError> {
        match expectation {
            HeaderExpectation::Inline(entries) => Ok(Self::new(entries)),
            HeaderExpectation::Named(name) => registry
                .header_expectation(&name)
                .map(Self::new)
                .ok_or(SpecError::UnknownExpectation { name }),
        }
    }

    fn holds(assertion: &Assertion, response: &Response) -> bool {
        let actual = header_name(&assertion.path).and_then(|name| response.header(name));
        match (assertion.kind, actual) {
            (AssertionKind::Absent, actual) => actual.is_none(),
            (_, Some(actual)) => header_value_valid(&assertion.value, actual),
            (_, None) => false,
        }
    }
}

impl Validator for HeaderValidator {
    fn aspect(&self) -> ResponseAspect {
        ResponseAspect::ResponseHeaders
    }

    fn validate(&self, response: &Response) -> Result<ValidatorResult, SpecError> {
        let assertions = compile_headers(&self.entries, response)?;
        let failed: Vec<Assertion> = assertions
            .iter()
            .filter(|assertion| !Self::holds(assertion, response))
            .cloned()
            .collect();
        let diff = header_diff(response, &failed);
        Ok(finish(self.aspect(), assertions, failed, diff))
    }
}

#[derive(Debug, Clone)]
pub struct JsonValidator {
    expected: Expected,
    base: PointerPath,
}

impl JsonValidator {
    pub fn new(expected: impl Into<Expected>) -> Self {
        Self {
            expected: expected.into(),
            base: PointerPath::root(),
        }
    }

    pub fn at(mut self, base: PointerPath) -> Self {
        self.base = base;
        self
    }
}

impl Validator for JsonValidator {
    fn aspect(&self) -> ResponseAspect {
        ResponseAspect::ResponseBody
    }

    fn validate(&self, response: &Response) -> Result<ValidatorResult, SpecError> {
        let body = response.parsed_body();
        let assertions = compile(&self.expected, &self.base, response)?;
        let failed: Vec<Assertion> = assertions
            .iter()
            .filter(|assertion| !holds(assertion, &body))
            .cloned()
            .collect();
        let diff = json_diff(&body, &failed);
        Ok(finish(self.aspect(), assertions, failed, diff))
    }
}

#[derive(Clone)]
pub enum StatusExpectation {
    Code(u16),
    OneOf(Vec<u16>),
    Range(RangeInclusive<u16>),
    Predicate {
        description: String,
        check: Rc<dyn Fn(u16) -> bool>,
    },
}

impl StatusExpectation {
    pub fn predicate(description: impl Into<String>, check: impl Fn(u16) -> bool + 'static) -> Self {
        Self::Predicate {
            description: description.into(),
            check: Rc::new(check),
        }
    }

    pub fn matches(&self, status: u16) -> bool {
        match self {
            Self::Code(code) => *code == status,
            Self::OneOf(codes) => codes.contains(&status),
            Self::Range(range) => range.contains(&status),
            Self::Predicate { check, .. } => check(status),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Code(code) => json!(code),
            Self::OneOf(codes) => json!(codes),
            Self::Range(range) => json!({"min": range.start(), "max": range.end()}),
            Self::Predicate { description, .. } => json!(description),
        }
    }
}

impl fmt::Debug for StatusExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusExpectation({})", self.to_value())
    }
}

impl From<u16> for StatusExpectation {
    fn from(value: u16) -> Self {
        Self::Code(value)
    }
}

impl From<Vec<u16>> for StatusExpectation {
    fn from(value: Vec<u16>) -> Self {
        Self::OneOf(value)
    }
}

impl From<RangeInclusive<u16>> for StatusExpectation {
    fn from(value: RangeInclusive<u16>) -> Self {
        Self::Range(value)
    }
}

#[derive(Debug, Clone)]
pub struct StatusValidator {
    expected: StatusExpectation,
}

impl StatusValidator {
    pub fn new(expected: impl Into<StatusExpectation>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl Validator for StatusValidator {
    fn aspect(&self) -> ResponseAspect {
        ResponseAspect::Status
    }

    fn validate(&self, response: &Response) -> Result<ValidatorResult, SpecError> {
        let assertion = Assertion::equality(PointerPath::root(), self.expected.to_value());
        let (failed, diff) = if self.expected.matches(response.status) {
            (Vec::new(), Vec::new())
        } else {
            let entry =
                DiffOp::for_assertion(&assertion, DiffOpKind::Replace, Some(json!(response.status)));
            (vec![assertion.clone()], vec![entry])
        };
        Ok(finish(self.aspect(), vec![assertion], failed, diff))
    }
}
