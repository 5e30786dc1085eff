use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::domain::assertion::Expected;
use crate::domain::error::SpecError;
use crate::domain::pointer::PointerPath;
use crate::domain::report::ValidatorResult;
use crate::domain::response::Response;
use crate::engine::assert::{
    HeaderExpectation, HeaderValidator, JsonValidator, SchemaValidator, StatusExpectation,
    StatusValidator, Validator,
};
use crate::engine::results::ExpectationResults;
use crate::engine::spec::registry::Registry;

/// What a response expectation may ask of the validation that owns it.
pub trait ExpectationContext {
    fn full_name(&self) -> String;

    fn get(&self, path: &str) -> Option<Value>;
}

pub type Capture = Rc<dyn Fn(&dyn ExpectationContext) -> Result<Response, SpecError>>;

pub type ResponseFilter = Rc<dyn Fn(&mut Response)>;

pub struct ResponseExpectation {
    registry: Rc<Registry>,
    capture: Option<Capture>,
    status_validator: Option<StatusValidator>,
    header_validators: Vec<HeaderValidator>,
    schema_validators: Vec<SchemaValidator>,
    json_validators: Vec<JsonValidator>,
    response_filters: Vec<ResponseFilter>,
}

impl ResponseExpectation {
    pub fn new(registry: Rc<Registry>) -> Self {
        Self {
            registry,
            capture: None,
            status_validator: None,
            header_validators: Vec::new(),
            schema_validators: Vec::new(),
            json_validators: Vec::new(),
            response_filters: Vec::new(),
        }
    }

    /// Sets how the response is obtained. Without a capture the expectation
    /// produces no results.
    pub fn capture<F>(&mut self, capture: F) -> &mut Self
    where
        F: Fn(&dyn ExpectationContext) -> Result<Response, SpecError> + 'static,
    {
        self.capture = Some(Rc::new(capture));
        self
    }

    pub fn expect_status(&mut self, expected: impl Into<StatusExpectation>) -> &mut Self {
        self.status_validator = Some(StatusValidator::new(expected));
        self
    }

    pub fn expect_headers(&mut self, expected: HeaderExpectation) -> Result<&mut Self, SpecError> {
        let validator = HeaderValidator::resolve(expected, &self.registry)?;
        self.header_validators.push(validator);
        Ok(self)
    }

    pub fn expect_properties(&mut self, expected: impl Into<Expected>) -> &mut Self {
        self.json_validators.push(JsonValidator::new(expected));
        self
    }

    pub fn expect_schema(&mut self, schema: Value, path: Option<PointerPath>) -> &mut Self {
        let validator = SchemaValidator::new(schema);
        self.schema_validators.push(match path {
            Some(path) => validator.at(path),
            None => validator,
        });
        self
    }

    /// Tags the response with the post type the validations expect.
    pub fn expect_post_type(&mut self, type_uri: impl Into<String>) -> &mut Self {
        let type_uri = type_uri.into();
        self.add_response_filter(move |response| {
            response
                .env
                .insert("expected_post_type".to_string(), Value::String(type_uri.clone()));
        })
    }

    pub fn add_response_filter<F>(&mut self, filter: F) -> &mut Self
    where
        F: Fn(&mut Response) + 'static,
    {
        self.response_filters.push(Rc::new(filter));
        self
    }

    /// Validators in execution order: status, headers, schema, properties.
    pub fn validators(&self) -> Vec<&dyn Validator> {
        let mut out: Vec<&dyn Validator> = Vec::new();
        if let Some(status) = &self.status_validator {
            out.push(status);
        }
        out.extend(self.header_validators.iter().map(|v| v as &dyn Validator));
        out.extend(self.schema_validators.iter().map(|v| v as &dyn Validator));
        out.extend(self.json_validators.iter().map(|v| v as &dyn Validator));
        out
    }

    pub fn validate(&self, response: &mut Response) -> Result<Vec<ValidatorResult>, SpecError> {
        for filter in &self.response_filters {
            filter(&mut *response);
        }
        let response: &Response = response;
        self.validators()
            .into_iter()
            .map(|validator| validator.validate(response))
            .collect()
    }

    pub fn run(&self, context: &dyn ExpectationContext) -> Result<Option<ExpectationResults>, SpecError> {
        let Some(capture) = &self.capture else {
            return Ok(None);
        };
        let mut response = capture(context)?;
        let results = self.validate(&mut response)?;
        debug!(
            validation = %context.full_name(),
            validators = results.len(),
            valid = results.iter().all(|result| result.valid),
            "response expectation evaluated"
        );
        Ok(Some(ExpectationResults::new(response, results)))
    }
}

impl fmt::Debug for ResponseExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseExpectation")
            .field("captures", &self.capture.is_some())
            .field("status_validator", &self.status_validator)
            .field("header_validators", &self.header_validators)
            .field("schema_validators", &self.schema_validators)
            .field("json_validators", &self.json_validators)
            .field("response_filters", &self.response_filters.len())
            .finish()
    }
}
