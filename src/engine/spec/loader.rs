use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::assertion::Producer;
use crate::domain::document::{
    BlockDocument, Deferred, ExpectationDocument, HeadersDocument, ResponsesDocument,
    SpecDocument, StatusDocument, ValidationDocument, expected_from_value, header_entries,
};
use crate::domain::error::SpecError;
use crate::domain::pointer::PointerPath;
use crate::engine::assert::{HeaderExpectation, StatusExpectation};
use crate::engine::expectation::ResponseExpectation;

use super::registry::Registry;
use super::{NodeOptions, ValidationNode};

impl From<StatusDocument> for StatusExpectation {
    fn from(value: StatusDocument) -> Self {
        match value {
            StatusDocument::Code(code) => Self::Code(code),
            StatusDocument::OneOf(codes) => Self::OneOf(codes),
            StatusDocument::Range { min, max } => Self::Range(min..=max),
        }
    }
}

/// Builds a validation tree from a spec document. Every expectation captures
/// the fixture it names in `responses`.
pub fn load(
    document: &SpecDocument,
    responses: Rc<ResponsesDocument>,
    base: Option<Rc<Registry>>,
) -> Result<Rc<ValidationNode>, SpecError> {
    let mut registry = match base {
        Some(parent) => Registry::with_parent(parent),
        None => Registry::new(),
    };
    let root_values = Value::Object(document.set.clone());
    let from_root_values = move |path: PointerPath| -> Result<Producer, SpecError> {
        let value = path.resolve(&root_values).cloned().unwrap_or(Value::Null);
        Ok(Producer::new(move |_| value.clone()))
    };
    for (name, headers) in &document.header_expectations {
        let entries = header_entries(headers, &from_root_values)?;
        registry.register_headers(name.as_str(), entries);
    }
    for (name, hook) in &document.hooks {
        let hook = hook.clone();
        registry.register_hook(name.as_str(), move |node| write_values(node, &hook.set));
    }

    let root = ValidationNode::root(document.name.as_str(), Rc::new(registry));
    let suite = BlockDocument {
        set: document.set.clone(),
        shared_examples: document.shared_examples.clone(),
        validations: document.validations.clone(),
        ..BlockDocument::default()
    };
    apply_block(&root, &suite, &responses)?;
    debug!(
        suite = %document.name,
        validations = document.validations.len(),
        "validation tree loaded"
    );
    Ok(root)
}

/// Applies the document settings of one expectation, everything except the
/// response capture.
pub fn configure_expectation(
    expectation: &mut ResponseExpectation,
    document: &ExpectationDocument,
    deferred: &Deferred,
) -> Result<(), SpecError> {
    if let Some(status) = &document.status {
        expectation.expect_status(status.clone());
    }
    if let Some(headers) = &document.headers {
        for headers in headers.flatten() {
            let headers = match headers {
                HeadersDocument::Named(name) => HeaderExpectation::named(name.as_str()),
                HeadersDocument::Inline(map) => HeaderExpectation::Inline(header_entries(map, deferred)?),
                HeadersDocument::Many(_) => continue,
            };
            expectation.expect_headers(headers)?;
        }
    }
    if let Some(schema) = &document.schema {
        let path = document.schema_path.as_deref().map(PointerPath::parse);
        expectation.expect_schema(schema.clone(), path);
    }
    if let Some(properties) = &document.properties {
        expectation.expect_properties(expected_from_value(properties, deferred)?);
    }
    if let Some(post_type) = &document.post_type {
        expectation.expect_post_type(post_type.as_str());
    }
    Ok(())
}

fn apply_block(
    node: &Rc<ValidationNode>,
    block: &BlockDocument,
    responses: &Rc<ResponsesDocument>,
) -> Result<(), SpecError> {
    write_values(node, &block.set)?;
    for (name, shared) in &block.shared_examples {
        let shared = shared.clone();
        let responses = Rc::clone(responses);
        node.shared_example(name.as_str(), move |node| apply_block(node, &shared, &responses));
    }
    for name in &block.behaves_as {
        node.behaves_as(name)?;
    }
    for expectation in &block.expect_response {
        add_expectation(node, expectation, responses)?;
    }
    for validation in &block.validations {
        declare(node, validation, responses)?;
    }
    Ok(())
}

fn write_values(node: &ValidationNode, values: &Map<String, Value>) -> Result<(), SpecError> {
    for (key, value) in values {
        node.set(&PointerPath::root().key(key.as_str()).to_string(), value.clone())?;
    }
    Ok(())
}

fn declare(
    parent: &Rc<ValidationNode>,
    document: &ValidationDocument,
    responses: &Rc<ResponsesDocument>,
) -> Result<(), SpecError> {
    let mut options = NodeOptions::new().depends_on(document.depends_on.iter().cloned());
    if let Some(id) = &document.id {
        options = options.named(id.as_str());
    }
    for hook in &document.before {
        options = options.before_named(hook.as_str());
    }

    if document.pending {
        parent.pending(document.name.as_str(), options);
        return Ok(());
    }
    let block = document.block();
    parent.describe(document.name.as_str(), options, |node| {
        apply_block(node, &block, responses)
    })?;
    Ok(())
}

fn add_expectation(
    node: &Rc<ValidationNode>,
    document: &ExpectationDocument,
    responses: &Rc<ResponsesDocument>,
) -> Result<(), SpecError> {
    let fixture = match &document.response {
        Some(name) if responses.contains_key(name) => name.clone(),
        Some(name) => return Err(SpecError::MissingResponse { name: name.clone() }),
        None => {
            return Err(SpecError::InvalidExpectation {
                path: node.full_name(),
                reason: "expectation does not name a captured response".to_string(),
            });
        }
    };

    let owner = Rc::downgrade(node);
    let from_cache = move |path: PointerPath| -> Result<Producer, SpecError> {
        let owner = owner.clone();
        Ok(Producer::new(move |_| {
            owner
                .upgrade()
                .and_then(|node| node.get(&path.to_string()))
                .unwrap_or(Value::Null)
        }))
    };

    let responses = Rc::clone(responses);
    node.expect_response(|expectation| {
        configure_expectation(expectation, document, &from_cache)?;
        expectation.capture(move |_| {
            responses
                .get(&fixture)
                .cloned()
                .ok_or_else(|| SpecError::MissingResponse {
                    name: fixture.clone(),
                })
        });
        Ok(())
    })
}
