use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::domain::assertion::Expected;
use crate::domain::error::SpecError;

use super::ValidationNode;

pub type NodeBlock = Rc<dyn Fn(&Rc<ValidationNode>) -> Result<(), SpecError>>;

/// Named, reusable definitions shared by a validation tree.
#[derive(Default)]
pub struct Registry {
    parent: Option<Rc<Registry>>,
    header_expectations: BTreeMap<String, Vec<(String, Expected)>>,
    shared_examples: BTreeMap<String, NodeBlock>,
    hooks: BTreeMap<String, NodeBlock>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Rc<Registry>) -> Self {
        Self {
            parent: Some(parent),
            ..Self::default()
        }
    }

    pub fn register_headers<K, V>(
        &mut self,
        name: impl Into<String>,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> &mut Self
    where
        K: Into<String>,
        V: Into<Expected>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.header_expectations.insert(name.into(), entries);
        self
    }

    pub fn header_expectation(&self, name: &str) -> Option<Vec<(String, Expected)>> {
        match self.header_expectations.get(name) {
            Some(entries) => Some(entries.clone()),
            None => self.parent.as_ref()?.header_expectation(name),
        }
    }

    pub fn shared_example<F>(&mut self, name: impl Into<String>, block: F) -> &mut Self
    where
        F: Fn(&Rc<ValidationNode>) -> Result<(), SpecError> + 'static,
    {
        self.shared_examples.insert(name.into(), Rc::new(block));
        self
    }

    pub fn find_shared_example(&self, name: &str) -> Option<NodeBlock> {
        match self.shared_examples.get(name) {
            Some(block) => Some(Rc::clone(block)),
            None => self.parent.as_ref()?.find_shared_example(name),
        }
    }

    pub fn register_hook<F>(&mut self, name: impl Into<String>, hook: F) -> &mut Self
    where
        F: Fn(&Rc<ValidationNode>) -> Result<(), SpecError> + 'static,
    {
        self.hooks.insert(name.into(), Rc::new(hook));
        self
    }

    pub fn hook(&self, name: &str) -> Option<NodeBlock> {
        match self.hooks.get(name) {
            Some(hook) => Some(Rc::clone(hook)),
            None => self.parent.as_ref()?.hook(name),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("header_expectations", &self.header_expectations.keys())
            .field("shared_examples", &self.shared_examples.keys())
            .field("hooks", &self.hooks.keys())
            .field("parent", &self.parent)
            .finish()
    }
}
