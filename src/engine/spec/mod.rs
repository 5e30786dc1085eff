pub mod loader;
pub mod order;
pub mod registry;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::error::SpecError;
use crate::domain::pointer::PointerPath;
use crate::engine::expectation::{ExpectationContext, ResponseExpectation};
use crate::engine::results::SpecResults;

use self::order::{DependencyHint, sort_by_dependencies};
use self::registry::{NodeBlock, Registry};

/// Lazily computed cache value, evaluated in the requesting node's context on
/// every read.
pub type CacheProducer = Rc<dyn Fn(&ValidationNode) -> Value>;

#[derive(Clone)]
pub enum HookRef {
    Named(String),
    Block(NodeBlock),
}

#[derive(Clone, Default)]
pub struct NodeOptions {
    pub dependency_name: Option<String>,
    pub depends_on: Vec<String>,
    pub before: Vec<HookRef>,
}

impl NodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.dependency_name = Some(name.into());
        self
    }

    pub fn depends_on<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.depends_on.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn before_named(mut self, hook: impl Into<String>) -> Self {
        self.before.push(HookRef::Named(hook.into()));
        self
    }

    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Rc<ValidationNode>) -> Result<(), SpecError> + 'static,
    {
        self.before.push(HookRef::Block(Rc::new(hook)));
        self
    }
}

#[derive(Clone)]
enum Hook {
    Named { name: String, block: NodeBlock },
    Block(NodeBlock),
}

impl Hook {
    fn call(&self, node: &Rc<ValidationNode>) -> Result<(), SpecError> {
        match self {
            Self::Named { name, block } => {
                debug!(validation = %node.full_name(), hook = %name, "running named hook");
                block(node)
            }
            Self::Block(block) => block(node),
        }
    }
}

/// Named unit of a validation tree.
pub struct ValidationNode {
    name: String,
    dependency_name: Option<String>,
    dependencies: Vec<String>,
    pending: bool,
    parent: Weak<ValidationNode>,
    registry: Rc<Registry>,
    children: RefCell<Vec<Rc<ValidationNode>>>,
    expectations: RefCell<Vec<Rc<ResponseExpectation>>>,
    setup_hooks: RefCell<Vec<Hook>>,
    before_hooks: RefCell<Vec<Hook>>,
    shared_examples: RefCell<BTreeMap<String, NodeBlock>>,
    cache: RefCell<Value>,
    producers: RefCell<BTreeMap<PointerPath, CacheProducer>>,
}

impl ValidationNode {
    pub fn root(name: impl Into<String>, registry: Rc<Registry>) -> Rc<Self> {
        Rc::new(Self::build(
            name.into(),
            NodeOptions::default(),
            Weak::new(),
            registry,
            false,
        ))
    }

    fn build(
        name: String,
        options: NodeOptions,
        parent: Weak<ValidationNode>,
        registry: Rc<Registry>,
        pending: bool,
    ) -> Self {
        let before_hooks = options
            .before
            .into_iter()
            .filter_map(|hook| match hook {
                HookRef::Block(block) => Some(Hook::Block(block)),
                HookRef::Named(hook_name) => match registry.hook(&hook_name) {
                    Some(block) => Some(Hook::Named {
                        name: hook_name,
                        block,
                    }),
                    None => {
                        warn!(validation = %name, hook = %hook_name, "before hook is not registered; skipping");
                        None
                    }
                },
            })
            .collect();

        Self {
            name,
            dependency_name: options.dependency_name,
            dependencies: options.depends_on,
            pending,
            parent,
            registry,
            children: RefCell::new(Vec::new()),
            expectations: RefCell::new(Vec::new()),
            setup_hooks: RefCell::new(Vec::new()),
            before_hooks: RefCell::new(before_hooks),
            shared_examples: RefCell::new(BTreeMap::new()),
            cache: RefCell::new(Value::Object(Map::new())),
            producers: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn describe<F>(
        self: &Rc<Self>,
        name: impl Into<String>,
        options: NodeOptions,
        block: F,
    ) -> Result<Rc<ValidationNode>, SpecError>
    where
        F: FnOnce(&Rc<ValidationNode>) -> Result<(), SpecError>,
    {
        let child = self.attach(name.into(), options, false);
        block(&child)?;
        Ok(child)
    }

    pub fn pending(self: &Rc<Self>, name: impl Into<String>, options: NodeOptions) -> Rc<ValidationNode> {
        self.attach(name.into(), options, true)
    }

    fn attach(self: &Rc<Self>, name: String, options: NodeOptions, pending: bool) -> Rc<ValidationNode> {
        let child = Rc::new(Self::build(
            name,
            options,
            Rc::downgrade(self),
            Rc::clone(&self.registry),
            pending,
        ));
        self.children.borrow_mut().push(Rc::clone(&child));
        child
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> String {
        match self.parent() {
            Some(parent) => {
                let parent_name = parent.full_name();
                if parent_name.is_empty() {
                    self.name.clone()
                } else {
                    format!("{parent_name} {}", self.name)
                }
            }
            None => self.name.clone(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn parent(&self) -> Option<Rc<ValidationNode>> {
        self.parent.upgrade()
    }

    pub fn registry(&self) -> &Rc<Registry> {
        &self.registry
    }

    pub fn children(&self) -> Vec<Rc<ValidationNode>> {
        self.children.borrow().clone()
    }

    pub fn setup<F>(&self, hook: F)
    where
        F: Fn(&Rc<ValidationNode>) -> Result<(), SpecError> + 'static,
    {
        self.setup_hooks.borrow_mut().push(Hook::Block(Rc::new(hook)));
    }

    pub fn before<F>(&self, hook: F)
    where
        F: Fn(&Rc<ValidationNode>) -> Result<(), SpecError> + 'static,
    {
        self.before_hooks.borrow_mut().push(Hook::Block(Rc::new(hook)));
    }

    pub fn shared_example<F>(&self, name: impl Into<String>, block: F)
    where
        F: Fn(&Rc<ValidationNode>) -> Result<(), SpecError> + 'static,
    {
        self.shared_examples
            .borrow_mut()
            .insert(name.into(), Rc::new(block));
    }

    /// Looks `name` up on this node, then each ancestor, then the registry.
    pub fn find_shared_example(&self, name: &str) -> Option<NodeBlock> {
        if let Some(block) = self.shared_examples.borrow().get(name) {
            return Some(Rc::clone(block));
        }
        let mut ancestor = self.parent();
        while let Some(node) = ancestor {
            if let Some(block) = node.shared_examples.borrow().get(name) {
                return Some(Rc::clone(block));
            }
            ancestor = node.parent();
        }
        self.registry.find_shared_example(name)
    }

    pub fn behaves_as(self: &Rc<Self>, name: &str) -> Result<(), SpecError> {
        let block = self
            .find_shared_example(name)
            .ok_or_else(|| SpecError::BehaviorNotFound {
                name: name.to_string(),
            })?;
        block(self)
    }

    pub fn expect_response<F>(&self, build: F) -> Result<(), SpecError>
    where
        F: FnOnce(&mut ResponseExpectation) -> Result<(), SpecError>,
    {
        let mut expectation = ResponseExpectation::new(Rc::clone(&self.registry));
        build(&mut expectation)?;
        self.expectations.borrow_mut().push(Rc::new(expectation));
        Ok(())
    }

    /// Stores a literal at `path`, replacing any producer stored there.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<(), SpecError> {
        let path = PointerPath::parse(path);
        path.set(&mut self.cache.borrow_mut(), value.into())?;
        self.producers.borrow_mut().remove(&path);
        Ok(())
    }

    /// Stores a producer at `path`; it runs on every `get`, in the context of
    /// the node that asked.
    pub fn set_with<F>(&self, path: &str, producer: F)
    where
        F: Fn(&ValidationNode) -> Value + 'static,
    {
        let path = PointerPath::parse(path);
        path.remove(&mut self.cache.borrow_mut());
        self.producers.borrow_mut().insert(path, Rc::new(producer));
    }

    /// Reads `path` from this node's cache, falling back to the closest
    /// ancestor that has it.
    pub fn get(&self, path: &str) -> Option<Value> {
        self.lookup(&PointerPath::parse(path), self)
    }

    fn lookup(&self, path: &PointerPath, context: &ValidationNode) -> Option<Value> {
        let producer = self.producers.borrow().get(path).cloned();
        if let Some(producer) = producer {
            return Some(producer(context));
        }
        if let Some(value) = path.resolve(&self.cache.borrow()) {
            return Some(value.clone());
        }
        self.parent()?.lookup(path, context)
    }

    pub fn sort_validations(&self) {
        let children = std::mem::take(&mut *self.children.borrow_mut());
        *self.children.borrow_mut() = sort_by_dependencies(children);
    }

    /// Runs hooks, this node's expectations, then every child in dependency
    /// order, and returns the merged results of the subtree.
    pub fn run(self: &Rc<Self>) -> Result<SpecResults, SpecError> {
        let mut results = SpecResults::new();
        let full_name = self.full_name();
        if self.pending {
            debug!(validation = %full_name, "validation is pending");
            results.mark_pending(full_name);
            return Ok(results);
        }

        self.sort_validations();
        debug!(validation = %full_name, "running validation");

        let hooks: Vec<Hook> = self
            .setup_hooks
            .borrow()
            .iter()
            .chain(self.before_hooks.borrow().iter())
            .cloned()
            .collect();
        for hook in &hooks {
            hook.call(self)?;
        }

        let expectations = self.expectations.borrow().clone();
        for expectation in expectations {
            if let Some(outcome) = expectation.run(&**self)? {
                results.push(full_name.as_str(), outcome);
            }
        }

        for child in self.children() {
            results.merge(child.run()?);
        }
        Ok(results)
    }
}

impl ExpectationContext for ValidationNode {
    fn full_name(&self) -> String {
        ValidationNode::full_name(self)
    }

    fn get(&self, path: &str) -> Option<Value> {
        ValidationNode::get(self, path)
    }
}

impl DependencyHint for Rc<ValidationNode> {
    fn dependency_name(&self) -> Option<&str> {
        self.dependency_name.as_deref()
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

impl fmt::Debug for ValidationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationNode")
            .field("name", &self.name)
            .field("dependency_name", &self.dependency_name)
            .field("dependencies", &self.dependencies)
            .field("pending", &self.pending)
            .field("children", &self.children.borrow())
            .field("expectations", &self.expectations.borrow().len())
            .finish()
    }
}
