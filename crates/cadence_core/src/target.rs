//! Animation targets
//!
//! The engine never inspects a target itself. Everything it needs goes
//! through [`TargetHost`]: resolving a target spec into concrete targets,
//! reading a property's current value, and committing a batch of values.

use crate::value::Value;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

/// Property writes for one target in one frame, in declaration order
pub type PropertyBatch = IndexMap<String, Value>;

/// What an animation applies to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Targets<T> {
    /// A single concrete target
    One(T),
    /// An ordered list of concrete targets
    Many(Vec<T>),
    /// A query the host resolves (class name, id, path...)
    Selector(String),
}

impl<T> Targets<T> {
    /// Create a selector target spec
    pub fn selector(query: impl Into<String>) -> Self {
        Targets::Selector(query.into())
    }
}

impl<T> From<T> for Targets<T> {
    fn from(target: T) -> Self {
        Targets::One(target)
    }
}

impl<T> From<Vec<T>> for Targets<T> {
    fn from(targets: Vec<T>) -> Self {
        Targets::Many(targets)
    }
}

/// The read/write/resolve contract between the engine and whatever it animates
///
/// Implementations must not call back into the scheduler from these methods;
/// they are invoked while a frame is being evaluated.
pub trait TargetHost {
    /// Concrete target handle
    type Target: Clone + Eq + Hash + fmt::Debug + 'static;

    /// Resolve a target spec into an ordered list of concrete targets
    ///
    /// The default handles concrete targets and resolves selectors to nothing.
    fn resolve_targets(&self, spec: &Targets<Self::Target>) -> Vec<Self::Target> {
        match spec {
            Targets::One(target) => vec![target.clone()],
            Targets::Many(targets) => targets.clone(),
            Targets::Selector(query) => {
                tracing::debug!("TargetHost: selector {:?} not supported by host", query);
                Vec::new()
            }
        }
    }

    /// Read the current value of `property` on `target`
    fn read_value(&self, target: &Self::Target, property: &str) -> Option<Value>;

    /// Commit a batch of property values onto `target`
    fn write_values(&self, target: &Self::Target, values: &PropertyBatch);
}

impl<H: TargetHost> TargetHost for Rc<H> {
    type Target = H::Target;

    fn resolve_targets(&self, spec: &Targets<Self::Target>) -> Vec<Self::Target> {
        (**self).resolve_targets(spec)
    }

    fn read_value(&self, target: &Self::Target, property: &str) -> Option<Value> {
        (**self).read_value(target, property)
    }

    fn write_values(&self, target: &Self::Target, values: &PropertyBatch) {
        (**self).write_values(target, values)
    }
}

// ============================================================================
// In-memory host
// ============================================================================

struct MemoryState<T> {
    values: FxHashMap<T, IndexMap<String, Value>>,
    tags: FxHashMap<String, SmallVec<[T; 4]>>,
    writes: Vec<(T, PropertyBatch)>,
}

/// A host that keeps property values in memory
///
/// Useful for headless animation and for tests. Clones share state.
/// Selectors resolve through tags registered with [`MemoryHost::tag`].
pub struct MemoryHost<T = &'static str> {
    state: Rc<RefCell<MemoryState<T>>>,
}

impl<T> Clone for MemoryHost<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: Clone + Eq + Hash> MemoryHost<T> {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MemoryState {
                values: FxHashMap::default(),
                tags: FxHashMap::default(),
                writes: Vec::new(),
            })),
        }
    }

    /// Set a property value directly (not recorded as a write)
    pub fn insert(&self, target: T, property: impl Into<String>, value: Value) {
        self.state
            .borrow_mut()
            .values
            .entry(target)
            .or_default()
            .insert(property.into(), value);
    }

    /// Get the current value of a property
    pub fn get(&self, target: T, property: &str) -> Option<Value> {
        self.state
            .borrow()
            .values
            .get(&target)
            .and_then(|props| props.get(property).cloned())
    }

    /// Get the current value of a property as a real number
    pub fn number(&self, target: T, property: &str) -> Option<f64> {
        self.get(target, property).map(|v| v.to_f64())
    }

    /// Register `target` under a selector tag
    pub fn tag(&self, target: T, selector: impl Into<String>) {
        self.state
            .borrow_mut()
            .tags
            .entry(selector.into())
            .or_default()
            .push(target);
    }

    /// Number of write batches committed so far
    pub fn write_count(&self) -> usize {
        self.state.borrow().writes.len()
    }

    /// All write batches committed so far, oldest first
    pub fn writes(&self) -> Vec<(T, PropertyBatch)> {
        self.state.borrow().writes.clone()
    }

    /// Forget the write log
    pub fn clear_writes(&self) {
        self.state.borrow_mut().writes.clear();
    }
}

impl<T: Clone + Eq + Hash> Default for MemoryHost<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TargetHost for MemoryHost<T>
where
    T: Clone + Eq + Hash + fmt::Debug + 'static,
{
    type Target = T;

    fn resolve_targets(&self, spec: &Targets<T>) -> Vec<T> {
        match spec {
            Targets::One(target) => vec![target.clone()],
            Targets::Many(targets) => targets.clone(),
            Targets::Selector(query) => self
                .state
                .borrow()
                .tags
                .get(query)
                .map(|targets| targets.to_vec())
                .unwrap_or_default(),
        }
    }

    fn read_value(&self, target: &T, property: &str) -> Option<Value> {
        self.state
            .borrow()
            .values
            .get(target)
            .and_then(|props| props.get(property).cloned())
    }

    fn write_values(&self, target: &T, values: &PropertyBatch) {
        let mut state = self.state.borrow_mut();
        let props = state.values.entry(target.clone()).or_default();
        for (property, value) in values {
            props.insert(property.clone(), value.clone());
        }
        state.writes.push((target.clone(), values.clone()));
    }
}
