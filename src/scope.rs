//! Lexically chained scopes ("contexts").
//!
//! A [`Scope`] is a shared handle: many child scopes and closures may point
//! at the same parent, and a parent lives as long as its longest-lived
//! holder. Each binding carries [`BindingFlags`] that control who may read
//! it, whether it may be rewritten, and whether bulk imports carry it over.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use log::debug;
use thiserror::Error;

use crate::value::Value;

bitflags! {
    /// Per-binding visibility flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BindingFlags: u8 {
        /// Readable only from the owning scope or its descendants.
        const PRIVATE = 0b001;

        /// Write-once: once it holds a non-void value, writes fail.
        const FINALIZED = 0b010;

        /// Skipped when bindings are merged into another scope.
        const DONT_IMPORT = 0b100;
    }
}

/// Failure of a scope operation. The interpreter turns these into thrown
/// error values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("no such field: {0}")]
    Absent(String),

    #[error("field '{0}' is private")]
    Private(String),

    #[error("field '{0}' is final")]
    Finalized(String),
}

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    flags: BindingFlags,
}

impl Binding {
    fn is_locked(&self) -> bool {
        self.flags.contains(BindingFlags::FINALIZED) && !self.value.is_void()
    }
}

#[derive(Default)]
struct ScopeData {
    bindings: HashMap<String, Binding>,
    parent: Option<Scope>,
}

#[derive(Clone, Default)]
pub struct Scope(Rc<RefCell<ScopeData>>);

impl Scope {
    /// A new root scope with no parent.
    pub fn new() -> Self {
        Self::default()
    }

    /// A new, empty scope whose parent is `parent`.
    pub fn child_of(parent: &Scope) -> Self {
        Scope(Rc::new(RefCell::new(ScopeData {
            bindings: HashMap::new(),
            parent: Some(parent.clone()),
        })))
    }

    pub fn parent(&self) -> Option<Scope> {
        self.0.borrow().parent.clone()
    }

    /// A sibling activation record: same parent, shallow copy of the
    /// bindings and their flags.
    pub fn copy(&self) -> Self {
        let data = self.0.borrow();
        Scope(Rc::new(RefCell::new(ScopeData {
            bindings: data.bindings.clone(),
            parent: data.parent.clone(),
        })))
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// True if `self` is `ancestor` or has it somewhere up its parent chain.
    pub fn is_descendant_of(&self, ancestor: &Scope) -> bool {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            if scope.ptr_eq(ancestor) {
                return true;
            }
            current = scope.parent();
        }
        false
    }

    /// The nearest scope, starting at `self`, that directly owns `name`.
    pub fn owner_of(&self, name: &str) -> Option<Scope> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            if scope.0.borrow().bindings.contains_key(name) {
                return Some(scope);
            }
            current = scope.parent();
        }
        None
    }

    /// Own binding only; parents are not consulted.
    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.0.borrow().bindings.get(name).map(|b| b.value.clone())
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.0.borrow().bindings.contains_key(name)
    }

    /// Look `name` up through the parent chain, ignoring visibility.
    pub fn lookup(&self, name: &str) -> Result<Value, ScopeError> {
        self.owner_of(name)
            .and_then(|owner| owner.get_local(name))
            .ok_or_else(|| ScopeError::Absent(name.to_string()))
    }

    /// Look `name` up on behalf of code running in `accessor`, enforcing
    /// `PRIVATE`.
    pub fn lookup_from(&self, name: &str, accessor: &Scope) -> Result<Value, ScopeError> {
        let owner = self
            .owner_of(name)
            .ok_or_else(|| ScopeError::Absent(name.to_string()))?;

        owner.check_visible(name, accessor)?;

        owner
            .get_local(name)
            .ok_or_else(|| ScopeError::Absent(name.to_string()))
    }

    fn check_visible(&self, name: &str, accessor: &Scope) -> Result<(), ScopeError> {
        if self.has_local_flag(name, BindingFlags::PRIVATE) && !accessor.is_descendant_of(self) {
            debug!("Denied access to private '{}'", name);
            return Err(ScopeError::Private(name.to_string()));
        }
        Ok(())
    }

    /// Update the nearest owner of `name`, or define it here if nobody owns
    /// it.
    pub fn set(&self, name: &str, value: Value) -> Result<(), ScopeError> {
        self.set_from(name, value, &self.clone())
    }

    /// [`Scope::set`] on behalf of code running in `accessor`.
    pub fn set_from(&self, name: &str, value: Value, accessor: &Scope) -> Result<(), ScopeError> {
        match self.owner_of(name) {
            Some(owner) => owner.set_locally_from(name, value, accessor),
            None => self.set_locally(name, value),
        }
    }

    /// Define or overwrite `name` in this scope itself.
    pub fn set_locally(&self, name: &str, value: Value) -> Result<(), ScopeError> {
        self.set_locally_from(name, value, &self.clone())
    }

    pub fn set_locally_from(
        &self,
        name: &str,
        value: Value,
        accessor: &Scope,
    ) -> Result<(), ScopeError> {
        self.check_visible(name, accessor)?;

        let mut data = self.0.borrow_mut();
        match data.bindings.get_mut(name) {
            Some(binding) if binding.is_locked() => Err(ScopeError::Finalized(name.to_string())),
            Some(binding) => {
                binding.value = value;
                Ok(())
            }
            None => {
                data.bindings.insert(
                    name.to_string(),
                    Binding {
                        value,
                        flags: BindingFlags::empty(),
                    },
                );
                Ok(())
            }
        }
    }

    /// Remove a binding owned directly by this scope.
    pub fn del(&self, name: &str) -> bool {
        self.0.borrow_mut().bindings.remove(name).is_some()
    }

    fn has_local_flag(&self, name: &str, flag: BindingFlags) -> bool {
        self.0
            .borrow()
            .bindings
            .get(name)
            .is_some_and(|b| b.flags.contains(flag))
    }

    /// Flag check on the nearest owner of `name`.
    pub fn has_flag(&self, name: &str, flag: BindingFlags) -> bool {
        self.owner_of(name)
            .is_some_and(|owner| owner.has_local_flag(name, flag))
    }

    /// Add `flag` to this scope's own binding, creating a void binding first
    /// if needed.
    pub fn set_flag(&self, name: &str, flag: BindingFlags) {
        let mut data = self.0.borrow_mut();
        data.bindings
            .entry(name.to_string())
            .or_insert_with(|| Binding {
                value: Value::Void,
                flags: BindingFlags::empty(),
            })
            .flags
            .insert(flag);
    }

    /// Copy this scope's own importable bindings into `target`. `PRIVATE` and
    /// `DONT_IMPORT` bindings stay behind, `FINALIZED` travels with the
    /// value, and a finalized binding in `target` is never overwritten.
    pub fn merge_into(&self, target: &Scope) -> Result<(), ScopeError> {
        let exported: Vec<(String, Binding)> = self
            .0
            .borrow()
            .bindings
            .iter()
            .filter(|(_, b)| {
                !b.flags
                    .intersects(BindingFlags::PRIVATE | BindingFlags::DONT_IMPORT)
            })
            .map(|(name, b)| (name.clone(), b.clone()))
            .collect();

        debug!("Merging {} binding(s)", exported.len());

        let mut data = target.0.borrow_mut();

        // All or nothing: `target` is untouched when any name is locked.
        let mut conflicts: Vec<&String> = exported
            .iter()
            .map(|(name, _)| name)
            .filter(|name| data.bindings.get(*name).is_some_and(Binding::is_locked))
            .collect();
        conflicts.sort();
        if let Some(name) = conflicts.first() {
            return Err(ScopeError::Finalized((*name).clone()));
        }

        data.bindings.extend(exported);
        Ok(())
    }

    /// Own binding names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.borrow().bindings.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bindings may refer back to this scope, so only the shape is shown.
        write!(f, "Scope({:?})", self.names())
    }
}
