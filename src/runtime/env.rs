//! Lexical scopes.
//!
//! A scope maps names to values and links to an optional parent. Scopes are
//! shared (`Rc<RefCell<_>>`): a closure keeps the scope its definition
//! created alive, and every call of that closure runs in it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::runtime::value::Value;

#[derive(Debug, Default)]
pub struct Scope {
    bindings: HashMap<String, Value>,
    parent: Option<Env>,
}

/// A handle to a shared scope.
#[derive(Debug, Clone, Default)]
pub struct Env(Rc<RefCell<Scope>>);

impl Env {
    /// A scope with no parent.
    pub fn root() -> Env {
        Env::default()
    }

    /// A fresh, empty scope whose parent is `self`.
    pub fn child(&self) -> Env {
        Env(Rc::new(RefCell::new(Scope {
            bindings: HashMap::new(),
            parent: Some(self.clone()),
        })))
    }

    pub fn parent(&self) -> Option<Env> {
        self.0.borrow().parent.clone()
    }

    /// Resolves `name` through the scope chain, innermost first.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let owner = self.owner_of(name)?;
        let scope = owner.0.borrow();
        scope.bindings.get(name).cloned()
    }

    /// Whether `name` is bound in this scope itself, ignoring parents.
    pub fn has_local(&self, name: &str) -> bool {
        self.0.borrow().bindings.contains_key(name)
    }

    /// The innermost scope on the chain that binds `name`.
    pub fn owner_of(&self, name: &str) -> Option<Env> {
        let mut current = Some(self.clone());
        while let Some(env) = current {
            if env.has_local(name) {
                return Some(env);
            }
            current = env.parent();
        }
        None
    }

    /// Binds `name` in this scope, shadowing anything further out.
    pub fn bind_local(&self, name: &str, value: Value) {
        self.0.borrow_mut().bindings.insert(name.to_string(), value);
    }

    /// `=`: overwrites the innermost existing binding of `name`, or binds it
    /// here when no scope on the chain has one. Returns the assigned value.
    pub fn assign(&self, name: &str, value: Value) -> Value {
        let target = self.owner_of(name).unwrap_or_else(|| self.clone());
        target.bind_local(name, value.clone());
        value
    }

    /// `:=`: binds `name` in this scope unless it is already bound here.
    /// An existing local binding is left untouched and a deep copy of its
    /// value is returned.
    pub fn declare(&self, name: &str, value: Value) -> Value {
        if let Some(existing) = self.0.borrow().bindings.get(name) {
            return existing.deep_copy();
        }
        self.bind_local(name, value.clone());
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outward() {
        let root = Env::root();
        root.bind_local("x", Value::number(1.0));
        let inner = root.child().child();
        assert_eq!(inner.lookup("x"), Some(Value::number(1.0)));
        assert_eq!(inner.lookup("y"), None);
    }

    #[test]
    fn assign_updates_the_owning_scope() {
        let root = Env::root();
        root.bind_local("x", Value::number(1.0));
        let inner = root.child();
        inner.assign("x", Value::number(2.0));
        assert!(!inner.has_local("x"));
        assert_eq!(root.lookup("x"), Some(Value::number(2.0)));
    }

    #[test]
    fn assign_to_a_new_name_binds_locally() {
        let root = Env::root();
        let inner = root.child();
        inner.assign("fresh", Value::from("v"));
        assert!(inner.has_local("fresh"));
        assert_eq!(root.lookup("fresh"), None);
    }

    #[test]
    fn declare_shadows_outer_bindings() {
        let root = Env::root();
        root.bind_local("x", Value::number(1.0));
        let inner = root.child();
        assert_eq!(inner.declare("x", Value::number(5.0)), Value::number(5.0));
        assert_eq!(inner.lookup("x"), Some(Value::number(5.0)));
        assert_eq!(root.lookup("x"), Some(Value::number(1.0)));
    }

    #[test]
    fn redeclaring_keeps_the_first_value() {
        let env = Env::root();
        env.declare("xs", Value::list(vec![Value::number(1.0)]));
        let again = env.declare("xs", Value::list(vec![]));
        assert_eq!(again, Value::list(vec![Value::number(1.0)]));
        if let (Some(Value::List(bound)), Value::List(copy)) = (env.lookup("xs"), &again) {
            assert!(!Rc::ptr_eq(&bound, copy));
        } else {
            panic!("expected lists");
        }
    }

    #[test]
    fn owner_of_finds_innermost() {
        let root = Env::root();
        root.bind_local("x", Value::number(1.0));
        let mid = root.child();
        mid.bind_local("x", Value::number(2.0));
        let leaf = mid.child();
        let owner = leaf.owner_of("x").expect("bound");
        assert!(owner.has_local("x"));
        assert_eq!(owner.lookup("x"), Some(Value::number(2.0)));
        assert!(root.owner_of("x").is_some_and(|e| e.parent().is_none()));
    }
}
