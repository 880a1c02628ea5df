//! Runtime values of the Pretext interpreter.
//!
//! Strings and `none` behave as plain values. Numbers and lists are shared
//! through reference-counted cells: binding a name to another name's value
//! aliases it, so `++` on one and indexed assignment through one are seen
//! by every alias. Literals and arithmetic always produce fresh cells.
//! Closures are shared the same way and capture the scope their definition
//! created.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::ast::{Block, Param};
use crate::runtime::env::Env;

pub type NumberRef = Rc<Cell<f64>>;
pub type ListRef = Rc<RefCell<Vec<Value>>>;

/// A user-defined macro together with its captured scope.
pub struct Closure {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
    pub env: Env,
}

impl Closure {
    /// Number of non-variadic parameters.
    pub fn positional(&self) -> usize {
        self.params.iter().filter(|p| !p.variadic).count()
    }

    pub fn is_variadic(&self) -> bool {
        self.params.iter().any(|p| p.variadic)
    }
}

// The captured scope usually contains the closure itself.
impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub enum Value {
    Number(NumberRef),
    #[default]
    None,
    String(String),
    List(ListRef),
    Closure(Rc<Closure>),
}

impl Value {
    /// A number in a cell of its own.
    pub fn number(n: f64) -> Value {
        Value::Number(Rc::new(Cell::new(n)))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn bool(flag: bool) -> Value {
        Value::number(if flag { 1.0 } else { 0.0 })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::None => "None",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Closure(_) => "Closure",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(n.get()),
            _ => None,
        }
    }

    /// Condition value of `if` and `loop`. `None` for kinds that have no
    /// truth value.
    pub fn truthiness(&self) -> Option<bool> {
        match self {
            Value::Number(n) => Some(n.get() != 0.0),
            Value::String(s) => Some(!s.is_empty()),
            Value::None => Some(false),
            Value::List(_) | Value::Closure(_) => None,
        }
    }

    /// A copy that shares no number or list storage with `self`.
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::Number(n) => Value::number(n.get()),
            Value::List(items) => {
                Value::list(items.borrow().iter().map(Value::deep_copy).collect())
            }
            other => other.clone(),
        }
    }

    /// The form printed by the `debug` builtin: strings are quoted and
    /// lists are bracketed.
    pub fn debug_text(&self) -> String {
        match self {
            Value::String(s) => format!("{:?}", s),
            Value::List(items) => format!(
                "[{}]",
                items
                    .borrow()
                    .iter()
                    .map(Value::debug_text)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            other => other.to_string(),
        }
    }
}

/// Numbers print as their integer part; non-finite numbers print as `inf`,
/// `-inf` or `nan`.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let truncated = n.trunc();
    if truncated == 0.0 {
        return "0".to_string();
    }
    format!("{:.0}", truncated)
}

/// The canonical text form, used when a value is spliced into output.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(n.get())),
            Value::None => write!(f, "none"),
            Value::String(s) => write!(f, "{}", s),
            Value::List(items) => {
                let items = items.borrow();
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Closure(closure) => write!(f, "<macro {}>", closure.name),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.get() == b.get(),
            (Value::None, Value::None) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_print_their_integer_part() {
        assert_eq!(Value::number(3.0).to_string(), "3");
        assert_eq!(Value::number(2.9).to_string(), "2");
        assert_eq!(Value::number(-2.9).to_string(), "-2");
        assert_eq!(Value::number(-0.4).to_string(), "0");
        assert_eq!(Value::number(1e20).to_string(), "100000000000000000000");
        assert_eq!(Value::number(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::number(f64::NAN).to_string(), "nan");
    }

    #[test]
    fn lists_join_with_comma_space() {
        let inner = Value::list(vec![Value::number(2.0), "b".into()]);
        let list = Value::list(vec![Value::number(1.0), inner, Value::None]);
        assert_eq!(list.to_string(), "1, 2, b, none");
        assert_eq!(Value::list(vec![]).to_string(), "");
    }

    #[test]
    fn debug_text_quotes_strings() {
        let list = Value::list(vec![Value::number(1.0), "a".into()]);
        assert_eq!(list.debug_text(), "[1, \"a\"]");
    }

    #[test]
    fn deep_copy_detaches_lists() {
        let original = Value::list(vec![Value::list(vec![Value::number(1.0)])]);
        let copy = original.deep_copy();
        if let (Value::List(a), Value::List(b)) = (&original, &copy) {
            assert!(!Rc::ptr_eq(a, b));
            b.borrow_mut().push(Value::None);
            assert_eq!(a.borrow().len(), 1);
        } else {
            panic!("expected lists");
        }
        assert_eq!(original.deep_copy(), original);
    }

    #[test]
    fn clones_share_numbers_and_deep_copies_do_not() {
        let n = Value::number(1.0);
        let alias = n.clone();
        let copy = n.deep_copy();
        if let Value::Number(cell) = &n {
            cell.set(5.0);
        }
        assert_eq!(alias, Value::number(5.0));
        assert_eq!(copy, Value::number(1.0));
    }

    #[test]
    fn truthiness_by_kind() {
        assert_eq!(Value::number(0.0).truthiness(), Some(false));
        assert_eq!(Value::number(-1.0).truthiness(), Some(true));
        assert_eq!(Value::from("").truthiness(), Some(false));
        assert_eq!(Value::None.truthiness(), Some(false));
        assert_eq!(Value::list(vec![]).truthiness(), None);
    }
}
