//! # Pretext Evaluation Engine
//!
//! A tree-walking evaluator. Every node is evaluated against an [`Env`] and
//! yields a [`Value`]; the first failure aborts the whole run.
//!
//! ## Dispatch order for applications
//!
//! 1. Builtins (`len`, `debug`), which shadow any user binding.
//! 2. A closure bound to the callee name.
//!
//! Native-text statements are handed to the expansion machinery in
//! [`crate::runtime::expand`].

use std::rc::Rc;

use log::debug;

use crate::ast::{AstNode, Expr, Operator, Param, Span};
use crate::atoms::{Builtin, OutputSink, StderrSink};
use crate::config::{EngineConfig, FramePolicy};
use crate::diagnostics::{ErrorContext, PretextError};
use crate::err_ctx;
use crate::runtime::env::Env;
use crate::runtime::expand::NativeStack;
use crate::runtime::math;
use crate::runtime::value::{Closure, ListRef, Value};

// ============================================================================
// INTERPRETER STATE
// ============================================================================

pub struct Interpreter<'o> {
    pub(crate) config: EngineConfig,
    pub(crate) output: &'o mut dyn OutputSink,
    diagnostics: Box<dyn OutputSink + 'o>,
    pub(crate) natives: NativeStack,
    depth: usize,
}

impl<'o> Interpreter<'o> {
    pub fn new(config: EngineConfig, output: &'o mut dyn OutputSink) -> Self {
        Self {
            config,
            output,
            diagnostics: Box::new(StderrSink),
            natives: NativeStack::default(),
            depth: 0,
        }
    }

    /// Redirects `debug(...)` output.
    pub fn with_diagnostics(mut self, sink: Box<dyn OutputSink + 'o>) -> Self {
        self.diagnostics = sink;
        self
    }

    /// Runs top-level statements in order and returns the last value.
    pub fn run(&mut self, statements: &[AstNode], env: &Env) -> Result<Value, PretextError> {
        let value = self.eval_block(statements, env)?;
        self.output
            .flush()
            .map_err(|e| PretextError::io("Failed to flush output", e))?;
        Ok(value)
    }

    pub(crate) fn emit_debug(&mut self, text: &str) -> Result<(), PretextError> {
        self.diagnostics
            .emit(text)
            .map_err(|e| PretextError::io("Failed to write diagnostic output", e))
    }

    // ========================================================================
    // NODE EVALUATION
    // ========================================================================

    /// Evaluates statements in order, yielding the last value or `none`.
    pub fn eval_block(&mut self, statements: &[AstNode], env: &Env) -> Result<Value, PretextError> {
        let mut last = Value::None;
        for statement in statements {
            last = self.eval(statement, env)?;
        }
        Ok(last)
    }

    pub fn eval(&mut self, node: &AstNode, env: &Env) -> Result<Value, PretextError> {
        match &*node.value {
            Expr::Number(n) => Ok(Value::number(*n)),
            Expr::None => Ok(Value::None),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Identifier(name) => lookup(env, name, node.span),
            Expr::Operation { op, operands } => self.eval_operation(*op, operands, node.span, env),
            Expr::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, env)?);
                }
                Ok(Value::list(values))
            }
            Expr::If {
                condition,
                then_block,
                else_block,
            } => {
                if self.condition(condition, env)? {
                    self.eval_block(then_block, env)
                } else {
                    self.eval_block(else_block, env)
                }
            }
            Expr::Loop { condition, body } => {
                let scope = env.child();
                let mut last = Value::None;
                while self.condition(condition, &scope)? {
                    last = self.eval_block(body, &scope)?;
                }
                Ok(last)
            }
            Expr::MacroDef { name, params, body } => {
                debug!("defining macro `{}`", name);
                let closure = Closure {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    env: env.child(),
                };
                Ok(env.assign(name, Value::Closure(Rc::new(closure))))
            }
            Expr::Application { callee, args } => self.apply(callee, args, node.span, env),
            Expr::Native(text) => {
                self.expand_native(text, node.span, env)?;
                Ok(Value::None)
            }
        }
    }

    fn condition(&mut self, node: &AstNode, env: &Env) -> Result<bool, PretextError> {
        let value = self.eval(node, env)?;
        value.truthiness().ok_or_else(|| {
            err_ctx!(
                TypeError,
                format!("A {} cannot be used as a condition", value.type_name()),
                node.span
            )
        })
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    fn eval_operation(
        &mut self,
        op: Operator,
        operands: &[AstNode],
        span: Span,
        env: &Env,
    ) -> Result<Value, PretextError> {
        match (op, operands) {
            (Operator::Sequence, [first, second]) => {
                self.eval(first, env)?;
                self.eval(second, env)
            }
            (Operator::Assign, [target, value]) => {
                let name = assignable(target)?;
                let value = self.eval(value, env)?;
                Ok(env.assign(name, value))
            }
            (Operator::Declare, [target, value]) => {
                let name = assignable(target)?;
                let value = self.eval(value, env)?;
                Ok(env.declare(name, value))
            }
            (Operator::Or, [lhs, rhs]) => {
                let left = self.number(lhs, env)?;
                if left != 0.0 {
                    return Ok(Value::number(left.trunc()));
                }
                Ok(Value::number(self.number(rhs, env)?.trunc()))
            }
            (Operator::Increment, [target]) => self.step(target, 1.0, env),
            (Operator::Decrement, [target]) => self.step(target, -1.0, env),
            (Operator::Negate, [operand]) => Ok(Value::number(-self.number(operand, env)?)),
            (Operator::Factorial, [operand]) => {
                let n = self.number(operand, env)?;
                math::factorial(n).map(Value::number).ok_or_else(|| {
                    err_ctx!(Eval, format!("Factorial is undefined for {}", n), span)
                })
            }
            (Operator::Index, [target, index]) => {
                let target_value = self.eval(target, env)?;
                let index_value = self.eval(index, env)?;
                index_into(&target_value, &index_value, target.span, index.span)
            }
            (Operator::IndexAssign, [target, index, value]) => {
                let target_value = self.eval(target, env)?;
                let index_value = self.eval(index, env)?;
                let value = self.eval(value, env)?;
                store_into(&target_value, &index_value, value, target.span, index.span)
            }
            (Operator::Spread, _) => Err(err_ctx!(
                Eval,
                "`...` is only valid on the last parameter of a macro",
                span
            )),
            (Operator::In, _) => Err(err_ctx!(
                Eval,
                "The `in` operator is reserved and has no evaluation rule",
                span
            )),
            (_, [lhs, rhs]) => {
                let left = self.eval(lhs, env)?;
                let right = self.eval(rhs, env)?;
                binary(op, left, right, span)
            }
            _ => Err(err_ctx!(
                Eval,
                format!(
                    "Operator `{}` applied to {} operand(s)",
                    op.symbol(),
                    operands.len()
                ),
                span
            )),
        }
    }

    fn number(&mut self, node: &AstNode, env: &Env) -> Result<f64, PretextError> {
        let value = self.eval(node, env)?;
        value.as_number().ok_or_else(|| {
            err_ctx!(
                TypeError,
                format!("Expected a Number, found {}", value.type_name()),
                node.span
            )
        })
    }

    /// `++` and `--`: updates the bound number in place, so every alias of
    /// it sees the change. The result is a fresh number.
    fn step(&mut self, target: &AstNode, delta: f64, env: &Env) -> Result<Value, PretextError> {
        let name = assignable(target)?;
        let current = lookup(env, name, target.span)?;
        let Value::Number(cell) = &current else {
            return Err(err_ctx!(
                TypeError,
                format!("Cannot step `{}`, which holds a {}", name, current.type_name()),
                target.span
            ));
        };
        cell.set(cell.get() + delta);
        Ok(Value::number(cell.get()))
    }

    // ========================================================================
    // APPLICATION
    // ========================================================================

    fn apply(
        &mut self,
        callee: &str,
        args: &[AstNode],
        span: Span,
        env: &Env,
    ) -> Result<Value, PretextError> {
        if let Some(builtin) = Builtin::from_name(callee) {
            return builtin.call(self, args, span, env);
        }

        let closure = match lookup(env, callee, span)? {
            Value::Closure(closure) => closure,
            other => {
                return Err(err_ctx!(
                    TypeError,
                    format!("`{}` is a {}, not a macro", callee, other.type_name()),
                    span
                ))
            }
        };

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, env)?);
        }

        if self.depth >= self.config.max_depth {
            return Err(err_ctx!(
                Eval,
                format!("Macro calls nested deeper than {}", self.config.max_depth),
                span,
                "raise `max_depth` if the recursion is intended"
            ));
        }

        let frame = match self.config.frames {
            FramePolicy::Shared => closure.env.clone(),
            FramePolicy::PerCall => closure.env.child(),
        };
        bind_arguments(&closure, values, &frame, span)?;

        debug!("invoking macro `{}` at depth {}", callee, self.depth + 1);
        self.depth += 1;
        let result = self.eval_block(&closure.body, &frame);
        self.depth -= 1;
        result
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn not_bound(name: &str, span: Span) -> PretextError {
    err_ctx!(Eval, format!("Identifier {} not bound.", name), span)
}

fn lookup(env: &Env, name: &str, span: Span) -> Result<Value, PretextError> {
    env.lookup(name).ok_or_else(|| not_bound(name, span))
}

fn assignable(target: &AstNode) -> Result<&str, PretextError> {
    target.value.as_identifier().ok_or_else(|| {
        err_ctx!(
            Eval,
            format!("Cannot assign to {}", target.value.pretty()),
            target.span,
            "only identifiers and indexed lists can be assigned"
        )
    })
}

fn bind_arguments(
    closure: &Closure,
    mut values: Vec<Value>,
    frame: &Env,
    span: Span,
) -> Result<(), PretextError> {
    let positional = closure.positional();
    let fits = if closure.is_variadic() {
        values.len() >= positional
    } else {
        values.len() == positional
    };
    if !fits {
        return Err(err_ctx!(
            Eval,
            format!(
                "Macro `{}` expects {}{} argument(s), got {}",
                closure.name,
                if closure.is_variadic() { "at least " } else { "" },
                positional,
                values.len()
            ),
            span
        ));
    }

    let rest = values.split_off(positional);
    for (Param { name, .. }, value) in closure.params.iter().zip(values) {
        frame.bind_local(name, value);
    }
    if let Some(variadic) = closure.params.iter().find(|p| p.variadic) {
        frame.bind_local(&variadic.name, Value::list(rest));
    }
    Ok(())
}

fn binary(op: Operator, left: Value, right: Value, span: Span) -> Result<Value, PretextError> {
    let result = match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => numeric(op, a.get(), b.get(), span)?,
        (Value::String(a), Value::String(b)) => textual(op, a, b),
        _ => None,
    };
    result.ok_or_else(|| {
        err_ctx!(
            TypeError,
            format!(
                "Operator `{}` cannot combine {} and {}",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ),
            span
        )
    })
}

fn numeric(op: Operator, a: f64, b: f64, span: Span) -> Result<Option<Value>, PretextError> {
    let value = match op {
        Operator::Add => Value::number(a + b),
        Operator::Sub => Value::number(a - b),
        Operator::Mul => Value::number(a * b),
        Operator::Div if b == 0.0 => {
            return Err(PretextError::DivisionByZero {
                ctx: ErrorContext::with_span(span),
            })
        }
        Operator::Div => Value::number(a / b),
        Operator::Less => Value::bool(a < b),
        Operator::LessEqual => Value::bool(a <= b),
        Operator::GreaterEqual => Value::bool(a >= b),
        Operator::Equal => Value::bool(a == b),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn textual(op: Operator, a: &str, b: &str) -> Option<Value> {
    let value = match op {
        Operator::Add => Value::String(format!("{}{}", a, b)),
        Operator::Less => Value::bool(a < b),
        Operator::LessEqual => Value::bool(a <= b),
        Operator::GreaterEqual => Value::bool(a >= b),
        Operator::Equal => Value::bool(a == b),
        _ => return None,
    };
    Some(value)
}

/// Converts an index value to a position. Fractions are truncated; negative
/// indices are out of range.
fn position(index: &Value, len: usize, span: Span) -> Result<usize, PretextError> {
    let Some(n) = index.as_number() else {
        return Err(err_ctx!(
            TypeError,
            format!("Index must be a Number, found {}", index.type_name()),
            span
        ));
    };
    let n = n.trunc();
    if !n.is_finite() || n < 0.0 || n >= len as f64 {
        return Err(err_ctx!(
            Eval,
            format!("Index {} out of range for length {}", Value::number(n), len),
            span
        ));
    }
    Ok(n as usize)
}

fn index_into(
    target: &Value,
    index: &Value,
    target_span: Span,
    index_span: Span,
) -> Result<Value, PretextError> {
    match target {
        Value::List(items) => {
            let items = items.borrow();
            let at = position(index, items.len(), index_span)?;
            Ok(items[at].clone())
        }
        Value::String(s) => {
            let count = s.chars().count();
            let at = position(index, count, index_span)?;
            Ok(s.chars().nth(at).map(String::from).unwrap_or_default().into())
        }
        other => Err(err_ctx!(
            TypeError,
            format!("Cannot index into a {}", other.type_name()),
            target_span
        )),
    }
}

/// Whether `value` is `list` or holds it at any depth.
fn contains_list(value: &Value, list: &ListRef) -> bool {
    match value {
        Value::List(items) => {
            Rc::ptr_eq(items, list) || items.borrow().iter().any(|v| contains_list(v, list))
        }
        _ => false,
    }
}

fn store_into(
    target: &Value,
    index: &Value,
    value: Value,
    target_span: Span,
    index_span: Span,
) -> Result<Value, PretextError> {
    match target {
        Value::List(items) => {
            if contains_list(&value, items) {
                return Err(err_ctx!(
                    Eval,
                    "A list cannot be stored inside itself",
                    target_span
                ));
            }
            let mut items = items.borrow_mut();
            let at = position(index, items.len(), index_span)?;
            items[at] = value.clone();
            Ok(value)
        }
        Value::String(_) => Err(err_ctx!(
            Eval,
            "Indexed assignment into a String is unsupported",
            target_span
        )),
        other => Err(err_ctx!(
            TypeError,
            format!("Cannot index into a {}", other.type_name()),
            target_span
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::NullSink;
    use crate::diagnostics::ErrorType;
    use crate::syntax::parser::parse_escape_expression;

    fn eval_in(code: &str, env: &Env) -> Result<Value, PretextError> {
        let node = parse_escape_expression(code, '$', 0)?;
        let mut sink = NullSink;
        let mut interp = Interpreter::new(EngineConfig::default(), &mut sink);
        interp.eval(&node, env)
    }

    fn eval(code: &str) -> Result<Value, PretextError> {
        eval_in(code, &Env::root())
    }

    #[test]
    fn arithmetic_and_comparison() {
        assert_eq!(eval("2 + 3").unwrap(), Value::number(5.0));
        assert_eq!(eval("1 - 2 - 3").unwrap(), Value::number(-4.0));
        assert_eq!(eval("1 < 2").unwrap(), Value::number(1.0));
        assert_eq!(eval("2 >= 2").unwrap(), Value::number(1.0));
        assert_eq!(eval("3 == 4").unwrap(), Value::number(0.0));
        assert_eq!(eval("\"a\" < \"b\"").unwrap(), Value::number(1.0));
        assert_eq!(eval("\"ab\" + \"cd\"").unwrap(), Value::from("abcd"));
        assert_eq!(eval("4!").unwrap(), Value::number(24.0));
    }

    #[test]
    fn or_short_circuits_and_truncates() {
        assert_eq!(eval("0 || 5").unwrap(), Value::number(5.0));
        assert_eq!(eval("2.7 || undefined").unwrap(), Value::number(2.0));
    }

    #[test]
    fn mismatched_operands_are_type_errors() {
        let err = eval("1 + \"a\"").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::TypeError);
        let err = eval("1 < \"a\"").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::TypeError);
    }

    #[test]
    fn division_by_zero() {
        let err = eval("1 / 0").unwrap_err();
        assert!(matches!(err, PretextError::DivisionByZero { .. }));
    }

    #[test]
    fn increment_updates_the_bound_number_in_place() {
        let root = Env::root();
        root.bind_local("i", Value::number(1.0));
        let inner = root.child();
        assert_eq!(eval_in("i++", &inner).unwrap(), Value::number(2.0));
        assert_eq!(eval_in("i--; i--", &inner).unwrap(), Value::number(0.0));
        assert!(!inner.has_local("i"));
        assert_eq!(root.lookup("i"), Some(Value::number(0.0)));
    }

    #[test]
    fn increment_is_seen_through_every_alias() {
        let env = Env::root();
        eval_in("a = 1; b = a; xs = [a]", &env).unwrap();
        let stepped = eval_in("a++", &env).unwrap();
        assert_eq!(env.lookup("b"), Some(Value::number(2.0)));
        assert_eq!(eval_in("xs[0]", &env).unwrap(), Value::number(2.0));

        // The result of `++` and the result of arithmetic are detached.
        eval_in("a++", &env).unwrap();
        assert_eq!(stepped, Value::number(2.0));
        eval_in("a = a + 1", &env).unwrap();
        assert_eq!(env.lookup("b"), Some(Value::number(3.0)));
    }

    #[test]
    fn redeclaring_returns_a_detached_copy() {
        let env = Env::root();
        eval_in("c := 1", &env).unwrap();
        let copy = eval_in("c := 7", &env).unwrap();
        eval_in("c++", &env).unwrap();
        assert_eq!(copy, Value::number(1.0));
        assert_eq!(env.lookup("c"), Some(Value::number(2.0)));
    }

    #[test]
    fn string_indexing_yields_characters() {
        assert_eq!(eval("\"héllo\"[1]").unwrap(), Value::from("é"));
        let err = eval("\"abc\"[3]").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Eval);
        let err = eval("\"abc\"[0] = \"x\"").unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn list_index_assignment_is_shared() {
        let env = Env::root();
        eval_in("xs = [10, 20, 30]", &env).unwrap();
        eval_in("ys = xs", &env).unwrap();
        eval_in("ys[0] = 99", &env).unwrap();
        assert_eq!(eval_in("xs[0]", &env).unwrap(), Value::number(99.0));
        let err = eval_in("xs[-1]", &env).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn lists_cannot_contain_themselves() {
        let env = Env::root();
        eval_in("xs = [1, [2]]", &env).unwrap();
        assert!(eval_in("xs[0] = xs", &env).is_err());
        assert!(eval_in("xs[1][0] = xs", &env).is_err());
        eval_in("xs[0] = [3]", &env).unwrap();
        assert_eq!(eval_in("xs", &env).unwrap().to_string(), "3, 2");
    }

    #[test]
    fn unbound_identifier() {
        let err = eval("nope + 1").unwrap_err();
        assert_eq!(err.to_string(), "Evaluation error: Identifier nope not bound.");
        assert_eq!(err.span(), Some(Span::new(0, 4)));
    }

    #[test]
    fn reserved_operators_fail() {
        assert!(eval("1 in 2").unwrap_err().to_string().contains("reserved"));
        assert!(eval("x...").is_err());
    }

    #[test]
    fn lists_are_not_conditions() {
        let err = eval("if [] { 1 }").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::TypeError);
        assert_eq!(eval("if \"\" { 1 } else { 2 }").unwrap(), Value::number(2.0));
        assert_eq!(eval("if 0 { 1 }").unwrap(), Value::None);
    }

    #[test]
    fn len_builtin() {
        assert_eq!(eval("len([1, 2, 3])").unwrap(), Value::number(3.0));
        assert_eq!(eval("len(\"abc\")").unwrap(), Value::number(3.0));
        assert!(eval("len(1, 2)").unwrap_err().to_string().contains("1 argument"));
    }
}
