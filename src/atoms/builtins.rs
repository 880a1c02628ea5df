//! Builtin macros.
//!
//! Builtins are resolved by name before any user binding, so a user macro
//! named `len` or `debug` can be defined but never called.

use crate::ast::{AstNode, Span};
use crate::diagnostics::PretextError;
use crate::err_ctx;
use crate::runtime::env::Env;
use crate::runtime::eval::Interpreter;
use crate::runtime::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `len(x)`: element count of a list, character count of a string.
    Len,
    /// `debug(a, b, ...)`: writes the evaluated arguments to the diagnostic
    /// sink and yields `none`.
    Debug,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        match name {
            "len" => Some(Builtin::Len),
            "debug" => Some(Builtin::Debug),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::Debug => "debug",
        }
    }

    pub fn call(
        &self,
        interp: &mut Interpreter<'_>,
        args: &[AstNode],
        span: Span,
        env: &Env,
    ) -> Result<Value, PretextError> {
        match self {
            Builtin::Len => len(interp, args, span, env),
            Builtin::Debug => debug(interp, args, env),
        }
    }
}

fn len(
    interp: &mut Interpreter<'_>,
    args: &[AstNode],
    span: Span,
    env: &Env,
) -> Result<Value, PretextError> {
    let [arg] = args else {
        return Err(err_ctx!(
            Eval,
            format!("len only takes 1 argument, got {}", args.len()),
            span
        ));
    };
    match interp.eval(arg, env)? {
        Value::List(items) => Ok(Value::number(items.borrow().len() as f64)),
        Value::String(s) => Ok(Value::number(s.chars().count() as f64)),
        other => Err(err_ctx!(
            TypeError,
            format!("len expects a List or a String, found {}", other.type_name()),
            arg.span
        )),
    }
}

fn debug(interp: &mut Interpreter<'_>, args: &[AstNode], env: &Env) -> Result<Value, PretextError> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(interp.eval(arg, env)?.debug_text());
    }
    interp.emit_debug(&format!("[{}]\n", parts.join(", ")))?;
    Ok(Value::None)
}
