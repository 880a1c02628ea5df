//! Native-text expansion.
//!
//! A native line may embed escape expressions such as `$(name(1, 2))`. They
//! are expanded right to left: the rightmost one is evaluated, its text is
//! spliced into the line, and the line is scanned again. Macro bodies can
//! emit native lines of their own while an expansion is in progress; those
//! lines are collected on a [`NativeStack`] and spliced in right after the
//! text of the expression that produced them.
//!
//! A trailing escape character marks a line without a line break: it is
//! removed together with everything after it (usually just the newline).

use log::{debug, trace};

use crate::ast::Span;
use crate::diagnostics::PretextError;
use crate::err_ctx;
use crate::runtime::env::Env;
use crate::runtime::eval::Interpreter;
use crate::syntax::parser::parse_escape_expression;

// ============================================================================
// NATIVE STACK
// ============================================================================

/// One slot per native line currently being expanded. The bottom slot
/// belongs to the outermost line; deeper slots hold finished lines emitted
/// by macros called from inside an escape expression.
#[derive(Debug, Default)]
pub struct NativeStack {
    slots: Vec<String>,
}

impl NativeStack {
    /// Opens a slot and returns its depth.
    pub fn push(&mut self) -> usize {
        self.slots.push(String::new());
        self.slots.len() - 1
    }

    /// Whether slots were opened above `depth`.
    pub fn has_nested(&self, depth: usize) -> bool {
        self.slots.len() > depth + 1
    }

    /// Removes every slot above `depth` and returns their contents
    /// concatenated bottom to top.
    pub fn take_above(&mut self, depth: usize) -> String {
        if self.slots.len() <= depth + 1 {
            return String::new();
        }
        self.slots.drain(depth + 1..).collect()
    }

    pub fn store(&mut self, depth: usize, line: String) {
        if let Some(slot) = self.slots.get_mut(depth) {
            *slot = line;
        }
    }

    pub fn pop(&mut self) -> Option<String> {
        self.slots.pop()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

// ============================================================================
// EXPANSION
// ============================================================================

impl Interpreter<'_> {
    /// Expands a native line and either writes it to the output sink or,
    /// when called from inside another expansion, leaves it on the stack
    /// for the enclosing line.
    pub(crate) fn expand_native(
        &mut self,
        text: &str,
        span: Span,
        env: &Env,
    ) -> Result<(), PretextError> {
        let depth = self.natives.push();
        let escape = self.config.escape;
        let mut line = text.to_string();

        let trimmed = line.trim_end();
        if !trimmed.is_empty() {
            if let Some(stripped) = trimmed.strip_suffix(escape) {
                line = stripped.to_string();
            }

            // Bytes of `line` before this offset are still the source text
            // at `span.start`.
            let mut pristine = line.len();
            let mut limit = line.len();
            while let Some(beg) = line[..limit].rfind(escape) {
                let open = beg + escape.len_utf8();
                if !line[open..].starts_with('(') {
                    limit = beg;
                    continue;
                }
                let location = if beg < pristine {
                    span.start + beg
                } else {
                    span.start + pristine
                };
                let Some(close) = matching_paren(&line, open) else {
                    return Err(err_ctx!(
                        Eval,
                        "Unbalanced parentheses in escape expression",
                        Span::new(location, location + (line.len() - beg)),
                        format!("close the expression opened by `{}(`", escape)
                    ));
                };

                let code = &line[open + 1..close];
                let base = if close < pristine {
                    span.start + open + 1
                } else {
                    location
                };
                debug!("lexing escape expression {:?}", code);
                let expr = parse_escape_expression(code, escape, base)?;
                let value = self.eval(&expr, env)?;

                let impure = expr.value.is_application() && self.natives.has_nested(depth);
                let mut replacement = if impure {
                    String::new()
                } else {
                    value.to_string()
                };
                replacement.push_str(&self.natives.take_above(depth));
                trace!("splicing {:?} over {:?}", replacement, &line[beg..=close]);

                line.replace_range(beg..=close, &replacement);
                pristine = pristine.min(beg);
                limit = line.len();
            }
        }

        if depth == 0 {
            debug!("flushing native line ({} bytes)", line.len());
            self.natives.pop();
            self.output
                .emit(&line)
                .map_err(|e| PretextError::io("Failed to write output", e))
        } else {
            self.natives.store(depth, line);
            Ok(())
        }
    }
}

/// Byte index of the `)` matching the `(` at `open`.
fn matching_paren(line: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in line[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::OutputBuffer;
    use crate::config::EngineConfig;
    use crate::diagnostics::ErrorType;
    use crate::runtime::value::Value;

    fn expand(text: &str, env: &Env) -> Result<String, PretextError> {
        let mut out = OutputBuffer::new();
        let mut interp = Interpreter::new(EngineConfig::default(), &mut out);
        interp.expand_native(text, Span::new(0, text.len()), env)?;
        drop(interp);
        Ok(out.buffer)
    }

    #[test]
    fn stack_drains_bottom_to_top() {
        let mut stack = NativeStack::default();
        let d = stack.push();
        let inner = stack.push();
        stack.store(inner, "a".to_string());
        let top = stack.push();
        stack.store(top, "b".to_string());
        assert!(stack.has_nested(d));
        assert_eq!(stack.take_above(d), "ab");
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.take_above(d), "");
    }

    #[test]
    fn trailing_escape_removes_the_line_break() {
        let env = Env::root();
        assert_eq!(expand("Result: $(1 + 2)$\n", &env).unwrap(), "Result: 3");
        assert_eq!(expand("Result: $(1 + 2)\n", &env).unwrap(), "Result: 3\n");
    }

    #[test]
    fn lone_escape_characters_are_literal() {
        let env = Env::root();
        assert_eq!(expand("costs $5 or $(2 * 3)\n", &env).unwrap(), "costs $5 or 6\n");
    }

    #[test]
    fn rightmost_expression_expands_first() {
        let env = Env::root();
        env.bind_local("x", Value::number(1.0));
        assert_eq!(
            expand("$(x) $(x = x + 1)\n", &env).unwrap(),
            "2 2\n"
        );
    }

    #[test]
    fn nested_parentheses() {
        let env = Env::root();
        assert_eq!(expand("<$((1 + 2) * (3))>\n", &env).unwrap(), "<9>\n");
    }

    #[test]
    fn whitespace_only_lines_pass_through() {
        let env = Env::root();
        assert_eq!(expand("   \n", &env).unwrap(), "   \n");
    }

    #[test]
    fn unbalanced_expression_is_an_error() {
        let err = expand("oops $(1 + 2\n", &Env::root()).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Eval);
        assert_eq!(err.span().map(|s| s.start), Some(5));
    }

    #[test]
    fn errors_point_into_the_line() {
        let err = expand("ab $(nope)\n", &Env::root()).unwrap_err();
        assert_eq!(err.span(), Some(Span::new(5, 9)));
    }
}
