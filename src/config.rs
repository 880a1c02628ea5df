//! Engine configuration.
//!
//! Defaults reproduce the classic behaviour. A YAML file may override any
//! field, and the CLI applies its flags on top of that.
//!
//! ```yaml
//! escape: "%"
//! frames: per_call
//! max_depth: 64
//! ```

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::diagnostics::PretextError;
use crate::syntax::token::{OPERATORS, PUNCTUATION};

pub const DEFAULT_ESCAPE: char = '$';
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Where a macro call binds its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramePolicy {
    /// Every call reuses the scope captured at definition time. A call made
    /// while another call of the same macro is running overwrites the outer
    /// call's parameters.
    #[default]
    Shared,
    /// Every call gets a fresh child of the captured scope.
    PerCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Introduces escape expressions in native text and native lines inside
    /// macro bodies.
    pub escape: char,
    pub frames: FramePolicy,
    /// Maximum nesting of macro invocations.
    pub max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            escape: DEFAULT_ESCAPE,
            frames: FramePolicy::Shared,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml(text: &str) -> Result<Self, PretextError> {
        let config: EngineConfig = serde_yaml::from_str(text).map_err(|e| {
            PretextError::io(
                "Invalid configuration",
                io::Error::new(io::ErrorKind::InvalidData, e),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, PretextError> {
        let text = fs::read_to_string(path).map_err(|e| {
            PretextError::io(format!("Failed to read config {}", path.display()), e)
        })?;
        Self::from_yaml(&text)
    }

    /// Rejects escape characters the lexer could not tell apart from code.
    pub fn validate(&self) -> Result<(), PretextError> {
        let c = self.escape;
        let clashes = c.is_alphanumeric()
            || c.is_whitespace()
            || matches!(c, '"' | '_' | '#' | '(')
            || PUNCTUATION.contains(&c)
            || OPERATORS.iter().any(|op| op.starts_with(c));
        if clashes {
            return Err(PretextError::io(
                "Invalid configuration",
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("`{}` cannot be used as the escape character", c),
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorType;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.escape, '$');
        assert_eq!(config.frames, FramePolicy::Shared);
        assert_eq!(config.max_depth, 200);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = EngineConfig::from_yaml("frames: per_call\n").unwrap();
        assert_eq!(config.frames, FramePolicy::PerCall);
        assert_eq!(config.escape, '$');
        assert_eq!(config.max_depth, 200);
    }

    #[test]
    fn full_yaml() {
        let config = EngineConfig::from_yaml("escape: \"%\"\nmax_depth: 8\n").unwrap();
        assert_eq!(config.escape, '%');
        assert_eq!(config.max_depth, 8);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = EngineConfig::from_yaml("escpae: \"%\"\n").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Io);
    }

    #[test]
    fn letters_cannot_escape() {
        let config = EngineConfig {
            escape: 'x',
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(EngineConfig::from_yaml("escape: \"(\"\n").is_err());
        assert!(EngineConfig::from_yaml("escape: \"+\"\n").is_err());
    }
}
