//! Evaluation of parsed Pretext programs.

pub mod env;
pub mod eval;
pub mod expand;
pub mod math;
pub mod value;

pub use env::Env;
pub use eval::Interpreter;
pub use value::Value;
