//! OpenQASM 2.0 front end for RAC.
//!
//! The compiler only routes two-qubit interactions, so this crate reduces
//! a parsed circuit to its CZ-class interaction pairs: every supported
//! two-qubit gate contributes the pairs of its CZ-basis decomposition, in
//! program order, and single-qubit gates are dropped (they are broadcast,
//! not routed).

pub mod ast;
pub mod error;
pub mod extract;
pub mod parser;
pub mod preprocessor;

pub use error::{QasmError, Result};
pub use extract::extract_interactions;
pub use parser::parse_qasm_str;
pub use preprocessor::resolve_includes;

use rac_core::Program;

/// Parses OpenQASM source and returns the CZ interaction program.
pub fn parse_program(source: &str) -> Result<Program> {
    let ast = parse_qasm_str(source)?;
    extract_interactions(&ast)
}
