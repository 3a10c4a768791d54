//! CZ interaction extraction.
//!
//! Mirrors a transpilation into the `{cz, rx, ry, rz, h, t}` basis: each
//! two-qubit gate is replaced by the interaction pairs of its CZ-basis
//! decomposition and every single-qubit remainder is dropped.

use crate::ast::{Argument, QasmProgram, Statement};
use crate::error::{QasmError, Result};
use rac_core::Program;
use std::collections::HashMap;

/// How many CZ interactions a supported gate contributes.
fn cz_count(name: &str) -> Option<usize> {
    match name {
        // single-qubit gates are broadcast, not routed
        "h" | "x" | "y" | "z" | "s" | "sdg" | "t" | "tdg" | "id" | "sx" | "sxdg" | "rx" | "ry"
        | "rz" | "p" | "u" | "u1" | "u2" | "u3" => Some(0),
        // one CX-class interaction
        "cx" | "cz" | "cy" | "ch" => Some(1),
        // swap is three alternating interactions
        "swap" => Some(3),
        _ => None,
    }
}

/// Reduces a parsed program to its ordered CZ interaction pairs.
pub fn extract_interactions(ast: &QasmProgram) -> Result<Program> {
    let mut registers: HashMap<&str, (usize, usize)> = HashMap::new();
    let mut total_qubits = 0usize;
    for stmt in &ast.statements {
        if let Statement::QReg { name, size } = stmt {
            if registers.insert(name.as_str(), (total_qubits, *size)).is_some() {
                return Err(QasmError::Extract(format!("duplicate qreg '{name}'")));
            }
            total_qubits += size;
        }
    }
    if total_qubits == 0 {
        return Err(QasmError::Extract("no quantum registers declared".into()));
    }

    let resolve = |arg: &Argument| -> Result<usize> {
        let (start, size) = registers
            .get(arg.register())
            .ok_or_else(|| QasmError::Extract(format!("undefined qreg '{}'", arg.register())))?;
        match arg {
            Argument::Indexed(name, idx) => {
                if idx >= size {
                    return Err(QasmError::Extract(format!(
                        "index {idx} out of bounds for qreg '{name}' of size {size}"
                    )));
                }
                Ok(start + idx)
            }
            Argument::Whole(name) => {
                if *size == 1 {
                    Ok(*start)
                } else {
                    Err(QasmError::Extract(format!(
                        "register '{name}' of size {size} used without index"
                    )))
                }
            }
        }
    };

    let mut pairs: Vec<(usize, usize)> = Vec::new();
    for stmt in &ast.statements {
        let (name, args) = match stmt {
            Statement::GateCall { name, args, .. } => (name, args),
            _ => continue,
        };
        match cz_count(name) {
            Some(0) => {}
            Some(n) => {
                if args.len() != 2 {
                    return Err(QasmError::UnsupportedGate(name.clone(), args.len()));
                }
                let a = resolve(&args[0])?;
                let b = resolve(&args[1])?;
                for _ in 0..n {
                    pairs.push((a, b));
                }
            }
            None => return Err(QasmError::UnsupportedGate(name.clone(), args.len())),
        }
    }

    Ok(Program::from_pairs(pairs, Some(total_qubits))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_qasm_str;

    #[test]
    fn test_registers_are_flattened() {
        let ast = parse_qasm_str("qreg a[2]; qreg b[2]; cx a[1], b[0];").unwrap();
        let program = extract_interactions(&ast).unwrap();
        assert_eq!(program.num_qubits, 4);
        assert_eq!((program.gates[0].q0, program.gates[0].q1), (1, 2));
    }

    #[test]
    fn test_controlled_phase_is_rejected() {
        let ast = parse_qasm_str("qreg q[2]; crz(0.5) q[0], q[1];").unwrap();
        assert!(matches!(
            extract_interactions(&ast),
            Err(QasmError::UnsupportedGate(name, 2)) if name == "crz"
        ));
    }

    #[test]
    fn test_out_of_bounds_index() {
        let ast = parse_qasm_str("qreg q[2]; cx q[0], q[5];").unwrap();
        assert!(extract_interactions(&ast).is_err());
    }

    #[test]
    fn test_whole_register_two_qubit_rejected() {
        let ast = parse_qasm_str("qreg q[2]; qreg r[2]; cx q, r;").unwrap();
        assert!(extract_interactions(&ast).is_err());
    }

    #[test]
    fn test_no_registers_rejected() {
        let ast = parse_qasm_str("creg c[2];").unwrap();
        assert!(extract_interactions(&ast).is_err());
    }
}
