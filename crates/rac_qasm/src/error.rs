//! QASM front-end errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QasmError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported gate '{0}' on {1} qubits")]
    UnsupportedGate(String, usize),

    #[error("Extraction error: {0}")]
    Extract(String),

    #[error(transparent)]
    Core(#[from] rac_core::RacError),
}

pub type Result<T> = std::result::Result<T, QasmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = QasmError::UnsupportedGate("ccx".to_string(), 3);
        assert!(err.to_string().contains("ccx"));
    }
}
