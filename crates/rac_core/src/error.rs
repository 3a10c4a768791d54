//! Error types for RAC.

use thiserror::Error;

/// Unified error type for RAC operations.
#[derive(Error, Debug)]
pub enum RacError {
    // ============ Schema Errors ============
    /// Malformed input that cannot enter the pipeline
    #[error("Schema error: {0}")]
    Schema(String),

    /// Invalid qubit index
    #[error("Invalid qubit index {0}, program has {1} qubits")]
    InvalidQubit(usize, usize),

    /// Two-qubit gate with both operands on the same qubit
    #[error("Degenerate gate: both operands are qubit {0}")]
    DegenerateGate(usize),

    /// The chip does not have a site for every qubit
    #[error("Chip {nx}x{ny} cannot hold {n_q} qubits")]
    ChipTooSmall { nx: usize, ny: usize, n_q: usize },

    // ============ Pipeline Errors ============
    /// Scheduling failure (edge coloring exceeded Vizing's bound)
    #[error("Scheduling error: {0}")]
    Scheduling(String),

    /// Placement failure
    #[error("Placement error: {0}")]
    Placement(String),

    /// Routing failure
    #[error("Routing error: {0}")]
    Routing(String),

    /// External MIS solver failure
    #[error("MIS solver error: {0}")]
    MisSolver(String),

    // ============ Code Generation Errors ============
    /// Geometric precondition violated while building an instruction.
    /// These indicate a compiler bug, not bad input.
    #[error("Geometry violation: {0}")]
    Geometry(String),

    // ============ I/O Errors ============
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for RAC operations.
pub type Result<T> = std::result::Result<T, RacError>;

impl RacError {
    /// Creates a schema error with the given message.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Creates a scheduling error with the given message.
    pub fn scheduling(msg: impl Into<String>) -> Self {
        Self::Scheduling(msg.into())
    }

    /// Creates a placement error with the given message.
    pub fn placement(msg: impl Into<String>) -> Self {
        Self::Placement(msg.into())
    }

    /// Creates a routing error with the given message.
    pub fn routing(msg: impl Into<String>) -> Self {
        Self::Routing(msg.into())
    }

    /// Creates a MIS solver error with the given message.
    pub fn mis_solver(msg: impl Into<String>) -> Self {
        Self::MisSolver(msg.into())
    }

    /// Creates a geometry violation with the given message.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }
}
