//! Abstract syntax of the supported OpenQASM 2.0 subset.

/// A parsed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct QasmProgram {
    pub version: Option<String>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    QReg { name: String, size: usize },
    CReg { name: String, size: usize },
    /// A gate application; parameters are parsed but not evaluated.
    GateCall {
        name: String,
        params: Vec<String>,
        args: Vec<Argument>,
    },
    Measure { qubit: Argument, target: Argument },
    Reset { qubit: Argument },
    Barrier { args: Vec<Argument> },
    /// A user gate definition; the body is skipped, only the name is kept
    /// so redefinitions can be diagnosed.
    GateDef { name: String },
}

/// A register reference, optionally indexed.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Whole(String),
    Indexed(String, usize),
}

impl Argument {
    pub fn register(&self) -> &str {
        match self {
            Self::Whole(name) | Self::Indexed(name, _) => name,
        }
    }
}
