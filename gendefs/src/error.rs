//! Failure taxonomy for a generation run.
//!
//! Every variant is fatal: the run stops and no fragment is published.
//! File and line context is attached by the caller with `anyhow::Context`.

use thiserror::Error;

/// Errors raised while scanning sources or resolving library guards.
#[derive(Debug, Error)]
pub enum Error {
    /// A function marker whose argument list has no matching calling
    /// convention (only 1, 2 or 3 arguments are supported).
    #[error("function `{name}` takes {count} argument(s); only 1, 2 or 3 are supported")]
    UnsupportedArity {
        /// Exported function name (without prefix).
        name: String,
        /// Number of comma-separated arguments found.
        count: usize,
    },

    /// A constant marker with a flag suffix the generator does not know.
    #[error("constant `{name}` uses unsupported flag `EXPCONST{flag}`")]
    UnsupportedConstFlag { name: String, flag: String },

    /// A constant marker whose body is not `[rev,] type NAME`: a missing or
    /// out-of-range OS revision, a missing type or an invalid name.
    #[error("malformed constant marker `EXPCONST{flag}({body})`")]
    MalformedConstant { flag: String, body: String },

    /// A constant marker with a type spelling that has no `SETDICT_*` macro.
    #[error("constant `{name}` has unsupported type `{ty}`")]
    UnsupportedConstType { name: String, ty: String },

    /// `#else`, `#elif` or `#endif` seen while no conditional block is open.
    #[error("conditional directive without matching `#if`")]
    UnbalancedConditional,

    /// End of file reached with conditional blocks still open.
    #[error("{open} conditional block(s) still open at end of file")]
    UnterminatedConditional { open: usize },

    /// A guard expression in the library fragment could not be parsed.
    #[error("cannot evaluate guard `{guard}`")]
    InvalidGuard { guard: String },

    /// A guard compares a symbol other than the configured version symbol.
    #[error("guard refers to unknown symbol `{symbol}`")]
    UnknownGuardSymbol { symbol: String },

    /// A configured marker pattern failed to compile.
    #[error("invalid marker pattern: {0}")]
    Pattern(#[from] regex::Error),
}
