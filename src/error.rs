//! Rich diagnostic error types for htn-refine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. The passes assume a referentially
//! consistent domain model; these errors surface the cases where that
//! assumption was broken upstream.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for htn-refine.
#[derive(Debug, Error, Diagnostic)]
pub enum RefineError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Infer(#[from] InferError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Model errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error("unknown task \"{task}\"")]
    #[diagnostic(
        code(htn::model::unknown_task),
        help(
            "A plan step or method refers to a task that is not declared. \
             The loader must hand over a referentially consistent domain."
        )
    )]
    UnknownTask { task: String },

    #[error("unknown method \"{method}\"")]
    #[diagnostic(
        code(htn::model::unknown_method),
        help("The method is not part of the domain the index was built from.")
    )]
    UnknownMethod { method: String },

    #[error("task \"{task}\" has no parameter \"{param}\"")]
    #[diagnostic(
        code(htn::model::unknown_param),
        help("A literal or signature names a parameter the task does not declare.")
    )]
    UnknownParameter { task: String, param: String },

    #[error("method \"{method}\" has no variable \"{var}\"")]
    #[diagnostic(
        code(htn::model::unknown_variable),
        help(
            "Every argument of a plan step, of the decomposed-task binding and of \
             a constraint must be declared in the method's variable list."
        )
    )]
    UnknownVariable { method: String, var: String },

    #[error("variable \"{var}\" of method \"{method}\" is not bound to the decomposed task")]
    #[diagnostic(
        code(htn::model::unbound_variable),
        help(
            "Only variables listed in the method's task arguments can be lifted \
             to the decomposed task's parameters."
        )
    )]
    UnboundVariable { method: String, var: String },

    #[error("unknown sort \"{sort}\"")]
    #[diagnostic(
        code(htn::model::unknown_sort),
        help("Declare the sort together with its instances before running the passes.")
    )]
    UnknownSort { sort: String },

    #[error("plan step \"{step}\" of method \"{method}\" passes {actual} arguments, task expects {expected}")]
    #[diagnostic(
        code(htn::model::arity),
        help("Plan-step arguments are positional with respect to the task's parameters.")
    )]
    ArityMismatch {
        method: String,
        step: String,
        expected: usize,
        actual: usize,
    },

    #[error("integrity violation in \"{entity}\": {message}")]
    #[diagnostic(
        code(htn::model::integrity),
        help("A task or method was constructed inconsistently. This is a bug in the pass that built it.")
    )]
    Integrity { entity: String, message: String },
}

// ---------------------------------------------------------------------------
// Inference errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum InferError {
    #[error("top-level task \"{task}\" does not exist")]
    #[diagnostic(
        code(htn::infer::no_top_task),
        help(
            "The reachability walk starts at the configured top task. \
             Set `top_task` in the configuration to a declared task."
        )
    )]
    UnknownTopTask { task: String },

    #[error("inferred literal {predicate} in method \"{method}\" carries the opaque argument {argument}")]
    #[diagnostic(
        code(htn::infer::opaque_argument),
        help(
            "Placeholders for another method's local variables cannot be turned \
             into precondition arguments. This indicates a bug in the analysis."
        )
    )]
    OpaqueArgument {
        method: String,
        predicate: String,
        argument: String,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(htn::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(htn::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(htn::config::write),
        help("Ensure you have write permissions to the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for the model layer.
pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Convenience alias for inference.
pub type InferResult<T> = std::result::Result<T, InferError>;

/// Convenience alias for configuration handling.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Convenience alias for top-level operations.
pub type RefineResult<T> = std::result::Result<T, RefineError>;
