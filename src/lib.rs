//! This crate provides the core logic for the Functional Turing Machine
//! language: a binary-tape machine programmed through named functions with
//! per-call flag state. It includes modules for parsing scripts, statically
//! analyzing them, executing them on a bounded tape and call stack, and
//! managing a collection of embedded demo scripts.

pub mod analyzer;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod programs;
pub mod stack;
pub mod tape;
pub mod types;

/// Re-exports the `analyze` function from the analyzer module.
pub use analyzer::analyze;
/// Re-exports the `ScriptLoader` struct from the loader module.
pub use loader::ScriptLoader;
/// Re-exports the interpreter and its console collaborators from the machine module.
pub use machine::{BufferedConsole, Console, Machine, Step};
/// Re-exports the `parse` function from the parser module.
pub use parser::parse;
/// Re-exports the demo registry from the programs module.
pub use programs::{DemoProgram, ProgramManager, DEMOS};
/// Re-exports the call-stack types from the stack module.
pub use stack::{CallStack, Frame};
/// Re-exports the `Tape` struct from the tape module.
pub use tape::Tape;
/// Re-exports the core value, program, settings, and error types.
pub use types::{
    Cell, Direction, FtmError, Function, Instruction, Pattern, Program, RuntimeError,
    SemanticError, Settings, SyntaxError, Transition, DEFAULT_MAX_STACK_SIZE,
    DEFAULT_MAX_TAPE_SIZE,
};
