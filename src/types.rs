//! This module defines the core data structures and types used throughout the FTM
//! interpreter, including the cell/pattern value model, compiled program representation,
//! interpreter settings, and error types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The default maximum number of tape cells.
pub const DEFAULT_MAX_TAPE_SIZE: usize = 10000;
/// The default maximum call-stack depth.
pub const DEFAULT_MAX_STACK_SIZE: usize = 1000;
/// The entry function every script must define.
pub const MAIN_FUNCTION: &str = "main";
/// Names reserved for builtin operations. User functions may not shadow them.
pub const BUILTIN_NAMES: [&str; 7] = [
    "flag",
    "goto",
    "if",
    "input",
    "print_str",
    "print",
    "print_val",
];

/// A concrete tape cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    Zero,
    One,
}

impl Cell {
    /// Returns the digit character for this cell.
    pub fn as_char(self) -> char {
        match self {
            Cell::Zero => '0',
            Cell::One => '1',
        }
    }

    /// Parses a digit character into a cell.
    pub fn from_char(c: char) -> Option<Cell> {
        match c {
            '0' => Some(Cell::Zero),
            '1' => Some(Cell::One),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A cell pattern: a concrete value or the `*` wildcard.
///
/// Patterns appear in transition keys (where `*` matches any cell) and in the
/// write/fill slots of move instructions (where `*` means "leave unchanged").
/// They never appear on the tape itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pattern {
    Cell(Cell),
    Any,
}

impl Pattern {
    /// Parses a `0`, `1`, or `*` character into a pattern.
    pub fn from_char(c: char) -> Option<Pattern> {
        match c {
            '*' => Some(Pattern::Any),
            _ => Cell::from_char(c).map(Pattern::Cell),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Cell(cell) => write!(f, "{cell}"),
            Pattern::Any => write!(f, "*"),
        }
    }
}

/// Represents the possible directions the tape cursor can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Move the cursor towards position 0.
    Left,
    /// Move the cursor towards the end of the tape.
    Right,
    /// Keep the cursor in the same position.
    Stay,
}

/// A single executable operation, produced by the parser and matched
/// exhaustively by the interpreter.
///
/// `next_state: Option<String>` slots encode the `*` wildcard as `None`,
/// meaning "keep the current state". Instructions whose grammar never allows
/// a wildcard carry a plain `String`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Optionally overwrite the selected cell, then move the cursor.
    Move {
        write: Pattern,
        direction: Direction,
        count: usize,
        fill: Pattern,
        next_state: Option<String>,
    },
    /// Record the current cursor position under a name in the active frame.
    Flag { name: String, next_state: String },
    /// Move the cursor to a previously recorded flag's position.
    Goto {
        name: String,
        next_state: Option<String>,
    },
    /// Branch on whether the named flag equals the current cursor position.
    If {
        flag: String,
        true_state: String,
        false_state: String,
    },
    /// Request a bit string from the outside world and write it to the tape.
    Input {
        min: usize,
        max: usize,
        prompt: String,
        next_state: Option<String>,
    },
    /// Emit a literal line of text.
    PrintStr { text: String, next_state: String },
    /// Emit the selected cell, the cell at one flag, or the cells in a
    /// two-flag half-open range.
    PrintVal {
        flags: Vec<String>,
        next_state: String,
    },
    /// Call a user-defined function, passing flags by value.
    Call {
        function: String,
        args: Vec<String>,
        next_state: Option<String>,
    },
}

/// An instruction together with the 1-indexed script line it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub instruction: Instruction,
    pub line: u32,
}

/// Key of a function's transition table: `(state, value-pattern)`.
pub type TransitionKey = (String, Pattern);

/// A named subroutine: its parameters, initial state, and transition table.
///
/// Built once by the parser and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<String>,
    pub initial_state: String,
    pub transitions: HashMap<TransitionKey, Transition>,
}

impl Function {
    /// Resolves the transition for `(state, value)`. A wildcard-value entry
    /// takes priority; the exact-value entry is consulted only when no
    /// wildcard entry exists for that state.
    pub fn transition(&self, state: &str, value: Cell) -> Option<&Transition> {
        self.transitions
            .get(&(state.to_string(), Pattern::Any))
            .or_else(|| self.transitions.get(&(state.to_string(), Pattern::Cell(value))))
    }
}

/// The function registry produced by compiling a script: an immutable table
/// of named functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub functions: HashMap<String, Function>,
}

impl Program {
    /// Looks up a function by name.
    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }
}

/// Interpreter configuration, constructed once and passed to `Machine::new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Maximum number of tape cells.
    pub max_tape_size: usize,
    /// Maximum call-stack depth.
    pub max_stack_size: usize,
    /// Emit a tape snapshot before every executed instruction.
    pub trace_tape: bool,
    /// Emit a tape snapshot plus the pending state before every executed instruction.
    pub trace_state: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_tape_size: DEFAULT_MAX_TAPE_SIZE,
            max_stack_size: DEFAULT_MAX_STACK_SIZE,
            trace_tape: false,
            trace_state: false,
        }
    }
}

/// A script line that matches none of the grammar's line forms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("Invalid expression on line {0}.")]
    InvalidExpression(u32),
    #[error("Expression on line {0} is not inside a function.")]
    OutsideFunction(u32),
}

/// A well-formed line (or whole script) that is semantically inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("Unable to re-define builtin function \"!{name}\" on line {line}.")]
    BuiltinRedefined { name: String, line: u32 },
    #[error("Repeated function name on line {0}.")]
    DuplicateFunction(u32),
    #[error("Repeated parameter name on line {0}.")]
    DuplicateParameter(u32),
    #[error("Main function on line {0} must not take any parameters.")]
    MainWithParameters(u32),
    #[error("No main function specified.")]
    MainUndefined,
    #[error("Repeated expression on line {0}.")]
    DuplicateTransition(u32),
    #[error("Incorrect syntax for executing builtin function \"!{name}\" on line {line}.")]
    BuiltinCallSyntax { name: String, line: u32 },
    #[error("Incorrect number of arguments for function \"!{name}\" on line {line}.")]
    BuiltinArity { name: String, line: u32 },
    #[error("The minimum input count was 0 and the maximum input count was not specified on line {0}.")]
    InputWithoutBound(u32),
    #[error("The maximum input count is less than the minimum input count on line {0}.")]
    InputBoundsReversed(u32),
    #[error("Infinite loop detected on line {0}.")]
    InfiniteLoop(u32),
}

/// A fatal error raised while the machine is running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("Flag name {0} referenced before creation.")]
    UndefinedFlag(String),
    #[error("Invalid function {0}.")]
    UndefinedFunction(String),
    #[error("Incorrect number of arguments for function \"!{0}\".")]
    ArityMismatch(String),
    #[error("Tape has reached its maximum size of {0}.")]
    TapeOverflow(usize),
    #[error("Tape cannot extend below position 0.")]
    TapeUnderflow,
    #[error("Position {0} is out of range of the tape.")]
    PositionOutOfRange(usize),
    #[error("Stack has reached its maximum size of {0}.")]
    StackOverflow(usize),
    #[error("Invalid input: expected between {min} and {max} bits.")]
    InvalidInput { min: usize, max: usize },
    #[error("Flag {0} was not found before flag {1}.")]
    FlagOrder(String, String),
    #[error("No active call frame.")]
    NoActiveFrame,
}

/// Top-level error type covering the whole compile/run pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FtmError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("Semantic error: {0}")]
    Semantic(#[from] SemanticError),
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("File error: {0}")]
    File(String),
}
