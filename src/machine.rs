//! This module implements the interpreter. A `Machine` owns the tape and the
//! call stack and executes one transition per step against an immutable
//! `Program`. All console traffic goes through the `Console` trait so hosts
//! decide how prompts, output, and traces reach the user.

use crate::stack::{CallStack, Frame};
use crate::tape::Tape;
use crate::types::{
    Cell, Direction, FtmError, Instruction, Pattern, Program, RuntimeError, SemanticError,
    Settings, MAIN_FUNCTION,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, VecDeque};

lazy_static! {
    static ref BITS_RE: Regex = Regex::new(r"^[01]*$").unwrap();
}

/// Host-side I/O collaborator.
///
/// `print` emits one line of program output. `trace` emits one line of
/// diagnostic output (tape/state snapshots). `read_line` shows `prompt` and
/// returns the next input line, or `None` when no more input is available.
pub trait Console {
    fn print(&mut self, text: &str);
    fn trace(&mut self, text: &str);
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

/// An in-memory console backed by queues, used by tests and embedders.
#[derive(Debug, Default)]
pub struct BufferedConsole {
    inputs: VecDeque<String>,
    /// Lines emitted by `print_str`/`print_val`, in order.
    pub output: Vec<String>,
    /// Trace lines, in order.
    pub traces: Vec<String>,
    /// Every prompt shown, including retry prompts.
    pub prompts: Vec<String>,
}

impl BufferedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a console that will answer input requests from `inputs`.
    pub fn with_inputs<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

impl Console for BufferedConsole {
    fn print(&mut self, text: &str) {
        self.output.push(text.to_string());
    }

    fn trace(&mut self, text: &str) {
        self.traces.push(text.to_string());
    }

    fn read_line(&mut self, prompt: &str) -> Option<String> {
        self.prompts.push(prompt.to_string());
        self.inputs.pop_front()
    }
}

/// Result of a single dispatch step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Running,
    Halted,
}

/// The interpreter: a tape, a call stack, and a dispatch loop over the
/// program's transition tables.
#[derive(Debug)]
pub struct Machine<'a> {
    program: &'a Program,
    settings: Settings,
    tape: Tape,
    stack: CallStack,
}

impl<'a> Machine<'a> {
    /// Creates a machine positioned at the entry function's initial state
    /// with a fresh single-cell tape.
    pub fn new(program: &'a Program, settings: Settings) -> Result<Self, FtmError> {
        let main = program
            .get(MAIN_FUNCTION)
            .ok_or(SemanticError::MainUndefined)?;

        let tape = Tape::new(settings.max_tape_size);
        let mut stack = CallStack::new(settings.max_stack_size);
        stack.push(Frame::new(
            MAIN_FUNCTION,
            HashMap::new(),
            main.initial_state.clone(),
        ))?;

        Ok(Self {
            program,
            settings,
            tape,
            stack,
        })
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Runs the machine until the bottom frame returns.
    pub fn run(&mut self, console: &mut dyn Console) -> Result<(), FtmError> {
        while self.step(console)? == Step::Running {}
        Ok(())
    }

    /// Dispatches and executes one transition.
    ///
    /// A missing transition is an implicit return: the active frame is popped
    /// and the caller resumes at the state recorded when it made the call.
    /// Popping the last frame halts the machine.
    pub fn step(&mut self, console: &mut dyn Console) -> Result<Step, FtmError> {
        let (function_name, state) = match self.stack.top() {
            Some(frame) => (frame.function.clone(), frame.state.clone()),
            None => return Ok(Step::Halted),
        };

        let function = self
            .program
            .get(&function_name)
            .ok_or_else(|| RuntimeError::UndefinedFunction(function_name.clone()))?;

        let instruction = match function.transition(&state, self.tape.selected()) {
            Some(transition) => transition.instruction.clone(),
            None => {
                self.stack.pop();
                return Ok(if self.stack.is_empty() {
                    Step::Halted
                } else {
                    Step::Running
                });
            }
        };

        if self.settings.trace_state {
            console.trace(&format!("{} Next state: {}", self.tape, state));
        } else if self.settings.trace_tape {
            console.trace(&self.tape.to_string());
        }

        self.execute(instruction, console)?;
        Ok(Step::Running)
    }

    fn execute(
        &mut self,
        instruction: Instruction,
        console: &mut dyn Console,
    ) -> Result<(), FtmError> {
        match instruction {
            Instruction::Move {
                write,
                direction,
                count,
                fill,
                next_state,
            } => {
                if let Pattern::Cell(value) = write {
                    self.tape.set_selected(value);
                }
                self.tape.shift(direction, count, fill)?;
                self.set_state(next_state)?;
            }
            Instruction::Flag { name, next_state } => {
                let position = self.tape.position();
                let frame = self.active()?;
                frame.set_flag(&name, position);
                frame.state = next_state;
            }
            Instruction::Goto { name, next_state } => {
                let position = self.active()?.flag(&name)?;
                self.tape.set_position(position)?;
                match next_state {
                    Some(state) => self.active()?.state = state,
                    // A `*` next state leaves no state to resume in, so the
                    // frame returns after the jump.
                    None => {
                        self.stack.pop();
                    }
                }
            }
            Instruction::If {
                flag,
                true_state,
                false_state,
            } => {
                let position = self.active()?.flag(&flag)?;
                let target = if position == self.tape.position() {
                    true_state
                } else {
                    false_state
                };
                self.active()?.state = target;
            }
            Instruction::Input {
                min,
                max,
                prompt,
                next_state,
            } => {
                // Each accepted bit lands on the tape followed by a one-cell
                // shift right, leaving the cursor past the written run.
                for bit in self.read_bits(min, max, &prompt, console)? {
                    self.tape.set_selected(bit);
                    self.tape.shift(Direction::Right, 1, Pattern::Any)?;
                }
                self.set_state(next_state)?;
            }
            Instruction::PrintStr { text, next_state } => {
                console.print(&text);
                self.active()?.state = next_state;
            }
            Instruction::PrintVal { flags, next_state } => {
                let text = self.render_values(&flags)?;
                console.print(&text);
                self.active()?.state = next_state;
            }
            Instruction::Call {
                function,
                args,
                next_state,
            } => {
                let callee = self
                    .program
                    .get(&function)
                    .ok_or_else(|| RuntimeError::UndefinedFunction(function.clone()))?;
                if args.len() != callee.parameters.len() {
                    return Err(RuntimeError::ArityMismatch(function).into());
                }
                let parameters = callee.parameters.clone();
                let initial_state = callee.initial_state.clone();

                // The caller's resume state is recorded before the push, so
                // the implicit return lands there.
                self.set_state(next_state)?;

                let caller = self.active()?;
                let mut flags = HashMap::new();
                for (parameter, arg) in parameters.into_iter().zip(&args) {
                    flags.insert(parameter, caller.flag(arg)?);
                }
                self.stack.push(Frame::new(function, flags, initial_state))?;
            }
        }
        Ok(())
    }

    /// Applies a next-state slot; `None` (the `*` wildcard) keeps the state.
    fn set_state(&mut self, next_state: Option<String>) -> Result<(), FtmError> {
        if let Some(state) = next_state {
            self.active()?.state = state;
        }
        Ok(())
    }

    fn active(&mut self) -> Result<&mut Frame, FtmError> {
        self.stack
            .top_mut()
            .ok_or(FtmError::Runtime(RuntimeError::NoActiveFrame))
    }

    /// Prompts until the console yields a bit string whose length falls in
    /// `min..=max`. Exhausted input is a runtime error.
    fn read_bits(
        &self,
        min: usize,
        max: usize,
        prompt: &str,
        console: &mut dyn Console,
    ) -> Result<Vec<Cell>, FtmError> {
        let mut line = console.read_line(&format!("{prompt} "));
        loop {
            match line {
                Some(ref text) if is_valid_input(text, min, max) => {
                    return Ok(text.chars().filter_map(Cell::from_char).collect());
                }
                Some(_) => line = console.read_line(&retry_prompt(min, max)),
                None => return Err(RuntimeError::InvalidInput { min, max }.into()),
            }
        }
    }

    /// Renders a `print_val` payload: the selected cell, the cell at one
    /// flag, or the half-open run between two flags.
    fn render_values(&mut self, flags: &[String]) -> Result<String, FtmError> {
        match flags {
            [] => Ok(self.tape.selected().to_string()),
            [single] => {
                let position = self.active()?.flag(single)?;
                Ok(self.tape.value_at(position)?.to_string())
            }
            [first, second, ..] => {
                let frame = self.active()?;
                let start = frame.flag(first)?;
                let end = frame.flag(second)?;
                if start >= end {
                    return Err(
                        RuntimeError::FlagOrder(first.clone(), second.clone()).into()
                    );
                }

                let mut text = String::with_capacity(end - start);
                for position in start..end {
                    text.push(self.tape.value_at(position)?.as_char());
                }
                Ok(text)
            }
        }
    }
}

fn is_valid_input(text: &str, min: usize, max: usize) -> bool {
    BITS_RE.is_match(text) && (min..=max).contains(&text.len())
}

fn retry_prompt(min: usize, max: usize) -> String {
    if min == max {
        if min == 1 {
            "ERROR: Enter a 0 or a 1: ".to_string()
        } else {
            format!("ERROR: Enter exactly {min} 0s and 1s: ")
        }
    } else {
        format!("ERROR: Enter between {min} and {max} 0s and 1s: ")
    }
}
