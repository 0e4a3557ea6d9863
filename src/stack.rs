//! This module defines call frames and the bounded LIFO call stack. Each
//! frame owns its own flag map; frames never see each other's flags except
//! through the explicit parameter copy performed at call time.

use crate::types::RuntimeError;
use std::collections::HashMap;

/// One activation record: the function being executed, its local flag
/// bindings (name -> absolute tape position), and its current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub function: String,
    pub flags: HashMap<String, usize>,
    pub state: String,
}

impl Frame {
    pub fn new(
        function: impl Into<String>,
        flags: HashMap<String, usize>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            function: function.into(),
            flags,
            state: state.into(),
        }
    }

    /// Looks up a flag's recorded tape position.
    pub fn flag(&self, name: &str) -> Result<usize, RuntimeError> {
        self.flags
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::UndefinedFlag(name.to_string()))
    }

    /// Records a tape position under `name`, replacing any previous binding.
    pub fn set_flag(&mut self, name: &str, position: usize) {
        self.flags.insert(name.to_string(), position);
    }
}

/// A bounded LIFO stack of call frames. The bottom frame is always the entry
/// function; the stack is empty only once the program has terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStack {
    frames: Vec<Frame>,
    max_size: usize,
}

impl CallStack {
    pub fn new(max_size: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_size,
        }
    }

    /// Pushes a frame, failing once the stack holds `max_size` frames.
    pub fn push(&mut self, frame: Frame) -> Result<(), RuntimeError> {
        if self.frames.len() == self.max_size {
            return Err(RuntimeError::StackOverflow(self.max_size));
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Removes and returns the active frame.
    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// The active frame, if any.
    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Mutable access to the active frame's state and flags.
    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(name: &str) -> Frame {
        Frame::new(name, HashMap::new(), "start")
    }

    #[test]
    fn test_push_pop_order() {
        let mut stack = CallStack::new(4);
        stack.push(frame("main")).unwrap();
        stack.push(frame("helper")).unwrap();

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.top().unwrap().function, "helper");

        let popped = stack.pop().unwrap();
        assert_eq!(popped.function, "helper");
        assert_eq!(stack.top().unwrap().function, "main");
    }

    #[test]
    fn test_push_past_capacity() {
        let mut stack = CallStack::new(2);
        stack.push(frame("main")).unwrap();
        stack.push(frame("a")).unwrap();

        assert_eq!(
            stack.push(frame("b")),
            Err(RuntimeError::StackOverflow(2))
        );
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_frame_flags() {
        let mut frame = frame("main");
        assert_eq!(
            frame.flag("a"),
            Err(RuntimeError::UndefinedFlag("a".to_string()))
        );

        frame.set_flag("a", 5);
        assert_eq!(frame.flag("a"), Ok(5));

        frame.set_flag("a", 7);
        assert_eq!(frame.flag("a"), Ok(7));
    }

    #[test]
    fn test_top_mut_updates_state() {
        let mut stack = CallStack::new(4);
        stack.push(frame("main")).unwrap();

        stack.top_mut().unwrap().state = "next".to_string();
        assert_eq!(stack.top().unwrap().state, "next");
    }
}
