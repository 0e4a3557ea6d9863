//! This module provides static analysis of a parsed program. It verifies the
//! entry point exists and rejects transitions that can be proven to spin
//! forever without touching the tape or the cursor. The check is a
//! conservative per-transition test; loops spanning several states are left
//! to the runtime limits.

use crate::types::{
    Direction, FtmError, Instruction, Pattern, Program, SemanticError, MAIN_FUNCTION,
};

/// Runs all whole-program checks. Called by the parser after the last line.
pub fn analyze(program: &Program) -> Result<(), FtmError> {
    check_main(program)?;
    check_self_loops(program)?;
    Ok(())
}

fn check_main(program: &Program) -> Result<(), FtmError> {
    if program.get(MAIN_FUNCTION).is_none() {
        return Err(SemanticError::MainUndefined.into());
    }
    Ok(())
}

fn check_self_loops(program: &Program) -> Result<(), FtmError> {
    for function in program.functions.values() {
        for ((state, value), transition) in &function.transitions {
            if is_self_loop(state, *value, &transition.instruction) {
                return Err(SemanticError::InfiniteLoop(transition.line).into());
            }
        }
    }
    Ok(())
}

/// True when executing `instruction` from `(state, value)` provably lands
/// back on the same transition with the machine unchanged.
fn is_self_loop(state: &str, value: Pattern, instruction: &Instruction) -> bool {
    let stays = |next: &Option<String>| next.as_deref().map_or(true, |n| n == state);

    match instruction {
        // A stationary move re-enters its own key when the write cannot
        // change the dispatch value: wildcard write, writing the matched
        // value back, or a wildcard key that matches whatever was written.
        Instruction::Move {
            write,
            direction,
            next_state,
            ..
        } => {
            *direction == Direction::Stay
                && stays(next_state)
                && (value == Pattern::Any || *write == Pattern::Any || *write == value)
        }
        // These leave tape and cursor alone, so looping back is always fatal.
        Instruction::Flag { next_state, .. }
        | Instruction::PrintStr { next_state, .. }
        | Instruction::PrintVal { next_state, .. } => next_state == state,
        // Goto moves the cursor, but under a wildcard key the transition
        // re-fires regardless of where the cursor lands. A `*` next state is
        // a return, so only the named-state case loops.
        Instruction::Goto { next_state, .. } => {
            value == Pattern::Any && next_state.as_deref() == Some(state)
        }
        Instruction::Call { next_state, .. } => value == Pattern::Any && stays(next_state),
        Instruction::If {
            true_state,
            false_state,
            ..
        } => true_state == state || false_state == state,
        // Input rewrites the selected cell, but a wildcard key matches the
        // new value too, so staying put re-prompts forever.
        Instruction::Input {
            next_state, ..
        } => value == Pattern::Any && stays(next_state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_stationary_move_rewriting_same_value() {
        // Writes back what it matched and stays put.
        let input = "@main() s\ns 0 0 * s";
        assert_eq!(parse(input), Err(SemanticError::InfiniteLoop(2).into()));
    }

    #[test]
    fn test_stationary_move_with_wildcard_write() {
        let input = "@main() s\ns 0 * * *";
        assert_eq!(parse(input), Err(SemanticError::InfiniteLoop(2).into()));
    }

    #[test]
    fn test_stationary_move_under_wildcard_key() {
        // The wildcard key matches the freshly written 1 again.
        let input = "@main() s\ns * 1 * s";
        assert_eq!(parse(input), Err(SemanticError::InfiniteLoop(2).into()));
    }

    #[test]
    fn test_stationary_move_that_flips_the_value_is_allowed() {
        // `s 0 1 *2 s` rewrites the matched 0 to 1, so the key no longer
        // matches after one firing.
        let input = "@main() s\ns 0 1 *2 s";
        assert!(parse(input).is_ok());
    }

    #[test]
    fn test_moving_self_loop_is_allowed() {
        let input = "@main() s\ns * 1 > s";
        assert!(parse(input).is_ok());
    }

    #[test]
    fn test_flag_looping_back_to_own_state() {
        let input = "@main() s\ns 0 !flag(a) s";
        assert_eq!(parse(input), Err(SemanticError::InfiniteLoop(2).into()));
    }

    #[test]
    fn test_print_str_looping_back_to_own_state() {
        let input = "@main() s\ns 1 !print_str(\"x\") s";
        assert_eq!(parse(input), Err(SemanticError::InfiniteLoop(2).into()));
    }

    #[test]
    fn test_print_val_looping_back_to_own_state() {
        let input = "@main() s\ns 1 !print_val() s";
        assert_eq!(parse(input), Err(SemanticError::InfiniteLoop(2).into()));
    }

    #[test]
    fn test_goto_wildcard_key_looping_back() {
        let input = "@main() s\ns * !goto(a) s";
        assert_eq!(parse(input), Err(SemanticError::InfiniteLoop(2).into()));
    }

    #[test]
    fn test_goto_with_wildcard_next_state_is_allowed() {
        // `*` after a goto returns from the frame rather than looping.
        let input = "@main() s\ns * !goto(a) *";
        assert!(parse(input).is_ok());
    }

    #[test]
    fn test_goto_on_concrete_value_is_allowed() {
        // The jump may land on a cell that breaks the match.
        let input = "@main() s\ns 1 !goto(a) s\ns 0 1 > t";
        assert!(parse(input).is_ok());
    }

    #[test]
    fn test_call_wildcard_self_loop() {
        let input = "@main() s\ns * !f() s\n@f() go\ngo * 1 > done";
        assert_eq!(parse(input), Err(SemanticError::InfiniteLoop(2).into()));
    }

    #[test]
    fn test_if_branching_to_own_state() {
        let input = "@main() s\ns 0 !if(a) s:t";
        assert_eq!(parse(input), Err(SemanticError::InfiniteLoop(2).into()));

        let input = "@main() s\ns 0 !if(a) t:s";
        assert_eq!(parse(input), Err(SemanticError::InfiniteLoop(2).into()));
    }

    #[test]
    fn test_input_wildcard_self_loop() {
        let input = "@main() s\ns * !input(1, \"p\") s";
        assert_eq!(parse(input), Err(SemanticError::InfiniteLoop(2).into()));
    }

    #[test]
    fn test_input_on_concrete_value_is_allowed() {
        // Reading input can rewrite the matched cell.
        let input = "@main() s\ns 0 !input(1, \"p\") s";
        assert!(parse(input).is_ok());
    }
}
