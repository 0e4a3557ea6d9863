//! This module provides the parser for FTM scripts. The grammar is strictly
//! line-oriented: every non-blank line is either a function header or one
//! transition, so each line is matched against one anchored regex per form
//! and compiled into a `Transition` keyed by `(state, value-pattern)`.
//! Errors carry the offending 1-indexed line number.

use crate::analyzer::analyze;
use crate::types::{
    Direction, FtmError, Function, Instruction, Pattern, Program, SemanticError, SyntaxError,
    Transition, BUILTIN_NAMES, MAIN_FUNCTION,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

/// Identifiers may carry leading digits but must contain a letter or
/// underscore before any trailing digits, so `1` never reads as a state name.
const IDENT: &str = r"\d*[a-zA-Z_]\w*";
/// A possibly-empty comma-separated identifier list.
const IDENT_LIST: &str = r"(?:\d*[a-zA-Z_]\w*(?:\s*,\s*\d*[a-zA-Z_]\w*)*)?";
/// Optional trailing `#` comment.
const COMMENT: &str = r"\s*(?:#.*)?$";

lazy_static! {
    static ref BLANK_RE: Regex = Regex::new(r"^\s*(?:#.*)?$").unwrap();
    static ref HEADER_RE: Regex = Regex::new(&format!(
        r"^\s*@(?P<name>{IDENT})\s*\(\s*(?P<params>{IDENT_LIST})\s*\)\s*(?P<state>{IDENT}){COMMENT}"
    ))
    .unwrap();
    static ref CALL_RE: Regex = Regex::new(&format!(
        r"^\s*(?P<state>{IDENT})\s+(?P<value>[01*])\s+!(?P<function>{IDENT})\s*\(\s*(?P<args>{IDENT_LIST})\s*\)\s+(?P<next>{IDENT}|\*){COMMENT}"
    ))
    .unwrap();
    static ref MOVE_RE: Regex = Regex::new(&format!(
        r"^\s*(?P<state>{IDENT})\s+(?P<value>[01*])\s+(?P<write>[01*])\s+(?P<op>[<>*])(?P<count>[1-9][0-9]*)?(?::(?P<fill>[01*]))?\s+(?P<next>{IDENT}|\*){COMMENT}"
    ))
    .unwrap();
    static ref IF_RE: Regex = Regex::new(&format!(
        r"^\s*(?P<state>{IDENT})\s+(?P<value>[01*])\s+!if\s*\(\s*(?P<flag>{IDENT})\s*\)\s*(?P<true>{IDENT})\s*:\s*(?P<false>{IDENT}){COMMENT}"
    ))
    .unwrap();
    static ref INPUT_RE: Regex = Regex::new(&format!(
        r#"^\s*(?P<state>{IDENT})\s+(?P<value>[01*])\s+!input\s*\(\s*(?P<min>0|[1-9]\d*)\s*(?:,\s*(?P<max>[1-9]\d*)\s*)?,\s*"(?P<prompt>.*)"\s*\)\s*(?P<next>{IDENT}|\*){COMMENT}"#
    ))
    .unwrap();
    static ref PRINT_STR_RE: Regex = Regex::new(&format!(
        r#"^\s*(?P<state>{IDENT})\s+(?P<value>[01*])\s+!(?:print_str|print)\s*\(\s*"(?P<text>.*)"\s*\)\s*(?P<next>{IDENT}){COMMENT}"#
    ))
    .unwrap();
}

/// Compiles a script into a validated `Program`.
///
/// This is the main entry point for compilation. Each line is classified by
/// form, converted into a transition, and checked against the per-line
/// semantic rules; the whole registry is then handed to the analyzer for the
/// entry-point and self-loop checks.
pub fn parse(input: &str) -> Result<Program, FtmError> {
    let mut functions: HashMap<String, Function> = HashMap::new();
    let mut current: Option<String> = None;

    for (index, raw) in input.lines().enumerate() {
        let line = (index + 1) as u32;

        if BLANK_RE.is_match(raw) {
            continue;
        }

        if let Some(caps) = HEADER_RE.captures(raw) {
            let name = caps["name"].to_string();
            parse_header(&mut functions, name.clone(), &caps["params"], &caps["state"], line)?;
            current = Some(name);
            continue;
        }

        // Every remaining form is a transition and needs an open function scope.
        let function = match current.as_ref().and_then(|name| functions.get_mut(name)) {
            Some(function) => function,
            None => return Err(SyntaxError::OutsideFunction(line).into()),
        };

        if let Some(caps) = CALL_RE.captures(raw) {
            let state = caps["state"].to_string();
            let value = pattern(&caps["value"]);
            let next = next_state(&caps["next"]);
            let instruction = parse_call(
                &caps["function"],
                split_names(&caps["args"]),
                next,
                line,
            )?;
            insert(function, state, value, instruction, line)?;
            continue;
        }

        if let Some(caps) = MOVE_RE.captures(raw) {
            let state = caps["state"].to_string();
            let value = pattern(&caps["value"]);
            let write = pattern(&caps["write"]);
            let direction = match &caps["op"] {
                "<" => Direction::Left,
                ">" => Direction::Right,
                _ => Direction::Stay,
            };
            let count = match caps.name("count") {
                Some(m) => m
                    .as_str()
                    .parse::<usize>()
                    .map_err(|_| SyntaxError::InvalidExpression(line))?,
                None => 1,
            };
            let fill = caps.name("fill").map_or(Pattern::Any, |m| pattern(m.as_str()));
            let next_state = next_state(&caps["next"]);

            let instruction = Instruction::Move {
                write,
                direction,
                count,
                fill,
                next_state,
            };
            insert(function, state, value, instruction, line)?;
            continue;
        }

        if let Some(caps) = IF_RE.captures(raw) {
            let state = caps["state"].to_string();
            let value = pattern(&caps["value"]);
            let instruction = Instruction::If {
                flag: caps["flag"].to_string(),
                true_state: caps["true"].to_string(),
                false_state: caps["false"].to_string(),
            };
            insert(function, state, value, instruction, line)?;
            continue;
        }

        if let Some(caps) = INPUT_RE.captures(raw) {
            let state = caps["state"].to_string();
            let value = pattern(&caps["value"]);
            let min = caps["min"]
                .parse::<usize>()
                .map_err(|_| SyntaxError::InvalidExpression(line))?;
            let max = match caps.name("max") {
                Some(m) => {
                    let max = m
                        .as_str()
                        .parse::<usize>()
                        .map_err(|_| SyntaxError::InvalidExpression(line))?;
                    if max < min {
                        return Err(SemanticError::InputBoundsReversed(line).into());
                    }
                    max
                }
                // An omitted maximum means "exactly min", which must be positive.
                None => {
                    if min == 0 {
                        return Err(SemanticError::InputWithoutBound(line).into());
                    }
                    min
                }
            };

            let instruction = Instruction::Input {
                min,
                max,
                prompt: caps["prompt"].to_string(),
                next_state: next_state(&caps["next"]),
            };
            insert(function, state, value, instruction, line)?;
            continue;
        }

        if let Some(caps) = PRINT_STR_RE.captures(raw) {
            let state = caps["state"].to_string();
            let value = pattern(&caps["value"]);
            let instruction = Instruction::PrintStr {
                text: caps["text"].to_string(),
                next_state: caps["next"].to_string(),
            };
            insert(function, state, value, instruction, line)?;
            continue;
        }

        return Err(SyntaxError::InvalidExpression(line).into());
    }

    let program = Program { functions };

    // Whole-program checks: missing main, static self-loop rejection.
    analyze(&program)?;

    Ok(program)
}

/// Opens a new function scope from a `@name(params) state` header.
fn parse_header(
    functions: &mut HashMap<String, Function>,
    name: String,
    params: &str,
    initial_state: &str,
    line: u32,
) -> Result<(), FtmError> {
    if BUILTIN_NAMES.contains(&name.as_str()) {
        return Err(SemanticError::BuiltinRedefined { name, line }.into());
    }
    if functions.contains_key(&name) {
        return Err(SemanticError::DuplicateFunction(line).into());
    }

    let parameters = split_names(params);
    for (i, parameter) in parameters.iter().enumerate() {
        if parameters[..i].contains(parameter) {
            return Err(SemanticError::DuplicateParameter(line).into());
        }
    }
    if name == MAIN_FUNCTION && !parameters.is_empty() {
        return Err(SemanticError::MainWithParameters(line).into());
    }

    functions.insert(
        name.clone(),
        Function {
            name,
            parameters,
            initial_state: initial_state.to_string(),
            transitions: HashMap::new(),
        },
    );

    Ok(())
}

/// Classifies a generic `!name(args)` call line: the `flag`/`goto`/`print_val`
/// builtins, a user call, or a misused dedicated-syntax builtin.
fn parse_call(
    target: &str,
    mut args: Vec<String>,
    next: Option<String>,
    line: u32,
) -> Result<Instruction, FtmError> {
    let arity_error = || SemanticError::BuiltinArity {
        name: target.to_string(),
        line,
    };

    match target {
        // These builtins have dedicated line forms; generic syntax is an error.
        "if" | "input" | "print_str" | "print" => Err(SemanticError::BuiltinCallSyntax {
            name: target.to_string(),
            line,
        }
        .into()),
        "flag" => {
            if args.len() != 1 {
                return Err(arity_error().into());
            }
            // A flag that stays in its own state re-records forever.
            let next = next.ok_or(SemanticError::InfiniteLoop(line))?;
            Ok(Instruction::Flag {
                name: args.remove(0),
                next_state: next,
            })
        }
        "goto" => {
            if args.len() != 1 {
                return Err(arity_error().into());
            }
            Ok(Instruction::Goto {
                name: args.remove(0),
                next_state: next,
            })
        }
        "print_val" => {
            if args.len() > 2 {
                return Err(arity_error().into());
            }
            let next = next.ok_or(SemanticError::InfiniteLoop(line))?;
            Ok(Instruction::PrintVal {
                flags: args,
                next_state: next,
            })
        }
        _ => Ok(Instruction::Call {
            function: target.to_string(),
            args,
            next_state: next,
        }),
    }
}

/// Adds a transition, rejecting a duplicate `(state, value)` key.
fn insert(
    function: &mut Function,
    state: String,
    value: Pattern,
    instruction: Instruction,
    line: u32,
) -> Result<(), FtmError> {
    let key = (state, value);
    if function.transitions.contains_key(&key) {
        return Err(SemanticError::DuplicateTransition(line).into());
    }
    function.transitions.insert(key, Transition { instruction, line });
    Ok(())
}

/// Parses a single `0`/`1`/`*` capture into a pattern.
fn pattern(text: &str) -> Pattern {
    text.chars()
        .next()
        .and_then(Pattern::from_char)
        .unwrap_or(Pattern::Any)
}

/// `*` means "keep the current state".
fn next_state(text: &str) -> Option<String> {
    (text != "*").then(|| text.to_string())
}

/// Splits a comma-separated identifier list, ignoring surrounding whitespace.
fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;

    fn key(state: &str, value: Pattern) -> (String, Pattern) {
        (state.to_string(), value)
    }

    #[test]
    fn test_parse_simple_program() {
        let input = r#"
# Flip the first cell, then fall off the transition table.
@main() start
start 0 !flag(a) next
next 0 1 * start
"#;

        let program = parse(input).unwrap();
        let main = program.get("main").unwrap();

        assert!(main.parameters.is_empty());
        assert_eq!(main.initial_state, "start");
        assert_eq!(main.transitions.len(), 2);

        match &main.transitions[&key("start", Pattern::Cell(Cell::Zero))].instruction {
            Instruction::Flag { name, next_state } => {
                assert_eq!(name, "a");
                assert_eq!(next_state, "next");
            }
            other => panic!("expected a flag instruction, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_function_with_parameters() {
        let input = r#"
@main() start
start * !walk(a, b) done
@walk(left, right) go
go * * >2 stop
"#;

        // `start * !walk(...)` references flags at runtime; parsing only
        // records the call.
        let program = parse(input).unwrap();
        let walk = program.get("walk").unwrap();
        assert_eq!(walk.parameters, vec!["left", "right"]);
        assert_eq!(walk.initial_state, "go");

        match &program.get("main").unwrap().transitions[&key("start", Pattern::Any)].instruction {
            Instruction::Call {
                function,
                args,
                next_state,
            } => {
                assert_eq!(function, "walk");
                assert_eq!(args, &["a", "b"]);
                assert_eq!(next_state.as_deref(), Some("done"));
            }
            other => panic!("expected a call instruction, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_move_forms() {
        let input = r#"
@main() s
s 0 1 > t        # defaults: count 1, wildcard fill
t 0 1 >3:1 u     # explicit count and fill
u 0 1 *2 v       # stay may carry a count
v 1 * <2:0 *     # wildcard write and next state
"#;

        let program = parse(input).unwrap();
        let main = program.get("main").unwrap();

        match &main.transitions[&key("s", Pattern::Cell(Cell::Zero))].instruction {
            Instruction::Move {
                write,
                direction,
                count,
                fill,
                next_state,
            } => {
                assert_eq!(*write, Pattern::Cell(Cell::One));
                assert_eq!(*direction, Direction::Right);
                assert_eq!(*count, 1);
                assert_eq!(*fill, Pattern::Any);
                assert_eq!(next_state.as_deref(), Some("t"));
            }
            other => panic!("expected a move instruction, got {:?}", other),
        }

        match &main.transitions[&key("t", Pattern::Cell(Cell::Zero))].instruction {
            Instruction::Move { count, fill, .. } => {
                assert_eq!(*count, 3);
                assert_eq!(*fill, Pattern::Cell(Cell::One));
            }
            other => panic!("expected a move instruction, got {:?}", other),
        }

        match &main.transitions[&key("u", Pattern::Cell(Cell::Zero))].instruction {
            Instruction::Move {
                direction, count, ..
            } => {
                assert_eq!(*direction, Direction::Stay);
                assert_eq!(*count, 2);
            }
            other => panic!("expected a move instruction, got {:?}", other),
        }

        match &main.transitions[&key("v", Pattern::Cell(Cell::One))].instruction {
            Instruction::Move {
                write, next_state, ..
            } => {
                assert_eq!(*write, Pattern::Any);
                assert_eq!(*next_state, None);
            }
            other => panic!("expected a move instruction, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_dedicated_forms() {
        let input = r#"
@main() s
s 0 !if(mark) yes:no
s 1 !input(2, 4, "Enter bits:") t
t 0 !print_str("hello") u
t 1 !print("alias") u
u * !print_val(a, b) done
"#;

        let program = parse(input).unwrap();
        let main = program.get("main").unwrap();

        match &main.transitions[&key("s", Pattern::Cell(Cell::Zero))].instruction {
            Instruction::If {
                flag,
                true_state,
                false_state,
            } => {
                assert_eq!(flag, "mark");
                assert_eq!(true_state, "yes");
                assert_eq!(false_state, "no");
            }
            other => panic!("expected an if instruction, got {:?}", other),
        }

        match &main.transitions[&key("s", Pattern::Cell(Cell::One))].instruction {
            Instruction::Input {
                min, max, prompt, ..
            } => {
                assert_eq!((*min, *max), (2, 4));
                assert_eq!(prompt, "Enter bits:");
            }
            other => panic!("expected an input instruction, got {:?}", other),
        }

        match &main.transitions[&key("t", Pattern::Cell(Cell::One))].instruction {
            Instruction::PrintStr { text, .. } => assert_eq!(text, "alias"),
            other => panic!("expected a print_str instruction, got {:?}", other),
        }

        match &main.transitions[&key("u", Pattern::Any)].instruction {
            Instruction::PrintVal { flags, .. } => assert_eq!(flags, &["a", "b"]),
            other => panic!("expected a print_val instruction, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_quoted_text_with_embedded_quotes() {
        // The quoted capture is greedy, so inner double quotes survive.
        let input = r#"
@main() s
s 0 !print_str("say "hi"") t
s 1 !input(2, "width "2" bits:") u
"#;

        let program = parse(input).unwrap();
        let main = program.get("main").unwrap();

        match &main.transitions[&key("s", Pattern::Cell(Cell::Zero))].instruction {
            Instruction::PrintStr { text, .. } => assert_eq!(text, "say \"hi\""),
            other => panic!("expected a print_str instruction, got {:?}", other),
        }

        match &main.transitions[&key("s", Pattern::Cell(Cell::One))].instruction {
            Instruction::Input { prompt, .. } => assert_eq!(prompt, "width \"2\" bits:"),
            other => panic!("expected an input instruction, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_input_default_max() {
        let input = r#"
@main() s
s * !input(3, "Enter bits:") t
"#;

        let program = parse(input).unwrap();
        match &program.get("main").unwrap().transitions[&key("s", Pattern::Any)].instruction {
            Instruction::Input { min, max, .. } => assert_eq!((*min, *max), (3, 3)),
            other => panic!("expected an input instruction, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_invalid_expression() {
        let input = "@main() s\ns 0 1 ? t";
        assert_eq!(
            parse(input),
            Err(SyntaxError::InvalidExpression(2).into())
        );
    }

    #[test]
    fn test_parse_expression_outside_function() {
        let input = "s 0 1 > t\n@main() s";
        assert_eq!(parse(input), Err(SyntaxError::OutsideFunction(1).into()));
    }

    #[test]
    fn test_parse_builtin_redefinition() {
        for name in ["flag", "goto", "if", "input", "print_str", "print", "print_val"] {
            let input = format!("@{name}() s");
            assert_eq!(
                parse(&input),
                Err(SemanticError::BuiltinRedefined {
                    name: name.to_string(),
                    line: 1
                }
                .into())
            );
        }
    }

    #[test]
    fn test_parse_duplicate_function_name() {
        let input = "@main() s\ns 0 1 > t\n@main() u";
        assert_eq!(parse(input), Err(SemanticError::DuplicateFunction(3).into()));
    }

    #[test]
    fn test_parse_duplicate_parameter() {
        let input = "@main() s\ns * !f(a) t\n@f(a, a) u";
        assert_eq!(
            parse(input),
            Err(SemanticError::DuplicateParameter(3).into())
        );
    }

    #[test]
    fn test_parse_main_with_parameters() {
        let input = "@main(a) s";
        assert_eq!(
            parse(input),
            Err(SemanticError::MainWithParameters(1).into())
        );
    }

    #[test]
    fn test_parse_duplicate_transition_key() {
        let input = "@main() s\ns 0 1 > t\ns 0 0 > u";
        assert_eq!(
            parse(input),
            Err(SemanticError::DuplicateTransition(3).into())
        );

        // Same state under a different value pattern is fine.
        let input = "@main() s\ns 0 1 > t\ns 1 0 > u";
        assert!(parse(input).is_ok());
    }

    #[test]
    fn test_parse_builtin_with_generic_syntax() {
        let input = "@main() s\ns 0 !if(a) t";
        assert_eq!(
            parse(input),
            Err(SemanticError::BuiltinCallSyntax {
                name: "if".to_string(),
                line: 2
            }
            .into())
        );

        let input = "@main() s\ns 0 !print(a) t";
        assert_eq!(
            parse(input),
            Err(SemanticError::BuiltinCallSyntax {
                name: "print".to_string(),
                line: 2
            }
            .into())
        );
    }

    #[test]
    fn test_parse_builtin_arity() {
        let input = "@main() s\ns 0 !flag(a, b) t";
        assert_eq!(
            parse(input),
            Err(SemanticError::BuiltinArity {
                name: "flag".to_string(),
                line: 2
            }
            .into())
        );

        let input = "@main() s\ns 0 !goto() t";
        assert!(matches!(
            parse(input),
            Err(FtmError::Semantic(SemanticError::BuiltinArity { .. }))
        ));

        let input = "@main() s\ns 0 !print_val(a, b, c) t";
        assert!(matches!(
            parse(input),
            Err(FtmError::Semantic(SemanticError::BuiltinArity { .. }))
        ));
    }

    #[test]
    fn test_parse_input_bounds() {
        let input = "@main() s\ns * !input(0, \"p\") t";
        assert_eq!(
            parse(input),
            Err(SemanticError::InputWithoutBound(2).into())
        );

        let input = "@main() s\ns * !input(3, 2, \"p\") t";
        assert_eq!(
            parse(input),
            Err(SemanticError::InputBoundsReversed(2).into())
        );
    }

    #[test]
    fn test_parse_flag_with_wildcard_next_state() {
        let input = "@main() s\ns 0 !flag(a) *";
        assert_eq!(parse(input), Err(SemanticError::InfiniteLoop(2).into()));
    }

    #[test]
    fn test_parse_missing_main() {
        let input = "@helper() s\ns 0 1 > t";
        assert_eq!(parse(input), Err(SemanticError::MainUndefined.into()));
    }

    #[test]
    fn test_parse_trailing_comments_and_whitespace() {
        let input = "  @main()  start  # entry\n  start * !flag(a) next   # mark\n  next 0 1 > done # move\n";
        assert!(parse(input).is_ok());
    }
}
