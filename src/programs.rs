//! Embedded demo scripts and the `ProgramManager` facade for looking them up
//! by name.

use crate::loader::ScriptLoader;
use crate::types::{FtmError, Program};

/// A named demo script embedded in the binary.
#[derive(Debug, Clone, Copy)]
pub struct DemoProgram {
    pub name: &'static str,
    pub description: &'static str,
    pub source: &'static str,
}

// Default embedded scripts
pub const DEMOS: [DemoProgram; 3] = [
    DemoProgram {
        name: "echo",
        description: "Read up to eight bits and print them back",
        source: include_str!("../demos/echo.ftm"),
    },
    DemoProgram {
        name: "invert",
        description: "Read four bits, flip each one, and print the result",
        source: include_str!("../demos/invert.ftm"),
    },
    DemoProgram {
        name: "ones",
        description: "Write a run of five 1s using a fill move and print it",
        source: include_str!("../demos/ones.ftm"),
    },
];

pub struct ProgramManager;

impl ProgramManager {
    /// List all demo names
    pub fn names() -> Vec<&'static str> {
        DEMOS.iter().map(|demo| demo.name).collect()
    }

    /// Get the number of available demos
    pub fn count() -> usize {
        DEMOS.len()
    }

    /// Compile a demo by its name
    pub fn get(name: &str) -> Result<Program, FtmError> {
        let demo = DEMOS
            .iter()
            .find(|demo| demo.name == name)
            .ok_or_else(|| FtmError::File(format!("Demo '{}' not found", name)))?;

        ScriptLoader::load_script_from_string(demo.source)
    }
}
