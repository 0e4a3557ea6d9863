//! This module provides the `ScriptLoader` struct, responsible for loading FTM
//! scripts from files and strings and for discovering `.ftm` files in a
//! directory.

use crate::parser::parse;
use crate::types::{FtmError, Program};
use std::fs;
use std::path::{Path, PathBuf};

/// `ScriptLoader` is a utility struct for loading FTM scripts. Scripts on disk
/// must carry the `.ftm` extension; string loading skips that check.
pub struct ScriptLoader;

impl ScriptLoader {
    /// Loads and compiles a single script from the specified file path.
    ///
    /// Returns `FtmError::File` when the path does not end in `.ftm` or the
    /// file cannot be read, and a syntax or semantic error when the content
    /// does not compile.
    pub fn load_script(path: &Path) -> Result<Program, FtmError> {
        if path.extension().and_then(|e| e.to_str()) != Some("ftm") {
            return Err(FtmError::File(format!(
                "Invalid file name {}. Functional Turing Machine files must end with \".ftm\"",
                path.display()
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            FtmError::File(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        parse(&content)
    }

    /// Compiles a script from string content, e.g. from an embedded demo or
    /// user input.
    pub fn load_script_from_string(content: &str) -> Result<Program, FtmError> {
        parse(content)
    }

    /// Loads every `.ftm` file in a directory. Subdirectories and files with
    /// other extensions are skipped; each script compiles (or fails)
    /// independently.
    pub fn load_scripts(directory: &Path) -> Vec<Result<(PathBuf, Program), FtmError>> {
        if !directory.exists() {
            return vec![Err(FtmError::File(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(FtmError::File(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut results = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("ftm") {
                results.push(Self::load_script(&path).map(|program| (path, program)));
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const SCRIPT: &str = "@main() start\nstart 0 !flag(a) next\nnext 0 1 * start\n";

    fn write_script(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_script_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "flip.ftm", SCRIPT);

        let program = ScriptLoader::load_script(&path).unwrap();
        assert!(program.get("main").is_some());
    }

    #[test]
    fn test_load_script_rejects_other_extensions() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "flip.txt", SCRIPT);

        let result = ScriptLoader::load_script(&path);
        assert!(matches!(result, Err(FtmError::File(_))));
    }

    #[test]
    fn test_load_script_missing_file() {
        let result = ScriptLoader::load_script(Path::new("no-such-script.ftm"));
        assert!(matches!(result, Err(FtmError::File(_))));
    }

    #[test]
    fn test_load_script_from_string() {
        let program = ScriptLoader::load_script_from_string(SCRIPT).unwrap();
        assert_eq!(program.functions.len(), 1);
    }

    #[test]
    fn test_load_scripts_from_directory() {
        let dir = TempDir::new().unwrap();
        write_script(&dir, "good.ftm", SCRIPT);
        write_script(&dir, "bad.ftm", "@main() s\nnot a transition\n");
        write_script(&dir, "ignored.txt", SCRIPT);

        let results = ScriptLoader::load_scripts(dir.path());
        assert_eq!(results.len(), 2);
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    }

    #[test]
    fn test_load_scripts_missing_directory() {
        let results = ScriptLoader::load_scripts(Path::new("no-such-directory"));
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }
}
