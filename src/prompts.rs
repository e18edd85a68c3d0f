//! Named system prompts stored as plain-text files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default directory holding `<name>.txt` prompt files.
pub const DEFAULT_PROMPTS_DIR: &str = "/opt/llm-chat/prompts";

const PROMPT_SUFFIX: &str = ".txt";

/// A directory of prompt files.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    dir: PathBuf,
}

impl PromptLibrary {
    /// Creates a library rooted at `dir`. The directory need not exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the prompts directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file for prompt `name`, appending `.txt` if absent.
    pub fn path_for(&self, name: &str) -> PathBuf {
        if name.ends_with(PROMPT_SUFFIX) {
            self.dir.join(name)
        } else {
            self.dir.join(format!("{name}{PROMPT_SUFFIX}"))
        }
    }

    /// Reads prompt `name` and returns its trimmed contents.
    ///
    /// Returns `Ok(None)` when the file is empty after trimming.
    pub fn load(&self, name: &str) -> Result<Option<String>> {
        let path = self.path_for(name);
        let text = fs::read_to_string(&path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                Error::not_found(
                    format!("prompt file not found: {}", path.display()),
                    Some("prompt".to_string()),
                    Some(name.to_string()),
                )
            } else {
                Error::io(format!("failed to read {}", path.display()), err)
            }
        })?;
        let text = text.trim();
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text.to_string()))
        }
    }

    /// Lists prompt names (file stems of `*.txt`) in lexicographic order.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                Error::not_found(
                    format!("prompts directory not found: {}", self.dir.display()),
                    Some("prompts directory".to_string()),
                    None,
                )
            } else {
                Error::io(format!("failed to read {}", self.dir.display()), err)
            }
        })?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if let Some(name) = entry
                .file_name()
                .to_str()
                .and_then(|file_name| file_name.strip_suffix(PROMPT_SUFFIX))
                .filter(|name| !name.is_empty())
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPTS_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_appends_suffix_once() {
        let library = PromptLibrary::new("/prompts");
        assert_eq!(library.path_for("coder"), PathBuf::from("/prompts/coder.txt"));
        assert_eq!(
            library.path_for("coder.txt"),
            PathBuf::from("/prompts/coder.txt")
        );
    }

    #[test]
    fn load_trims_contents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("coder.txt"), "\n  You write Rust.  \n").unwrap();
        let library = PromptLibrary::new(dir.path());
        assert_eq!(
            library.load("coder").unwrap(),
            Some("You write Rust.".to_string())
        );
    }

    #[test]
    fn empty_prompt_is_none() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blank.txt"), " \n\t").unwrap();
        let library = PromptLibrary::new(dir.path());
        assert_eq!(library.load("blank").unwrap(), None);
    }

    #[test]
    fn missing_prompt_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let library = PromptLibrary::new(dir.path());
        assert!(library.load("absent").unwrap_err().is_not_found());
    }

    #[test]
    fn list_only_txt_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for file in ["zeta.txt", "alpha.txt", "readme.md"] {
            fs::write(dir.path().join(file), "x").unwrap();
        }
        let library = PromptLibrary::new(dir.path());
        assert_eq!(
            library.list().unwrap(),
            vec!["alpha".to_string(), "zeta".to_string()]
        );
    }

    #[test]
    fn list_missing_dir_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let library = PromptLibrary::new(dir.path().join("missing"));
        assert!(library.list().unwrap_err().is_not_found());
    }
}
