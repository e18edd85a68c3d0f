//! Durable storage for named sessions.
//!
//! Each session lives in its own `chat_<name>.json` file under the history
//! directory, as a pretty-printed JSON array of `{"role", "content"}`
//! records. Writes go to a temporary file that is renamed into place, so a
//! record is always either the previous version or the new one.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{from_reader, to_writer_pretty};

use crate::chat::Turn;
use crate::error::{Error, Result};
use crate::observability::{HISTORY_DELETES, HISTORY_ERRORS, HISTORY_LOADS, HISTORY_SAVES};
use crate::utils::time::{now_local, session_stamp};

/// Directory name under the user's home directory.
pub const DEFAULT_HISTORY_DIR: &str = ".llm_chat_history";

const FILE_PREFIX: &str = "chat_";
const FILE_SUFFIX: &str = ".json";

/// Where a session was saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSession {
    /// The resolved session name.
    pub name: String,
    /// The file the session was written to.
    pub path: PathBuf,
}

/// Sole reader and writer of the history directory.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    /// Opens the store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| {
            Error::io(
                format!("failed to create history directory {}", dir.display()),
                err,
            )
        })?;
        Ok(Self { dir })
    }

    /// Returns `~/.llm_chat_history`, or a relative path if there is no home
    /// directory.
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .map(|home| home.join(DEFAULT_HISTORY_DIR))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_DIR))
    }

    /// Returns the history directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file that holds the session `name`.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{FILE_PREFIX}{name}{FILE_SUFFIX}")))
    }

    /// Saves `turns` under `name`, or under a timestamp if `name` is `None`.
    ///
    /// An existing record with the same name is replaced.
    pub fn save(&self, turns: &[Turn], name: Option<&str>) -> Result<SavedSession> {
        let name = match name {
            Some(name) => name.to_string(),
            None => session_stamp(now_local()),
        };
        let path = self.path_for(&name)?;
        let tmp = self.dir.join(format!(".{FILE_PREFIX}{name}{FILE_SUFFIX}.tmp"));
        let result = write_turns(&tmp, turns).and_then(|()| {
            fs::rename(&tmp, &path)
                .map_err(|err| Error::io(format!("failed to replace {}", path.display()), err))
        });
        if let Err(err) = result {
            HISTORY_ERRORS.click();
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }
        HISTORY_SAVES.click();
        tracing::debug!(name = %name, path = %path.display(), turns = turns.len(), "session saved");
        Ok(SavedSession { name, path })
    }

    /// Loads the session `name`.
    pub fn load(&self, name: &str) -> Result<Vec<Turn>> {
        let path = self.path_for(name)?;
        let file = File::open(&path).map_err(|err| self.map_missing(name, &path, err))?;
        let turns: Vec<Turn> = from_reader(BufReader::new(file)).map_err(|err| {
            HISTORY_ERRORS.click();
            Error::serialization(
                format!("failed to parse {}", path.display()),
                Some(Box::new(err)),
            )
        })?;
        HISTORY_LOADS.click();
        tracing::debug!(name = %name, turns = turns.len(), "session loaded");
        Ok(turns)
    }

    /// Deletes the session `name`.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        fs::remove_file(&path).map_err(|err| self.map_missing(name, &path, err))?;
        HISTORY_DELETES.click();
        tracing::debug!(name = %name, "session deleted");
        Ok(())
    }

    /// Lists saved session names in lexicographic order.
    ///
    /// Files that do not follow the `chat_<name>.json` pattern are ignored.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|err| {
            Error::io(format!("failed to read {}", self.dir.display()), err)
        })?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(name) = file_name
                .strip_prefix(FILE_PREFIX)
                .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
                .filter(|name| !name.is_empty())
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn map_missing(&self, name: &str, path: &Path, err: io::Error) -> Error {
        if err.kind() == io::ErrorKind::NotFound {
            Error::not_found(
                "no history file found",
                Some("session".to_string()),
                Some(name.to_string()),
            )
        } else {
            HISTORY_ERRORS.click();
            Error::io(format!("failed to access {}", path.display()), err)
        }
    }
}

fn write_turns(path: &Path, turns: &[Turn]) -> Result<()> {
    let file = File::create(path)
        .map_err(|err| Error::io(format!("failed to create {}", path.display()), err))?;
    let mut writer = BufWriter::new(file);
    to_writer_pretty(&mut writer, turns).map_err(|err| {
        Error::serialization("failed to serialize session", Some(Box::new(err)))
    })?;
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|err| Error::io("failed to flush session file", err.into_error()))?
        .sync_all()?;
    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if invalid {
        return Err(Error::validation(
            format!("invalid session name {name:?}"),
            Some("name".to_string()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = HistoryStore::open(dir.path().join("history")).unwrap();
        (dir, store)
    }

    fn sample() -> Vec<Turn> {
        vec![
            Turn::system("Be brief."),
            Turn::user("hi"),
            Turn::assistant("Hello!"),
        ]
    }

    #[test]
    fn open_creates_directory() {
        let (_dir, store) = store();
        assert!(store.dir().is_dir());
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, store) = store();
        let saved = store.save(&sample(), Some("greeting")).unwrap();
        assert_eq!(saved.name, "greeting");
        assert_eq!(saved.path, store.dir().join("chat_greeting.json"));
        assert_eq!(store.load("greeting").unwrap(), sample());
    }

    #[test]
    fn save_overwrites_existing() {
        let (_dir, store) = store();
        store.save(&sample(), Some("s")).unwrap();
        store.save(&[Turn::user("only")], Some("s")).unwrap();
        assert_eq!(store.load("s").unwrap(), vec![Turn::user("only")]);
        assert_eq!(store.list().unwrap(), vec!["s".to_string()]);
    }

    #[test]
    fn save_without_name_uses_timestamp() {
        let (_dir, store) = store();
        let saved = store.save(&sample(), None).unwrap();
        assert_eq!(saved.name.len(), "YYYYMMDD_HHMMSS".len());
        assert_eq!(saved.name.as_bytes()[8], b'_');
        assert!(
            saved
                .name
                .chars()
                .enumerate()
                .all(|(i, c)| i == 8 || c.is_ascii_digit())
        );
        assert!(saved.path.is_file());
    }

    #[test]
    fn file_format_is_pretty_turn_array() {
        let (_dir, store) = store();
        let saved = store.save(&[Turn::user("hi")], Some("fmt")).unwrap();
        let text = fs::read_to_string(saved.path).unwrap();
        assert_eq!(
            text,
            "[\n  {\n    \"role\": \"user\",\n    \"content\": \"hi\"\n  }\n]"
        );
    }

    #[test]
    fn load_missing_is_not_found() {
        let (_dir, store) = store();
        assert!(store.load("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn delete_then_load_is_not_found() {
        let (_dir, store) = store();
        store.save(&sample(), Some("gone")).unwrap();
        store.delete("gone").unwrap();
        assert!(store.load("gone").unwrap_err().is_not_found());
        assert!(store.delete("gone").unwrap_err().is_not_found());
    }

    #[test]
    fn corrupt_file_is_serialization_error() {
        let (_dir, store) = store();
        fs::write(store.dir().join("chat_bad.json"), "{ not json").unwrap();
        let err = store.load("bad").unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn list_is_sorted_and_filtered() {
        let (_dir, store) = store();
        store.save(&sample(), Some("b")).unwrap();
        store.save(&sample(), Some("a")).unwrap();
        fs::write(store.dir().join("notes.txt"), "x").unwrap();
        fs::write(store.dir().join("chat_.json"), "[]").unwrap();
        fs::create_dir(store.dir().join("chat_dir.json")).unwrap();
        assert_eq!(store.list().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn rejects_names_that_escape_the_directory() {
        let (_dir, store) = store();
        for name in ["", ".", "..", "../x", "a/b", "a\\b"] {
            let err = store.save(&sample(), Some(name)).unwrap_err();
            assert!(err.is_validation(), "{name:?} should be rejected");
        }
        assert!(store.list().unwrap().is_empty());
    }
}
