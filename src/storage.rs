use serde::Serialize;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::AppSettings;

const SETTINGS_FILE: &str = "settings.json";
const RESUME_FILE: &str = "resume.txt";
const APP_NAME: &str = "jobscribe";

/// Where resume text lives: kept across runs, or only until the session directory is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Durable,
    Session,
}

impl Scope {
    pub fn for_settings(settings: &AppSettings) -> Self {
        if settings.session_only_resume {
            Scope::Session
        } else {
            Scope::Durable
        }
    }
}

pub trait ResumeStore {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, text: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Resume text stored as a plain file inside one scope's directory.
pub struct FileResumeStore {
    path: PathBuf,
}

impl FileResumeStore {
    pub fn new(dir: &Path) -> Self {
        Self { path: dir.join(RESUME_FILE) }
    }
}

impl ResumeStore for FileResumeStore {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, text: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, text)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct SettingsStore {
    durable_dir: PathBuf,
    session_dir: PathBuf,
}

impl SettingsStore {
    pub fn open() -> Result<Self> {
        let (durable_dir, session_dir) = Self::default_dirs();
        Ok(Self::at(durable_dir, session_dir))
    }

    pub fn at(durable_dir: impl Into<PathBuf>, session_dir: impl Into<PathBuf>) -> Self {
        Self {
            durable_dir: durable_dir.into(),
            session_dir: session_dir.into(),
        }
    }

    fn default_dirs() -> (PathBuf, PathBuf) {
        let user = std::env::var("USER").unwrap_or_else(|_| "user".to_string());
        let temp_session = std::env::temp_dir().join(format!("{}-{}", APP_NAME, user));

        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", APP_NAME) {
            let session = proj_dirs
                .runtime_dir()
                .map(Path::to_path_buf)
                .unwrap_or(temp_session);
            (proj_dirs.data_dir().to_path_buf(), session)
        } else {
            // Fallback to current directory
            (PathBuf::from(format!(".{}", APP_NAME)), temp_session)
        }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.durable_dir.join(SETTINGS_FILE)
    }

    pub fn load_settings(&self) -> Result<AppSettings> {
        let path = self.settings_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(AppSettings::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&raw).map_err(|source| AppError::Settings {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        let path = self.settings_path();
        write_json(&path, settings)?;
        debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    pub fn resume_store(&self, scope: Scope) -> FileResumeStore {
        match scope {
            Scope::Durable => FileResumeStore::new(&self.durable_dir),
            Scope::Session => FileResumeStore::new(&self.session_dir),
        }
    }

    /// Resume text from the scope the settings select; empty when none is stored.
    pub fn load_resume(&self, settings: &AppSettings) -> Result<String> {
        let scope = Scope::for_settings(settings);
        Ok(self.resume_store(scope).load()?.unwrap_or_default())
    }

    /// Store the resume in one scope and remove it from the other.
    pub fn save_resume(&self, text: &str, session_only: bool) -> Result<()> {
        let (target, other) = if session_only {
            (Scope::Session, Scope::Durable)
        } else {
            (Scope::Durable, Scope::Session)
        };
        self.resume_store(other).clear()?;
        self.resume_store(target).save(text)?;
        debug!(?target, "resume saved");
        Ok(())
    }

    pub fn clear_resume(&self) -> Result<()> {
        self.resume_store(Scope::Durable).clear()?;
        self.resume_store(Scope::Session).clear()
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| AppError::Settings {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Provider, Tone};
    use tempfile::TempDir;

    fn store() -> (TempDir, SettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::at(dir.path().join("data"), dir.path().join("session"));
        (dir, store)
    }

    #[test]
    fn test_missing_settings_file_yields_defaults() {
        let (_dir, store) = store();
        assert_eq!(store.load_settings().unwrap(), AppSettings::default());
    }

    #[test]
    fn test_settings_round_trip() {
        let (_dir, store) = store();
        let mut settings = AppSettings::default();
        settings.provider = Provider::OpenAI;
        settings.tone = Tone::Confident;
        settings.full_name = "Jane Doe".to_string();
        settings.api_keys.set(Provider::OpenAI, "sk-123".to_string());

        store.save_settings(&settings).unwrap();
        assert_eq!(store.load_settings().unwrap(), settings);
    }

    #[test]
    fn test_corrupt_settings_file_is_reported() {
        let (_dir, store) = store();
        fs::create_dir_all(store.settings_path().parent().unwrap()).unwrap();
        fs::write(store.settings_path(), "{not json").unwrap();
        assert!(matches!(store.load_settings(), Err(AppError::Settings { .. })));
    }

    #[test]
    fn test_resume_lives_in_exactly_one_scope() {
        let (_dir, store) = store();

        store.save_resume("durable resume", false).unwrap();
        assert_eq!(store.resume_store(Scope::Durable).load().unwrap().as_deref(), Some("durable resume"));
        assert_eq!(store.resume_store(Scope::Session).load().unwrap(), None);

        store.save_resume("session resume", true).unwrap();
        assert_eq!(store.resume_store(Scope::Durable).load().unwrap(), None);
        assert_eq!(store.resume_store(Scope::Session).load().unwrap().as_deref(), Some("session resume"));
    }

    #[test]
    fn test_load_resume_follows_session_flag() {
        let (_dir, store) = store();
        store.save_resume("session resume", true).unwrap();

        let mut settings = AppSettings::default();
        assert_eq!(store.load_resume(&settings).unwrap(), "");

        settings.session_only_resume = true;
        assert_eq!(store.load_resume(&settings).unwrap(), "session resume");
    }

    #[test]
    fn test_clear_resume_removes_both_scopes() {
        let (_dir, store) = store();
        store.resume_store(Scope::Durable).save("a").unwrap();
        store.resume_store(Scope::Session).save("b").unwrap();

        store.clear_resume().unwrap();
        assert_eq!(store.resume_store(Scope::Durable).load().unwrap(), None);
        assert_eq!(store.resume_store(Scope::Session).load().unwrap(), None);
        // Clearing twice is fine.
        store.clear_resume().unwrap();
    }
}
