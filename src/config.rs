use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file or a persona template.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    openai_api_key: String,
    /// The bot owner. Gets the primary persona template; everyone else gets
    /// the secondary one.
    owner_id: i64,
    /// Persona template shown to the owner.
    prompt_path: Option<String>,
    /// Persona template shown to everyone else.
    prompt2_path: Option<String>,
    /// SQLite database for conversation history.
    db_path: Option<String>,
    /// Path to Whisper model file (.bin). Voice intake is disabled without it.
    whisper_model_path: Option<String>,
    /// Language hint for transcription (ISO 639-1).
    language: Option<String>,
    /// Max history records replayed into the prompt (0 = unlimited).
    #[serde(default)]
    history_limit: usize,
    #[serde(default = "default_timeout_secs")]
    request_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

/// The two persona templates, selected per requesting user.
#[derive(Debug, Clone)]
pub struct Personas {
    /// Template for the owner (prompt.txt).
    pub owner: String,
    /// Template for everyone else (prompt2.txt).
    pub guest: String,
}

pub struct Config {
    pub telegram_bot_token: String,
    pub openai_api_key: String,
    pub owner_id: i64,
    pub personas: Personas,
    pub db_path: PathBuf,
    /// Path to Whisper model file (.bin). Voice intake is disabled without it.
    pub whisper_model_path: Option<PathBuf>,
    /// Language hint for transcription.
    pub language: String,
    /// Max history records replayed into the prompt (0 = unlimited).
    pub history_limit: usize,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        // Validate required fields
        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if file.openai_api_key.is_empty() {
            return Err(ConfigError::Validation("openai_api_key is required".into()));
        }
        if file.owner_id == 0 {
            return Err(ConfigError::Validation("owner_id is required".into()));
        }

        let prompt_path = PathBuf::from(
            file.prompt_path.unwrap_or_else(|| "prompt/prompt.txt".to_string()),
        );
        let prompt2_path = PathBuf::from(
            file.prompt2_path.unwrap_or_else(|| "prompt/prompt2.txt".to_string()),
        );

        // Missing templates are fatal at startup, not at first message
        let personas = Personas {
            owner: read_template(&prompt_path)?,
            guest: read_template(&prompt2_path)?,
        };

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            openai_api_key: file.openai_api_key,
            owner_id: file.owner_id,
            personas,
            db_path: file
                .db_path
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("conversas.db")),
            whisper_model_path: file.whisper_model_path.map(PathBuf::from),
            language: file.language.unwrap_or_else(|| "pt".to_string()),
            history_limit: file.history_limit,
            request_timeout_secs: file.request_timeout_secs,
        })
    }
}

fn read_template(path: &Path) -> Result<String, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadFile { path: path.to_path_buf(), source: e })?;
    if text.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "persona template '{}' is empty",
            path.display()
        )));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    /// A directory with both persona templates in place.
    fn prompt_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("prompt.txt"), "Oi {user}, sou a assistente.").unwrap();
        std::fs::write(dir.path().join("prompt2.txt"), "Olá {user}.").unwrap();
        dir
    }

    fn config_json(dir: &TempDir) -> String {
        format!(
            r#"{{
                "telegram_bot_token": "123456789:ABCdefGHIjklMNOpqrsTUVwxyz",
                "openai_api_key": "sk-test",
                "owner_id": 42,
                "prompt_path": "{0}/prompt.txt",
                "prompt2_path": "{0}/prompt2.txt"
            }}"#,
            dir.path().display()
        )
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_config() {
        let dir = prompt_dir();
        let file = write_config(&config_json(&dir));
        let config = Config::load(file.path()).expect("should load valid config");
        assert_eq!(config.owner_id, 42);
        assert_eq!(config.language, "pt");
        assert_eq!(config.history_limit, 0);
        assert_eq!(config.request_timeout_secs, 60);
        assert!(config.personas.owner.contains("{user}"));
    }

    #[test]
    fn test_empty_token() {
        let file = write_config(r#"{
            "telegram_bot_token": "",
            "openai_api_key": "sk-test",
            "owner_id": 42
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_invalid_token_format() {
        let file = write_config(r#"{
            "telegram_bot_token": "invalid_token_no_colon",
            "openai_api_key": "sk-test",
            "owner_id": 42
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_openai_key() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "openai_api_key": "",
            "owner_id": 42
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("openai_api_key"));
    }

    #[test]
    fn test_missing_owner_id() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "openai_api_key": "sk-test",
            "owner_id": 0
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("owner_id"));
    }

    #[test]
    fn test_missing_template_is_fatal() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "openai_api_key": "sk-test",
            "owner_id": 42,
            "prompt_path": "/nonexistent/prompt.txt",
            "prompt2_path": "/nonexistent/prompt2.txt"
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load("/nonexistent/path/config.json"));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
