//! Application-level configuration: an optional JSON file for tunables plus environment secrets.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, DurationSeconds, serde_as};
use tracing::{info, warn};

use crate::{
    clients::{gemini::GeminiConfig, spotify::SpotifyCredentials, ytdlp},
    state::quiz::{PASSING_SCORE, QUESTION_COUNT},
};

/// Default location on disk where the bot looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/bot.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CROSSROADS_BOT_CONFIG_PATH";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Prefix every text command starts with.
    pub command_prefix: String,
    /// JSON file holding the win ledger.
    pub score_file: PathBuf,
    /// How long an adventure choice stays clickable.
    pub choice_timeout: Duration,
    /// How long the quiz waits for each answer.
    pub answer_timeout: Duration,
    /// Bound on resolving a track to a streamable URL.
    pub resolve_timeout: Duration,
    /// Bound on handing a playback completion back to the scheduler.
    pub handoff_deadline: Duration,
    /// Correct answers needed to pass a quiz.
    pub passing_score: u32,
    /// Questions asked per quiz.
    pub question_count: usize,
    /// Reaction GIFs.
    pub gifs: GifSet,
    /// `None` without an API key.
    pub gemini: Option<GeminiConfig>,
    /// `None` without catalogue credentials.
    pub spotify: Option<SpotifyCredentials>,
    /// Media resolver executable.
    pub ytdlp_program: String,
}

/// Reaction GIF links posted after outcomes.
#[derive(Debug, Clone, Default)]
pub struct GifSet {
    /// After a passed quiz.
    pub win: Vec<String>,
    /// After a failed quiz or a defeat.
    pub fail: Vec<String>,
    /// When the adventurer fights the bear.
    pub fight: Vec<String>,
    /// When the adventurer flees.
    pub flee: Vec<String>,
}

impl AppConfig {
    /// Load tunables from disk (falling back to defaults) and secrets from the environment.
    pub fn load() -> Self {
        let mut config = Self::from_file();
        config.apply_env();
        config
    }

    fn from_file() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded bot configuration");
                    raw.into()
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    fn apply_env(&mut self) {
        if let Some(prefix) = non_empty_var("COMMAND_PREFIX") {
            self.command_prefix = prefix;
        }
        if let Some(path) = non_empty_var("SCORE_FILE") {
            self.score_file = PathBuf::from(path);
        }
        if let Some(program) = non_empty_var("YTDLP_PATH") {
            self.ytdlp_program = program;
        }

        self.gemini = non_empty_var("GEMINI_API_KEY").map(|key| {
            let config = GeminiConfig::new(key);
            match non_empty_var("GEMINI_MODEL") {
                Some(model) => config.with_model(model),
                None => config,
            }
        });
        if self.gemini.is_none() {
            warn!("GEMINI_API_KEY not set; quiz and ask commands are disabled");
        }

        self.spotify = non_empty_var("SPOTIFY_CLIENT_ID")
            .zip(non_empty_var("SPOTIFY_CLIENT_SECRET"))
            .map(|(client_id, client_secret)| SpotifyCredentials {
                client_id,
                client_secret,
            });
        if self.spotify.is_none() {
            info!("spotify credentials not set; track links will be rejected");
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    command_prefix: String,
    score_file: PathBuf,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "choice_timeout_secs")]
    choice_timeout: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "answer_timeout_secs")]
    answer_timeout: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "resolve_timeout_secs")]
    resolve_timeout: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "handoff_deadline_ms")]
    handoff_deadline: Duration,
    passing_score: u32,
    question_count: usize,
    win_gifs: Vec<String>,
    fail_gifs: Vec<String>,
    fight_gifs: Vec<String>,
    flee_gifs: Vec<String>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            command_prefix: "!".into(),
            score_file: PathBuf::from("scores.json"),
            choice_timeout: Duration::from_secs(60),
            answer_timeout: Duration::from_secs(30),
            resolve_timeout: Duration::from_secs(45),
            handoff_deadline: Duration::from_millis(500),
            passing_score: PASSING_SCORE,
            question_count: QUESTION_COUNT,
            win_gifs: vec![WIN_GIF.into()],
            fail_gifs: vec![FAIL_GIF.into()],
            fight_gifs: vec![BEAR_GIF.into()],
            flee_gifs: vec![BEAR_GIF.into()],
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            command_prefix: raw.command_prefix,
            score_file: raw.score_file,
            choice_timeout: raw.choice_timeout,
            answer_timeout: raw.answer_timeout,
            resolve_timeout: raw.resolve_timeout,
            handoff_deadline: raw.handoff_deadline,
            passing_score: raw.passing_score,
            question_count: raw.question_count,
            gifs: GifSet {
                win: raw.win_gifs,
                fail: raw.fail_gifs,
                fight: raw.fight_gifs,
                flee: raw.flee_gifs,
            },
            gemini: None,
            spotify: None,
            ytdlp_program: ytdlp::DEFAULT_PROGRAM.into(),
        }
    }
}

const WIN_GIF: &str = "https://media1.giphy.com/media/Ju7l5y9osyymQ/giphy.gif";
const FAIL_GIF: &str = "https://media2.giphy.com/media/mEnY8A6zE53pxLRD9a/giphy.gif";
const BEAR_GIF: &str = "https://media1.giphy.com/media/NBAOL4ZPU4Pks/giphy.gif";

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"command_prefix": "?", "answer_timeout_secs": 10, "handoff_deadline_ms": 250}"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.command_prefix, "?");
        assert_eq!(config.answer_timeout, Duration::from_secs(10));
        assert_eq!(config.handoff_deadline, Duration::from_millis(250));
        assert_eq!(config.choice_timeout, Duration::from_secs(60));
        assert_eq!(config.passing_score, 3);
        assert_eq!(config.question_count, 5);
        assert_eq!(config.score_file, PathBuf::from("scores.json"));
    }

    #[test]
    fn secrets_are_absent_by_default() {
        let config = AppConfig::default();
        assert!(config.gemini.is_none());
        assert!(config.spotify.is_none());
        assert_eq!(config.ytdlp_program, "yt-dlp");
    }
}
