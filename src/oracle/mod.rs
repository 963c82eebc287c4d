use std::{path::PathBuf, str::FromStr};

use anyhow::{bail, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::utils::clock::Clock;

/// Name of the sidecar file a companion process writes the current character
/// mood into, one token per file.
pub const MOOD_FILE_NAME: &str = "character_state.txt";

/// A reading older than this is treated as if the companion went away.
const MOOD_STALE_AFTER: chrono::Duration = chrono::Duration::seconds(60);

/// What the companion reports the character is feeling. `Idle` doubles as the
/// fallback whenever no trustworthy reading exists.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum MoodState {
    Happy,
    Sad,
    Excited,
    Work,
    Chill,
    #[default]
    Idle,
}

impl FromStr for MoodState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "happy" => MoodState::Happy,
            "sad" => MoodState::Sad,
            "excited" => MoodState::Excited,
            "work" => MoodState::Work,
            "chill" => MoodState::Chill,
            "idle" => MoodState::Idle,
            other => bail!("unknown mood token {other:?}"),
        })
    }
}

/// Interface for abstracting where mood readings come from.
#[cfg_attr(test, mockall::automock)]
pub trait MoodSource: Send {
    /// The latest reading, or `None` when there is nothing trustworthy to
    /// read. Must never block beyond a quick local probe.
    fn current_mood(&mut self) -> Option<MoodState>;
}

/// Reads the mood from the sidecar file. Every failure mode, from a missing
/// file to an unknown token to a reading past the staleness window, is just
/// "no reading".
pub struct FileMoodSource {
    path: PathBuf,
    time_provider: Box<dyn Clock>,
}

impl FileMoodSource {
    pub fn new(path: PathBuf, time_provider: Box<dyn Clock>) -> Self {
        Self {
            path,
            time_provider,
        }
    }

    fn is_stale(&self, modified: std::time::SystemTime) -> bool {
        let modified = DateTime::<Local>::from(modified);
        self.time_provider.time() - modified > MOOD_STALE_AFTER
    }
}

impl MoodSource for FileMoodSource {
    fn current_mood(&mut self) -> Option<MoodState> {
        let metadata = match std::fs::metadata(&self.path) {
            Ok(v) => v,
            Err(_) => {
                debug!("No mood file at {:?}", self.path);
                return None;
            }
        };
        if metadata.modified().map_or(false, |v| self.is_stale(v)) {
            debug!("Mood file at {:?} is stale", self.path);
            return None;
        }

        let contents = match std::fs::read_to_string(&self.path) {
            Ok(v) => v,
            Err(e) => {
                warn!("Couldn't read mood file {:?}: {e}", self.path);
                return None;
            }
        };

        match contents.parse() {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Ignoring mood file {:?}: {e}", self.path);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tempfile::tempdir;
    use tokio::time::Instant;

    use crate::utils::clock::DefaultClock;

    use super::*;

    /// A clock running a fixed amount ahead of the real one.
    struct SkewedClock {
        ahead: chrono::Duration,
    }

    #[async_trait]
    impl Clock for SkewedClock {
        fn time(&self) -> DateTime<Local> {
            Local::now() + self.ahead
        }

        fn instant(&self) -> Instant {
            Instant::now()
        }

        async fn sleep_until(&self, instant: Instant) {
            tokio::time::sleep_until(instant).await;
        }
    }

    #[test]
    fn tokens_parse_forgivingly() {
        assert_eq!("happy".parse::<MoodState>().unwrap(), MoodState::Happy);
        assert_eq!(
            "  Excited\n".parse::<MoodState>().unwrap(),
            MoodState::Excited
        );
        assert!("grumpy".parse::<MoodState>().is_err());
        assert!("".parse::<MoodState>().is_err());
    }

    #[test]
    fn missing_and_unknown_files_read_as_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MOOD_FILE_NAME);

        let mut source = FileMoodSource::new(path.clone(), Box::new(DefaultClock));
        assert_eq!(source.current_mood(), None);

        std::fs::write(&path, "confused").unwrap();
        assert_eq!(source.current_mood(), None);

        std::fs::write(&path, "work\n").unwrap();
        assert_eq!(source.current_mood(), Some(MoodState::Work));
    }

    #[test]
    fn readings_expire_after_the_staleness_window() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MOOD_FILE_NAME);
        std::fs::write(&path, "happy").unwrap();

        let mut fresh = FileMoodSource::new(path.clone(), Box::new(DefaultClock));
        assert_eq!(fresh.current_mood(), Some(MoodState::Happy));

        let mut late = FileMoodSource::new(
            path,
            Box::new(SkewedClock {
                ahead: chrono::Duration::seconds(120),
            }),
        );
        assert_eq!(late.current_mood(), None);
    }
}
