//! Startup configuration: OpenClaw paths from the environment and the
//! per-source refresh interval table.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::dashboard::registry::{
    COSTS, CRONS, GATEWAY, GPU, LIVE_FEED, NETWORK, PROCESSES, SESSIONS, SYSTEM, USAGE,
};
use crate::error::{DashError, Result};

/// Default refresh intervals, in registration order.
const DEFAULT_INTERVALS: &[(&str, u64)] = &[
    (SYSTEM, 2),
    (GPU, 2),
    (GATEWAY, 2),
    (USAGE, 2),
    (COSTS, 2),
    (SESSIONS, 10),
    (CRONS, 30),
    (LIVE_FEED, 5),
    (PROCESSES, 2),
    (NETWORK, 2),
];

/// Refresh interval per source id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceIntervals {
    entries: Vec<(String, Duration)>,
}

impl SourceIntervals {
    pub fn get(&self, source_id: &str) -> Option<Duration> {
        self.entries
            .iter()
            .find(|(id, _)| id == source_id)
            .map(|(_, interval)| *interval)
    }

    pub fn set(&mut self, source_id: &str, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(DashError::config(format!(
                "interval for '{}' must be greater than zero",
                source_id
            )));
        }

        match self.entries.iter_mut().find(|(id, _)| id == source_id) {
            Some((_, current)) => {
                *current = interval;
                Ok(())
            }
            None => Err(DashError::config(format!(
                "unknown source '{}' (known: {})",
                source_id,
                self.ids().collect::<Vec<_>>().join(", ")
            ))),
        }
    }

    /// Apply an override written as `SOURCE=SECS`, e.g. `sessions=15` or
    /// `network=0.5`.
    pub fn apply_override(&mut self, arg: &str) -> Result<()> {
        let (id, secs) = arg.split_once('=').ok_or_else(|| {
            DashError::config(format!("invalid interval '{}', expected SOURCE=SECS", arg))
        })?;

        let secs: f64 = secs.trim().parse().map_err(|_| {
            DashError::config(format!("invalid number of seconds in '{}'", arg))
        })?;
        let interval = Duration::try_from_secs_f64(secs)
            .map_err(|_| DashError::config(format!("invalid interval in '{}'", arg)))?;

        self.set(id.trim(), interval)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.entries.iter().map(|(id, d)| (id.as_str(), *d))
    }
}

impl Default for SourceIntervals {
    fn default() -> Self {
        Self {
            entries: DEFAULT_INTERVALS
                .iter()
                .map(|(id, secs)| (id.to_string(), Duration::from_secs(*secs)))
                .collect(),
        }
    }
}

/// Values resolved once at startup and shared read-only by all adapters.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub openclaw_dir: PathBuf,
    pub workspace_dir: PathBuf,
    pub agent_id: String,
    pub intervals: SourceIntervals,
    /// Bare Linux console: draw sparklines with ASCII only.
    pub ascii_sparklines: bool,
}

impl DashboardConfig {
    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::resolve(
            |key| std::env::var(key).ok(),
            dirs::home_dir(),
            std::env::current_dir().ok(),
        )
    }

    /// Resolve from an arbitrary variable lookup (used by tests).
    ///
    /// `OPENCLAW_DIR` defaults to `~/.openclaw`, `WORKSPACE_DIR` falls back to
    /// `OPENCLAW_WORKSPACE` and then the current directory, `OPENCLAW_AGENT`
    /// defaults to `main`.
    pub fn resolve<F>(lookup: F, home: Option<PathBuf>, cwd: Option<PathBuf>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openclaw_dir = match var("OPENCLAW_DIR") {
            Some(dir) => expand_home(&dir, home.as_deref())?,
            None => home
                .as_ref()
                .map(|h| h.join(".openclaw"))
                .ok_or_else(|| {
                    DashError::config("could not determine home directory; set OPENCLAW_DIR")
                })?,
        };

        let workspace_dir = match var("WORKSPACE_DIR").or_else(|| var("OPENCLAW_WORKSPACE")) {
            Some(dir) => expand_home(&dir, home.as_deref())?,
            None => cwd.ok_or_else(|| {
                DashError::config("could not determine current directory; set WORKSPACE_DIR")
            })?,
        };

        let agent_id = var("OPENCLAW_AGENT").unwrap_or_else(|| "main".to_string());
        if agent_id.contains(['/', '\\']) || agent_id == ".." {
            return Err(DashError::config(format!(
                "OPENCLAW_AGENT '{}' is not a valid agent id",
                agent_id
            )));
        }

        let ascii_sparklines = var("TERM").is_some_and(|t| t.eq_ignore_ascii_case("linux"));

        Ok(Self {
            openclaw_dir,
            workspace_dir,
            agent_id,
            intervals: SourceIntervals::default(),
            ascii_sparklines,
        })
    }

    /// Check that the configured directories are usable.
    ///
    /// A missing OpenClaw directory is allowed (panels stay empty until it
    /// appears); one that exists but cannot be listed is fatal.
    pub fn validate(&self) -> Result<()> {
        check_dir("OPENCLAW_DIR", &self.openclaw_dir)?;
        check_dir("WORKSPACE_DIR", &self.workspace_dir)?;
        Ok(())
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.openclaw_dir
            .join("agents")
            .join(&self.agent_id)
            .join("sessions")
    }

    pub fn sessions_file(&self) -> PathBuf {
        self.sessions_dir().join("sessions.json")
    }

    pub fn cron_file(&self) -> PathBuf {
        self.openclaw_dir.join("cron").join("jobs.json")
    }
}

fn expand_home(raw: &str, home: Option<&Path>) -> Result<PathBuf> {
    let Some(rest) = raw.strip_prefix('~') else {
        return Ok(PathBuf::from(raw));
    };

    let home = home.ok_or_else(|| {
        DashError::config(format!("cannot expand '{}': home directory unknown", raw))
    })?;
    Ok(home.join(rest.trim_start_matches(['/', '\\'])))
}

fn check_dir(name: &str, path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if !meta.is_dir() => Err(DashError::config(format!(
            "{} {} is not a directory",
            name,
            path.display()
        ))),
        Ok(_) => fs::read_dir(path).map(|_| ()).map_err(|e| {
            DashError::config(format!("{} {} is not readable: {}", name, path.display(), e))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("{} {} does not exist yet", name, path.display());
            Ok(())
        }
        Err(e) => Err(DashError::config(format!(
            "{} {} is not accessible: {}",
            name,
            path.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(vars: &[(&str, &str)]) -> Result<DashboardConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DashboardConfig::resolve(
            |key| vars.get(key).cloned(),
            Some(PathBuf::from("/home/claw")),
            Some(PathBuf::from("/work")),
        )
    }

    #[test]
    fn test_defaults() {
        let config = resolve(&[]).unwrap();
        assert_eq!(config.openclaw_dir, PathBuf::from("/home/claw/.openclaw"));
        assert_eq!(config.workspace_dir, PathBuf::from("/work"));
        assert_eq!(config.agent_id, "main");
        assert!(!config.ascii_sparklines);
        assert_eq!(
            config.sessions_dir(),
            PathBuf::from("/home/claw/.openclaw/agents/main/sessions")
        );
        assert_eq!(
            config.cron_file(),
            PathBuf::from("/home/claw/.openclaw/cron/jobs.json")
        );
    }

    #[test]
    fn test_env_overrides() {
        let config = resolve(&[
            ("OPENCLAW_DIR", "/srv/openclaw"),
            ("OPENCLAW_WORKSPACE", "/srv/ws"),
            ("OPENCLAW_AGENT", "research"),
            ("TERM", "linux"),
        ])
        .unwrap();
        assert_eq!(config.openclaw_dir, PathBuf::from("/srv/openclaw"));
        assert_eq!(config.workspace_dir, PathBuf::from("/srv/ws"));
        assert_eq!(
            config.sessions_dir(),
            PathBuf::from("/srv/openclaw/agents/research/sessions")
        );
        assert!(config.ascii_sparklines);
    }

    #[test]
    fn test_workspace_dir_wins_over_openclaw_workspace() {
        let config = resolve(&[("WORKSPACE_DIR", "/a"), ("OPENCLAW_WORKSPACE", "/b")]).unwrap();
        assert_eq!(config.workspace_dir, PathBuf::from("/a"));
    }

    #[test]
    fn test_tilde_expansion() {
        let config = resolve(&[("OPENCLAW_DIR", "~/claw")]).unwrap();
        assert_eq!(config.openclaw_dir, PathBuf::from("/home/claw/claw"));
    }

    #[test]
    fn test_missing_home_is_config_error() {
        let err = DashboardConfig::resolve(|_| None, None, Some(PathBuf::from("/work"))).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_agent_rejected() {
        assert!(resolve(&[("OPENCLAW_AGENT", "../etc")]).is_err());
    }

    #[test]
    fn test_default_intervals() {
        let intervals = SourceIntervals::default();
        assert_eq!(intervals.get(SYSTEM), Some(Duration::from_secs(2)));
        assert_eq!(intervals.get(SESSIONS), Some(Duration::from_secs(10)));
        assert_eq!(intervals.get(CRONS), Some(Duration::from_secs(30)));
        assert_eq!(intervals.get(LIVE_FEED), Some(Duration::from_secs(5)));
        assert_eq!(intervals.ids().count(), 10);
    }

    #[test]
    fn test_interval_overrides() {
        let mut intervals = SourceIntervals::default();
        intervals.apply_override("sessions=15").unwrap();
        intervals.apply_override(" network = 0.5 ").unwrap();
        assert_eq!(intervals.get(SESSIONS), Some(Duration::from_secs(15)));
        assert_eq!(intervals.get(NETWORK), Some(Duration::from_millis(500)));

        assert!(intervals.apply_override("bogus=3").is_err());
        assert!(intervals.apply_override("sessions=0").is_err());
        assert!(intervals.apply_override("sessions=-1").is_err());
        assert!(intervals.apply_override("sessions").is_err());
        assert!(intervals.apply_override("sessions=abc").is_err());
    }

    #[test]
    fn test_validate_missing_dir_is_ok() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = DashboardConfig {
            openclaw_dir: temp.path().join("absent"),
            workspace_dir: temp.path().to_path_buf(),
            agent_id: "main".to_string(),
            intervals: SourceIntervals::default(),
            ascii_sparklines: false,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_file_instead_of_dir_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();
        let config = DashboardConfig {
            openclaw_dir: file,
            workspace_dir: temp.path().to_path_buf(),
            agent_id: "main".to_string(),
            intervals: SourceIntervals::default(),
            ascii_sparklines: false,
        };
        assert!(config.validate().unwrap_err().is_fatal());
    }
}
