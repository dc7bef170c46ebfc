use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tracing::{debug, info, trace, warn};

/// Flat key=value configuration loaded from `~/.sundialrc` (or the path
/// in `SUNDIALRC`), with `include` support and command-line overrides.
#[derive(Debug, Clone)]
pub struct Config {
    map: HashMap<String, String>,
    pub loaded_files: Vec<PathBuf>,
}

impl Config {
    #[tracing::instrument(skip(rc_override))]
    pub fn load(rc_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config {
            map: HashMap::new(),
            loaded_files: vec![],
        };

        cfg.map
            .insert("api.url".to_string(), "http://127.0.0.1:8000".to_string());
        cfg.map
            .insert("data.location".to_string(), "~/.sundial".to_string());
        cfg.map.insert("language".to_string(), "en".to_string());
        cfg.map
            .insert("notify.ttl_ms".to_string(), "5000".to_string());

        let rc = resolve_rc_path(rc_override)?;
        if let Some(path) = rc {
            info!(rc = %path.display(), "loading config file");
            cfg.load_file(&path)?;
        } else {
            debug!("no config file found; using defaults");
        }

        Ok(cfg)
    }

    #[tracing::instrument(skip(self, overrides))]
    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (k, v) in overrides {
            let key = k.strip_prefix("rc.").unwrap_or(&k).to_string();
            debug!(key = %key, value = %v, "applying override");
            self.map.insert(key, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.map.get(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.map.iter()
    }

    #[tracing::instrument(skip(self))]
    fn load_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let path = expand_tilde(path);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        self.loaded_files.push(path.clone());

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        for (line_num, raw_line) in text.lines().enumerate() {
            let mut line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((before, _)) = line.split_once('#') {
                line = before.trim();
            }

            if line.is_empty() {
                continue;
            }

            if let Some(include_rest) = line.strip_prefix("include ") {
                let include_path = resolve_include_path(&base_dir, include_rest.trim())?;
                debug!(
                    file = %path.display(),
                    include = %include_path.display(),
                    line = line_num + 1,
                    "processing include"
                );

                if include_path.exists() {
                    self.load_file(&include_path)?;
                } else {
                    warn!(include = %include_path.display(), "include file does not exist; skipping");
                }
                continue;
            }

            let (k, v) = line.split_once('=').ok_or_else(|| {
                anyhow!(
                    "invalid config line {}:{}: {}",
                    path.display(),
                    line_num + 1,
                    raw_line
                )
            })?;

            let key = k.trim().to_string();
            let value = v.trim().to_string();
            trace!(key = %key, value = %value, "loaded config key");
            self.map.insert(key, value);
        }

        Ok(())
    }
}

/// Directory holding local state (the persisted token file). Created on
/// first use.
#[tracing::instrument(skip(cfg, override_dir))]
pub fn resolve_data_dir(cfg: &Config, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = if let Some(path) = override_dir {
        path.to_path_buf()
    } else if let Some(cfg_value) = cfg.get("data.location") {
        expand_tilde(Path::new(&cfg_value))
    } else {
        default_data_dir()?
    };

    if !dir.exists() {
        info!(dir = %dir.display(), "creating data directory");
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    Ok(dir)
}

#[tracing::instrument(skip(override_path))]
fn resolve_rc_path(override_path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = override_path {
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(rc_env) = std::env::var("SUNDIALRC") {
        if rc_env == "/dev/null" {
            return Ok(None);
        }
        return Ok(Some(PathBuf::from(rc_env)));
    }

    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    let candidate = home.join(".sundialrc");
    if candidate.exists() {
        return Ok(Some(candidate));
    }

    Ok(None)
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(".sundial"))
}

fn resolve_include_path(base_dir: &Path, include: &str) -> anyhow::Result<PathBuf> {
    if include.trim().is_empty() {
        return Err(anyhow!("include path cannot be empty"));
    }

    let raw = PathBuf::from(include);
    let expanded = expand_tilde(&raw);
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base_dir.join(expanded))
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn defaults_cover_api_url_and_language() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rc = dir.path().join("rc");
        fs::File::create(&rc).expect("create rc");

        let cfg = Config::load(Some(&rc)).expect("load");
        assert_eq!(cfg.get("api.url").as_deref(), Some("http://127.0.0.1:8000"));
        assert_eq!(cfg.get("language").as_deref(), Some("en"));
        assert_eq!(cfg.get_u64("notify.ttl_ms"), Some(5000));
    }

    #[test]
    fn rc_file_and_overrides_win_over_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rc = dir.path().join("rc");
        let mut file = fs::File::create(&rc).expect("create rc");
        writeln!(file, "# comment").expect("write");
        writeln!(file, "api.url = https://sundial.example").expect("write");
        writeln!(file, "language = fa").expect("write");

        let mut cfg = Config::load(Some(&rc)).expect("load");
        assert_eq!(
            cfg.get("api.url").as_deref(),
            Some("https://sundial.example")
        );

        cfg.apply_overrides([("rc.language".to_string(), "en".to_string())]);
        assert_eq!(cfg.get("language").as_deref(), Some("en"));
    }

    #[test]
    fn includes_are_followed_relative_to_the_rc_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let extra = dir.path().join("extra.rc");
        fs::write(&extra, "notify.ttl_ms = 100\n").expect("write extra");
        let rc = dir.path().join("rc");
        fs::write(&rc, "include extra.rc\n").expect("write rc");

        let cfg = Config::load(Some(&rc)).expect("load");
        assert_eq!(cfg.get_u64("notify.ttl_ms"), Some(100));
        assert_eq!(cfg.loaded_files.len(), 2);
    }

    #[test]
    fn malformed_lines_are_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rc = dir.path().join("rc");
        fs::write(&rc, "no equals sign here\n").expect("write rc");
        assert!(Config::load(Some(&rc)).is_err());
    }
}
