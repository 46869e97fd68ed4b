//! Component G: Configuration Merger (spec §4.G, §3 `Config`). Grounded
//! on the teacher's `config.rs` load/merge shape (`load_global`/
//! `load_project`/`merge`, a `merge_vec_with_placeholder` list-merge
//! helper) but rebuilt around TOML (`toml`/`toml_edit`, pulled in as an
//! enrichment dependency from the `kabu` tool's `Cargo.toml`, replacing
//! the teacher's `serde_yaml`) and spec's project/local file pair within
//! one directory rather than the teacher's global/project-directory
//! split.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

const PROJECT_FILE: &str = "settings.toml";
const LOCAL_FILE: &str = "settings.local.toml";
const CONFIG_DIR: &str = ".twig";

/// On-disk schema for both `settings.toml` and `settings.local.toml`.
/// Every field is optional: absence means "not set", not a default
/// value, so `merge` can tell "local set this to false" apart from
/// "local didn't mention this" for the tri-state booleans.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    symlinks: Vec<String>,
    extra_symlinks: Vec<String>,
    worktree_dest_base_dir: Option<String>,
    default_source: Option<String>,
    init_submodules: Option<bool>,
    submodule_reference: Option<bool>,
}

/// The merged, resolved configuration (spec §3 `Config`).
#[derive(Debug, Clone)]
pub struct Config {
    pub symlinks: Vec<String>,
    pub worktree_dest_base_dir: PathBuf,
    pub worktree_source_dir: PathBuf,
    pub default_source: Option<String>,
    pub init_submodules: Option<bool>,
    pub submodule_reference: Option<bool>,
}

fn load_raw(path: &Path) -> Result<Option<RawConfig>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let raw: RawConfig =
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
            Ok(Some(raw))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Loads `<dir>/.twig/settings.toml` and `<dir>/.twig/settings.local.toml`
/// (either may be absent) and merges per spec §4.G's exact rules.
pub fn load(dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = dir.join(CONFIG_DIR);
    let project = load_raw(&config_dir.join(PROJECT_FILE))?.unwrap_or_default();
    let local = load_raw(&config_dir.join(LOCAL_FILE))?.unwrap_or_default();

    let source_dir = dir
        .canonicalize()
        .map_err(|_| ConfigError::UnresolvablePath(dir.display().to_string()))?;

    Ok(merge(project, local, &source_dir))
}

fn merge(project: RawConfig, local: RawConfig, source_dir: &Path) -> Config {
    // `symlinks`: local's array, if non-empty, fully overrides project's.
    // Empty local array means "not set" (project wins).
    let mut symlinks = if local.symlinks.is_empty() {
        project.symlinks.clone()
    } else {
        local.symlinks.clone()
    };

    // `extra_symlinks`: concatenate project then local, dedup against the
    // already-chosen `symlinks`, append unique entries preserving order.
    let mut seen: HashSet<String> = symlinks.iter().cloned().collect();
    let extra_symlinks: Vec<String> = project
        .extra_symlinks
        .iter()
        .chain(local.extra_symlinks.iter())
        .cloned()
        .collect();
    for entry in extra_symlinks {
        if seen.insert(entry.clone()) {
            symlinks.push(entry);
        }
    }

    let default_source = local.default_source.or(project.default_source);
    let init_submodules = local.init_submodules.or(project.init_submodules);
    let submodule_reference = local.submodule_reference.or(project.submodule_reference);

    let raw_dest = local
        .worktree_dest_base_dir
        .or(project.worktree_dest_base_dir);
    let worktree_dest_base_dir = resolve_dest_base_dir(raw_dest.as_deref(), source_dir);

    Config {
        symlinks,
        worktree_dest_base_dir,
        worktree_source_dir: source_dir.to_path_buf(),
        default_source,
        init_submodules,
        submodule_reference,
    }
}

/// If relative, resolve against `source_dir`; otherwise treat as already
/// absolute. When unset, defaults to
/// `<parent-of-source>/<source-basename>-worktree` (spec §3).
fn resolve_dest_base_dir(raw: Option<&str>, source_dir: &Path) -> PathBuf {
    match raw {
        Some(value) => {
            let p = Path::new(value);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                source_dir.join(p)
            }
        }
        None => {
            let basename = source_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            source_dir
                .parent()
                .map(|parent| parent.join(format!("{basename}-worktree")))
                .unwrap_or_else(|| source_dir.join(format!("{basename}-worktree")))
        }
    }
}

/// Writes a template `settings.toml` (spec §4.H "Init"), grounded on the
/// teacher's `config.rs::init`'s heavily-commented example-file approach,
/// using `toml_edit` so the emitted document keeps human-readable
/// comments the way the teacher's YAML template does.
pub fn init_template(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    let config_dir = dir.join(CONFIG_DIR);
    let path = config_dir.join(PROJECT_FILE);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }
    std::fs::create_dir_all(&config_dir)?;

    let mut doc = toml_edit::DocumentMut::new();
    doc["symlinks"] = toml_edit::value(toml_edit::Array::new());
    doc["extra_symlinks"] = toml_edit::value(toml_edit::Array::new());

    let template = format!(
        "# Worktree personal-file symlinks, relative to this directory.\n\
         # Supports doublestar globs (`**/*.env`).\n\
         {}\n\
         # worktree_dest_base_dir = \"../myproject-worktree\"\n\
         # default_source = \"main\"\n\
         # init_submodules = true\n\
         # submodule_reference = true\n",
        doc
    );

    std::fs::write(&path, template)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_local_symlinks_means_project_wins() {
        let project = RawConfig {
            symlinks: vec![".envrc".to_string()],
            ..Default::default()
        };
        let local = RawConfig::default();
        let cfg = merge(project, local, Path::new("/repo"));
        assert_eq!(cfg.symlinks, vec![".envrc".to_string()]);
    }

    #[test]
    fn nonempty_local_symlinks_fully_overrides_project() {
        let project = RawConfig {
            symlinks: vec![".envrc".to_string()],
            ..Default::default()
        };
        let local = RawConfig {
            symlinks: vec![".env.local".to_string()],
            ..Default::default()
        };
        let cfg = merge(project, local, Path::new("/repo"));
        assert_eq!(cfg.symlinks, vec![".env.local".to_string()]);
    }

    #[test]
    fn extra_symlinks_dedups_against_chosen_symlinks_and_appends() {
        let project = RawConfig {
            symlinks: vec![".envrc".to_string()],
            extra_symlinks: vec![".envrc".to_string(), "secrets.json".to_string()],
            ..Default::default()
        };
        let local = RawConfig {
            extra_symlinks: vec!["secrets.json".to_string(), "config.local.toml".to_string()],
            ..Default::default()
        };
        let cfg = merge(project, local, Path::new("/repo"));
        assert_eq!(
            cfg.symlinks,
            vec![
                ".envrc".to_string(),
                "secrets.json".to_string(),
                "config.local.toml".to_string(),
            ]
        );
    }

    #[test]
    fn tri_state_booleans_preserve_unset_through_merge() {
        let project = RawConfig::default();
        let local = RawConfig::default();
        let cfg = merge(project, local, Path::new("/repo"));
        assert_eq!(cfg.init_submodules, None);
        assert_eq!(cfg.submodule_reference, None);
    }

    #[test]
    fn local_overrides_project_scalar_when_explicitly_set() {
        let project = RawConfig {
            init_submodules: Some(true),
            ..Default::default()
        };
        let local = RawConfig {
            init_submodules: Some(false),
            ..Default::default()
        };
        let cfg = merge(project, local, Path::new("/repo"));
        assert_eq!(cfg.init_submodules, Some(false));
    }

    #[test]
    fn dest_base_dir_defaults_to_sibling_suffix() {
        let cfg = merge(RawConfig::default(), RawConfig::default(), Path::new("/a/repo"));
        assert_eq!(cfg.worktree_dest_base_dir, PathBuf::from("/a/repo-worktree"));
    }

    #[test]
    fn dest_base_dir_relative_resolves_against_source() {
        let project = RawConfig {
            worktree_dest_base_dir: Some("../wt".to_string()),
            ..Default::default()
        };
        let cfg = merge(project, RawConfig::default(), Path::new("/a/repo"));
        assert_eq!(cfg.worktree_dest_base_dir, PathBuf::from("/a/repo/../wt"));
    }
}
