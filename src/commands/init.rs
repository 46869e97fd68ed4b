//! `Init` orchestrator (spec §4.H "List / Init"). Writes a template
//! `settings.toml`; existence is a skip unless `force`.

use std::path::PathBuf;

use anyhow::Result;

pub fn init(dir: &std::path::Path, force: bool) -> Result<PathBuf> {
    crate::config::init_template(dir, force)
}
