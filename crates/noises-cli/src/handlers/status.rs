//! Status command handler.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Local};
use noises_core::domain::COMPLETION_MARKER;
use noises_core::{BootstrapConfig, InstallationState, remove_dir_hint};

use crate::bootstrap::CliContext;
use crate::error::CliError;

pub fn execute(ctx: &CliContext) -> Result<(), CliError> {
    print!("{}", render(ctx.config()));
    Ok(())
}

fn render(config: &BootstrapConfig) -> String {
    let state = InstallationState::read(&config.cache_dir, &config.runtime_package_dir);

    let mut out = format!("cache = {}\n", config.cache_dir.display());
    let status = if state.is_valid() {
        "installed"
    } else if state.is_partial() {
        "incomplete"
    } else if state.exists {
        "invalid"
    } else {
        "not installed"
    };
    out.push_str(&format!("status = {status}\n"));

    if state.exists {
        out.push_str(&format!("variant = {}\n", state.variant_label()));
    }
    if let Some(installed_at) = completed_at(&config.cache_dir) {
        out.push_str(&format!(
            "installed_at = {}\n",
            installed_at.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    if state.is_partial() {
        out.push_str(&format!(
            "hint = run setup again, or remove the cache: {}\n",
            remove_dir_hint(&config.cache_dir)
        ));
    }
    out.push_str(&format!("log = {}\n", config.log_file.display()));
    out
}

fn completed_at(cache_dir: &Path) -> Option<DateTime<Local>> {
    let modified = fs::metadata(cache_dir.join(COMPLETION_MARKER))
        .and_then(|meta| meta.modified())
        .ok()?;
    Some(DateTime::<Local>::from(modified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use noises_core::domain::mark_complete;
    use tempfile::TempDir;

    fn config(temp: &TempDir) -> BootstrapConfig {
        BootstrapConfig::new(
            temp.path().join("runtime"),
            temp.path().join("setup.log"),
            temp.path().join("noises.lock"),
        )
    }

    #[test]
    fn missing_cache() {
        let temp = TempDir::new().unwrap();
        let text = render(&config(&temp));
        assert!(text.contains("status = not installed"));
        assert!(!text.contains("variant ="));
    }

    #[test]
    fn installed_cache_shows_variant_and_time() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);
        fs::create_dir_all(config.runtime_root()).unwrap();
        mark_complete(&config.cache_dir, "cu124").unwrap();

        let text = render(&config);
        assert!(text.contains("status = installed"));
        assert!(text.contains("variant = cu124"));
        assert!(text.contains("installed_at = "));
    }

    #[test]
    fn partial_cache_suggests_removal() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);
        fs::create_dir_all(config.runtime_root()).unwrap();

        let text = render(&config);
        assert!(text.contains("status = incomplete"));
        assert!(text.contains("hint = "));
    }
}
