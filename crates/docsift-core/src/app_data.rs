//! Where docsift keeps its own files (the default config).
//!
//! Document data never lands here: the store lives in memory only.

use std::path::PathBuf;

/// Returns the directory holding docsift's config file.
/// On Linux: `~/.config/docsift/`.
/// Creates the directory if it doesn't exist; returns `None` if we can't determine the path.
pub fn app_config_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("app", "Docsift", "docsift")?
        .config_dir()
        .to_path_buf();
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_config_dir_ends_with_app_name() {
        if let Some(dir) = app_config_dir() {
            assert!(dir.to_string_lossy().contains("docsift"));
        }
    }
}
