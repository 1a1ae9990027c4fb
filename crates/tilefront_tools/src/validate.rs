//! Config file loading and validation.

use std::path::Path;

use tilefront_core::config::MatchConfig;

use crate::{Result, ToolError};

/// Read and validate a RON match config.
///
/// # Errors
///
/// [`ToolError::Io`] if the file cannot be read, otherwise whatever
/// [`MatchConfig::from_ron_str`] reports.
pub fn load_config(path: &Path) -> Result<MatchConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| ToolError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config = MatchConfig::from_ron_str(&text)?;
    let (width, height) = config.effective_dimensions();
    tracing::debug!(
        path = %path.display(),
        width,
        height,
        seed = config.seed,
        "Loaded match config"
    );
    Ok(config)
}

/// One-line description of a valid config.
#[must_use]
pub fn describe(config: &MatchConfig) -> String {
    let (width, height) = config.effective_dimensions();
    let r = config.starting_resources;
    format!(
        "{width}x{height} map, seed {}, {:?} difficulty, {:?} movement, \
         starting metal {} gold {} wood {}",
        config.seed, config.difficulty, config.connectivity, r.metal, r.gold, r.wood
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilefront_core::config::Difficulty;
    use tilefront_core::error::GameError;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("tilefront_{}_{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_valid_config() {
        let path = write_temp("valid.ron", "(width: 60, height: 50, seed: 3, difficulty: Hard)");
        let config = load_config(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.seed, 3);
        assert_eq!(config.difficulty, Difficulty::Hard);
        assert_eq!(config.effective_dimensions(), (72, 60));
        assert!(describe(&config).starts_with("72x60 map, seed 3"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.ron")).unwrap_err();
        assert!(matches!(err, ToolError::Io { .. }));
    }

    #[test]
    fn test_too_small_is_rejected() {
        let path = write_temp("small.ron", "(width: 10, height: 10)");
        let err = load_config(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, ToolError::Game(GameError::InvalidConfig(_))));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let path = write_temp("garbage.ron", "width = 5");
        let err = load_config(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, ToolError::Game(GameError::ConfigParse(_))));
    }
}
