//! Platform directories used for user-level configuration

use std::path::PathBuf;

use etcetera::BaseStrategy;

/// Application directory name under the platform config directory
const APP_DIR: &str = "pyroxy";

/// Directory holding the user configuration, e.g. `~/.config/pyroxy`
pub fn user_config_dir() -> Option<PathBuf> {
    etcetera::choose_base_strategy()
        .ok()
        .map(|strategy| strategy.config_dir().join(APP_DIR))
}

/// Path of the user configuration file, whether or not it exists
pub fn user_config_file() -> Option<PathBuf> {
    user_config_dir().map(|dir| dir.join("pyroxy.toml"))
}
