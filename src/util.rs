use std::path::PathBuf;

const STORYTELLER_CONFIG: &str = "STORYTELLER_CONFIG";

pub fn get_config_path() -> Option<PathBuf> {
    std::env::var_os(STORYTELLER_CONFIG).map(PathBuf::from)
}

const STORYTELLER_STATE_DIR: &str = "STORYTELLER_STATE_DIR";

const DEFAULT_STATE_DIR: &str = "./.storyteller";

pub fn get_state_dir() -> PathBuf {
    std::env::var_os(STORYTELLER_STATE_DIR)
        .filter(|dir| !dir.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_STATE_DIR), PathBuf::from)
}
