use std::path::PathBuf;

/// User-local SoundNav directory (`~/.config/soundnav/` on Linux).
///
/// Falls back to `./soundnav` when the platform has no config directory.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SOUNDNAV_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("soundnav")
}

pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn settings_file() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn log_file() -> PathBuf {
    config_dir().join("soundnav.log")
}
