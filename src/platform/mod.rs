// GitBrowser archive platform paths
// Linux:   $XDG_CONFIG_HOME/gitbrowser/archive, $XDG_DATA_HOME/gitbrowser/archive
// macOS:   ~/Library/Application Support/GitBrowser/Archive
// Windows: %APPDATA%/GitBrowser/Archive

use std::env;
use std::path::PathBuf;

/// Overrides the data directory (where the archive database lives).
pub const DATA_DIR_ENV: &str = "GITBROWSER_ARCHIVE_DATA_DIR";

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn xdg_dir(var: &str, fallback: &[&str]) -> PathBuf {
    let base = match env::var(var) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let home = env::var("HOME").unwrap_or_else(|_| String::from("/tmp"));
            fallback.iter().fold(PathBuf::from(home), |p, part| p.join(part))
        }
    };
    base.join("gitbrowser").join("archive")
}

#[cfg(target_os = "macos")]
fn app_support_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
        .join("Library")
        .join("Application Support")
        .join("GitBrowser")
        .join("Archive")
}

#[cfg(target_os = "windows")]
fn appdata_dir() -> PathBuf {
    let appdata = env::var("APPDATA")
        .unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Roaming"));
    PathBuf::from(appdata).join("GitBrowser").join("Archive")
}

/// Returns the directory holding `archive_settings.json`.
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        app_support_dir()
    }
    #[cfg(target_os = "windows")]
    {
        appdata_dir()
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        xdg_dir("XDG_CONFIG_HOME", &[".config"])
    }
}

/// Returns the directory holding the archive database. Honors [`DATA_DIR_ENV`].
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    #[cfg(target_os = "macos")]
    {
        app_support_dir()
    }
    #[cfg(target_os = "windows")]
    {
        appdata_dir()
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        xdg_dir("XDG_DATA_HOME", &[".local", "share"])
    }
}
