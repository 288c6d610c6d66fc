//! Path utilities for SQLMan data directories.

use std::path::{Path, PathBuf};

/// Get the SQLMan data directory (~/.sqlman/).
///
/// Falls back to the system temp directory when no home directory can be
/// determined.
pub fn sqlman_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".sqlman")
}

/// Get the default virtual environment directory (~/.sqlman/venv/).
pub fn venv_dir() -> PathBuf {
    sqlman_data_dir().join("venv")
}

/// Get the scripts directory (~/.sqlman/scripts/).
pub fn scripts_dir() -> PathBuf {
    sqlman_data_dir().join("scripts")
}

/// Get the path to the inference server entry point.
///
/// A `scripts/main.py` shipped next to the executable wins over the copy in
/// the data directory.
pub fn server_script_path() -> PathBuf {
    let bundled = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("scripts").join("main.py")));

    match bundled {
        Some(path) if path.exists() => path,
        _ => scripts_dir().join("main.py"),
    }
}

/// Directory holding the executables of a virtual environment.
pub fn venv_bin_dir(venv: &Path) -> PathBuf {
    if cfg!(target_os = "windows") {
        venv.join("Scripts")
    } else {
        venv.join("bin")
    }
}

/// Path to the interpreter inside a virtual environment.
pub fn venv_python(venv: &Path) -> PathBuf {
    let binary_name = if cfg!(target_os = "windows") {
        "python.exe"
    } else {
        "python"
    };
    venv_bin_dir(venv).join(binary_name)
}

/// Ensure the SQLMan data directories exist.
pub fn ensure_dirs() -> std::io::Result<()> {
    std::fs::create_dir_all(sqlman_data_dir())?;
    std::fs::create_dir_all(scripts_dir())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venv_layout() {
        let venv = Path::new("/tmp/sqlman-venv");
        let python = venv_python(venv);
        assert!(python.starts_with(venv_bin_dir(venv)));
        if cfg!(target_os = "windows") {
            assert!(python.ends_with("Scripts/python.exe"));
        } else {
            assert!(python.ends_with("bin/python"));
        }
    }

    #[test]
    fn test_defaults_live_under_data_dir() {
        assert!(venv_dir().starts_with(sqlman_data_dir()));
        assert!(scripts_dir().starts_with(sqlman_data_dir()));
    }
}
