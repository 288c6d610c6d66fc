//! Show where SQLMan keeps its files.

use sqlman_ai::{local_ai_paths, BootstrapConfig};

pub(crate) fn run() -> miette::Result<()> {
    let config = BootstrapConfig::from_env();

    println!("SQLMan Local AI Configuration");
    println!("=============================");
    println!();
    println!(
        "Data directory:   {}",
        local_ai_paths::sqlman_data_dir().display()
    );
    println!("Virtualenv:       {}", config.venv_dir.display());
    println!("  Exists: {}", config.venv_dir.exists());
    println!("Server script:    {}", config.server_script.display());
    println!("  Exists: {}", config.server_script.exists());
    println!();
    println!("Server URL:       {}", config.server_url);
    println!("Model repository: {}", config.model_repo);
    println!(
        "HF token:         {}",
        if config.hf_token.is_empty() { "not set" } else { "set" }
    );
    println!(
        "Python:           {}.{}",
        config.python_version.0, config.python_version.1
    );
    println!();
    println!("Default port:     {}", sqlman_ai::DEFAULT_LOCAL_AI_PORT);

    Ok(())
}
