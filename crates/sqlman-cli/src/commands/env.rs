//! Virtual environment maintenance.

use sqlman_ai::{BootstrapConfig, PythonEnvironment};

fn environment() -> PythonEnvironment {
    let config = BootstrapConfig::from_env();
    let (major, minor) = config.python_version;
    PythonEnvironment::new(config.venv_dir).with_required_version(major, minor)
}

/// Report the interpreter and virtualenv state.
pub(crate) async fn status() -> miette::Result<()> {
    let env = environment();

    println!("{}", env.installation_status().await);
    if env.exists() {
        println!("Virtual environment: {}", env.venv_dir().display());
    } else {
        println!(
            "Virtual environment not found at {}; `sqlman start` will create it.",
            env.venv_dir().display()
        );
    }

    Ok(())
}

pub(crate) async fn update() -> miette::Result<()> {
    let env = environment();

    println!("Updating packages in {}...", env.venv_dir().display());
    println!("This may take a while depending on your connection...");
    env.update_requirements()
        .await
        .map_err(|e| miette::miette!("Failed to update requirements: {}", e))?;
    println!("Requirements updated successfully");

    Ok(())
}

pub(crate) fn delete() -> miette::Result<()> {
    let mut env = environment();

    let removed = env
        .delete()
        .map_err(|e| miette::miette!("Failed to delete virtual environment: {}", e))?;
    if removed {
        println!("Virtual environment deleted successfully");
    } else {
        println!("Virtual environment does not exist");
    }

    Ok(())
}
