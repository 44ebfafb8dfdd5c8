//! Folder and goal commands

use anyhow::{Context, Result};
use bookreader_core::ReaderApp;

/// List saved folders
pub async fn folders_list(app: &ReaderApp) -> Result<()> {
    let folders = app.folders().await;
    if folders.is_empty() {
        println!("No folders. Add one with `bookreader folders add <DIR>`.");
    }
    for folder in folders {
        println!("{}", folder.title);
        println!("    {}", folder.path);
    }
    Ok(())
}

/// Save a folder to scan
pub async fn folders_add(app: &ReaderApp, uri: &str) -> Result<()> {
    // Plain paths are stored absolute so later scans do not depend on the cwd
    let uri = if uri.contains("://") {
        uri.to_string()
    } else {
        std::fs::canonicalize(uri)
            .with_context(|| format!("Folder not found: {}", uri))?
            .to_string_lossy()
            .into_owned()
    };

    if app.add_folder(&uri).await.context("Failed to save folder")? {
        println!("Added {}", uri);
    } else {
        println!("Already added: {}", uri);
    }
    Ok(())
}

/// Forget a saved folder
pub async fn folders_remove(app: &ReaderApp, uri: &str) -> Result<()> {
    let mut removed = app.remove_folder(uri).await.context("Failed to save folders")?;
    if !removed {
        if let Ok(path) = std::fs::canonicalize(uri) {
            removed = app
                .remove_folder(&path.to_string_lossy())
                .await
                .context("Failed to save folders")?;
        }
    }

    if removed {
        println!("Removed {}", uri);
    } else {
        println!("Not a saved folder: {}", uri);
    }
    Ok(())
}

/// Show or set the reading goal
pub async fn goal(app: &ReaderApp, value: Option<u32>) -> Result<()> {
    if let Some(value) = value {
        app.set_goal(value).await.context("Failed to save goal")?;
    }
    println!("Reading goal: {}", app.goal().await);
    Ok(())
}
