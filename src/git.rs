use std::fs;
use std::path::Path;
use std::process::Command;

use log::{debug, info};

use crate::error::Error;

/// Ref prefixes that `git clone --branch` understands directly.
const CLONEABLE_PREFIXES: [&str; 2] = ["refs/heads/", "refs/tags/"];

/// Check out a single ref of a repository into `target_dir` with depth 1
///
/// Branches and tags are cloned with `--single-branch --branch`. Any other
/// ref namespace (`refs/pull/`, `refs/changes/`, ...) is fetched explicitly
/// into a fresh repository and checked out detached.
///
/// This uses the system git command, which automatically handles:
/// - SSH keys from ~/.ssh/
/// - Git credential helpers
/// - Any authentication configured in ~/.gitconfig
pub fn clone_ref(url: &str, prefix: &str, git_ref: &str, target_dir: &Path) -> Result<(), Error> {
    // git won't clone into an existing non-empty dir
    if target_dir.exists() {
        fs::remove_dir_all(target_dir)?;
    }
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    let full_ref = format!("{}{}", prefix, git_ref);
    info!("Cloning {} at {} into {}", url, full_ref, target_dir.display());

    if CLONEABLE_PREFIXES.contains(&prefix) {
        clone_branch(url, git_ref, &full_ref, target_dir)
    } else {
        fetch_ref(url, &full_ref, target_dir)
    }
}

fn clone_branch(url: &str, git_ref: &str, full_ref: &str, target_dir: &Path) -> Result<(), Error> {
    let output = Command::new("git")
        .args(["clone", "--depth=1", "--single-branch", "--branch", git_ref, url])
        .arg(target_dir)
        .output()
        .map_err(|e| Error::GitClone {
            url: url.to_string(),
            r#ref: full_ref.to_string(),
            message: e.to_string(),
            hint: Some("Make sure git is installed and on PATH".to_string()),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::GitClone {
            url: url.to_string(),
            r#ref: full_ref.to_string(),
            message: stderr.trim().to_string(),
            hint: clone_hint(&stderr, git_ref),
        });
    }

    Ok(())
}

fn fetch_ref(url: &str, full_ref: &str, target_dir: &Path) -> Result<(), Error> {
    fs::create_dir_all(target_dir)?;
    run_git(target_dir, url, &["init", "--quiet"])?;
    run_git(target_dir, url, &["fetch", "--depth=1", url, full_ref]).map_err(|e| match e {
        Error::GitCommand { stderr, .. } => Error::GitClone {
            url: url.to_string(),
            r#ref: full_ref.to_string(),
            hint: clone_hint(&stderr, full_ref),
            message: stderr,
        },
        other => other,
    })?;
    run_git(target_dir, url, &["checkout", "--quiet", "FETCH_HEAD"])?;
    Ok(())
}

/// Run a git subcommand inside `cwd`.
fn run_git(cwd: &Path, url: &str, args: &[&str]) -> Result<(), Error> {
    debug!("git {} (in {})", args.join(" "), cwd.display());
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| Error::GitCommand {
            command: args.join(" "),
            url: url.to_string(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(Error::GitCommand {
            command: args.join(" "),
            url: url.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Suggest a fix for common clone failures
fn clone_hint(stderr: &str, git_ref: &str) -> Option<String> {
    if stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("Could not read from remote repository")
    {
        Some(
            "Make sure you have access to the repository (SSH key in ssh-agent or git credentials configured)"
                .to_string(),
        )
    } else if stderr.contains("not found in upstream")
        || stderr.contains("couldn't find remote ref")
    {
        Some(format!(
            "Ref '{}' does not exist; check the source's 'ref' and 'prefix'",
            git_ref
        ))
    } else {
        None
    }
}
