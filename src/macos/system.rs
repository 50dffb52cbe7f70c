//! [`System`] implementation for a real macOS host.
//!
//! Protection state is read from `csrutil status` and, on Apple silicon,
//! `nvram boot-args`.  Installing copies the configured `.osax` bundle into
//! the scripting additions directory; injecting runs the configured loader.

use crate::config::InstallConfig;
use crate::traits::System;
use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Boot argument required to load arm64e code into Dock on Apple silicon.
const ARM64E_BOOT_ARG: &str = "-arm64e_preview_abi";

/// macOS host backend.
pub struct MacSystem {
    bundle: PathBuf,
    target_dir: PathBuf,
    loader: PathBuf,
}

/// Errors from the privileged steps.
#[derive(Debug, thiserror::Error)]
#[error("macos: {0}")]
pub struct MacSystemError(String);

impl MacSystem {
    pub fn new(config: &InstallConfig) -> Self {
        Self {
            bundle: config.bundle.clone(),
            target_dir: config.target_dir.clone(),
            loader: config.loader.clone(),
        }
    }

    /// Where the bundle lives once installed.
    pub fn installed_path(&self) -> Result<PathBuf, MacSystemError> {
        let name = self.bundle.file_name().ok_or_else(|| {
            MacSystemError(format!("bundle path {} has no file name", self.bundle.display()))
        })?;
        Ok(self.target_dir.join(name))
    }
}

impl System for MacSystem {
    type Error = MacSystemError;

    fn is_root(&self) -> bool {
        nix::unistd::geteuid().is_root()
    }

    fn protections(&self) -> Result<(), String> {
        let sip = run_tool("csrutil", &["status"])?;
        check_sip(&sip)?;
        if cfg!(target_arch = "aarch64") {
            let boot_args = run_tool("nvram", &["boot-args"])
                .map_err(|_| format!("boot argument {} is not set", ARM64E_BOOT_ARG))?;
            check_boot_args(&boot_args)?;
        }
        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.installed_path().map(|p| p.is_dir()).unwrap_or(false)
    }

    fn install_payload(&self) -> Result<(), MacSystemError> {
        if !self.bundle.is_dir() {
            return Err(MacSystemError(format!(
                "bundle {} not found",
                self.bundle.display()
            )));
        }
        let dest = self.installed_path()?;
        fs::create_dir_all(&self.target_dir).map_err(|e| {
            MacSystemError(format!("create {}: {}", self.target_dir.display(), e))
        })?;
        remove_if_present(&dest)
            .map_err(|e| MacSystemError(format!("remove old {}: {}", dest.display(), e)))?;
        copy_tree(&self.bundle, &dest).map_err(|e| {
            MacSystemError(format!(
                "copy {} to {}: {}",
                self.bundle.display(),
                dest.display(),
                e
            ))
        })?;
        info!("installed {} to {}", self.bundle.display(), dest.display());
        Ok(())
    }

    fn uninstall_payload(&self) -> Result<(), MacSystemError> {
        let dest = self.installed_path()?;
        remove_if_present(&dest)
            .map_err(|e| MacSystemError(format!("remove {}: {}", dest.display(), e)))?;
        info!("removed {}", dest.display());
        Ok(())
    }

    fn inject(&self) -> Result<(), MacSystemError> {
        debug!("running loader {}", self.loader.display());
        let status = Command::new(&self.loader)
            .status()
            .map_err(|e| MacSystemError(format!("run {}: {}", self.loader.display(), e)))?;
        if !status.success() {
            return Err(MacSystemError(format!(
                "{} exited with {}",
                self.loader.display(),
                status
            )));
        }
        Ok(())
    }
}

//  Helpers

/// Run a system tool and return its stdout.
fn run_tool(program: &str, args: &[&str]) -> Result<String, String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| format!("cannot run {}: {}", program, e))?;
    if !output.status.success() {
        return Err(format!("{} exited with {}", program, output.status));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Accept either a fully disabled SIP or a custom configuration with both
/// filesystem protections and debugging restrictions turned off.
fn check_sip(status: &str) -> Result<(), String> {
    let first = status.lines().next().unwrap_or_default();
    if first.contains("status: disabled") {
        return Ok(());
    }
    let disabled = |key: &str| {
        status.lines().any(|line| {
            let line = line.trim();
            line.strip_prefix(key)
                .map(|rest| rest.trim_start_matches(':').trim().starts_with("disabled"))
                .unwrap_or(false)
        })
    };
    if !disabled("Filesystem Protections") {
        return Err("System Integrity Protection: filesystem protections are enabled".into());
    }
    if !disabled("Debugging Restrictions") {
        return Err("System Integrity Protection: debugging restrictions are enabled".into());
    }
    Ok(())
}

fn check_boot_args(output: &str) -> Result<(), String> {
    if output.split_whitespace().any(|arg| arg == ARM64E_BOOT_ARG) {
        Ok(())
    } else {
        Err(format!("boot argument {} is not set", ARM64E_BOOT_ARG))
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Recursively copy `src` to `dst`, preserving symlinks.
fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let kind = entry.file_type()?;
        if kind.is_dir() {
            copy_tree(&from, &to)?;
        } else if kind.is_symlink() {
            std::os::unix::fs::symlink(fs::read_link(&from)?, &to)?;
        } else {
            fs::copy(&from, &to)?;
        }
    }
    Ok(())
}
