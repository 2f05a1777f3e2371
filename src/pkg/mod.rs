//! Package-manager detection and command templates.
//!
//! A closed set of managers, each with fixed templates for
//! install/update/remove/check. A platform factory picks the first manager
//! present on `PATH`; there is no dynamic dispatch because the set never
//! grows at runtime.

use std::process::Command;

use crate::domain::Env;
use crate::shell::command_exists;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Brew,
    Choco,
    Winget,
    Pacman,
    Yum,
    Dnf,
    Zypper,
    Snap,
}

#[derive(Debug, Clone, Default)]
pub struct PackageInfo {
    pub name: String,
    pub installed: bool,
    pub version: String,
}

impl PackageManager {
    pub fn name(&self) -> &'static str {
        match self {
            PackageManager::Apt => "apt",
            PackageManager::Brew => "brew",
            PackageManager::Choco => "choco",
            PackageManager::Winget => "winget",
            PackageManager::Pacman => "pacman",
            PackageManager::Yum => "yum",
            PackageManager::Dnf => "dnf",
            PackageManager::Zypper => "zypper",
            PackageManager::Snap => "snap",
        }
    }

    /// Pick the first available manager for the platform.
    pub fn detect(env: &Env) -> Option<Self> {
        let candidates: &[PackageManager] = match env.os.as_str() {
            "linux" => &[
                PackageManager::Apt,
                PackageManager::Yum,
                PackageManager::Dnf,
                PackageManager::Pacman,
                PackageManager::Zypper,
                PackageManager::Snap,
            ],
            "macos" => &[PackageManager::Brew],
            "windows" => &[PackageManager::Choco, PackageManager::Winget],
            _ => &[],
        };
        candidates.iter().copied().find(|m| command_exists(m.name()))
    }

    pub fn install_command(&self, pkg: &str) -> String {
        match self {
            PackageManager::Apt => format!("sudo apt install {pkg}"),
            PackageManager::Brew => format!("brew install {pkg}"),
            PackageManager::Choco => format!("choco install {pkg} -y"),
            PackageManager::Winget => format!("winget install {pkg}"),
            PackageManager::Pacman => format!("sudo pacman -S {pkg}"),
            PackageManager::Yum => format!("sudo yum install {pkg}"),
            PackageManager::Dnf => format!("sudo dnf install {pkg}"),
            PackageManager::Zypper => format!("sudo zypper install {pkg}"),
            PackageManager::Snap => format!("sudo snap install {pkg}"),
        }
    }

    pub fn update_command(&self, pkg: &str) -> String {
        match self {
            PackageManager::Apt => format!("sudo apt update && sudo apt upgrade {pkg}"),
            PackageManager::Brew => format!("brew upgrade {pkg}"),
            PackageManager::Choco => format!("choco upgrade {pkg} -y"),
            PackageManager::Winget => format!("winget upgrade {pkg}"),
            PackageManager::Pacman => format!("sudo pacman -Syu {pkg}"),
            PackageManager::Yum => format!("sudo yum update {pkg}"),
            PackageManager::Dnf => format!("sudo dnf upgrade {pkg}"),
            PackageManager::Zypper => format!("sudo zypper update {pkg}"),
            PackageManager::Snap => format!("sudo snap refresh {pkg}"),
        }
    }

    pub fn remove_command(&self, pkg: &str) -> String {
        match self {
            PackageManager::Apt => format!("sudo apt remove {pkg}"),
            PackageManager::Brew => format!("brew uninstall {pkg}"),
            PackageManager::Choco => format!("choco uninstall {pkg} -y"),
            PackageManager::Winget => format!("winget uninstall {pkg}"),
            PackageManager::Pacman => format!("sudo pacman -R {pkg}"),
            PackageManager::Yum => format!("sudo yum remove {pkg}"),
            PackageManager::Dnf => format!("sudo dnf remove {pkg}"),
            PackageManager::Zypper => format!("sudo zypper remove {pkg}"),
            PackageManager::Snap => format!("sudo snap remove {pkg}"),
        }
    }

    /// Query used to test whether a package is installed.
    pub fn check_command(&self, pkg: &str) -> String {
        match self {
            PackageManager::Apt => format!("dpkg -l {pkg}"),
            PackageManager::Brew => format!("brew list --versions {pkg}"),
            PackageManager::Choco => format!("choco list --local-only {pkg}"),
            PackageManager::Winget => format!("winget list --name {pkg}"),
            PackageManager::Pacman => format!("pacman -Q {pkg}"),
            PackageManager::Yum | PackageManager::Dnf | PackageManager::Zypper => {
                format!("rpm -q {pkg}")
            }
            PackageManager::Snap => format!("snap list {pkg}"),
        }
    }

    pub fn requires_sudo(&self) -> bool {
        matches!(
            self,
            PackageManager::Apt
                | PackageManager::Pacman
                | PackageManager::Yum
                | PackageManager::Dnf
                | PackageManager::Zypper
                | PackageManager::Snap
        )
    }

    /// Run the check query and parse installed status plus a best-effort
    /// version string.
    pub fn check_package(&self, pkg: &str) -> PackageInfo {
        let mut info = PackageInfo { name: pkg.to_string(), ..PackageInfo::default() };

        let check = self.check_command(pkg);
        let mut parts = check.split_whitespace();
        let Some(program) = parts.next() else {
            return info;
        };
        let output = Command::new(program).args(parts).output();

        let Ok(output) = output else {
            return info;
        };
        if !output.status.success() {
            return info;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.to_lowercase().contains(&pkg.to_lowercase()) {
            return info;
        }

        info.installed = true;
        info.version = parse_version(self, pkg, &stdout);
        info
    }
}

fn parse_version(manager: &PackageManager, pkg: &str, stdout: &str) -> String {
    match manager {
        PackageManager::Apt => stdout
            .lines()
            .find(|line| line.starts_with("ii") && line.contains(pkg))
            .and_then(|line| line.split_whitespace().nth(2))
            .unwrap_or_default()
            .to_string(),
        _ => stdout
            .lines()
            .find(|line| line.to_lowercase().contains(&pkg.to_lowercase()))
            .and_then(|line| line.split_whitespace().nth(1))
            .unwrap_or_default()
            .to_string(),
    }
}
