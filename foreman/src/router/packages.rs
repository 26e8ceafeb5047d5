//! Package detection
//!
//! Maps changed file paths and category names onto the monorepo packages
//! that validation gates run against.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A known package in the monorepo layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Package {
    Frontend,
    Backend,
    Electron,
    Mobile,
    ChromeExtension,
}

impl Package {
    /// Every known package, in routing order.
    pub const ALL: [Package; 5] = [
        Package::Frontend,
        Package::Backend,
        Package::Electron,
        Package::Mobile,
        Package::ChromeExtension,
    ];

    /// Directory name under the workspace root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Package::Frontend => "frontend",
            Package::Backend => "backend",
            Package::Electron => "electron",
            Package::Mobile => "mobile",
            Package::ChromeExtension => "chrome-extension",
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// Error for package names outside the known set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPackage(pub String);

impl fmt::Display for UnknownPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown package: {}", self.0)
    }
}

impl std::error::Error for UnknownPackage {}

impl FromStr for Package {
    type Err = UnknownPackage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Package::ALL
            .into_iter()
            .find(|package| package.dir_name() == s)
            .ok_or_else(|| UnknownPackage(s.to_string()))
    }
}

/// Keyword groups checked in order; the first group with a hit wins.
const PACKAGE_KEYWORDS: &[(Package, &[&str])] = &[
    (
        Package::Frontend,
        &["ui", "frontend", "component", "view", "page"],
    ),
    (Package::Backend, &["api", "backend", "server"]),
    (Package::Electron, &["electron", "desktop"]),
    (Package::Mobile, &["mobile"]),
    (
        Package::ChromeExtension,
        &["chrome-extension", "browser-extension"],
    ),
];

/// Detect affected packages from changed file paths.
///
/// A path belongs to a package when its first segment names the package
/// directory. Results keep first-seen order with duplicates removed;
/// paths outside any known package are ignored.
pub fn detect_packages_from_files<S: AsRef<str>>(paths: &[S]) -> Vec<Package> {
    let mut packages = Vec::new();

    for path in paths {
        let first_segment = match path.as_ref().split('/').next() {
            Some(segment) if !segment.is_empty() => segment,
            _ => continue,
        };
        if let Ok(package) = first_segment.parse::<Package>() {
            if !packages.contains(&package) {
                packages.push(package);
            }
        }
    }

    packages
}

/// Guess the package a requirement category maps to from keywords in its
/// name. Returns None when nothing matches.
pub fn detect_package_from_category(category: &str) -> Option<Package> {
    let category = category.to_lowercase();

    for (package, keywords) in PACKAGE_KEYWORDS {
        if keywords.iter().any(|keyword| category.contains(keyword)) {
            return Some(*package);
        }
    }

    None
}
