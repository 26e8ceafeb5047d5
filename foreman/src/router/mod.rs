//! Package routing
//!
//! Decides which monorepo packages a change or requirement category
//! touches, so gates run only where they matter.

pub mod packages;

pub use packages::{
    detect_package_from_category, detect_packages_from_files, Package, UnknownPackage,
};
