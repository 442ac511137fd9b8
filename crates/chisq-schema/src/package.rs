//! Package-level metadata shared by every chisq crate.
//!
//! Everything except the product name is inherited from
//! `[workspace.package]` through the Cargo environment.

use serde::Serialize;

/// Name of the product and of its binary.
pub const PACKAGE_NAME: &str = "chisq";
pub const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PACKAGE_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
pub const HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");
pub const LICENSE: &str = env!("CARGO_PKG_LICENSE");

/// One-line statement of what chisq does.
pub const PURPOSE: &str = PACKAGE_DESCRIPTION;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub homepage: &'static str,
    pub license: &'static str,
}

pub fn package_info() -> PackageInfo {
    PackageInfo {
        name: PACKAGE_NAME,
        version: PACKAGE_VERSION,
        description: PACKAGE_DESCRIPTION,
        homepage: HOMEPAGE,
        license: LICENSE,
    }
}
