//! Linux packaging: `.deb` and `.rpm` from one staged install image.
//!
//! # Build Requirements
//!
//! | Format | Required Tools |
//! |--------|----------------|
//! | .deb | `fakeroot`, `dpkg-deb` |
//! | .rpm | `fakeroot`, `rpmbuild` |
//!
//! `fakeroot` can be disabled in the settings.
//!
//! # Install image
//!
//! ```text
//! tmp/<packName>/
//!   DEBIAN/control
//!   opt/<name>/              runtime, renamed executable, icon.png
//!   opt/<name>/resources/    app.asar, dictionaries/
//!   usr/share/applications/<name>.desktop
//! ```
//!
//! The [`freedesktop`] module writes the desktop entry and the other
//! metadata files into that image.

pub mod debian;
pub mod freedesktop;
pub mod rpm;

use crate::bundler::settings::Settings;
use std::path::Path;

/// `fakeroot` wrapper when enabled.
pub(crate) fn fakeroot(settings: &Settings) -> Option<&Path> {
    let tools = settings.tools();
    tools.use_fakeroot.then_some(tools.fakeroot.as_path())
}
