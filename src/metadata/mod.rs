//! Application manifest loaded from the app's own `package.json`.
//!
//! The manifest is read once per pipeline run and never mutated; every
//! templated file is rendered from it.

use crate::bundler::{Arch, Error, ErrorExt, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// npm `author` field, either `"Name <mail> (url)"` or an object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Author {
    /// Free-form author string.
    Text(String),
    /// Structured author object.
    Person {
        /// Display name
        name: String,
        /// Contact address
        #[serde(default)]
        email: Option<String>,
        /// Homepage
        #[serde(default)]
        url: Option<String>,
    },
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Author::Text(text) => f.write_str(text),
            Author::Person { name, email, .. } => match email {
                Some(email) => write!(f, "{name} <{email}>"),
                None => f.write_str(name),
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    name: Option<String>,
    product_name: Option<String>,
    version: Option<String>,
    description: Option<String>,
    author: Option<Author>,
}

/// Package metadata consumed by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Machine name; install directory and executable name.
    pub name: String,
    /// Human-readable name shown in menus. Falls back to `name`.
    pub product_name: String,
    /// Version string.
    pub version: String,
    /// One-line description. Empty when absent.
    pub description: String,
    /// Normalised author text. Empty when absent.
    pub author: String,
}

impl Manifest {
    /// Load and validate a manifest file.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .fs_context("reading manifest", path)?;
        Self::parse(&text, path)
    }

    /// Parse manifest JSON. `origin` is only used in error messages.
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let raw: RawManifest = serde_json::from_str(text).map_err(|e| Error::Manifest {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;

        let required = |value: Option<String>, field: &str| {
            value.filter(|v| !v.trim().is_empty()).ok_or_else(|| Error::Manifest {
                path: origin.to_path_buf(),
                reason: format!("missing required field `{field}`"),
            })
        };
        let name = required(raw.name, "name")?;
        let version = required(raw.version, "version")?;
        if name.contains('/') || name.contains(char::is_whitespace) {
            return Err(Error::Manifest {
                path: origin.to_path_buf(),
                reason: format!("`name` must be a plain file name, got {name:?}"),
            });
        }

        Ok(Self {
            product_name: raw.product_name.unwrap_or_else(|| name.clone()),
            description: raw.description.unwrap_or_default(),
            author: raw.author.map(|a| a.to_string()).unwrap_or_default(),
            name,
            version,
        })
    }

    /// Release package base name, e.g. `sample-1.2.3-amd64`.
    pub fn release_package_name(&self, arch: Arch) -> String {
        format!("{}-{}-{}", self.name, self.version, arch.debian_name())
    }

    /// Substitutions for the desktop entry template.
    pub fn desktop_fields(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("name", self.name.clone()),
            ("productName", self.product_name.clone()),
            ("description", self.description.clone()),
            ("version", self.version.clone()),
            ("author", self.author.clone()),
        ])
    }

    /// Substitutions shared by the Debian control and RPM spec templates.
    pub fn package_fields(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("name", self.name.clone()),
            ("description", self.description.clone()),
            ("version", self.version.clone()),
            ("author", self.author.clone()),
        ])
    }
}
