use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// How the fast-refresh preamble is obtained in watch mode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Preamble {
    /// Ask the framework integration, fall back to no preamble.
    #[default]
    Auto,
    Disabled,
    Code(String),
}

impl<'de> Deserialize<'de> for Preamble {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(String),
            Flag(bool),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            None | Some(Raw::Flag(true)) => Preamble::Auto,
            Some(Raw::Flag(false)) => Preamble::Disabled,
            Some(Raw::Code(code)) => Preamble::Code(code),
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentScriptsOptions {
    #[serde(default)]
    pub preamble_code: Preamble,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildMode {
    Build,
    Watch,
}

impl BuildMode {
    pub fn from_watch(watch: bool) -> Self {
        if watch {
            BuildMode::Watch
        } else {
            BuildMode::Build
        }
    }

    pub fn is_watch(self) -> bool {
        self == BuildMode::Watch
    }
}

/// Settings resolved once per session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Project root; script identities are relative to it.
    pub root: PathBuf,
    pub options: ContentScriptsOptions,
}

impl SessionConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            options: ContentScriptsOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ContentScriptsOptions) -> Self {
        self.options = options;
        self
    }
}
