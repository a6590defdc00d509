//! Configuration loading and validation.
//!
//! Settings are merged from, in increasing priority:
//!
//! 1. built-in defaults,
//! 2. a TOML file (given explicitly, or `subclipper.toml` in the platform
//!    configuration directory if it exists),
//! 3. environment variables prefixed with `SUBCLIPPER_`,
//! 4. the unprefixed `SEARCH_PATH`, `SQLITE_PATH` and `DEFAULT_PAGE_LENGTH`
//!    variables, for compatibility with existing deployments.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::error::Kind;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "SUBCLIPPER_";
pub const CONFIG_FILE_NAME: &str = "subclipper.toml";
/// Value of `sqlite_path` that selects an ephemeral, in-memory cache.
pub const IN_MEMORY: &str = ":memory:";
const LEGACY_VARIABLES: [&str; 3] = ["SEARCH_PATH", "SQLITE_PATH", "DEFAULT_PAGE_LENGTH"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root directory of the media library. Required.
    pub search_path: PathBuf,
    /// Location of the subtitle cache database. In-memory when absent.
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
    /// Number of search results per page, unless a request asks otherwise.
    #[serde(default = "default_page_length")]
    pub default_page_length: usize,
    /// Match search text case-sensitively.
    #[serde(default)]
    pub case_sensitive: bool,
    /// Explicit `ffmpeg` executable; searched for on the `PATH` when absent.
    #[serde(default)]
    pub ffmpeg: Option<PathBuf>,
    /// Font used for text burnt into clips.
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

fn default_page_length() -> usize {
    50
}

/// Defaults for everything except the (required) search path.
#[derive(Serialize)]
struct Defaults {
    default_page_length: usize,
    case_sensitive: bool,
}
impl Default for Defaults {
    fn default() -> Self {
        Self { default_page_length: default_page_length(), case_sensitive: false }
    }
}

impl Config {
    /// Load the configuration from every source, then validate it.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(file))
    }

    /// Assemble (but do not extract) the layered configuration sources.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Defaults::default()));
        figment = match file {
            Some(file) => figment.merge(Toml::file_exact(file)),
            None => match Self::default_file() {
                Some(file) => figment.merge(Toml::file(file)),
                None => figment,
            },
        };
        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Env::raw().only(&LEGACY_VARIABLES))
    }

    /// `subclipper.toml` in the platform configuration directory.
    pub fn default_file() -> Option<PathBuf> {
        ProjectDirs::from("", "", "subclipper").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = match figment.extract() {
            Ok(config) => config,
            Err(err) => match &err.kind {
                Kind::MissingField(field) => {
                    let field = field.to_string();
                    return Err(exn::Exn::from(err).raise(ErrorKind::MissingField(field)));
                },
                _ => return Err(exn::Exn::from(err).raise(ErrorKind::Load)),
            },
        };
        config.validate()?;
        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.search_path.as_os_str().is_empty() {
            exn::bail!(ErrorKind::MissingField("search_path".to_string()));
        }
        if !self.search_path.is_dir() {
            exn::bail!(ErrorKind::Invalid {
                field: "search_path",
                reason: format!("{} is not a directory", self.search_path.display()),
            });
        }
        if self.default_page_length == 0 {
            exn::bail!(ErrorKind::Invalid {
                field: "default_page_length",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(font) = &self.font_path
            && !font.is_file()
        {
            exn::bail!(ErrorKind::Invalid {
                field: "font_path",
                reason: format!("{} is not a file", font.display()),
            });
        }
        Ok(())
    }

    /// The cache database file, or `None` for an in-memory cache.
    pub fn cache_location(&self) -> Option<&Path> {
        self.sqlite_path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty() && path.as_os_str() != IN_MEMORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn library(jail: &Jail) -> String {
        let root = jail.directory().join("media");
        std::fs::create_dir_all(&root).unwrap();
        root.to_string_lossy().into_owned()
    }

    fn load(jail: &Jail, file: Option<&str>) -> Result<Config> {
        let file = file.map(|f| jail.directory().join(f));
        Config::load(file.as_deref())
    }

    #[test]
    fn test_defaults_from_legacy_variables() {
        Jail::expect_with(|jail| {
            let root = library(jail);
            jail.set_env("SEARCH_PATH", &root);
            let config = load(jail, None).unwrap();
            assert_eq!(config.search_path, PathBuf::from(&root));
            assert_eq!(config.default_page_length, 50);
            assert!(!config.case_sensitive);
            assert_eq!(config.cache_location(), None);
            Ok(())
        });
    }

    #[test]
    fn test_missing_search_path() {
        Jail::expect_with(|jail| {
            let err = load(jail, None).unwrap_err();
            assert!(matches!(&*err, ErrorKind::MissingField(field) if field == "search_path"));
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env_priority() {
        Jail::expect_with(|jail| {
            let root = library(jail);
            jail.create_file(
                "config.toml",
                &format!("search_path = {root:?}\nsqlite_path = \"cache.sqlite\"\ndefault_page_length = 20\ncase_sensitive = true\n"),
            )?;
            let config = load(jail, Some("config.toml")).unwrap();
            assert_eq!(config.default_page_length, 20);
            assert!(config.case_sensitive);
            assert_eq!(config.cache_location(), Some(Path::new("cache.sqlite")));

            jail.set_env("SUBCLIPPER_DEFAULT_PAGE_LENGTH", "30");
            assert_eq!(load(jail, Some("config.toml")).unwrap().default_page_length, 30);
            jail.set_env("DEFAULT_PAGE_LENGTH", "40");
            assert_eq!(load(jail, Some("config.toml")).unwrap().default_page_length, 40);
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_must_exist() {
        Jail::expect_with(|jail| {
            jail.set_env("SEARCH_PATH", library(jail));
            let err = load(jail, Some("nope.toml")).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Load));
            Ok(())
        });
    }

    #[rstest]
    #[case("0", "default_page_length")]
    #[case("many", "")]
    fn test_invalid_page_length(#[case] value: &str, #[case] field: &str) {
        Jail::expect_with(|jail| {
            jail.set_env("SEARCH_PATH", library(jail));
            jail.set_env("DEFAULT_PAGE_LENGTH", value);
            let err = load(jail, None).unwrap_err();
            match &*err {
                ErrorKind::Invalid { field: invalid, .. } => assert_eq!(*invalid, field),
                ErrorKind::Load => assert!(field.is_empty()),
                other => panic!("unexpected error: {other}"),
            }
            Ok(())
        });
    }

    #[test]
    fn test_search_path_must_be_a_directory() {
        Jail::expect_with(|jail| {
            jail.create_file("file.mkv", "")?;
            jail.set_env("SEARCH_PATH", jail.directory().join("file.mkv").display());
            let err = load(jail, None).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid { field: "search_path", .. }));
            Ok(())
        });
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some(""), None)]
    #[case(Some(":memory:"), None)]
    #[case(Some("/var/cache/subclipper.sqlite"), Some("/var/cache/subclipper.sqlite"))]
    fn test_cache_location(#[case] sqlite_path: Option<&str>, #[case] expected: Option<&str>) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            search_path: dir.path().to_path_buf(),
            sqlite_path: sqlite_path.map(PathBuf::from),
            default_page_length: 50,
            case_sensitive: false,
            ffmpeg: None,
            font_path: None,
        };
        assert_eq!(config.cache_location(), expected.map(Path::new));
    }
}
