//! Runtime configuration for the image server.
//!
//! Settings are layered (later wins):
//! 1. Built-in defaults.
//! 2. A TOML file: the one passed with `--config`, else `doghub.toml` in the
//!    working directory when present.
//! 3. `DOGHUB_*` environment variables, e.g. `DOGHUB_IMAGE_DIR` or
//!    `DOGHUB_ALLOWED_EXTENSIONS=jpg,png`.
//! 4. Command line flags.
//!
//! The result is an immutable [`Config`] built once at startup and handed to
//! the HTTP layer. Nothing reads settings from globals after that.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Extensions served when nothing else is configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Thirty days, in seconds.
pub const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 2_592_000;

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";

const DEFAULT_IMAGE_DIR: &str = "./images";
const DEFAULT_CONFIG_FILE: &str = "doghub.toml";
const ENV_PREFIX: &str = "DOGHUB";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("image directory {} is not accessible: {source}", .path.display())]
    ImageDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image directory {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("invalid bind address {value:?}: {source}")]
    Bind {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("allowed extension list is empty")]
    NoExtensions,
}

/// Case-insensitive set of file extensions.
///
/// Entries are stored lower-case without a leading dot, so `.JPG`, `jpg`
/// and `.jpg` all name the same member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSet(BTreeSet<String>);

impl ExtensionSet {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            extensions
                .into_iter()
                .map(|extension| normalize_extension(extension.as_ref()))
                .filter(|extension| !extension.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.0.contains(&normalize_extension(extension))
    }

    /// Whether the final extension of `path` is a member. Paths without an
    /// extension, or with a non-UTF-8 one, never match.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| self.contains(extension))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for ExtensionSet {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

/// The `DOGHUB_*` variable source.
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("allowed_extensions")
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// Values supplied on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub image_dir: Option<PathBuf>,
    pub bind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    image_dir: PathBuf,
    bind: String,
    allowed_extensions: Vec<String>,
    cache_max_age_secs: u64,
}

/// Immutable server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Canonical absolute path of the image directory; the trust boundary
    /// for every resolved request.
    pub base_dir: PathBuf,
    pub bind: SocketAddr,
    pub extensions: ExtensionSet,
    pub cache_max_age_secs: u64,
}

impl Config {
    /// Build a configuration from explicit values, canonicalizing the image
    /// directory.
    pub fn new(
        image_dir: impl AsRef<Path>,
        bind: SocketAddr,
        extensions: ExtensionSet,
    ) -> Result<Self, ConfigError> {
        if extensions.is_empty() {
            return Err(ConfigError::NoExtensions);
        }

        let image_dir = image_dir.as_ref();
        let base_dir = image_dir
            .canonicalize()
            .map_err(|source| ConfigError::ImageDir {
                path: image_dir.to_path_buf(),
                source,
            })?;
        if !base_dir.is_dir() {
            return Err(ConfigError::NotADirectory(base_dir));
        }

        Ok(Self {
            base_dir,
            bind,
            extensions,
            cache_max_age_secs: DEFAULT_CACHE_MAX_AGE_SECS,
        })
    }

    /// Load the layered configuration described in the module docs.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::load_from(overrides, Path::new(DEFAULT_CONFIG_FILE), environment())
    }

    fn load_from(
        overrides: &ConfigOverrides,
        default_file: &Path,
        environment: config::Environment,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("image_dir", DEFAULT_IMAGE_DIR)?
            .set_default("bind", DEFAULT_BIND)?
            .set_default("allowed_extensions", DEFAULT_EXTENSIONS.to_vec())?
            .set_default("cache_max_age_secs", DEFAULT_CACHE_MAX_AGE_SECS)?;

        builder = match &overrides.config_file {
            Some(path) => builder.add_source(config::File::from(path.as_path()).required(true)),
            None => builder.add_source(config::File::from(default_file).required(false)),
        };

        let settings = builder
            .add_source(environment)
            .set_override_option(
                "image_dir",
                overrides
                    .image_dir
                    .as_ref()
                    .map(|path| path.to_string_lossy().into_owned()),
            )?
            .set_override_option("bind", overrides.bind.clone())?
            .build()?;

        let raw: RawConfig = settings.try_deserialize()?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let bind = raw
            .bind
            .parse()
            .map_err(|source| ConfigError::Bind {
                value: raw.bind.clone(),
                source,
            })?;

        let extensions = ExtensionSet::new(&raw.allowed_extensions);
        let mut config = Self::new(&raw.image_dir, bind, extensions)?;
        config.cache_max_age_secs = raw.cache_max_age_secs;
        Ok(config)
    }

    /// Value of the `Cache-Control` header sent with every served image.
    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.cache_max_age_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn any_bind() -> SocketAddr {
        "127.0.0.1:0".parse().expect("valid address")
    }

    #[test]
    fn extension_set_ignores_case_and_leading_dot() {
        let set = ExtensionSet::new([".JPG", "png", " .WebP "]);

        assert!(set.contains("jpg"));
        assert!(set.contains(".Jpg"));
        assert!(set.contains("PNG"));
        assert!(set.contains("webp"));
        assert!(!set.contains("gif"));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["jpg", "png", "webp"]);
    }

    #[test]
    fn extension_set_matches_on_final_extension_only() {
        let set = ExtensionSet::default();

        assert!(set.matches(Path::new("dogs/rex.JPEG")));
        assert!(set.matches(Path::new("archive.tar.png")));
        assert!(!set.matches(Path::new("notes.txt")));
        assert!(!set.matches(Path::new("image.png.txt")));
        assert!(!set.matches(Path::new("README")));
        assert!(!set.matches(Path::new(".png")));
    }

    #[test]
    fn empty_entries_are_dropped() {
        let set = ExtensionSet::new(["", ".", "  "]);
        assert!(set.is_empty());
    }

    #[test]
    fn new_canonicalizes_image_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(temp.path().join("pics")).expect("mkdir");
        let dotted = temp.path().join("pics").join(".").join("..").join("pics");

        let config = Config::new(&dotted, any_bind(), ExtensionSet::default()).expect("config");

        let expected = temp.path().join("pics").canonicalize().expect("canonical");
        assert_eq!(config.base_dir, expected);
        assert!(config.base_dir.is_absolute());
        assert_eq!(config.cache_control(), "public, max-age=2592000");
    }

    #[test]
    fn new_rejects_missing_image_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = temp.path().join("nope");

        let error = Config::new(&missing, any_bind(), ExtensionSet::default())
            .expect_err("missing dir must fail");
        assert!(matches!(error, ConfigError::ImageDir { .. }));
    }

    #[test]
    fn new_rejects_file_as_image_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("photo.jpg");
        std::fs::write(&file, b"jpg").expect("write");

        let error = Config::new(&file, any_bind(), ExtensionSet::default())
            .expect_err("file must fail");
        assert!(matches!(error, ConfigError::NotADirectory(_)));
    }

    #[test]
    fn new_rejects_empty_extension_set() {
        let temp = tempfile::tempdir().expect("tempdir");

        let error = Config::new(temp.path(), any_bind(), ExtensionSet::new(Vec::<String>::new()))
            .expect_err("empty set must fail");
        assert!(matches!(error, ConfigError::NoExtensions));
    }

    #[test]
    fn load_reads_file_and_applies_overrides() {
        let temp = tempfile::tempdir().expect("tempdir");
        let from_file = temp.path().join("from-file");
        let from_flag = temp.path().join("from-flag");
        std::fs::create_dir(&from_file).expect("mkdir");
        std::fs::create_dir(&from_flag).expect("mkdir");

        let config_path = temp.path().join("doghub.toml");
        std::fs::write(
            &config_path,
            format!(
                "image_dir = {:?}\n\
                 bind = \"127.0.0.1:8080\"\n\
                 allowed_extensions = [\"PNG\"]\n\
                 cache_max_age_secs = 60\n",
                from_file.to_string_lossy()
            ),
        )
        .expect("write config");

        let from_toml = Config::load(&ConfigOverrides {
            config_file: Some(config_path.clone()),
            ..Default::default()
        })
        .expect("load");
        assert_eq!(from_toml.base_dir, from_file.canonicalize().expect("canonical"));
        assert_eq!(from_toml.bind, "127.0.0.1:8080".parse::<SocketAddr>().expect("addr"));
        assert!(from_toml.extensions.contains("png"));
        assert!(!from_toml.extensions.contains("jpg"));
        assert_eq!(from_toml.cache_control(), "public, max-age=60");

        let overridden = Config::load(&ConfigOverrides {
            config_file: Some(config_path),
            image_dir: Some(from_flag.clone()),
            bind: Some("127.0.0.1:9090".to_string()),
        })
        .expect("load with overrides");
        assert_eq!(overridden.base_dir, from_flag.canonicalize().expect("canonical"));
        assert_eq!(overridden.bind.port(), 9090);
    }

    #[test]
    fn load_rejects_bad_bind_address() {
        let temp = tempfile::tempdir().expect("tempdir");

        let error = Config::load(&ConfigOverrides {
            config_file: None,
            image_dir: Some(temp.path().to_path_buf()),
            bind: Some("not-an-address".to_string()),
        })
        .expect_err("bad bind must fail");
        assert!(matches!(error, ConfigError::Bind { .. }));
    }

    #[test]
    fn load_requires_explicit_config_file() {
        let temp = tempfile::tempdir().expect("tempdir");

        let error = Config::load(&ConfigOverrides {
            config_file: Some(temp.path().join("absent.toml")),
            ..Default::default()
        })
        .expect_err("missing explicit file must fail");
        assert!(matches!(error, ConfigError::Load(_)));
    }

    fn env_vars(pairs: &[(&str, &str)]) -> config::Environment {
        let vars = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        environment().source(Some(vars))
    }

    #[test]
    fn environment_overrides_file_and_parses_extension_list() {
        let temp = tempfile::tempdir().expect("tempdir");
        let from_file = temp.path().join("from-file");
        let from_env = temp.path().join("from-env");
        std::fs::create_dir(&from_file).expect("mkdir");
        std::fs::create_dir(&from_env).expect("mkdir");

        let config_path = temp.path().join("custom.toml");
        std::fs::write(
            &config_path,
            format!(
                "image_dir = {:?}\nbind = \"127.0.0.1:8080\"\n",
                from_file.to_string_lossy()
            ),
        )
        .expect("write config");

        let from_env_str = from_env.to_string_lossy().into_owned();
        let config = Config::load_from(
            &ConfigOverrides {
                config_file: Some(config_path),
                ..Default::default()
            },
            &temp.path().join("unused.toml"),
            env_vars(&[
                ("DOGHUB_IMAGE_DIR", from_env_str.as_str()),
                ("DOGHUB_ALLOWED_EXTENSIONS", "PNG,.gif, svg"),
                ("DOGHUB_CACHE_MAX_AGE_SECS", "120"),
            ]),
        )
        .expect("load");

        assert_eq!(config.base_dir, from_env.canonicalize().expect("canonical"));
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.extensions.iter().collect::<Vec<_>>(), vec!["gif", "png", "svg"]);
        assert_eq!(config.cache_control(), "public, max-age=120");
    }

    #[test]
    fn flags_override_environment() {
        let temp = tempfile::tempdir().expect("tempdir");
        let from_env = temp.path().join("from-env");
        let from_flag = temp.path().join("from-flag");
        std::fs::create_dir(&from_env).expect("mkdir");
        std::fs::create_dir(&from_flag).expect("mkdir");

        let from_env_str = from_env.to_string_lossy().into_owned();
        let config = Config::load_from(
            &ConfigOverrides {
                image_dir: Some(from_flag.clone()),
                ..Default::default()
            },
            &temp.path().join("absent.toml"),
            env_vars(&[
                ("DOGHUB_IMAGE_DIR", from_env_str.as_str()),
                ("DOGHUB_BIND", "127.0.0.1:7070"),
            ]),
        )
        .expect("load");

        assert_eq!(config.base_dir, from_flag.canonicalize().expect("canonical"));
        assert_eq!(config.bind.port(), 7070);
        assert_eq!(config.extensions, ExtensionSet::default());
    }

    #[test]
    fn default_file_is_read_when_present_and_optional_when_absent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let pics = temp.path().join("pics");
        std::fs::create_dir(&pics).expect("mkdir");
        let default_file = temp.path().join("doghub.toml");
        std::fs::write(
            &default_file,
            format!("image_dir = {:?}\nbind = \"127.0.0.1:6060\"\n", pics.to_string_lossy()),
        )
        .expect("write config");

        let from_default =
            Config::load_from(&ConfigOverrides::default(), &default_file, env_vars(&[]))
                .expect("load default file");
        assert_eq!(from_default.base_dir, pics.canonicalize().expect("canonical"));
        assert_eq!(from_default.bind.port(), 6060);

        let pics_str = pics.to_string_lossy().into_owned();
        let without_file = Config::load_from(
            &ConfigOverrides::default(),
            &temp.path().join("missing.toml"),
            env_vars(&[("DOGHUB_IMAGE_DIR", pics_str.as_str())]),
        )
        .expect("missing default file is fine");
        assert_eq!(without_file.bind, DEFAULT_BIND.parse::<SocketAddr>().expect("addr"));
    }
}
