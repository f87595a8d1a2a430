//! Configuration for running this bot.

use std::collections::HashSet;
use std::time::Duration;

use poise::Framework;
use serde::Deserialize;
use serde::Serialize;
use serenity::GuildId;
use serenity::UserId;

use crate::data::Volume;
use crate::error::ConfigError;
use crate::lib::cookies::CookieFile;
use crate::lib::cookies::CookieRefresher;
use crate::serenity;

/// The path to the config file
const CONFIG_PATH: &str = "config.toml";

/// Settings read from [CONFIG_PATH] that modify bot behavior.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Token needed to use a bot account. `DISCORD_TOKEN` takes precedence.
    discord_token: String,

    /// Prefix for text commands. `COMMAND_PREFIX` takes precedence.
    prefix: String,

    /// See [MusicConfig]
    music: MusicConfig,

    /// See [CookiesConfig]
    cookies: CookiesConfig,

    /// See [LoggingConfig]
    logging: LoggingConfig,

    /// Useful developer specific configs.
    dev_utils: DevConfig,
}

impl Config {
    /// Tries to read [CONFIG_PATH] to extract a [Config].
    /// If a file doesn't exists, create the default config file and returns error.
    /// If a file exists but is empty, re-write the default values and return error.
    /// If a file exists but is incomplete, show error and don't change files.
    /// If a file exists and is complete, read file to create a config.
    /// If file existance is indeterminent (e.g. missing permissions), return error.
    /// Environment overrides are applied last.
    pub fn read() -> Result<Config, ConfigError> {
        let file = std::fs::read_to_string(CONFIG_PATH);

        let mut config = match file {
            // Config file found
            Ok(content) => {
                // Write default values to file if it's empty.
                if content.trim().is_empty() {
                    write_file(Config::default())?;
                    return Err(ConfigError::InvalidConfig {
                        reason: format!("Empty config file! Rewriting {CONFIG_PATH} ..."),
                    });
                }
                Config::parse(&content)?
            }
            // File not found or other filesystem error
            Err(file_error) => {
                match file_error.kind() {
                    // If file doesn't exist, create default config file.
                    std::io::ErrorKind::NotFound => {
                        let action = format!("Creating {CONFIG_PATH}...");
                        write_file(Config::default())?;
                        return Err(ConfigError::MissingConfig { action_msg: action });
                    }
                    // If we can't determine that config file exist: log error and use default settings (no file writes)
                    _ => return Err(ConfigError::IoError(file_error)),
                }
            }
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parse and validate the contents of a config file.
    /// If deserialization fails, the error describes the mistake.
    pub fn parse(content: &str) -> Result<Config, ConfigError> {
        let to_toml = toml::Deserializer::new(content);
        let config: Config =
            serde_path_to_error::deserialize(to_toml).map_err(|error| {
                ConfigError::InvalidConfig {
                    reason: error.to_string(),
                }
            })?;

        config.music.validate()?;
        Ok(config)
    }

    /// Replace settings with the environment's `DISCORD_TOKEN` and `COMMAND_PREFIX`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("DISCORD_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.discord_token = token;
        }
        if let Some(prefix) = lookup("COMMAND_PREFIX").filter(|p| !p.trim().is_empty()) {
            self.prefix = prefix;
        }
    }

    /// Basic sanity check for if a token was given.
    pub fn token(&self) -> Result<&String, ConfigError> {
        let default_token = Config::default().discord_token;
        let given_token = &self.discord_token;

        let is_empty = given_token.is_empty();
        let contains_default = given_token.contains(&default_token);

        let sanity_check: bool = !is_empty && !contains_default;

        if sanity_check {
            Ok(&self.discord_token)
        } else {
            Err(ConfigError::InvalidConfig {
                reason: "Missing discord token".to_string(),
            })
        }
    }

    /// Construct a bug notification notify list based on the config.
    /// Wrapper for [NotifyConfig::notify_list]
    pub fn notify_list<U, E>(&self, fw: &Framework<U, E>) -> HashSet<UserId> {
        self.dev_utils.notifications.notify_list(fw)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn music(&self) -> &MusicConfig {
        &self.music
    }

    pub fn cookies(&self) -> &CookiesConfig {
        &self.cookies
    }

    /// Getter for log_dir.
    pub fn log_dir(&self) -> &str {
        &self.logging.log_dir
    }

    /// Is debug mode enabled for console logs
    pub fn console_debug(&self) -> bool {
        self.logging.console_debug
    }

    /// Is file logging enabled.
    pub fn logs_enabled(&self) -> bool {
        self.logging.logs_enabled
    }

    pub fn dev_guild(&self) -> Option<GuildId> {
        self.dev_utils.dev_guild
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: "put_token_here".to_string(),
            prefix: "!".to_string(),
            music: MusicConfig::default(),
            cookies: CookiesConfig::default(),
            logging: LoggingConfig::default(),
            dev_utils: DevConfig::default(),
        }
    }
}

/// Playback and extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    /// The yt-dlp executable.
    pub ytdlp_program: String,
    /// Max entries taken from a playlist.
    pub playlist_limit: usize,
    /// Results listed by `search`.
    pub search_results: usize,
    /// Volume of new sessions, `0..=100`.
    pub default_volume: u16,
    /// How often to check for an empty voice channel.
    pub idle_timeout_secs: u64,
    /// How long `search` waits for a pick.
    pub selection_timeout_secs: u64,
}

impl MusicConfig {
    #[allow(clippy::missing_docs_in_private_items)]
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::InvalidConfig {
                reason: format!("music: {reason}"),
            })
        };

        if Volume::new(self.default_volume).is_err() {
            return invalid("default_volume must be between 0 and 100");
        }
        if self.playlist_limit == 0 || self.search_results == 0 {
            return invalid("playlist_limit and search_results must be at least 1");
        }
        if self.idle_timeout_secs == 0 {
            return invalid("idle_timeout_secs must be at least 1");
        }
        Ok(())
    }

    pub fn selection_timeout(&self) -> Duration {
        Duration::from_secs(self.selection_timeout_secs)
    }
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            ytdlp_program: "yt-dlp".to_string(),
            playlist_limit: 30,
            search_results: 5,
            default_volume: 100,
            idle_timeout_secs: 300,
            selection_timeout_secs: 30,
        }
    }
}

/// Cookie jar handed to yt-dlp and how to renew it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookiesConfig {
    /// Netscape cookie jar, used when it exists.
    pub cookie_file: String,
    /// Run the refresher when youtube asks for a login.
    pub refresh_on_auth_error: bool,
    /// The refresher executable.
    pub refresh_program: String,
    /// Extra arguments for the refresher.
    pub refresh_args: Vec<String>,
    /// Minimum time between refresher runs.
    pub refresh_cooldown_secs: u64,
    /// A refresher run still going after this long is killed.
    pub refresh_timeout_secs: u64,
    /// Refresh a jar older than this, `0` disables the timer.
    pub refresh_interval_mins: u64,
}

impl CookiesConfig {
    pub fn cookie_file(&self) -> CookieFile {
        CookieFile::new(&self.cookie_file)
    }

    /// The refresher, if anything is going to run it.
    pub fn refresher(&self) -> Option<CookieRefresher> {
        if !self.refresh_on_auth_error && self.refresh_interval().is_none() {
            return None;
        }
        Some(CookieRefresher::new(
            self.refresh_program.clone(),
            self.refresh_args.clone(),
            self.cookie_file(),
            Duration::from_secs(self.refresh_cooldown_secs),
            Duration::from_secs(self.refresh_timeout_secs),
        ))
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        match self.refresh_interval_mins {
            0 => None,
            mins => Some(Duration::from_secs(mins.saturating_mul(60))),
        }
    }
}

impl Default for CookiesConfig {
    fn default() -> Self {
        Self {
            cookie_file: "cookies.txt".to_string(),
            refresh_on_auth_error: true,
            refresh_program: "refresh-cookies".to_string(),
            refresh_args: vec![],
            refresh_cooldown_secs: 900,
            refresh_timeout_secs: 300,
            refresh_interval_mins: 0,
        }
    }
}

/// Configs for logging.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct LoggingConfig {
    /// Print debug traces to console?
    console_debug: bool,
    /// Enable writing to log file?
    logs_enabled: bool,
    /// Directory to store log files
    log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_debug: false,
            logs_enabled: true,
            log_dir: "logs".to_string(),
        }
    }
}

/// Optional configs to enable developer-specific behavior.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DevConfig {
    /// Optional guild to automatically update commands quickly.
    #[serde(serialize_with = "serialize_opt", deserialize_with = "deserialize_opt")]
    dev_guild: Option<GuildId>,
    /// See [NotifyConfig]
    notifications: NotifyConfig,
}

/// Configs for notification behavior when encountering unexpected errors.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct NotifyConfig {
    /// Enable this behavior or not. (bot sends a private message)
    enabled: bool,
    /// Whether to automatically add owners to the notify list.
    add_owners: bool,
    /// Additional users to add to the notify list.
    userids: Vec<UserId>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            add_owners: true,
            userids: vec![],
        }
    }
}

impl NotifyConfig {
    /// Construct a bug notification notify list based on the config.
    fn notify_list<U, E>(&self, fw: &Framework<U, E>) -> HashSet<UserId> {
        let mut notify_list = HashSet::new();

        // If disabled, don't add anyone to the list.
        if !self.enabled {
            return notify_list;
        }

        // Add bot owners if enabled
        if self.add_owners {
            let owners = &fw.options().owners;
            for userid in owners {
                notify_list.insert(*userid);
            }
        }

        // Add users in config
        for userid in &self.userids {
            notify_list.insert(*userid);
        }

        notify_list
    }
}

/// Write the given config to [CONFIG_PATH].
fn write_file(config: Config) -> Result<(), ConfigError> {
    use std::fs::write;

    let content = toml::to_string_pretty(&config).map_err(|e| ConfigError::InvalidConfig {
        reason: e.to_string(),
    })?;
    write(CONFIG_PATH, content).map_err(ConfigError::IoError)
}

fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<GuildId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_str(OptVisitor)
}

fn serialize_opt<T, S>(val: &Option<T>, ser: S) -> Result<S::Ok, S::Error>
where
    T: serde::Serialize,
    S: serde::Serializer,
{
    match val {
        Some(v) => v.serialize(ser),
        None => ser.serialize_str(""),
    }
}

struct OptVisitor;

impl<'de> serde::de::Visitor<'de> for OptVisitor {
    type Value = Option<GuildId>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a valid guild id")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        match v {
            "" => Ok(None),
            _ => {
                let num: u64 = v.parse().map_err(|_| E::custom("not u64"))?;
                Ok(Some(GuildId::new(num)))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn written_defaults_parse_back() {
        let content = toml::to_string_pretty(&Config::default()).unwrap();
        let config = Config::parse(&content).unwrap();

        assert_eq!(config.prefix(), "!");
        assert_eq!(config.music().playlist_limit, 30);
        assert_eq!(config.dev_guild(), None);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config = Config::parse(
            r#"
            discord_token = "abc.def"

            [music]
            search_results = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.token().unwrap(), "abc.def");
        assert_eq!(config.music().search_results, 3);
        assert_eq!(config.music().playlist_limit, 30);
        assert_eq!(config.music().ytdlp_program, "yt-dlp");
        assert_eq!(config.cookies().cookie_file, "cookies.txt");
        assert!(config.cookies().refresh_on_auth_error);
        assert_eq!(config.cookies().refresh_interval(), None);
        assert!(config.logs_enabled());
    }

    #[test]
    fn bad_value_names_its_path() {
        let err = Config::parse(
            r#"
            [music]
            playlist_limit = "thirty"
            "#,
        )
        .unwrap_err();

        match err {
            ConfigError::InvalidConfig { reason } => {
                assert!(reason.contains("music.playlist_limit"), "{reason}")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_loud_default_volume() {
        let err = Config::parse("[music]\ndefault_volume = 150\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig { .. }));
    }

    #[test]
    fn placeholder_token_is_missing() {
        assert!(Config::default().token().is_err());
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = Config::parse("discord_token = \"from_file\"\nprefix = \"?\"\n").unwrap();

        config.apply_overrides(|name| match name {
            "DISCORD_TOKEN" => Some("from_env".to_string()),
            "COMMAND_PREFIX" => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.token().unwrap(), "from_env");
        // Blank values don't count.
        assert_eq!(config.prefix(), "?");
    }

    #[test]
    fn dev_guild_accepts_blank_or_id() {
        let config = Config::parse("[dev_utils]\ndev_guild = \"\"\n").unwrap();
        assert_eq!(config.dev_guild(), None);

        let config = Config::parse("[dev_utils]\ndev_guild = \"1234\"\n").unwrap();
        assert_eq!(config.dev_guild(), Some(GuildId::new(1234)));
    }

    #[test]
    fn interval_enables_refresher() {
        let mut cookies = CookiesConfig {
            refresh_on_auth_error: false,
            ..Default::default()
        };
        assert!(cookies.refresher().is_none());

        cookies.refresh_interval_mins = 60;
        assert_eq!(cookies.refresh_interval(), Some(Duration::from_secs(3600)));
        assert!(cookies.refresher().is_some());
    }
}
