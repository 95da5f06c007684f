use std::{
    borrow::Cow,
    fmt,
    io::IsTerminal,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    path::PathBuf,
    str::FromStr,
};

use clap::{Parser, ValueEnum};
use config::Config;
use logforth::filter::EnvFilter;
use url::Url;

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Parser)]
#[command(name = "thermod", version, long_about = concat!("thermod v", env!("CARGO_PKG_VERSION")))]
pub struct Args {
    /// IP address on which the server will listen for incoming connections.
    /// Takes precedence over --port. Default: 0.0.0.0:8080
    #[arg(short, long, env = "THERMOD_LISTEN_ADDRESS")]
    pub listen_address: Option<SocketAddr>,
    /// Port to listen on, on all interfaces.
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,
    /// Path to the TOML configuration file
    #[arg(long, short, env = "THERMOD_CONFIG_PATH", default_value = "./thermod.toml")]
    pub config: PathBuf,
    /// Origin of the dashboard allowed to call the API. Replaces the configured CORS origins.
    #[arg(long, env = "FRONTEND_ORIGIN")]
    pub frontend_origin: Option<Url>,
    /// Set the logging level.
    #[arg(long = "log", env = "THERMOD_LOG", default_value_t = LogLevel::default())]
    pub log_level: LogLevel,
    /// Set the style of log output
    #[arg(long, env = "THERMOD_LOG_STYLE", default_value_t = LogStyle::default())]
    pub log_style: LogStyle,
}

impl Args {
    /// Loads the configuration file and applies the command line overrides.
    pub fn config(&self) -> anyhow::Result<Config> {
        let mut config = if self.config.exists() {
            Config::load(&self.config)?
        } else {
            Config::default()
        };

        if let Some(origin) = &self.frontend_origin {
            config.server.cors = config.server.cors.with_origin(origin.clone());
        }

        config.validate()?;

        Ok(config)
    }

    pub fn listen_address(&self, config: &Config) -> SocketAddr {
        self.listen_address
            .or_else(|| self.port.map(|port| SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))))
            .or(config.server.listen_address)
            .unwrap_or(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogStyle {
    /// Colorized text, used as the default with TTY output
    Color,
    /// Standard text, used as the default with non-TTY output
    Text,
    /// JSON objects
    Json,
}

impl Default for LogStyle {
    fn default() -> Self {
        if std::io::stdout().is_terminal() {
            LogStyle::Color
        } else {
            LogStyle::Text
        }
    }
}

impl AsRef<str> for LogStyle {
    fn as_ref(&self) -> &str {
        match self {
            LogStyle::Color => "color",
            LogStyle::Text => "text",
            LogStyle::Json => "json",
        }
    }
}

impl fmt::Display for LogStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogLevel {
    /// Disable logging
    Off,
    /// Only log errors
    Error,
    /// Log errors, and warnings
    Warn,
    /// Log errors, warnings, and info messages
    #[default]
    Info,
    /// Log errors, warnings, info, and debug messages
    Debug,
    /// Log errors, warnings, info, debug, and trace messages
    Trace,
}

impl LogLevel {
    pub fn env_filter(self) -> EnvFilter {
        EnvFilter::from_str(&self.filter_directives()).expect("These all are valid env filters.")
    }

    // Dependencies stay at 'warn', workspace crates use the selected level.
    fn filter_directives(self) -> Cow<'static, str> {
        match self {
            LogLevel::Off => Cow::Borrowed("off"),
            level => Cow::Owned(format!(
                "warn,thermod={level},server={level},sensor={level},rate_limit={level},config={level}"
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_ref().fmt(f)
    }
}

impl AsRef<str> for LogLevel {
    fn as_ref(&self) -> &str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
