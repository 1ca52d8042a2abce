//! Command-line interface handling for the Nucleus console host.
//!
//! Arguments override the matching settings of the configuration file.

use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the tick interval in milliseconds
    pub tick_ms: Option<u64>,
}

impl CliArgs {
    /// Parses the process arguments. Exits with a usage message on bad input.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list, the first entry being the binary name.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("nucleus.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            tick_ms: matches.get_one::<u64>("tick-ms").copied(),
        }
    }
}

fn command() -> Command {
    Command::new("Nucleus")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Console host for the Nucleus region, command and jail services")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("nucleus.toml"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("tick-ms")
                .short('t')
                .long("tick-ms")
                .value_name("MILLIS")
                .help("Milliseconds between server ticks")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["nucleus"]).unwrap();
        assert_eq!(args.config_path, PathBuf::from("nucleus.toml"));
        assert_eq!(args.log_level, None);
        assert!(!args.json_logs);
        assert_eq!(args.tick_ms, None);
    }

    #[test]
    fn test_overrides() {
        let args = CliArgs::try_parse_from([
            "nucleus",
            "--config",
            "prison.toml",
            "-l",
            "debug",
            "--json-logs",
            "--tick-ms",
            "25",
        ])
        .unwrap();

        assert_eq!(args.config_path, PathBuf::from("prison.toml"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
        assert_eq!(args.tick_ms, Some(25));
    }

    #[test]
    fn test_rejects_non_numeric_tick() {
        assert!(CliArgs::try_parse_from(["nucleus", "--tick-ms", "fast"]).is_err());
    }
}
