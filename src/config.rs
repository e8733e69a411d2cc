use std::path::PathBuf;
use std::str::FromStr;

use log::LevelFilter;

use crate::countdown::{Countdown, DEFAULT_BASE, DEFAULT_START};

/// Environment variable naming the log level when no `-v` flag is given.
pub const LOG_ENV: &str = "COUNTDOWN_LOG";

pub const USAGE: &str = "\
usage: countdown [options]

  --base <hex>       zero page offset of the first value (default 10)
  --count <n>        value to count down from (default 10)
  --hexdump <path>   run a hexdump file instead of the built-in program
  --native           count down in Rust instead of on the 6502
  --max-steps <n>    give up after this many instructions (default 10000)
  -v, -vv            debug / trace logging (or set COUNTDOWN_LOG)
  -h, --help         show this message";

#[derive(Debug, PartialEq)]
pub struct Config {
    pub countdown: Countdown,
    pub hexdump: Option<PathBuf>,
    pub native: bool,
    pub max_instructions: u64,
    pub log_level: LevelFilter,
    pub show_help: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            countdown: Countdown::default(),
            hexdump: None,
            native: false,
            max_instructions: 10_000,
            log_level: LevelFilter::Info,
            show_help: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config, String> {
        Config::from_args(std::env::args().skip(1), std::env::var(LOG_ENV).ok())
    }

    /// `args` excludes the program name. `env_level` is the value of [`LOG_ENV`], if set.
    pub fn from_args<I>(args: I, env_level: Option<String>) -> Result<Config, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config::default();
        if let Some(level) = env_level {
            config.log_level = LevelFilter::from_str(level.trim())
                .map_err(|_| format!("{}: unknown log level '{}'", LOG_ENV, level))?;
        }

        let mut base = DEFAULT_BASE;
        let mut start = DEFAULT_START;
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| format!("{} needs a value", flag))
            };
            match arg.as_str() {
                "--base" => {
                    let v = value("--base")?;
                    base = u8::from_str_radix(v.trim_start_matches('$'), 16)
                        .map_err(|e| format!("--base {}: {}", v, e))?;
                }
                "--count" => {
                    let v = value("--count")?;
                    start = v.parse().map_err(|e| format!("--count {}: {}", v, e))?;
                }
                "--hexdump" => config.hexdump = Some(PathBuf::from(value("--hexdump")?)),
                "--native" => config.native = true,
                "--max-steps" => {
                    let v = value("--max-steps")?;
                    config.max_instructions =
                        v.parse().map_err(|e| format!("--max-steps {}: {}", v, e))?;
                }
                "-v" => config.log_level = LevelFilter::Debug,
                "-vv" => config.log_level = LevelFilter::Trace,
                "-h" | "--help" => config.show_help = true,
                other => return Err(format!("unknown argument '{}'\n\n{}", other, USAGE)),
            }
        }

        if config.native && config.hexdump.is_some() {
            return Err("--native and --hexdump cannot be combined".to_string());
        }
        config.countdown = Countdown::new(base, start)?;
        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, String> {
        Config::from_args(args.iter().map(|a| a.to_string()), None)
    }

    #[test]
    fn test_defaults() {
        assert_eq!(parse(&[]).unwrap(), Config::default());
    }

    #[test]
    fn test_flags() {
        let config = parse(&[
            "--base", "$20", "--count", "5", "--max-steps", "99", "-vv",
        ])
        .unwrap();
        assert_eq!(config.countdown, Countdown::new(0x20, 5).unwrap());
        assert_eq!(config.max_instructions, 99);
        assert_eq!(config.log_level, LevelFilter::Trace);

        let config = parse(&["--hexdump", "tests/resources/countdown.hex"]).unwrap();
        assert_eq!(
            config.hexdump,
            Some(PathBuf::from("tests/resources/countdown.hex"))
        );
    }

    #[test]
    fn test_env_level() {
        let config = Config::from_args(Vec::<String>::new(), Some("warn".to_string())).unwrap();
        assert_eq!(config.log_level, LevelFilter::Warn);

        // flags win over the environment
        let config = Config::from_args(vec!["-v".to_string()], Some("warn".to_string())).unwrap();
        assert_eq!(config.log_level, LevelFilter::Debug);

        assert!(Config::from_args(Vec::<String>::new(), Some("loud".to_string())).is_err());
    }

    #[test]
    fn test_errors() {
        assert!(parse(&["--base"]).is_err());
        assert!(parse(&["--base", "1000"]).is_err());
        assert!(parse(&["--count", "0"]).is_err());
        assert!(parse(&["--count", "ten"]).is_err());
        assert!(parse(&["--base", "fc", "--count", "10"]).is_err());
        assert!(parse(&["--native", "--hexdump", "x.hex"]).is_err());
        assert!(parse(&["--fast"]).unwrap_err().contains("usage"));
    }
}
