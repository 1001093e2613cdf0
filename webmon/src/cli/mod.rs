//! CLI module for webmon
//!
//! Provides the command-line interface for the uptime watchdog.

use clap::Parser;
use std::path::PathBuf;

/// webmon - Minimal HTTP uptime watchdog
#[derive(Parser, Debug)]
#[command(name = "webmon")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    WEBMON_LOG_LEVEL          Log filter (default: info, or debug with -v)
    WEBMON_DB_PATH            SQLite status database (default: monitor.db)
    WEBMON_SMTP_SERVER        SMTP relay for failure mail, HOST[:PORT] (port default: 587)
    WEBMON_SMTP_LOGIN         SMTP login
    WEBMON_SMTP_PASSWORD      SMTP password
    WEBMON_MAIL_FROM          Sender address for failure mail
    WEBMON_MAIL_TO            Comma-separated recipients for failure mail
    WEBMON_CHAT_WEBHOOK_URL   Chat webhook for failure messages
    WEBMON_CHAT_CHANNEL       Chat channel for failure messages
"#)]
pub struct Cli {
    /// URL to monitor (repeat for several URLs)
    #[arg(short = 'u', long = "url", value_name = "URL", required = true)]
    pub urls: Vec<String>,

    /// Seconds to wait between the end of one check and the start of the next
    #[arg(
        short = 'r',
        long = "repeat",
        value_name = "SECONDS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub repeat: u64,

    /// Verbose logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Do not print results to stdout
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// SQLite database that receives one row per check
    #[arg(long, value_name = "PATH", env = "WEBMON_DB_PATH")]
    pub db: Option<PathBuf>,

    /// Disable the SQLite status store
    #[arg(long, default_value_t = false)]
    pub no_db: bool,

    /// SMTP relay used for failure mail (STARTTLS)
    #[arg(long, value_name = "HOST[:PORT]", env = "WEBMON_SMTP_SERVER")]
    pub smtp_server: Option<String>,

    /// Sender address for failure mail
    #[arg(long, value_name = "ADDRESS", env = "WEBMON_MAIL_FROM")]
    pub mail_from: Option<String>,

    /// Recipient for failure mail (repeatable or comma-separated)
    #[arg(
        long,
        value_name = "ADDRESS",
        env = "WEBMON_MAIL_TO",
        value_delimiter = ','
    )]
    pub mail_to: Vec<String>,

    /// Chat webhook URL for failure messages
    #[arg(long, value_name = "URL", env = "WEBMON_CHAT_WEBHOOK_URL")]
    pub chat_webhook: Option<String>,

    /// Chat channel for failure messages
    #[arg(long, value_name = "CHANNEL", env = "WEBMON_CHAT_CHANNEL")]
    pub chat_channel: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeatable_urls() {
        let cli = Cli::try_parse_from([
            "webmon",
            "-u",
            "http://a/",
            "--url",
            "http://b/",
            "-r",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.urls, vec!["http://a/", "http://b/"]);
        assert_eq!(cli.repeat, 5);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_verbose_flag() {
        let cli = Cli::try_parse_from(["webmon", "-u", "http://a/", "-r", "5", "-v"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_zero_repeat_rejected() {
        let result = Cli::try_parse_from(["webmon", "-u", "http://a/", "-r", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_numeric_repeat_rejected() {
        let result = Cli::try_parse_from(["webmon", "-u", "http://a/", "-r", "soon"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }
}
