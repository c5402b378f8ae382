//! Command-line parsing for the `regperiod` binary.
//!
//! ```text
//! regperiod [serve]        Start the cron scheduler (default)
//! regperiod run            Run the registration check once and exit
//! regperiod check <id>     Show a user's suspension flags and registration values
//! ```

use crate::errors::{RegPeriodError, RegPeriodResult};
use crate::store::UserId;

/// Usage text printed on invalid arguments.
pub const USAGE: &str = "usage: regperiod [serve | run | check <user_id>]";

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Serve,
    RunOnce,
    Check { user_id: UserId },
}

/// Parse the arguments following the program name.
pub fn parse_command(args: &[String]) -> RegPeriodResult<Command> {
    match args {
        [] => Ok(Command::Serve),
        [cmd] if cmd == "serve" => Ok(Command::Serve),
        [cmd] if cmd == "run" => Ok(Command::RunOnce),
        [cmd, id] if cmd == "check" => id
            .parse::<UserId>()
            .map(|user_id| Command::Check { user_id })
            .map_err(|_| RegPeriodError::ConfigError(format!("invalid user id '{id}'"))),
        [cmd, ..] if cmd == "check" => Err(RegPeriodError::ConfigError(
            "check expects exactly one user id".to_string(),
        )),
        [cmd, ..] => Err(RegPeriodError::ConfigError(format!(
            "unrecognised command '{cmd}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_to_serve() {
        assert_eq!(parse_command(&[]).unwrap(), Command::Serve);
        assert_eq!(parse_command(&args(&["serve"])).unwrap(), Command::Serve);
    }

    #[test]
    fn parses_run_once() {
        assert_eq!(parse_command(&args(&["run"])).unwrap(), Command::RunOnce);
    }

    #[test]
    fn parses_check() {
        assert_eq!(
            parse_command(&args(&["check", "42"])).unwrap(),
            Command::Check { user_id: 42 }
        );
        assert!(parse_command(&args(&["check", "abc"])).is_err());
        assert!(parse_command(&args(&["check"])).is_err());
    }

    #[test]
    fn rejects_unknown_commands() {
        let err = parse_command(&args(&["purge"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: unrecognised command 'purge'"
        );
    }

    #[test]
    fn parse_errors_leave_usage_to_the_caller() {
        let cases: [&[&str]; 4] = [&["purge"], &["check"], &["check", "1", "2"], &["check", "x"]];
        for bad in cases {
            let err = parse_command(&args(bad)).unwrap_err();
            assert!(!err.to_string().contains(USAGE), "{bad:?}");
        }
    }
}
