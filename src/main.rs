//! # uniconf CLI
//!
//! Resolves the project's root document (`.unipipe/config.yaml` below
//! `--dir` by default), follows its includes across file, env, git, map and
//! remote sources, and prints the merged configuration or a view of it.
//!
//! Errors are printed with their full cause chain. The exit status tells
//! scripts what kind of failure happened:
//!
//! | code | meaning                                      |
//! |------|----------------------------------------------|
//! | 0    | success                                      |
//! | 1    | any other failure                            |
//! | 2    | the root document is missing                 |
//! | 3    | a git or remote source could not be fetched  |
//! | 4    | a document or the settings are invalid       |

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;

/// Exit status for a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Failure {
    General = 1,
    NotFound = 2,
    Fetch = 3,
    Invalid = 4,
}

impl Failure {
    fn of(err: &anyhow::Error) -> Self {
        let Some(cause) = err.chain().find_map(|c| c.downcast_ref::<uniconf::Error>()) else {
            return Failure::General;
        };
        match cause {
            uniconf::Error::NotFound { .. } => Failure::NotFound,
            uniconf::Error::GitClone { .. }
            | uniconf::Error::GitCommand { .. }
            | uniconf::Error::Network { .. }
            | uniconf::Error::Http { .. } => Failure::Fetch,
            uniconf::Error::ConfigParse { .. }
            | uniconf::Error::Yaml(_)
            | uniconf::Error::Json(_)
            | uniconf::Error::UnknownSourceType { .. }
            | uniconf::Error::IncludeDepthExceeded { .. }
            | uniconf::Error::Interpolation { .. }
            | uniconf::Error::Context { .. }
            | uniconf::Error::Settings { .. } => Failure::Invalid,
            _ => Failure::General,
        }
    }

    fn hint(self) -> Option<&'static str> {
        match self {
            Failure::NotFound => {
                Some("check --dir and --config; the root document is read from below the project directory")
            }
            Failure::Fetch => {
                Some("rerun with --log-level debug to see which source was being fetched")
            }
            Failure::General | Failure::Invalid => None,
        }
    }
}

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let failure = Failure::of(&err);
            eprintln!("uniconf: {:#}", err);
            if let Some(hint) = failure.hint() {
                eprintln!("  hint: {}", hint);
            }
            ExitCode::from(failure as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    fn failure_of(err: uniconf::Error) -> Failure {
        let wrapped: anyhow::Result<()> = Err(err).context("Failed to load configuration from x");
        Failure::of(&wrapped.unwrap_err())
    }

    #[test]
    fn test_failure_follows_cause_chain() {
        assert_eq!(
            failure_of(uniconf::Error::not_found("file", "config.yaml", "project")),
            Failure::NotFound
        );
        assert_eq!(
            failure_of(uniconf::Error::Network {
                url: "https://example.com/a.yaml".to_string(),
                message: "HTTP status 500".to_string(),
            }),
            Failure::Fetch
        );
        assert_eq!(
            failure_of(uniconf::Error::Context {
                message: "contexts are not defined".to_string(),
            }),
            Failure::Invalid
        );
        assert_eq!(
            failure_of(uniconf::Error::SourceNotRegistered {
                name: "lib".to_string(),
            }),
            Failure::General
        );
    }

    #[test]
    fn test_non_library_error_is_general() {
        let err = anyhow::anyhow!("bad flag");
        assert_eq!(Failure::of(&err), Failure::General);
        assert!(Failure::General.hint().is_none());
        assert!(Failure::NotFound.hint().unwrap().contains("--dir"));
    }
}
