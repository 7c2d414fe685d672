//! Tests for completions, manpage and rejected input.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use clap_complete::Shell;

#[test]
fn cli_parse_completions() {
    match parse(&["apiq", "completions", "bash"]) {
        CliCommand::Completions { shell } => assert_eq!(shell, Shell::Bash),
        _ => panic!("expected Completions"),
    }
}

#[test]
fn cli_parse_manpage() {
    assert!(matches!(parse(&["apiq", "manpage"]), CliCommand::Manpage));
}

#[test]
fn cli_parse_unknown_subcommand_fails() {
    assert!(Cli::try_parse_from(["apiq", "download", "x"]).is_err());
}

#[test]
fn cli_parse_unknown_shell_fails() {
    assert!(Cli::try_parse_from(["apiq", "completions", "cmd.exe"]).is_err());
}
