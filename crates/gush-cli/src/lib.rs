pub mod commands;
pub mod event;
pub mod helpers;
pub mod session;
pub mod subscribers;

use clap::{ArgAction, CommandFactory, FromArgMatches, Parser};

use crate::commands::{Command, COMMANDS};
use crate::event::EventDispatcher;
use crate::session::Session;

#[derive(Parser)]
#[command(
    name = "gush",
    version,
    about = "Project workflow helper for GitHub, GitLab, Bitbucket and Jira"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// The clap definition with every subcommand decorated by the subscribers.
pub fn definition(dispatcher: &EventDispatcher) -> clap::Command {
    COMMANDS.iter().fold(Cli::command(), |cli, meta| {
        cli.mut_subcommand(meta.name, |sub| dispatcher.decorate_definition(meta, sub))
    })
}

/// Parse `args` against the decorated definition.
pub fn parse<I, T>(dispatcher: &EventDispatcher, args: I) -> Result<(Cli, clap::ArgMatches), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = definition(dispatcher).try_get_matches_from(args)?;
    let cli = Cli::from_arg_matches(&matches)?;
    Ok((cli, matches))
}

/// Fire `Initialize` for the selected command, then run it.
pub async fn execute(
    command: Command,
    matches: &clap::ArgMatches,
    dispatcher: &EventDispatcher,
    session: &mut Session,
) -> anyhow::Result<()> {
    let meta = command.meta();
    if let Some((_, sub_matches)) = matches.subcommand() {
        dispatcher.initialize(meta, sub_matches, session)?;
    }
    tracing::debug!(command = meta.name, "running");
    commands::run(command, session).await
}

/// Parse and run one command line. Used by the binary and by tests.
pub async fn run_with<I, T>(
    args: I,
    dispatcher: &EventDispatcher,
    session: &mut Session,
) -> anyhow::Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let (cli, matches) = parse(dispatcher, args)?;
    execute(cli.command, &matches, dispatcher, session).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscribers::default_dispatcher;

    fn has_arg(cli: &clap::Command, command: &str, arg: &str) -> bool {
        cli.find_subcommand(command)
            .is_some_and(|c| c.get_arguments().any(|a| a.get_id() == arg))
    }

    #[test]
    fn test_definition_is_consistent() {
        definition(&default_dispatcher()).debug_assert();
    }

    #[test]
    fn test_every_command_is_defined() {
        let cli = definition(&default_dispatcher());
        for meta in COMMANDS {
            assert!(cli.find_subcommand(meta.name).is_some(), "{}", meta.name);
        }
        assert_eq!(cli.get_subcommands().count(), COMMANDS.len());
    }

    #[test]
    fn test_options_follow_declared_features() {
        let cli = definition(&default_dispatcher());

        assert!(has_arg(&cli, "release:list", "org"));
        assert!(!has_arg(&cli, "release:list", "issue-adapter"));
        assert!(!has_arg(&cli, "release:list", "template"));

        assert!(has_arg(&cli, "issue:copy", "issue-adapter"));
        assert!(!has_arg(&cli, "issue:copy", "repo-adapter"));

        assert!(has_arg(&cli, "pull-request:create", "template"));
        assert!(!has_arg(&cli, "core:configure", "org"));
    }

    #[test]
    fn test_meta_matches_parsed_command() {
        let (cli, _) = parse(&default_dispatcher(), ["gush", "-vv", "issue:show", "12"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.command.meta().name, "issue:show");
    }

    #[test]
    fn test_undecorated_option_is_rejected() {
        let parsed = parse(
            &default_dispatcher(),
            ["gush", "core:configure", "--adapter", "github", "--org", "x"],
        );
        assert!(parsed.is_err());
    }
}
