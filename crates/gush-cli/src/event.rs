//! Command events and the dispatcher that fans them out to subscribers.
//!
//! Two events exist. `DecorateDefinition` fires for every subcommand before
//! arguments are parsed so subscribers can add options. `Initialize` fires for
//! the selected command once its input is known so subscribers can prepare the
//! session (resolve repositories, build adapters, check the checkout).

use clap::ArgMatches;

use crate::session::Session;

/// Capabilities a command declares; subscribers key their behaviour off these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Needs a repository adapter (`--repo-adapter`, `--org`, `--repo`).
    GitRepo,
    /// Needs an issue tracker (`--issue-adapter`, `--issue-org`, `--issue-project`).
    IssueTracker,
    /// Must run inside a git work tree.
    GitFolder,
    /// Renders a body template (`--template`).
    Template,
}

/// Name and features of one subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandMeta {
    pub name: &'static str,
    pub features: &'static [Feature],
}

impl CommandMeta {
    pub fn has(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }
}

pub trait Subscriber: Send + Sync {
    /// Add options to `command`'s definition.
    fn decorate_definition(&self, _meta: &CommandMeta, command: clap::Command) -> clap::Command {
        command
    }

    /// Prepare `session` for running `meta` with the parsed `input`.
    fn initialize(
        &self,
        _meta: &CommandMeta,
        _input: &ArgMatches,
        _session: &mut Session,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Subscribers in registration order.
#[derive(Default)]
pub struct EventDispatcher {
    subscribers: Vec<Box<dyn Subscriber>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: impl Subscriber + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Fire `DecorateDefinition` for one subcommand.
    pub fn decorate_definition(&self, meta: &CommandMeta, command: clap::Command) -> clap::Command {
        self.subscribers
            .iter()
            .fold(command, |cmd, s| s.decorate_definition(meta, cmd))
    }

    /// Fire `Initialize`; the first failing subscriber aborts the command.
    pub fn initialize(
        &self,
        meta: &CommandMeta,
        input: &ArgMatches,
        session: &mut Session,
    ) -> anyhow::Result<()> {
        tracing::debug!(command = meta.name, "initializing");
        for subscriber in &self.subscribers {
            subscriber.initialize(meta, input, session)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Arg;

    struct AddsFlag;

    impl Subscriber for AddsFlag {
        fn decorate_definition(&self, meta: &CommandMeta, command: clap::Command) -> clap::Command {
            if meta.has(Feature::Template) {
                command.arg(Arg::new("template").long("template"))
            } else {
                command
            }
        }
    }

    #[test]
    fn test_decorates_only_commands_with_feature() {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe(AddsFlag);

        let with = CommandMeta {
            name: "pull-request:create",
            features: &[Feature::GitRepo, Feature::Template],
        };
        let without = CommandMeta {
            name: "release:list",
            features: &[Feature::GitRepo],
        };

        let decorated = dispatcher.decorate_definition(&with, clap::Command::new(with.name));
        let plain = dispatcher.decorate_definition(&without, clap::Command::new(without.name));

        assert!(decorated.get_arguments().any(|a| a.get_id() == "template"));
        assert!(!plain.get_arguments().any(|a| a.get_id() == "template"));
    }
}
