//! Command-line definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use eventcache_core::config::API_URL_ENV;
use eventcache_core::{EventFields, EventId, EventPatch, UpdateStrategy};

/// Browse and edit events through a caching client.
#[derive(Debug, Parser)]
#[command(name = "eventcache", version)]
#[command(about = "Browse and edit events through a caching client", long_about = None)]
pub struct Cli {
    /// Backend base URL. Overrides the config file.
    #[arg(long, global = true, env = API_URL_ENV)]
    pub api_url: Option<String>,

    /// How edits are applied to the cache.
    #[arg(long, global = true)]
    pub strategy: Option<StrategyArg>,

    /// Output format.
    #[arg(long, global = true, default_value = "pretty")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: TopCommand,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Raw JSON output.
    Json,
    /// Human-readable output.
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Wait for the server, then refresh.
    Pessimistic,
    /// Show the edit immediately, roll back if the server rejects it.
    Optimistic,
}

impl From<StrategyArg> for UpdateStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Pessimistic => UpdateStrategy::Pessimistic,
            StrategyArg::Optimistic => UpdateStrategy::Optimistic,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum TopCommand {
    #[command(flatten)]
    Event(EventCommand),
    /// Interactive session sharing one cache across commands.
    Shell,
}

/// Commands available both one-shot and inside the shell.
#[derive(Debug, Clone, Subcommand)]
pub enum EventCommand {
    /// List all events.
    List,
    /// Show one event.
    Show {
        /// Event ID.
        id: String,
    },
    /// Create an event. Prompts for fields when --title is omitted.
    Create(CreateArgs),
    /// Edit an event. Prompts for fields when none are given.
    Edit {
        /// Event ID.
        id: String,
        #[command(flatten)]
        patch: PatchArgs,
    },
    /// Delete an event after confirmation.
    Delete {
        /// Event ID.
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct CreateArgs {
    /// Event title.
    #[arg(long)]
    pub title: Option<String>,
    /// Description.
    #[arg(long)]
    pub description: Option<String>,
    /// Date (YYYY-MM-DD).
    #[arg(long)]
    pub date: Option<String>,
    /// Time (HH:MM).
    #[arg(long)]
    pub time: Option<String>,
    /// Location.
    #[arg(long)]
    pub location: Option<String>,
    /// Image path, relative to the backend.
    #[arg(long)]
    pub image: Option<String>,
}

impl CreateArgs {
    /// Complete field set, or `None` when the title was not given.
    pub fn into_fields(self) -> Option<EventFields> {
        let title = self.title?;
        Some(EventFields {
            title,
            description: self.description.unwrap_or_default(),
            date: self.date.unwrap_or_default(),
            time: self.time.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            image: self.image.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct PatchArgs {
    /// New title.
    #[arg(long)]
    pub title: Option<String>,
    /// New description.
    #[arg(long)]
    pub description: Option<String>,
    /// New date (YYYY-MM-DD).
    #[arg(long)]
    pub date: Option<String>,
    /// New time (HH:MM).
    #[arg(long)]
    pub time: Option<String>,
    /// New location.
    #[arg(long)]
    pub location: Option<String>,
    /// New image path.
    #[arg(long)]
    pub image: Option<String>,
}

impl From<PatchArgs> for EventPatch {
    fn from(args: PatchArgs) -> Self {
        EventPatch {
            title: args.title,
            description: args.description,
            date: args.date,
            time: args.time,
            location: args.location,
            image: args.image,
        }
    }
}

/// A line typed at the shell prompt.
#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Debug, Subcommand)]
pub enum ShellCommand {
    #[command(flatten)]
    Event(EventCommand),
    /// Re-fetch the event list regardless of staleness.
    Refresh,
    /// Show what the cache currently holds.
    Status,
    /// Leave the shell.
    #[command(alias = "quit")]
    Exit,
}

pub fn event_id(raw: &str) -> EventId {
    EventId::new(raw.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delete_with_yes() {
        let cli = Cli::try_parse_from(["eventcache", "delete", "42", "--yes"]).unwrap();
        match cli.command {
            TopCommand::Event(EventCommand::Delete { id, yes }) => {
                assert_eq!(id, "42");
                assert!(yes);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "eventcache",
            "edit",
            "7",
            "--title",
            "New",
            "--strategy",
            "optimistic",
            "--api-url",
            "http://example.test",
        ])
        .unwrap();
        assert_eq!(cli.strategy, Some(StrategyArg::Optimistic));
        assert_eq!(cli.api_url.as_deref(), Some("http://example.test"));
        match cli.command {
            TopCommand::Event(EventCommand::Edit { id, patch }) => {
                assert_eq!(id, "7");
                let patch = EventPatch::from(patch);
                assert_eq!(patch.title.as_deref(), Some("New"));
                assert!(patch.location.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_api_url_from_environment() {
        std::env::set_var(API_URL_ENV, "http://env.test");
        let from_env = Cli::try_parse_from(["eventcache", "list"]).unwrap();
        let from_flag =
            Cli::try_parse_from(["eventcache", "list", "--api-url", "http://flag.test"]).unwrap();
        std::env::remove_var(API_URL_ENV);

        assert_eq!(from_env.api_url.as_deref(), Some("http://env.test"));
        assert_eq!(from_flag.api_url.as_deref(), Some("http://flag.test"));
    }

    #[test]
    fn test_create_args_need_title() {
        assert!(CreateArgs::default().into_fields().is_none());

        let fields = CreateArgs {
            title: Some("Conf".into()),
            location: Some("Expo Center".into()),
            ..CreateArgs::default()
        }
        .into_fields()
        .unwrap();
        assert_eq!(fields.title, "Conf");
        assert_eq!(fields.location, "Expo Center");
        assert_eq!(fields.date, "");
    }

    #[test]
    fn test_shell_line_parses_without_binary_name() {
        let line = ShellLine::try_parse_from(["show", "42"]).unwrap();
        assert!(matches!(
            line.command,
            ShellCommand::Event(EventCommand::Show { ref id }) if id == "42"
        ));

        let line = ShellLine::try_parse_from(["quit"]).unwrap();
        assert!(matches!(line.command, ShellCommand::Exit));

        assert!(ShellLine::try_parse_from(["shell"]).is_err());
    }
}
