use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::credentials::TokenKind;
use crate::output::OutputFormat;
use crate::slack::channels::DEFAULT_TYPES;
use crate::slack::{SortDirection, SortOrder};

#[derive(Parser, Debug)]
#[command(name = "slck", version)]
#[command(about = "Operate a Slack workspace from the terminal", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, value_enum, help = "Output format")]
    pub output: Option<OutputFormat>,

    #[arg(long, global = true, help = "Shorthand for --output json")]
    pub json: bool,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,

    #[arg(short, long, global = true, help = "Enable debug logging on stderr")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Path to the config file")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// `--json` wins over `--output`; `None` defers to the config file.
    pub fn output_format(&self) -> Option<OutputFormat> {
        if self.json {
            Some(OutputFormat::Json)
        } else {
            self.output
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(subcommand, about = "Manage channels")]
    Channels(ChannelsCommand),

    #[command(subcommand, about = "Look up users")]
    Users(UsersCommand),

    #[command(subcommand, about = "Send, edit and read messages")]
    Messages(MessagesCommand),

    #[command(subcommand, about = "Search messages and files (requires a user token)")]
    Search(SearchCommand),

    #[command(subcommand, about = "Workspace information")]
    Workspace(WorkspaceCommand),

    #[command(about = "Show the identities behind the configured tokens")]
    Whoami,

    #[command(subcommand, about = "Manage stored tokens")]
    Config(ConfigCommand),

    #[command(about = "Guided setup: store and verify tokens")]
    Init(InitArgs),

    #[command(subcommand, about = "OAuth login and session status")]
    Auth(AuthCommand),
}

#[derive(Subcommand, Debug)]
pub enum ChannelsCommand {
    #[command(about = "List channels")]
    List {
        #[arg(long, default_value = DEFAULT_TYPES, help = "Comma-separated conversation types")]
        types: String,

        #[arg(
            long,
            default_value_t = true,
            action = ArgAction::Set,
            num_args = 0..=1,
            default_missing_value = "true",
            help = "Skip archived channels"
        )]
        exclude_archived: bool,

        #[arg(long, default_value_t = 100, help = "Maximum channels to return")]
        limit: i64,
    },

    #[command(about = "Show channel details")]
    Get { channel: String },

    #[command(about = "Create a channel")]
    Create {
        name: String,

        #[arg(long, help = "Create a private channel")]
        private: bool,
    },

    #[command(about = "Archive a channel")]
    Archive {
        channel: String,

        #[arg(short, long, help = "Skip confirmation prompt")]
        force: bool,
    },

    #[command(about = "Unarchive a channel")]
    Unarchive { channel: String },

    #[command(about = "Set the channel topic")]
    SetTopic { channel: String, topic: String },

    #[command(about = "Set the channel purpose")]
    SetPurpose { channel: String, purpose: String },

    #[command(about = "Invite users to a channel")]
    Invite {
        channel: String,

        #[arg(required = true, num_args = 1..)]
        users: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum UserField {
    #[default]
    All,
    Name,
    Email,
    #[value(name = "display_name")]
    DisplayName,
}

#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    #[command(about = "List users")]
    List {
        #[arg(long, default_value_t = 100, help = "Maximum users to return")]
        limit: i64,
    },

    #[command(about = "Show user details")]
    Get { user: String },

    #[command(about = "Find users by name, email or display name")]
    Search {
        query: String,

        #[arg(long, value_enum, default_value_t = UserField::All, help = "Field to match")]
        field: UserField,

        #[arg(long, help = "Include bot users in results")]
        include_bots: bool,

        #[arg(long, default_value_t = 1000, help = "Maximum users to search through")]
        limit: i64,
    },
}

/// At most one of these may be given.
#[derive(Args, Debug, Default, Clone)]
pub struct BlockSource {
    #[arg(long, value_name = "JSON", help = "Inline Block Kit JSON array")]
    pub blocks: Option<String>,

    #[arg(long, value_name = "PATH", help = "Read blocks from a JSON file")]
    pub blocks_file: Option<PathBuf>,

    #[arg(long, help = "Read blocks from stdin")]
    pub blocks_stdin: bool,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ComposeArgs {
    #[command(flatten)]
    pub blocks: BlockSource,

    #[arg(long, help = "Send as plain text without block formatting")]
    pub simple: bool,

    #[arg(long, help = "Disable link preview unfurling")]
    pub no_unfurl: bool,
}

#[derive(Subcommand, Debug)]
pub enum MessagesCommand {
    #[command(about = "Send a message; use '-' as text to read stdin")]
    Send {
        channel: String,
        text: Option<String>,

        #[arg(long, value_name = "TS", help = "Thread timestamp to reply to")]
        thread: Option<String>,

        #[command(flatten)]
        compose: ComposeArgs,
    },

    #[command(about = "Edit a message")]
    Update {
        channel: String,
        ts: String,
        text: Option<String>,

        #[command(flatten)]
        compose: ComposeArgs,
    },

    #[command(about = "Delete a message")]
    Delete {
        channel: String,
        ts: String,

        #[arg(short, long, help = "Skip confirmation prompt")]
        force: bool,
    },

    #[command(about = "Show channel history")]
    History {
        channel: String,

        #[arg(long, default_value_t = 20, help = "Maximum messages to return")]
        limit: i64,

        #[arg(long, help = "Only messages after this timestamp")]
        oldest: Option<String>,

        #[arg(long, help = "Only messages before this timestamp")]
        latest: Option<String>,
    },

    #[command(about = "Show replies in a thread")]
    Thread {
        channel: String,
        ts: String,

        #[arg(long, default_value_t = 100, help = "Maximum replies to return")]
        limit: i64,
    },

    #[command(about = "Add a reaction")]
    React {
        channel: String,
        ts: String,
        emoji: String,
    },

    #[command(about = "Remove a reaction")]
    Unreact {
        channel: String,
        ts: String,
        emoji: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    pub query: String,

    #[arg(short = 'c', long, default_value_t = 20, help = "Results per page (max 100)")]
    pub count: u32,

    #[arg(short, long, default_value_t = 1, help = "Page number (max 100)")]
    pub page: u32,

    #[arg(short, long, value_enum, default_value_t = SortOrder::Score)]
    pub sort: SortOrder,

    #[arg(long, value_enum, default_value_t = SortDirection::Desc)]
    pub sort_dir: SortDirection,

    #[arg(long, help = "Highlight matching terms")]
    pub highlight: bool,

    #[arg(long, help = "Include bot messages in results")]
    pub include_bots: bool,

    #[arg(long, help = "Search scope: all, public, private, dm, mpim")]
    pub scope: Option<String>,

    #[arg(long = "in", value_name = "CHANNEL", help = "Restrict to a channel")]
    pub in_channel: Option<String>,

    #[arg(long = "from", value_name = "USER", help = "Restrict to a sender")]
    pub from_user: Option<String>,

    #[arg(long, value_name = "YYYY-MM-DD")]
    pub after: Option<String>,

    #[arg(long, value_name = "YYYY-MM-DD")]
    pub before: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct MessageSearchArgs {
    #[command(flatten)]
    pub common: SearchArgs,

    #[arg(long, help = "Only messages containing links")]
    pub has_link: bool,

    #[arg(long, help = "Only messages with reactions")]
    pub has_reaction: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FileSearchArgs {
    #[command(flatten)]
    pub common: SearchArgs,

    #[arg(long = "type", value_name = "TYPE", help = "File type (pdf, doc, image, ...)")]
    pub file_type: Option<String>,

    #[arg(long, help = "Only pinned files")]
    pub has_pin: bool,
}

#[derive(Subcommand, Debug)]
pub enum SearchCommand {
    #[command(about = "Search messages")]
    Messages(MessageSearchArgs),

    #[command(about = "Search files")]
    Files(FileSearchArgs),

    #[command(about = "Search messages and files")]
    All(MessageSearchArgs),
}

#[derive(Subcommand, Debug)]
pub enum WorkspaceCommand {
    #[command(about = "Show workspace details")]
    Info,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TokenSelector {
    Bot,
    User,
    #[default]
    All,
}

impl TokenSelector {
    pub fn kinds(self) -> &'static [TokenKind] {
        match self {
            TokenSelector::Bot => &[TokenKind::Bot],
            TokenSelector::User => &[TokenKind::User],
            TokenSelector::All => &TokenKind::ALL,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    #[command(about = "Store a token; the kind is detected from its prefix")]
    SetToken { token: Option<String> },

    #[command(about = "Delete stored tokens")]
    DeleteToken {
        #[arg(short = 't', long = "type", value_enum, default_value_t = TokenSelector::All)]
        kind: TokenSelector,

        #[arg(short, long, help = "Skip confirmation prompt")]
        force: bool,
    },

    #[command(about = "Show configured tokens (masked) and where they come from")]
    Show,

    #[command(about = "Verify each configured token with auth.test")]
    Test,

    #[command(about = "Delete both stored tokens")]
    Clear,
}

#[derive(Args, Debug, Default, Clone)]
pub struct InitArgs {
    #[arg(long, value_name = "TOKEN", help = "Bot token (xoxb-*) for non-interactive setup")]
    pub bot_token: Option<String>,

    #[arg(long, value_name = "TOKEN", help = "User token (xoxp-*) for non-interactive setup")]
    pub user_token: Option<String>,

    #[arg(long, help = "Skip token verification")]
    pub no_verify: bool,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    #[command(about = "Log in through the browser with OAuth")]
    Login {
        #[arg(long, help = "Slack app client ID")]
        client_id: Option<String>,

        #[arg(long, help = "Slack app client secret")]
        client_secret: Option<String>,

        #[arg(long, help = "Local port for the OAuth callback [default: 8085]")]
        port: Option<u16>,
    },

    #[command(about = "Remove the stored bot token")]
    Logout,

    #[command(about = "Show authentication status")]
    Status,
}
