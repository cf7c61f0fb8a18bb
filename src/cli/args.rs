use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "prahari-console",
    version,
    about = "grievance dashboard console",
    long_about = "Prahari console drives the grievance administration dashboard: search and filter records, update statuses, verify records against the ledger, copy integrity hashes and control evidence playback.\n\nExamples:\n  prahari-console list --records grievances.json --search water\n  prahari-console update-status --id 482913 --status resolved\n  prahari-console verify --id 482913\n  prahari-console console --records grievances.json\n\nTip: Use --config to persist the server URL and notification timings."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        global = true,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        global = true,
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        global = true,
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.prahari/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        short = 'u',
        long = "bu",
        visible_alias = "base-url",
        value_name = "URL",
        global = true,
        help_heading = "HTTP",
        help = "Dashboard server base URL."
    )]
    pub base_url: Option<String>,

    #[arg(
        long = "to",
        visible_alias = "timeout",
        value_name = "SECS",
        global = true,
        help_heading = "HTTP",
        help = "Request timeout in seconds (default: none)."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'p',
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        global = true,
        help_heading = "HTTP",
        help = "Route requests through a proxy."
    )]
    pub proxy: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct RecordsArg {
    #[arg(
        short = 'r',
        long = "rec",
        visible_alias = "records",
        value_name = "FILE",
        help = "Record snapshot (JSON or YAML)."
    )]
    pub records: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List records, optionally searched and filtered.
    List {
        #[command(flatten)]
        records: RecordsArg,

        #[arg(short = 's', long = "search", value_name = "TERM", help = "Free-text search term.")]
        search: Option<String>,

        #[arg(
            short = 'f',
            long = "st",
            visible_alias = "status",
            value_name = "STATUS",
            help = "Show only this status (or 'all')."
        )]
        status: Option<String>,

        #[arg(long = "fmt", visible_alias = "format", value_name = "FORMAT", help = "Output format (text or json).")]
        format: Option<String>,

        #[arg(short = 'o', long = "out", visible_alias = "output", value_name = "FILE", help = "Write output to a file.")]
        output: Option<String>,
    },

    /// Format an annotation.
    Annotate {
        #[arg(value_name = "TEXT", help = "Annotation text (reads --file when omitted).")]
        text: Option<String>,

        #[arg(long = "file", value_name = "FILE", help = "Read the annotation from a file.")]
        file: Option<String>,

        #[arg(long = "markup", help = "Print HTML markup instead of fields.")]
        markup: bool,
    },

    /// Submit a status change for one record.
    UpdateStatus {
        #[arg(long = "id", value_name = "ID")]
        id: String,

        #[arg(long = "st", visible_alias = "status", value_name = "STATUS")]
        status: String,

        #[command(flatten)]
        records: RecordsArg,
    },

    /// Look a record up in the ledger.
    Verify {
        #[arg(long = "id", value_name = "ID")]
        id: String,

        #[command(flatten)]
        records: RecordsArg,
    },

    /// Copy an integrity hash to the clipboard.
    CopyHash {
        #[arg(long = "hash", value_name = "HASH", conflicts_with = "id")]
        hash: Option<String>,

        #[arg(long = "id", value_name = "ID")]
        id: Option<String>,

        #[command(flatten)]
        records: RecordsArg,

        #[arg(long = "ncb", visible_alias = "no-clipboard", help = "Do not touch the system clipboard.")]
        no_clipboard: bool,
    },

    /// Interactive session over stdin.
    Console {
        #[command(flatten)]
        records: RecordsArg,

        #[arg(long = "ncb", visible_alias = "no-clipboard", help = "Do not touch the system clipboard.")]
        no_clipboard: bool,
    },
}

impl Command {
    pub fn records(&self) -> Option<&str> {
        match self {
            Command::List { records, .. }
            | Command::UpdateStatus { records, .. }
            | Command::Verify { records, .. }
            | Command::CopyHash { records, .. }
            | Command::Console { records, .. } => records.records.as_deref(),
            Command::Annotate { .. } => None,
        }
    }
}
