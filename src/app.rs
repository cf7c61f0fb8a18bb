use std::path::Path;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::annotation::{self, Field};
use crate::cli::args::{CliArgs, Command as CliCommand};
use crate::cli::validation;
use crate::client::{ClientOptions, DEFAULT_BASE_URL};
use crate::clipboard;
use crate::config::{self, ConfigFile};
use crate::filter::{FilterMode, StatusFilter};
use crate::output::{self, OutputFormat};
use crate::records::{self, GrievanceStatus, Record};
use crate::runner::{Options, Session};
use crate::toast::ToastTiming;
use crate::view::{Command, DashboardView, Update, ViewOptions};

fn print_banner() {
    const BANNER: &str = r#"
                      __               _
     ____  _________ _/ /_  ____ _____(_)
    / __ \/ ___/ __ `/ __ \/ __ `/ ___/ /
   / /_/ / /  / /_/ / / / / /_/ / /  / /
  / .___/_/   \__,_/_/ /_/\__,_/_/  /_/
 /_/        grievance dashboard console
    "#;
    println!("{}", BANNER.bold().cyan());
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Clone, Debug)]
struct RunConfig {
    options: Options,
    records_path: Option<String>,
    clipboard: bool,
    no_color: bool,
    command: CliCommand,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let base_url = args
        .base_url
        .clone()
        .or(cfg.base_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let timeout = args.timeout.or(cfg.timeout).filter(|t| *t > 0).map(Duration::from_secs);
    let proxy = args.proxy.clone().or(cfg.proxy);

    let filter_mode = match cfg.filter_mode.as_deref() {
        Some(raw) => FilterMode::parse(raw)
            .ok_or_else(|| format!("invalid filter_mode '{raw}', expected last or combined"))?,
        None => FilterMode::default(),
    };
    let defaults = ToastTiming::default();
    let toast = ToastTiming::new(
        cfg.toast_seconds
            .map(Duration::from_secs)
            .unwrap_or(defaults.visible),
        cfg.toast_exit_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.exit),
    );
    let feedback = cfg
        .feedback_ms
        .map(Duration::from_millis)
        .unwrap_or(ViewOptions::default().feedback);

    let records_path = args
        .command
        .records()
        .map(str::to_string)
        .or(cfg.records)
        .map(|p| config::expand_tilde(&p).to_string_lossy().to_string());

    let no_clipboard = match &args.command {
        CliCommand::CopyHash { no_clipboard, .. } | CliCommand::Console { no_clipboard, .. } => {
            *no_clipboard
        }
        _ => false,
    };

    Ok(RunConfig {
        options: Options {
            client: ClientOptions {
                base_url,
                timeout,
                proxy,
            },
            view: ViewOptions {
                filter_mode,
                toast,
                feedback,
            },
        },
        records_path,
        clipboard: cfg.clipboard.unwrap_or(true) && !no_clipboard,
        no_color: args.no_color || cfg.no_color.unwrap_or(false),
        command: args.command,
    })
}

async fn load_snapshot(path: Option<&str>) -> Result<Vec<Record>, String> {
    match path {
        Some(path) => records::load_records(Path::new(path))
            .await
            .map_err(|e| e.to_string()),
        None => Ok(Vec::new()),
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_update(update: &Update, view: &DashboardView) {
    for change in &update.changes {
        if let Some(line) = output::describe_change(change, view) {
            println!("{line}");
        }
    }
}

/// Keeps the placeholder for an id the snapshot does not know about.
fn ensure_record(records: &mut Vec<Record>, id: &str, status: GrievanceStatus) {
    if !records.iter().any(|r| r.id == id) {
        records.push(Record::new(id, status, ""));
    }
}

async fn run_list(
    run: RunConfig,
    search: Option<String>,
    status: Option<String>,
    format: Option<String>,
    output_path: Option<String>,
) -> Result<(), String> {
    if run.records_path.is_none() {
        return Err("list needs --records or a records entry in the config".to_string());
    }
    let records = load_snapshot(run.records_path.as_deref()).await?;
    let mut view = DashboardView::new(records, run.options.view);
    let now = std::time::Instant::now();
    if let Some(raw) = status.as_deref() {
        let filter = StatusFilter::parse(raw).ok_or_else(|| format!("invalid status '{raw}'"))?;
        view.update(Command::SelectFilter(filter), now);
    }
    if let Some(term) = search {
        view.update(Command::Search(term), now);
    }

    let format = format
        .as_deref()
        .and_then(OutputFormat::parse)
        .or_else(|| output_path.as_deref().and_then(output::infer_format_from_path))
        .unwrap_or(OutputFormat::Text);
    let rendered = output::render(&output::build_records(&view), format);

    match output_path {
        Some(path) => {
            tokio::fs::write(&path, &rendered)
                .await
                .map_err(|e| format!("failed to write output file '{path}': {e}"))?;
            format_kv_line("Output", &path);
        }
        None => print!("{}", String::from_utf8_lossy(&rendered)),
    }
    Ok(())
}

async fn run_annotate(text: Option<String>, file: Option<String>, markup: bool) -> Result<(), String> {
    let raw = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| format!("failed to read annotation file '{path}': {e}"))?,
        (None, None) => return Err("annotate needs TEXT or --file".to_string()),
    };
    let parsed = annotation::parse(&raw);
    if markup {
        println!("{}", annotation::render_markup(&parsed));
        return Ok(());
    }
    for field in parsed.fields() {
        match field {
            Field::Labeled { label, value } => {
                println!("{:<14} {}", format!("{label}:").bold(), value)
            }
            Field::Note { text } => println!("{text}"),
        }
    }
    Ok(())
}

async fn run_update_status(run: RunConfig, id: String, status: String) -> Result<(), String> {
    let status: GrievanceStatus = status.parse()?;
    let mut records = load_snapshot(run.records_path.as_deref()).await?;
    ensure_record(&mut records, &id, status);
    let mut session = Session::new(records, run.options, clipboard::open(false))
        .map_err(|e| e.to_string())?;

    session.dispatch(Command::SelectStatus {
        id: id.clone(),
        status,
    });
    let started = session.dispatch(Command::SaveStatus { id: id.clone() });
    print_update(&started, session.view());

    let pb = spinner("Updating...");
    let settled = session.settle().await;
    pb.finish_and_clear();
    print_update(&settled, session.view());

    match session.view().alert() {
        Some(alert) => Err(alert.to_string()),
        None => Ok(()),
    }
}

async fn run_verify(run: RunConfig, id: String) -> Result<(), String> {
    let records = load_snapshot(run.records_path.as_deref()).await?;
    let mut session = Session::new(records, run.options, clipboard::open(false))
        .map_err(|e| e.to_string())?;
    session.dispatch(Command::Verify { id });
    let pb = spinner("Verifying...");
    let settled = session.settle().await;
    pb.finish_and_clear();
    print_update(&settled, session.view());
    Ok(())
}

async fn run_copy_hash(run: RunConfig, hash: Option<String>, id: Option<String>) -> Result<(), String> {
    let (records, id) = match (hash, id) {
        (Some(hash), _) => {
            let mut record = Record::new("cli", GrievanceStatus::Pending, "");
            record.hash = Some(hash);
            (vec![record], "cli".to_string())
        }
        (None, Some(id)) => {
            if run.records_path.is_none() {
                return Err(
                    "copy-hash --id needs --records or a records entry in the config".to_string(),
                );
            }
            (load_snapshot(run.records_path.as_deref()).await?, id)
        }
        (None, None) => return Err("copy-hash needs --hash or --id".to_string()),
    };
    let mut session = Session::new(records, run.options, clipboard::open(run.clipboard))
        .map_err(|e| e.to_string())?;
    let update = session.dispatch(Command::CopyHash { id: id.clone() });
    print_update(&update, session.view());

    // Clipboard refused the write: hand the hash over on stdout instead.
    if session.view().toast().is_none() {
        if let Some(hash) = session.view().record(&id).and_then(|r| r.record.hash.as_deref()) {
            tracing::warn!("clipboard unavailable, printing hash");
            println!("{hash}");
        }
    }
    Ok(())
}

const CONSOLE_HELP: &str = "commands:
  search <term>          filter by id, status or annotation text
  clear                  clear the search
  filter <all|status>    show one status
  select <id> <status>   set the status selector
  save <id>              submit the selected status
  verify <id>            ledger lookup
  copy <id>              copy the integrity hash
  play <id>              toggle playback
  seek <id> <fraction>   jump to a fraction of the recording
  show                   list visible records
  help                   this text
  quit                   leave";

fn parse_console_line(line: &str, view: &DashboardView) -> Result<Option<Command>, String> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let mut words = rest.split_whitespace();
    let first = words.next().map(str::to_string);
    let need_id = || first.clone().ok_or_else(|| format!("{verb} needs a record id"));

    let command = match verb {
        "" => return Ok(None),
        "search" => Command::Search(rest.to_string()),
        "clear" => Command::ClearSearch,
        "filter" => Command::SelectFilter(
            StatusFilter::parse(rest).ok_or_else(|| format!("unknown filter '{rest}'"))?,
        ),
        "select" => {
            let id = need_id()?;
            let raw = words.collect::<Vec<_>>().join(" ");
            Command::SelectStatus {
                id,
                status: raw.parse()?,
            }
        }
        "save" => Command::SaveStatus { id: need_id()? },
        "verify" => Command::Verify { id: need_id()? },
        "copy" => Command::CopyHash { id: need_id()? },
        "play" => Command::TogglePlayback { id: need_id()? },
        "seek" => {
            let id = need_id()?;
            let fraction = words
                .next()
                .and_then(|f| f.parse::<f64>().ok())
                .ok_or_else(|| "seek needs a fraction between 0 and 1".to_string())?;
            Command::SeekFraction { id, fraction }
        }
        "show" => {
            let rendered = output::render_text(&output::build_records(view));
            print!("{}", String::from_utf8_lossy(&rendered));
            return Ok(None);
        }
        "help" => {
            println!("{CONSOLE_HELP}");
            return Ok(None);
        }
        other => return Err(format!("unknown command '{other}', try help")),
    };
    Ok(Some(command))
}

async fn run_console(run: RunConfig) -> Result<(), String> {
    if run.records_path.is_none() {
        return Err("console needs --records or a records entry in the config".to_string());
    }
    let records = load_snapshot(run.records_path.as_deref()).await?;
    let base_url = run.options.client.base_url.clone();
    let mut session = Session::new(records, run.options, clipboard::open(run.clipboard))
        .map_err(|e| e.to_string())?;

    format_kv_line("Server", &base_url);
    format_kv_line("Records", &session.view().records().len().to_string());
    println!("{CONSOLE_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => return Err(format!("failed to read stdin: {e}")),
                };
                if matches!(line.trim(), "quit" | "exit") {
                    break;
                }
                match parse_console_line(&line, session.view()) {
                    Ok(Some(command)) => {
                        let update = session.dispatch(command);
                        print_update(&update, session.view());
                    }
                    Ok(None) => {}
                    Err(e) => println!("{}", e.yellow()),
                }
            }
            Some(update) = session.next_completion(), if session.pending() > 0 => {
                print_update(&update, session.view());
                if session.view().alert().is_some() {
                    let dismissed = session.dispatch(Command::DismissAlert);
                    print_update(&dismissed, session.view());
                }
            }
            _ = ticker.tick() => {
                let update = session.tick();
                print_update(&update, session.view());
            }
        }
    }

    if session.pending() > 0 {
        let settled = session.settle().await;
        print_update(&settled, session.view());
    }
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    match run.command.clone() {
        CliCommand::List {
            search,
            status,
            format,
            output,
            ..
        } => run_list(run, search, status, format, output).await,
        CliCommand::Annotate { text, file, markup } => run_annotate(text, file, markup).await,
        CliCommand::UpdateStatus { id, status, .. } => run_update_status(run, id, status).await,
        CliCommand::Verify { id, .. } => run_verify(run, id).await,
        CliCommand::CopyHash { hash, id, .. } => run_copy_hash(run, hash, id).await,
        CliCommand::Console { .. } => {
            print_banner();
            run_console(run).await
        }
    }
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                print!("{e}");
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    init_logging(args.verbose);

    let cfg = match args.config.as_deref() {
        Some(path) => config::load_config(&config::expand_tilde(path), false)?,
        None => match config::default_config_path() {
            Some(path) => {
                if let Err(e) = config::ensure_default_config_file(&path) {
                    tracing::warn!(error = %e, "could not create default config");
                }
                config::load_config(&path, true)?
            }
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
