use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use railyard_browser::app::{App, BrowseQuery, DownloadResult, ListResult, TagsResult};
use railyard_browser::config::ConfigLoader;
use railyard_browser::domain::{ItemId, PageSize, RegistryKind, SortKey};
use railyard_browser::error::RailyardError;
use railyard_browser::manifest::CanonicalItem;
use railyard_browser::output::{JsonOutput, OutputMode};
use railyard_browser::registry::{RegistryClient, RegistryHttpClient};
use railyard_browser::store::Store;
use railyard_browser::tui::Tui;

#[derive(Parser)]
#[command(name = "railyard")]
#[command(about = "Browse the Railyard registry of Subway Builder maps and mods")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Community maps")]
    Maps(RegistryArgs),
    #[command(about = "Community mods")]
    Mods(RegistryArgs),
}

#[derive(Args)]
struct RegistryArgs {
    #[command(subcommand)]
    command: Option<RegistryCommand>,
}

#[derive(Subcommand)]
enum RegistryCommand {
    #[command(about = "List one page of items")]
    List(ListArgs),
    #[command(about = "Show one item with all manifest fields")]
    Show(ShowArgs),
    #[command(about = "List every tag in the registry")]
    Tags,
    #[command(about = "Download an item")]
    Download(DownloadArgs),
    #[command(about = "Open the interactive browser")]
    Browse(ListArgs),
}

#[derive(Args, Clone, Default)]
struct ListArgs {
    #[arg(long, short)]
    query: Option<String>,

    #[arg(long = "tag")]
    tags: Vec<String>,

    #[arg(long)]
    sort: Option<SortKey>,

    #[arg(long)]
    page_size: Option<PageSize>,

    #[arg(long)]
    page: Option<usize>,
}

impl From<ListArgs> for BrowseQuery {
    fn from(args: ListArgs) -> Self {
        BrowseQuery {
            query: args.query,
            tags: args.tags,
            sort: args.sort,
            page_size: args.page_size,
            page: args.page,
        }
    }
}

#[derive(Args)]
struct ShowArgs {
    id: String,
}

#[derive(Args)]
struct DownloadArgs {
    id: String,

    #[arg(long)]
    dest: Option<String>,

    #[arg(long)]
    force: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(railyard) = report.downcast_ref::<RailyardError>() {
            return ExitCode::from(map_exit_code(railyard));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &RailyardError) -> u8 {
    match error {
        RailyardError::ItemNotFound(_) | RailyardError::NoDownloadUrl(_) => 2,
        RailyardError::RegistryUnavailable(_)
        | RailyardError::RegistryStatus { .. }
        | RailyardError::ManifestHttp(_)
        | RailyardError::ManifestStatus { .. }
        | RailyardError::DownloadHttp(_)
        | RailyardError::DownloadStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let client = RegistryHttpClient::new(config.timeout_secs, config.max_retries)?;
    let app = App::new(config, client);

    let (kind, command) = match cli.command {
        Some(Commands::Maps(args)) => (RegistryKind::Maps, args.command),
        Some(Commands::Mods(args)) => (RegistryKind::Mods, args.command),
        None => (RegistryKind::Maps, None),
    };

    let command = match (command, output_mode) {
        (Some(command), _) => command,
        (None, OutputMode::Interactive) => RegistryCommand::Browse(ListArgs::default()),
        (None, OutputMode::NonInteractive) => {
            return Err(miette::Report::msg(
                "command required (try `railyard maps --help`)",
            ));
        }
    };

    run_command(app, kind, command, output_mode)
}

fn run_command<C: RegistryClient + 'static>(
    app: App<C>,
    kind: RegistryKind,
    command: RegistryCommand,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match command {
        RegistryCommand::List(args) => {
            let result = app.list(kind, args.into(), &JsonOutput)?;
            match output_mode {
                OutputMode::NonInteractive => JsonOutput::print_list(&result).into_diagnostic(),
                OutputMode::Interactive => {
                    print_list_summary(&result);
                    Ok(())
                }
            }
        }
        RegistryCommand::Show(args) => {
            let id = args.id.parse::<ItemId>()?;
            let item = app.show(kind, &id, &JsonOutput)?;
            match output_mode {
                OutputMode::NonInteractive => JsonOutput::print_item(&item).into_diagnostic(),
                OutputMode::Interactive => {
                    print_item(kind, &item);
                    Ok(())
                }
            }
        }
        RegistryCommand::Tags => {
            let result = app.tags(kind, &JsonOutput)?;
            match output_mode {
                OutputMode::NonInteractive => JsonOutput::print_tags(&result).into_diagnostic(),
                OutputMode::Interactive => {
                    print_tags(&result);
                    Ok(())
                }
            }
        }
        RegistryCommand::Download(args) => {
            let id = args.id.parse::<ItemId>()?;
            let store = Store::new(args.dest.as_deref())?;
            let result = app.download(kind, &id, &store, args.force, &JsonOutput)?;
            match output_mode {
                OutputMode::NonInteractive => {
                    JsonOutput::print_download(&result).into_diagnostic()
                }
                OutputMode::Interactive => {
                    print_download(&result);
                    Ok(())
                }
            }
        }
        RegistryCommand::Browse(args) => {
            if matches!(output_mode, OutputMode::NonInteractive) {
                return Err(miette::Report::msg(
                    "browse needs a terminal; use `list` with --non-interactive",
                ));
            }
            let view = app.view_state(kind, &args.into());
            let store = Store::new(None)?;
            let mut tui = Tui::new(app, store, kind, view);
            tui.run()
        }
    }
}

fn print_list_summary(result: &ListResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let gray = "\x1b[90m";
    let reset = "\x1b[0m";

    println!(
        "{cyan}Railyard {}: {} result(s), page {} of {}{reset}",
        result.kind, result.total, result.page, result.total_pages
    );
    for item in &result.items {
        let population = item
            .population
            .map(|value| format!("  pop {value:.0}"))
            .unwrap_or_default();
        println!("{green}• {}{reset} {gray}{}{population}{reset}", item.title, item.id);
        println!("    {}", item.description);
        if !item.tags.is_empty() {
            println!("    {gray}tags: {}{reset}", item.tags.join(", "));
        }
    }
    if !result.skipped.is_empty() {
        println!(
            "{yellow}Skipped {} of {} listed item(s): {}{reset}",
            result.skipped.len(),
            result.listed,
            result.skipped.join(", ")
        );
    }
}

fn print_item(kind: RegistryKind, item: &CanonicalItem) {
    let cyan = "\x1b[36m";
    let gray = "\x1b[90m";
    let reset = "\x1b[0m";

    println!("{cyan}{}{reset} {gray}({kind}:{}){reset}", item.title, item.id);
    println!("Author: {}", item.author);
    if let Some(population) = item.population {
        println!("Population: {population:.0}");
    }
    if !item.tags.is_empty() {
        println!("Tags: {}", item.tags.join(", "));
    }
    println!();
    println!("{}", item.description);
    println!();
    for (index, candidates) in item.images.iter().enumerate() {
        println!("Image {}: {}", index + 1, candidates.join(" | "));
    }
    if let Some(url) = &item.download_url {
        println!("Download: {url}");
    }
    println!();
    for field in &item.fields {
        println!("{gray}{}:{reset} {}", field.key, field.value);
    }
}

fn print_tags(result: &TagsResult) {
    let cyan = "\x1b[36m";
    let gray = "\x1b[90m";
    let reset = "\x1b[0m";

    println!("{cyan}Railyard {} tags{reset}", result.kind);
    for entry in &result.tags {
        println!("{} {gray}({}, {}){reset}", entry.label, entry.tag, entry.count);
    }
}

fn print_download(result: &DownloadResult) {
    let green = "\x1b[32m";
    let reset = "\x1b[0m";
    println!("{green}Saved {}:{} to {}{reset}", result.kind, result.id, result.path);
}
