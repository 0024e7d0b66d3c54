use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use gitread::Repository;
use gitread::artifacts::diff::tree_diff::DiffFilter;
use gitread::commands::list_history::DEFAULT_HISTORY_LIMIT;
use gitread::logging::setup_logger;
use gitread::report::{self, OutputFormat};
use is_terminal::IsTerminal;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "gitread",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "Read-only git history and diff queries",
    long_about = "Answers history and diff questions about an on-disk git repository \
    by reading its object store directly: loose objects, packs and delta chains. \
    It never writes to the repository.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "CLIENT_WORKDIR",
        help = "Repository directory (defaults to $CLIENT_WORKDIR, $WORKDIR, then the current directory)"
    )]
    repo: Option<PathBuf>,
    #[arg(long, global = true, env = "WORKDIR", hide = true)]
    workdir: Option<PathBuf>,
    #[arg(long, global = true, value_enum, default_value_t, help = "Output format")]
    format: OutputFormat,
    #[arg(short, long, global = true, action = ArgAction::Count, help = "Increase log verbosity (-v debug, -vv trace)")]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "log",
        about = "Show the most recent commits reachable from HEAD",
        long_about = "This command lists commits on HEAD's first-parent chain, newest first, \
        with their hash, author, date and summary line."
    )]
    Log {
        #[arg(short = 'n', long, default_value_t = DEFAULT_HISTORY_LIMIT, help = "Number of commits to show")]
        limit: usize,
    },
    #[command(
        name = "changed-files",
        about = "List files changed between HEAD and N commits back"
    )]
    ChangedFiles {
        #[arg(index = 1, help = "Number of commits to look back from HEAD")]
        commits_back: usize,
        #[arg(long, value_parser = parse_diff_filter, help = "Only show changes of these kinds (any of A, D, M)")]
        filter: Option<DiffFilter>,
    },
    #[command(
        name = "file-diff",
        about = "Show the diff of one file between HEAD and N commits back"
    )]
    FileDiff {
        #[arg(index = 1, help = "Path of the file, relative to the repository root")]
        path: PathBuf,
        #[arg(index = 2, help = "Number of commits to look back from HEAD")]
        commits_back: usize,
    },
    #[command(
        name = "file-history",
        about = "Show every commit that changed a file, with its diff"
    )]
    FileHistory {
        #[arg(index = 1, help = "Path of the file, relative to the repository root")]
        path: PathBuf,
    },
    #[command(
        name = "serve",
        about = "Answer line-delimited JSON tool requests on stdin",
        long_about = "This command reads one JSON request per line from stdin and writes one JSON \
        response per line to stdout until stdin is closed. Tools: git-log, git-changed-files, \
        git-file-diff, git-file-history."
    )]
    Serve,
}

fn parse_diff_filter(value: &str) -> Result<DiffFilter, String> {
    DiffFilter::try_parse(value).ok_or_else(|| format!("invalid diff filter: {value}"))
}

fn repository_path(repo: Option<PathBuf>, workdir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = [repo, workdir]
        .into_iter()
        .flatten()
        .find(|path| !path.as_os_str().is_empty())
    {
        tracing::debug!(path = %path.display(), "repository location");
        return Ok(path);
    }

    std::env::current_dir().context("Failed to read the current directory")
}

fn open_repository(path: &Path) -> Result<Repository> {
    Repository::open(path).with_context(|| format!("Error opening repository: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logger(cli.verbose);

    let repo_path = repository_path(cli.repo, cli.workdir)?;
    let format = cli.format;
    colored::control::set_override(std::io::stdout().is_terminal());

    let output = match cli.command {
        Commands::Log { limit } => {
            let repository = open_repository(&repo_path)?;
            let commits = repository
                .list_history(limit)
                .context("Error getting commit history")?;

            match format {
                OutputFormat::Text => report::render_history(&commits),
                OutputFormat::Json => report::render_json(&commits)?,
            }
        }
        Commands::ChangedFiles {
            commits_back,
            filter,
        } => {
            let repository = open_repository(&repo_path)?;
            let mut changes = repository
                .list_changed_files(commits_back)
                .context("Error getting changes")?;
            if let Some(filter) = filter {
                changes.retain(|_, change| change.matches_filter(filter));
            }

            match format {
                OutputFormat::Text => report::render_changed_files(&changes, commits_back),
                OutputFormat::Json => report::render_json(&report::changed_file_list(&changes))?,
            }
        }
        Commands::FileDiff { path, commits_back } => {
            let repository = open_repository(&repo_path)?;
            let diff = repository
                .file_diff(&path, commits_back)
                .context("Error getting changes")?;

            match format {
                OutputFormat::Text => report::render_file_diff(&diff),
                OutputFormat::Json => report::render_json(&diff)?,
            }
        }
        Commands::FileHistory { path } => {
            let repository = open_repository(&repo_path)?;
            let revisions = repository
                .file_history(&path, None)
                .await
                .context("Error iterating commits")?;

            match format {
                OutputFormat::Text => report::render_file_history(&path, &revisions),
                OutputFormat::Json => report::render_json(&revisions)?,
            }
        }
        Commands::Serve => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            gitread::serve::run(&repo_path, stdin, tokio::io::stdout())
                .await
                .context("Tool server stopped")?;
            return Ok(());
        }
    };

    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{output}")?;
    if format == OutputFormat::Json {
        writeln!(stdout)?;
    }

    Ok(())
}
