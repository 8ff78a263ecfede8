mod platform;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use crawlwatch_core::{CrawlStatus, ViewTab};
use crawlwatch_engine::ListQuery;
use crawlwatch_logging::watch_error;
use log::LevelFilter;

use platform::{AppConfig, LogDestination, WatchOptions, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "crawlwatch")]
#[command(about = "Follow web crawls live and manage them from the terminal")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (RON)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// API base URL, overrides the config file
    #[arg(long, global = true)]
    api: Option<String>,

    /// Where log lines go
    #[arg(long, global = true, value_enum, default_value_t = LogDestination::Terminal)]
    log: LogDestination,

    /// Minimum level that is logged
    #[arg(long, global = true, default_value_t = LevelFilter::Warn)]
    log_level: LevelFilter,
}

#[derive(Subcommand)]
enum Command {
    /// Follow one crawl until quit (type progress, stats, graph or quit)
    Watch {
        crawl_id: String,

        #[arg(long, value_enum, default_value_t = TabArg::Progress)]
        tab: TabArg,

        /// Exit once the crawl is completed, failed or cancelled
        #[arg(long)]
        until_done: bool,
    },
    /// List crawls
    List {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        offset: Option<u32>,
    },
    /// Start a crawl
    Create {
        url: String,

        /// Link depth to follow, 1 to 5
        #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..=5))]
        depth: u32,
    },
    /// Cancel a crawl
    Cancel { crawl_id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TabArg {
    Progress,
    Stats,
    Graph,
}

impl From<TabArg> for ViewTab {
    fn from(tab: TabArg) -> Self {
        match tab {
            TabArg::Progress => ViewTab::Progress,
            TabArg::Stats => ViewTab::Stats,
            TabArg::Graph => ViewTab::Graph,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatusArg {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl From<StatusArg> for CrawlStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Pending => CrawlStatus::Pending,
            StatusArg::Running => CrawlStatus::Running,
            StatusArg::Completed => CrawlStatus::Completed,
            StatusArg::Failed => CrawlStatus::Failed,
            StatusArg::Cancelled => CrawlStatus::Cancelled,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    platform::initialize_logging(cli.log, cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            watch_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::load(&cli.config);
    if let Some(api) = cli.api {
        config.api_base = api;
    }

    match cli.command {
        Command::Watch {
            crawl_id,
            tab,
            until_done,
        } => platform::run_watch(
            &config,
            WatchOptions {
                crawl_id,
                tab: tab.into(),
                until_done,
            },
        ),
        Command::List {
            status,
            limit,
            offset,
        } => platform::list(
            &config,
            ListQuery {
                status: status.map(Into::into),
                limit,
                offset,
            },
        ),
        Command::Create { url, depth } => platform::create(&config, url, depth),
        Command::Cancel { crawl_id } => platform::cancel(&config, &crawl_id),
    }
}
