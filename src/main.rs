use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{ArgGroup, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use nfl_lines::api::{ApiSportsClient, ClientSettings, ScheduleRow, DEFAULT_BASE_URL, DEFAULT_LEAGUE_ID};
use nfl_lines::cache::{self, LongOptions, WeekCache};
use nfl_lines::error::{ApiError, CacheError, LoadError, PricingError};
use nfl_lines::pricing::{validate_model_config, Engine, FactorRegistry};
use nfl_lines::schedule::{known_seasons, latest_season, week1_thursday, week_range};

const EXIT_SUCCESS: i32 = 0;
const EXIT_NETWORK: i32 = 2;
const EXIT_CONFIG: i32 = 4;

/// Dates the upcoming-schedule command asks the API for, so game dates match
/// the US broadcast day.
const SCHEDULE_TIMEZONE: &str = "America/New_York";

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Cache every completed week of a season
    Update {
        /// Season to update (defaults to the current season)
        #[arg(long)]
        season: Option<i32>,
        /// Re-fetch weeks that are already cached
        #[arg(long)]
        refresh: bool,
    },
    /// Cache all regular-season weeks of one or more seasons
    Backfill {
        #[arg(required = true)]
        seasons: Vec<i32>,
        #[arg(long)]
        refresh: bool,
    },
    /// Re-fetch a single week
    Refresh { season: i32, week: u32 },
    /// Show which weeks are cached
    Status,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Price a schedule from a ratings table
    Price {
        /// Ratings CSV (team, power, [off, def, qb_points])
        #[arg(long)]
        ratings: PathBuf,
        /// Schedule CSV (week, date, away, home, [neutral])
        #[arg(long)]
        schedule: PathBuf,
        /// Model config (defaults to ~/.config/nfl-lines/config.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write lines as CSV instead of printing a table
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Print the factor breakdown of every game
        #[arg(long)]
        explain: bool,
    },
    /// Create a model config interactively
    Init {
        /// Where to write the config
        #[arg(long)]
        path: Option<PathBuf>,
        /// Write the defaults without prompting
        #[arg(short, long)]
        yes: bool,
    },
    /// Manage the weekly game cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
    /// Fetch an upcoming week's games as a schedule CSV
    Schedule {
        week: u32,
        #[arg(long)]
        season: Option<i32>,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print one raw game from the API
    #[command(group(ArgGroup::new("when").required(true).args(["date", "week"])))]
    Peek {
        /// Day to fetch (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Week whose first day (Thursday) to fetch
        #[arg(long)]
        week: Option<u32>,
        #[arg(long)]
        season: Option<i32>,
        /// 0-based index of the game to show
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// Build the team-perspective table from cached weeks
    Long {
        /// Only these seasons (repeatable)
        #[arg(long = "season")]
        seasons: Vec<i32>,
        #[arg(long)]
        through_week: Option<u32>,
        /// Keep weeks after the regular season
        #[arg(long)]
        include_playoffs: bool,
        /// Require exact column names
        #[arg(long)]
        strict: bool,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "nfl-lines")]
#[command(about = "NFL spread, total and moneyline pricing from power ratings", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// API-Sports key
    #[arg(long, global = true, env = "API_SPORTS_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, global = true, env = "API_SPORTS_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, global = true, env = "API_SPORTS_LEAGUE_ID", default_value_t = DEFAULT_LEAGUE_ID)]
    league_id: u32,

    /// Cache root (defaults to the user cache dir)
    #[arg(long, global = true, env = "NFL_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// HTTP request timeout
    #[arg(long, global = true, default_value = "20s")]
    timeout: humantime::Duration,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn client(&self, timezone: Option<&str>) -> Result<ApiSportsClient> {
        let api_key = nfl_lines::credentials::resolve_api_key(self.api_key.clone())?;
        let settings = ClientSettings {
            base_url: self.base_url.clone(),
            league_id: self.league_id,
            timeout: *self.timeout,
            timezone: timezone.map(String::from),
        };
        Ok(ApiSportsClient::new(settings, api_key)?)
    }

    fn cache_root(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => cache::default_cache_root().context("Could not determine cache directory"),
        }
    }
}

/// Most recent season whose week 1 has started by `today`.
fn current_season(today: NaiveDate) -> i32 {
    known_seasons()
        .into_iter()
        .rev()
        .find(|s| week1_thursday(*s).is_some_and(|w1| w1 <= today))
        .unwrap_or_else(latest_season)
}

/// Network and API failures exit 2; everything else is a config or data error.
fn exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(api) = cause.downcast_ref::<ApiError>() {
            return match api {
                ApiError::Schedule(_) => EXIT_CONFIG,
                _ => EXIT_NETWORK,
            };
        }
        if let Some(CacheError::Api(api)) = cause.downcast_ref::<CacheError>() {
            return match api {
                ApiError::Schedule(_) => EXIT_CONFIG,
                _ => EXIT_NETWORK,
            };
        }
    }
    EXIT_CONFIG
}

fn write_rows<T: serde::Serialize>(rows: &[T], out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            nfl_lines::io::write_csv_file(path, rows)?;
            eprintln!("Wrote {} rows to {}", rows.len(), path.display());
            Ok(())
        }
        None => nfl_lines::io::write_csv(std::io::stdout().lock(), rows),
    }
}

fn run_price(
    ratings: &Path,
    schedule: &Path,
    config: Option<&Path>,
    out: Option<&Path>,
    explain: bool,
) -> Result<()> {
    let start_time = Instant::now();
    let registry = FactorRegistry::with_builtin();
    let model = nfl_lines::config::load_config(config)?;

    if let Err(errors) = validate_model_config(&model, &registry) {
        eprintln!("Model config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let ratings = nfl_lines::io::load_ratings(ratings).map_err(load_context)?;
    let schedule = nfl_lines::io::load_schedule(schedule).map_err(load_context)?;
    debug!(teams = ratings.len(), games = schedule.len(), "loaded inputs");

    let engine = Engine::new(model.params(), &model.pipeline(), &registry)
        .map_err(pricing_context)?;
    let matchups = Engine::merge(&schedule, &ratings).map_err(pricing_context)?;
    let lines = engine.price(&matchups);

    let use_colors = nfl_lines::output::should_use_colors();
    if explain {
        for m in &matchups {
            println!("{}", nfl_lines::output::format_explanation(&engine.explain(m), use_colors));
            println!();
        }
    }

    match out {
        Some(path) => write_rows(&lines, Some(path))?,
        None if !explain => println!("{}", nfl_lines::output::format_lines_table(&lines, use_colors)),
        None => {}
    }

    info!(games = lines.len(), elapsed = ?start_time.elapsed(), "done");
    Ok(())
}

fn load_context(err: LoadError) -> anyhow::Error {
    anyhow::Error::new(err).context("Failed to load input table")
}

fn pricing_context(err: PricingError) -> anyhow::Error {
    anyhow::Error::new(err).context("Cannot price schedule")
}

async fn run_cache(cli: &Cli, action: &CacheCommand) -> Result<()> {
    let cache = WeekCache::new(cli.cache_root()?);
    let use_colors = nfl_lines::output::should_use_colors();

    let outcomes = match action {
        CacheCommand::Status => {
            let status = cache.status()?;
            println!("{}", nfl_lines::output::format_cache_status(&status, use_colors));
            return Ok(());
        }
        CacheCommand::Update { season, refresh } => {
            let today = Local::now().date_naive();
            let season = season.unwrap_or_else(|| current_season(today));
            info!(season, %today, "updating cache");
            cache.update(&cli.client(None)?, season, today, *refresh).await?
        }
        CacheCommand::Backfill { seasons, refresh } => {
            cache.backfill(&cli.client(None)?, seasons, *refresh).await?
        }
        CacheCommand::Refresh { season, week } => {
            vec![cache.refresh(&cli.client(None)?, *season, *week).await?]
        }
    };

    println!("{}", nfl_lines::output::format_week_outcomes(&outcomes));
    Ok(())
}

async fn run_schedule(cli: &Cli, week: u32, season: Option<i32>, out: Option<&Path>) -> Result<()> {
    let season = season.unwrap_or_else(|| current_season(Local::now().date_naive()));
    let cache = WeekCache::new(cli.cache_root()?);
    let client = cli.client(Some(SCHEDULE_TIMEZONE))?;

    let records = cache
        .fetch_upcoming(&client, season, week)
        .await
        .with_context(|| format!("Failed to fetch schedule for {} week {}", season, week))?;

    let rows: Vec<ScheduleRow> = records.iter().filter_map(|r| r.to_schedule_row()).collect();
    if rows.len() < records.len() {
        warn!(skipped = records.len() - rows.len(), "games without both team names left out");
    }
    if rows.is_empty() {
        eprintln!("No games found for {} week {}.", season, week);
    }
    write_rows(&rows, out)
}

async fn run_peek(
    cli: &Cli,
    date: Option<NaiveDate>,
    week: Option<u32>,
    season: Option<i32>,
    index: usize,
) -> Result<()> {
    let season = season.unwrap_or_else(|| current_season(Local::now().date_naive()));
    let date = match (date, week) {
        (Some(date), _) => date,
        (None, Some(week)) => week_range(season, week)?.0,
        (None, None) => anyhow::bail!("Pass --date or --week"),
    };

    let client = cli.client(None)?;
    let games = client.games_by_date(date, Some(season)).await?;
    eprintln!(
        "date={} season={} league_id={} -> {} games",
        date,
        season,
        cli.league_id,
        games.len()
    );
    if games.is_empty() {
        return Ok(());
    }
    let idx = index.min(games.len() - 1);
    eprintln!("showing game index {} of {}", idx, games.len());
    println!("{}", serde_json::to_string_pretty(&games[idx])?);
    Ok(())
}

fn run_long(
    cli: &Cli,
    seasons: &[i32],
    through_week: Option<u32>,
    include_playoffs: bool,
    strict: bool,
    out: Option<&Path>,
) -> Result<()> {
    let opts = LongOptions {
        seasons: (!seasons.is_empty()).then(|| seasons.to_vec()),
        through_week,
        include_playoffs,
        strict_columns: strict,
    };
    let rows = cache::build_team_long(&cli.cache_root()?, &opts)?;
    write_rows(&rows, out)
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Price {
            ratings,
            schedule,
            config,
            out,
            explain,
        } => run_price(ratings, schedule, config.as_deref(), out.as_deref(), *explain),
        Commands::Init { path, yes } => nfl_lines::config::run_init_wizard(path.clone(), *yes),
        Commands::Cache { action } => run_cache(cli, action).await,
        Commands::Schedule { week, season, out } => run_schedule(cli, *week, *season, out.as_deref()).await,
        Commands::Peek {
            date,
            week,
            season,
            index,
        } => run_peek(cli, *date, *week, *season, *index).await,
        Commands::Long {
            seasons,
            through_week,
            include_playoffs,
            strict,
            out,
        } => run_long(cli, seasons, *through_week, *include_playoffs, *strict, out.as_deref()),
    }
}

#[tokio::main]
async fn main() {
    // Fails only if a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    nfl_lines::logging::init(cli.verbose);

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }

    std::process::exit(EXIT_SUCCESS);
}
