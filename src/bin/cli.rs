//! sugang CLI
//!
//! Course search over the bulk export and a seat watcher over the search page.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use sugang::{
    error::Result,
    models::{Config, DAY_TOKENS, FilterCriteria, Role, Semester, SortKey, WatchKey, guess_columns},
    pipeline::{self, RATIO_COLUMN, REMAINING_COLUMN, SearchRequest},
    services::{CourseFetcher, FetchQuery},
    storage::{FetchCache, LocalStorage, MemoryCache},
    utils::{display, parse_clock_window, schedule::format_minutes},
};

/// sugang - SNU course search and seat monitor
#[derive(Parser, Debug)]
#[command(
    name = "sugang",
    version,
    about = "Search SNU course listings and watch seat counts"
)]
struct Cli {
    /// Path to storage directory containing config and cache
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Keep fetched tables in memory only
    #[arg(long)]
    no_disk_cache: bool,

    #[command(subcommand)]
    command: Command,
}

/// Term and server-side query options shared by the fetching commands.
#[derive(Args, Debug)]
struct FetchArgs {
    /// Academic year (overrides config)
    #[arg(long)]
    year: Option<u16>,

    /// Semester: 1/first, 2/summer, 3/second, 4/winter (overrides config)
    #[arg(long)]
    semester: Option<Semester>,

    /// Server-side subject name filter
    #[arg(long)]
    name: Option<String>,

    /// Server-side subject code filter
    #[arg(long)]
    code: Option<String>,

    /// Rows requested from the export endpoint
    #[arg(long)]
    page_size: Option<u32>,

    /// Ignore cached tables and fetch again
    #[arg(long)]
    refresh: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the course list, filter it and print or export the result
    Search {
        #[command(flatten)]
        fetch: FetchArgs,

        /// Case-insensitive keyword over name, code, section, department, professor and schedule
        #[arg(short, long, default_value = "")]
        keyword: String,

        /// Offering department (repeatable)
        #[arg(long = "dept")]
        departments: Vec<String>,

        /// Professor (repeatable)
        #[arg(long = "professor")]
        professors: Vec<String>,

        /// Campus (repeatable)
        #[arg(long = "campus")]
        campuses: Vec<String>,

        /// Only courses taught in English
        #[arg(long)]
        english: bool,

        /// Credit range, `LOW-HIGH` or a single value
        #[arg(long, value_parser = parse_credit_range)]
        credits: Option<(f64, f64)>,

        /// Only courses with seats left
        #[arg(long)]
        seats: bool,

        /// Day token such as 월 or 화 (repeatable)
        #[arg(long = "day", value_parser = parse_day)]
        days: Vec<String>,

        /// Time window, e.g. 09:00-18:00
        #[arg(long)]
        time: Option<String>,

        /// Sort by name, ratio, remaining, credits or code (default from config)
        #[arg(long)]
        sort: Option<SortKey>,

        /// Rows to print (default from config)
        #[arg(long)]
        limit: Option<usize>,

        /// Write the result as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write the result as XLSX
        #[arg(long)]
        xlsx: Option<PathBuf>,
    },

    /// Show which source column each role resolved to
    Columns {
        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// List distinct values of a mapped column (dept, professor, campus, ...)
    Values {
        /// Column role, e.g. dept
        role: Role,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Watch seat counts of sections on the search page
    #[cfg(feature = "browser")]
    Watch {
        /// Sections as SUBJECT:SECTION, e.g. 445.206:002
        #[arg(required = true)]
        keys: Vec<WatchKey>,

        /// Seconds between refresh rounds (default from config)
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after this many rounds (0 = until Ctrl-C)
        #[arg(long, default_value_t = 1)]
        rounds: usize,

        /// Order by competition ratio instead of registration order
        #[arg(long)]
        sort_ratio: bool,

        /// Show the browser window
        #[arg(long)]
        headed: bool,
    },

    /// Validate configuration file
    Validate,

    /// Show configuration and cache info
    Info,
}

/// Parse `3-4`, `3.5` or `0-6` into an inclusive range.
fn parse_credit_range(s: &str) -> std::result::Result<(f64, f64), String> {
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid credits '{v}': {e}"))
    };
    let (low, high) = match s.split_once('-') {
        Some((low, high)) => (parse(low)?, parse(high)?),
        None => {
            let value = parse(s)?;
            (value, value)
        }
    };
    if low > high {
        return Err(format!("credit range {low}-{high} is empty"));
    }
    Ok((low, high))
}

fn parse_day(s: &str) -> std::result::Result<String, String> {
    let day = s.trim();
    if DAY_TOKENS.contains(&day) {
        Ok(day.to_string())
    } else {
        Err(format!("expected one of {}", DAY_TOKENS.join(" ")))
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn apply_overrides(config: &mut Config, fetch: &FetchArgs) {
    if let Some(year) = fetch.year {
        config.term.year = year;
    }
    if let Some(semester) = fetch.semester {
        config.term.semester = semester;
    }
    if let Some(page_size) = fetch.page_size {
        config.fetch.page_size = page_size;
    }
}

fn fetcher(cli: &Cli, config: Arc<Config>) -> Result<CourseFetcher> {
    let cache: Box<dyn FetchCache> = if cli.no_disk_cache {
        Box::new(MemoryCache::new())
    } else {
        Box::new(LocalStorage::new(&cli.storage_dir))
    };
    CourseFetcher::new(config, cache)
}

fn query(config: &Config, fetch: &FetchArgs) -> FetchQuery {
    FetchQuery::from_config(config)
        .with_subject_name(fetch.name.as_deref())
        .with_subject_code(fetch.code.as_deref())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let mut config = Config::load_or_default(&config_path);
    log::debug!("Loaded configuration from {}", config_path.display());

    let storage = LocalStorage::new(&cli.storage_dir);

    match &cli.command {
        Command::Search {
            fetch,
            keyword,
            departments,
            professors,
            campuses,
            english,
            credits,
            seats,
            days,
            time,
            sort,
            limit,
            csv,
            xlsx,
        } => {
            apply_overrides(&mut config, fetch);
            let config = Arc::new(config);

            let criteria = FilterCriteria {
                keyword: keyword.clone(),
                departments: departments.clone(),
                professors: professors.clone(),
                campuses: campuses.clone(),
                english_only: *english,
                credits: *credits,
                seats_only: *seats,
                days: days.clone(),
                time_window: time.as_deref().map(parse_clock_window).transpose()?,
            };
            let request = SearchRequest {
                query: query(&config, fetch),
                criteria,
                sort: sort.unwrap_or(config.filter.sort),
                refresh: fetch.refresh,
            };

            let outcome = pipeline::run_search(&fetcher(&cli, Arc::clone(&config))?, &request).await?;
            let summary = outcome.summary();

            let columns = &outcome.columns;
            let shown: Vec<&str> = [
                columns.course_code.as_deref(),
                columns.class_no.as_deref(),
                columns.course_name.as_deref(),
                columns.professor.as_deref(),
                columns.credits.as_deref(),
                columns.schedule.as_deref(),
                columns.capacity.as_deref(),
                columns.enrolled.as_deref(),
                Some(REMAINING_COLUMN),
                Some(RATIO_COLUMN),
            ]
            .into_iter()
            .flatten()
            .collect();

            println!(
                "{}",
                display::render_table(&outcome.table, &shown, limit.unwrap_or(config.filter.limit))
            );
            println!();
            let mut items = vec![
                ("term", format!("{} {}", config.term.year, config.term.semester)),
                ("total courses", summary.total.to_string()),
                ("filtered courses", summary.filtered.to_string()),
                ("fetched at (KST)", summary.fetched_at),
                (
                    "columns detected",
                    format!("{} ({} roles mapped)", summary.columns_detected, summary.roles_mapped),
                ),
                ("sort", request.sort.to_string()),
            ];
            if let Some((start, end)) = request.criteria.time_window {
                items.push(("time window", format!("{}-{}", format_minutes(start), format_minutes(end))));
            }
            println!("{}", display::summary("Search", &items));

            if let Some(path) = csv {
                storage.export_csv(&outcome.table, path).await?;
            }
            if let Some(path) = xlsx {
                storage.export_xlsx(&outcome.table, path).await?;
            }
        }

        Command::Columns { fetch } => {
            apply_overrides(&mut config, fetch);
            let config = Arc::new(config);
            let fetcher = fetcher(&cli, Arc::clone(&config))?;
            let fetched = if fetch.refresh {
                fetcher.fetch_fresh(&query(&config, fetch)).await?
            } else {
                fetcher.fetch(&query(&config, fetch)).await?
            };

            let map = guess_columns(&fetched.table);
            println!("{}", serde_json::to_string_pretty(&map)?);
            println!();
            println!("Source columns: {}", fetched.table.headers().join(", "));
        }

        Command::Values { role, fetch } => {
            apply_overrides(&mut config, fetch);
            let config = Arc::new(config);
            let fetcher = fetcher(&cli, Arc::clone(&config))?;
            let fetched = if fetch.refresh {
                fetcher.fetch_fresh(&query(&config, fetch)).await?
            } else {
                fetcher.fetch(&query(&config, fetch)).await?
            };

            let map = guess_columns(&fetched.table);
            let Some(label) = map.get(*role) else {
                log::warn!("No source column found for role '{}'", role);
                return Ok(());
            };
            for value in fetched.table.distinct_values(label) {
                println!("{value}");
            }
        }

        #[cfg(feature = "browser")]
        Command::Watch {
            keys,
            interval,
            rounds,
            sort_ratio,
            headed,
        } => {
            use std::time::Duration;

            use sugang::pipeline::{Registration, WatchSession};
            use sugang::services::{BrowserSession, SeatMonitor};

            if *headed {
                config.monitor.headless = false;
            }
            config.validate()?;

            let mut watch = WatchSession::new();
            for key in keys {
                if watch.register(&key.subject, &key.section)? == Registration::Duplicate {
                    log::warn!("{} is already on the watchlist", key);
                }
            }

            let browser = BrowserSession::launch(&config).await?;
            let monitor = SeatMonitor::new(browser, &config.monitor);
            let interval =
                Duration::from_secs(interval.unwrap_or(config.monitor.refresh_interval_secs));

            watch.process_pending(&monitor).await;
            let mut round = 1;
            loop {
                let entries = if *sort_ratio {
                    watch.entries_by_ratio()
                } else {
                    watch.entries().iter().collect()
                };
                println!("{}", display::render_watchlist(&entries));

                if *rounds != 0 && round >= *rounds {
                    break;
                }
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = tokio::signal::ctrl_c() => {
                        log::info!("Interrupted");
                        break;
                    }
                }
                println!();
                watch.refresh_all(&monitor).await;
                round += 1;
            }

            monitor.into_session().close().await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if !config_path.exists() {
                log::warn!("{} not found; validating defaults", config_path.display());
            } else if let Err(e) = Config::load(&config_path) {
                log::error!("Config could not be read: {}", e);
                return Err(e);
            }

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }

        Command::Info => {
            let cached = storage.cached_count().await?;
            let items = [
                ("storage directory", cli.storage_dir.display().to_string()),
                (
                    "config file",
                    if config_path.exists() {
                        config_path.display().to_string()
                    } else {
                        "not found (using defaults)".to_string()
                    },
                ),
                ("term", format!("{} {}", config.term.year, config.term.semester)),
                ("export endpoint", config.fetch.url.clone()),
                ("search page", config.monitor.search_url.clone()),
                ("cache ttl", format!("{}s", config.fetch.cache_ttl_secs)),
                ("cached tables", cached.to_string()),
            ];
            println!("{}", display::summary("sugang", &items));
        }
    }

    Ok(())
}
