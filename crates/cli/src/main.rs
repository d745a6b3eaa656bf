use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use data_loader::{DataIndex, LoadOptions, MalformedRowPolicy, MovieId, UserId};
use pipeline::{PipelineConfig, Recommendation};
use recommender::{PipelineOutcome, RecommendError, RecommendationOrchestrator, RunReport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// movie-recs - collaborative filtering over a ratings dataset
#[derive(Parser)]
#[command(name = "movie-recs")]
#[command(about = "Recommend movies a user has not rated yet, based on users with similar taste", long_about = None)]
struct Cli {
    #[command(flatten)]
    data: DataArgs,

    #[command(flatten)]
    pipeline: PipelineArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// Movie catalog CSV (movieId,title,genres)
    #[arg(long, default_value = "movies.csv")]
    movies: PathBuf,

    /// Ratings CSV (userId,movieId,rating,timestamp)
    #[arg(long, default_value = "ratings.csv")]
    ratings: PathBuf,

    /// Ratings at or above this value count as liked
    #[arg(long, default_value_t = data_loader::DEFAULT_LIKED_THRESHOLD)]
    liked_threshold: f32,

    /// Drop malformed rows with a warning instead of failing the load
    #[arg(long)]
    skip_malformed: bool,
}

#[derive(Args)]
struct PipelineArgs {
    /// Minimum number of users who liked a movie before it is considered (K)
    #[arg(long, default_value_t = 10)]
    min_likers: usize,

    /// Maximum number of recommendations to return (N)
    #[arg(long, default_value_t = 20)]
    top_n: usize,

    /// Number of scorer workers
    #[arg(long, default_value_t = 2)]
    workers: usize,

    /// Cancel a run that takes longer than this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Memoize pairwise user similarities across runs
    #[arg(long)]
    cache: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Get movie recommendations for a user
    Recommend {
        /// User ID to get recommendations for (prompted for when omitted)
        #[arg(long)]
        user_id: Option<UserId>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what a user liked and did not like
    User {
        /// User ID to display
        #[arg(long)]
        user_id: UserId,
    },

    /// Search for movies by title
    Search {
        /// Movie title to search for (case-insensitive substring match)
        #[arg(long)]
        title: String,
    },

    /// Time the pipeline for several users under several pool sizes
    Benchmark {
        /// Users to run the pipeline for
        #[arg(long, value_delimiter = ',', default_value = "1,2,3")]
        users: Vec<UserId>,

        /// Scorer pool sizes to compare
        #[arg(long, value_delimiter = ',', default_value = "1,2")]
        pools: Vec<usize>,
    },
}

impl DataArgs {
    fn load_options(&self) -> LoadOptions {
        let policy = if self.skip_malformed {
            MalformedRowPolicy::Skip
        } else {
            MalformedRowPolicy::Abort
        };
        LoadOptions::default()
            .with_liked_threshold(self.liked_threshold)
            .with_malformed_rows(policy)
    }
}

impl PipelineArgs {
    fn config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_min_likers(self.min_likers)
            .with_top_n(self.top_n)
            .with_scorer_workers(self.workers)
            .with_timeout(self.timeout_ms.map(Duration::from_millis))
            .with_cache_similarity(self.cache)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
    println!("Number of CPUs: {}", cpus);

    println!(
        "Loading {} and {}...",
        cli.data.movies.display(),
        cli.data.ratings.display()
    );
    let start = Instant::now();
    let data_index = Arc::new(
        DataIndex::load_from_files(&cli.data.movies, &cli.data.ratings, &cli.data.load_options())
            .context("Failed to load the rating dataset")?,
    );
    let (users, movies, liked_movies) = data_index.counts();
    println!(
        "{} Loaded {} users and {} movies ({} liked at least once) in {:?}",
        "✓".green(),
        users,
        movies,
        liked_movies,
        start.elapsed()
    );

    let config = cli.pipeline.config();
    tracing::debug!(?config, "Pipeline configuration");

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Recommend { user_id, json } => {
            let user_id = match user_id {
                Some(id) => id,
                None => prompt_user_id().await?,
            };
            handle_recommend(data_index, config, user_id, json).await?
        }
        Commands::User { user_id } => handle_user(&data_index, user_id),
        Commands::Search { title } => handle_search(&data_index, &title),
        Commands::Benchmark { users, pools } => {
            handle_benchmark(data_index, config, &users, &pools).await?
        }
    }

    Ok(())
}

/// Ask for a user id on stdin
async fn prompt_user_id() -> Result<UserId> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b"Recommendations for which user? ")
        .await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read user id")?;

    let input = line.trim();
    if input.is_empty() {
        bail!("No user id given");
    }
    input
        .parse()
        .with_context(|| format!("'{}' is not a valid user id", input))
}

/// Handle the 'recommend' command
async fn handle_recommend(
    data_index: Arc<DataIndex>,
    config: PipelineConfig,
    user_id: UserId,
    json: bool,
) -> Result<()> {
    let orchestrator = RecommendationOrchestrator::new(data_index, config);

    let report = match orchestrator.get_recommendations(user_id).await {
        Ok(report) => report,
        Err(RecommendError::UserNotFound(id)) => {
            println!("User {} not found!", id);
            return Ok(());
        }
        Err(e) => return Err(e).context("Recommendation pipeline failed"),
    };

    if json {
        let output = serde_json::json!({
            "user_id": report.user_id,
            "cancelled": report.outcome.is_cancelled(),
            "elapsed_ms": report.elapsed.as_secs_f64() * 1000.0,
            "recommendations": report.outcome.recommendations(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Handle the 'user' command
fn handle_user(data_index: &DataIndex, user_id: UserId) {
    let Some(user) = data_index.get_user(user_id) else {
        println!("User {} not found!", user_id);
        return;
    };

    println!("{}", format!("User ID: {}", user_id).bold().blue());
    println!("{}Liked movies: {}", "• ".green(), user.liked.len());
    println!("{}Not liked movies: {}", "• ".green(), user.not_liked.len());

    print_sample_titles(data_index, "Liked", user.liked.iter().copied());
    print_sample_titles(data_index, "Not liked", user.not_liked.iter().copied());
}

fn print_sample_titles(
    data_index: &DataIndex,
    label: &str,
    movie_ids: impl Iterator<Item = MovieId>,
) {
    let mut movie_ids: Vec<MovieId> = movie_ids.collect();
    if movie_ids.is_empty() {
        return;
    }
    movie_ids.sort_unstable();

    println!("{}:", label);
    for movie_id in movie_ids.iter().take(5) {
        match data_index.get_movie(*movie_id) {
            Some(movie) => println!("  - {}", movie.title),
            None => println!("  - movie {} (not in catalog)", movie_id),
        }
    }
    if movie_ids.len() > 5 {
        println!("  ... and {} more", movie_ids.len() - 5);
    }
}

/// Handle the 'search' command
fn handle_search(data_index: &DataIndex, title: &str) {
    let needle = title.to_lowercase();

    // exact matches first, then the most liked
    let mut matches: Vec<(bool, usize, MovieId, &str)> = data_index
        .movies()
        .filter_map(|movie| {
            let haystack = movie.title.to_lowercase();
            haystack.contains(&needle).then(|| {
                (
                    haystack != needle,
                    data_index.popularity().like_count(movie.id),
                    movie.id,
                    movie.title.as_str(),
                )
            })
        })
        .collect();
    matches.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));

    println!("{}", format!("Search results for '{}':", title).bold().blue());
    if matches.is_empty() {
        println!("No movies found");
        return;
    }
    for (_, likes, movie_id, movie_title) in matches.iter().take(20) {
        println!("{}: {} ({} likes)", movie_id, movie_title, likes);
    }
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    data_index: Arc<DataIndex>,
    config: PipelineConfig,
    users: &[UserId],
    pools: &[usize],
) -> Result<()> {
    if users.is_empty() || pools.is_empty() {
        bail!("Benchmark needs at least one user and one pool size");
    }

    // One orchestrator per pool size, runs are sequential so timings don't interfere
    let orchestrators: Vec<RecommendationOrchestrator> = pools
        .iter()
        .map(|&workers| {
            RecommendationOrchestrator::new(
                data_index.clone(),
                config.clone().with_scorer_workers(workers),
            )
        })
        .collect();

    let mut rows: Vec<(UserId, Vec<Option<Duration>>)> = Vec::with_capacity(users.len());
    for &user_id in users {
        let mut timings = Vec::with_capacity(pools.len());
        for orchestrator in &orchestrators {
            match orchestrator.get_recommendations(user_id).await {
                Ok(report) if !report.outcome.is_cancelled() => timings.push(Some(report.elapsed)),
                Ok(_) => timings.push(None),
                Err(RecommendError::UserNotFound(id)) => {
                    println!("User {} not found!", id);
                    break;
                }
                Err(e) => return Err(e).context("Recommendation pipeline failed"),
            }
        }
        if timings.len() == pools.len() {
            rows.push((user_id, timings));
        }
    }

    println!("{}", "Execution time per user (ms)".bold().blue());
    let header: String = pools
        .iter()
        .map(|workers| format!("{:>12}", format!("{} workers", workers)))
        .collect();
    println!("{:>8}{}", "user", header);
    for (user_id, timings) in &rows {
        let cells: String = timings
            .iter()
            .map(|t| match t {
                Some(t) => format!("{:>12.2}", t.as_secs_f64() * 1000.0),
                None => format!("{:>12}", "cancelled"),
            })
            .collect();
        println!("{:>8}{}", user_id, cells);
    }

    // mean over the users that completed under every pool size
    let completed: Vec<&Vec<Option<Duration>>> = rows
        .iter()
        .map(|(_, timings)| timings)
        .filter(|timings| timings.iter().all(Option::is_some))
        .collect();
    if !completed.is_empty() {
        let means: String = (0..pools.len())
            .map(|col| {
                let total: f64 = completed
                    .iter()
                    .filter_map(|timings| timings[col])
                    .map(|t| t.as_secs_f64() * 1000.0)
                    .sum();
                format!("{:>12.2}", total / completed.len() as f64)
            })
            .collect();
        println!("{:>8}{}", "mean", means);
    }

    Ok(())
}

/// Print a run the way the console output has always looked
fn print_report(report: &RunReport) {
    match &report.outcome {
        PipelineOutcome::Completed(recs) => {
            println!(
                "{}",
                format!("Recommendations for user {}:", report.user_id).bold().blue()
            );
            if recs.is_empty() {
                println!("No movies passed the filters");
            }
            for rec in recs {
                println!("{}", format_line(rec));
            }
        }
        PipelineOutcome::Cancelled => {
            println!("{}", "Pipeline cancelled before completion".yellow());
        }
    }
    println!("Execution time: {:?}", report.elapsed);
}

fn format_line(rec: &Recommendation) -> String {
    format!("{} at {:.4} [ {:>2}]", rec.movie_title, rec.score, rec.n_users)
}
