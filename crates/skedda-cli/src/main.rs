//! skedda - find and book Skedda spaces from the terminal.

/// Catalog loading through the local cache.
mod catalog;
/// Application configuration (TOML).
mod config;
/// Fuzzy name matching.
mod matcher;
/// Interactive prompts.
mod prompt;
/// Output formatting.
mod render;
/// Time window resolution.
mod window;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::instrument;
use tracing_subscriber::filter::EnvFilter;
#[cfg(not(feature = "otel"))]
use tracing_subscriber::fmt;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

use crate::catalog::{fetch_catalog, load_catalog, store_catalog};
use crate::config::{AppConfig, resolve_config_path};
use crate::matcher::Matcher;
use crate::render::{
    describe_window, group_by_space, join_names, render_availability, render_catalog,
};
use crate::window::{ensure_bookable, parse_clock, parse_day, resolve_window};
use skedda_api::{
    Catalog, LocalSkeddaApi, NewBooking, SkeddaClient, SkeddaError, Space, TimeWindow, Venue,
    fetch_bookings_across_venues,
};

const APP_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (rev:", env!("GIT_HASH"), ")");

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// CLI argument parser.
#[derive(Parser)]
#[command(about, version = APP_VERSION)]
struct Cli {
    /// Override config/data directory.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Store Skedda credentials.
    #[command(alias = "config")]
    Configure,
    /// Fetch every venue and space and store them in the local cache.
    #[command(alias = "c")]
    Cache,
    /// List venues and their spaces.
    #[command(alias = "l")]
    List(ListArgs),
    /// Show bookings of spaces in a time window.
    #[command(alias = "f")]
    Find(FindArgs),
    /// Book one or more spaces.
    #[command(alias = "b")]
    Book(BookArgs),
}

/// Arguments for the `list` subcommand.
#[derive(clap::Args)]
struct ListArgs {
    /// Fetch from Skedda instead of the local cache.
    #[arg(short = 'x', long)]
    no_cache: bool,
}

/// Time window flags shared by `find` and `book`.
#[derive(clap::Args)]
struct WindowArgs {
    /// Day: "today", "tomorrow" or "YYYY-MM-DD" (default: today).
    #[arg(short = 'd', long)]
    on: Option<String>,

    /// Start time, e.g. "9am" or "9:30am".
    #[arg(short = 'a', long)]
    from: Option<String>,

    /// End time, e.g. "5pm" or "4:45pm".
    #[arg(short = 'b', long)]
    till: Option<String>,
}

impl WindowArgs {
    /// Resolves the flags against today's local date.
    fn resolve(&self) -> Result<TimeWindow> {
        let day = parse_day(self.on.as_deref(), Local::now().date_naive())?;
        let from = self.from.as_deref().map(parse_clock).transpose()?;
        let till = self.till.as_deref().map(parse_clock).transpose()?;
        resolve_window(day, from, till)
    }
}

/// Arguments for the `find` subcommand.
#[derive(clap::Args)]
struct FindArgs {
    /// Venue name (fuzzy). Selects every space of the venue.
    #[arg(short, long)]
    venue: Option<String>,

    /// Space names (fuzzy, comma separated or repeated).
    #[arg(short, long, value_delimiter = ',')]
    spaces: Vec<String>,

    #[command(flatten)]
    window: WindowArgs,

    /// Fetch venues and spaces from Skedda instead of the local cache.
    #[arg(short = 'x', long)]
    no_cache: bool,
}

/// Arguments for the `book` subcommand.
#[derive(clap::Args)]
struct BookArgs {
    /// Space names (fuzzy, comma separated or repeated).
    #[arg(short, long, required = true, value_delimiter = ',')]
    spaces: Vec<String>,

    #[command(flatten)]
    window: WindowArgs,

    /// Booking title.
    #[arg(short, long, required = true)]
    title: String,

    /// Skip the confirmation prompt.
    #[arg(short = 'y', long)]
    assume_yes: bool,

    /// Fetch venues and spaces from Skedda instead of the local cache.
    #[arg(short = 'x', long)]
    no_cache: bool,
}

/// Loads the config file.
fn load_config(dir: Option<&PathBuf>) -> Result<AppConfig> {
    let path = resolve_config_path(dir)?;
    AppConfig::load(&path)
}

/// Builds a `SkeddaClient` from the stored credentials.
///
/// # Errors
///
/// Returns an error if the client fails to build.
#[instrument(skip_all)]
fn build_client(config: &AppConfig) -> Result<SkeddaClient> {
    SkeddaClient::builder()
        .credentials(
            config.credentials.username.as_str(),
            config.credentials.password.as_str(),
        )
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build Skedda client")
}

/// Builds a client without credentials.
fn build_anonymous_client() -> Result<SkeddaClient> {
    SkeddaClient::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build Skedda client")
}

/// Selects spaces by venue (every space of a single matching venue) or by
/// space name queries.
fn select_spaces<'a>(
    catalog: &'a Catalog,
    venue: Option<&str>,
    spaces: &[String],
) -> Result<Vec<&'a Space>> {
    let selected: Vec<&Space> = match venue.map(str::trim).filter(|v| !v.is_empty()) {
        Some(query) => match Matcher::new(&catalog.venues).match_one(query).as_slice() {
            [] => bail!("no venue found"),
            [venue] => catalog.spaces_of(venue.id).collect(),
            many => bail!(
                "found multiple matching venues, be more specific: {}",
                join_names(many)
            ),
        },
        None => Matcher::new(&catalog.spaces).match_many(spaces),
    };

    if selected.is_empty() {
        bail!("no spaces found");
    }
    Ok(selected)
}

/// Checks that all spaces share one venue and returns it.
fn single_venue<'a>(catalog: &'a Catalog, spaces: &[&Space]) -> Result<&'a Venue> {
    let Some(first) = spaces.first() else {
        bail!("no spaces found");
    };
    if spaces.iter().any(|s| s.venue_id != first.venue_id) {
        bail!("you must choose spaces from a single venue only");
    }
    catalog
        .venue(first.venue_id)
        .context("could not find details about the venue")
}

/// Runs the `configure` subcommand.
///
/// # Errors
///
/// Returns an error if prompting or saving the config fails.
#[instrument(skip_all)]
fn run_configure(dir: Option<&PathBuf>) -> Result<()> {
    let path = resolve_config_path(dir)?;
    let mut config = AppConfig::load(&path)?;

    let mut out = io::stdout();
    config.credentials.username = prompt::read_input(
        &mut io::stdin().lock(),
        &mut out,
        "Username",
        &config.credentials.username,
    )?;
    config.credentials.password =
        prompt::read_secret(&mut out, "Password", &config.credentials.password)?;

    config.save(&path)?;
    tracing::info!("Configured!");
    Ok(())
}

/// Runs the `cache` subcommand.
///
/// # Errors
///
/// Returns an error if fetching the catalog or writing the cache fails.
#[instrument(skip_all)]
async fn run_cache(dir: Option<&PathBuf>) -> Result<()> {
    let client = build_client(&load_config(dir)?)?;

    tracing::info!("Caching venues and spaces from Skedda...");
    let catalog = fetch_catalog(&client).await?;
    store_catalog(&catalog, dir).context("failed to cache")?;

    tracing::info!(
        "Cached {} venues and {} spaces",
        catalog.venues.len(),
        catalog.spaces.len()
    );
    Ok(())
}

/// Runs the `list` subcommand.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
#[instrument(skip_all)]
async fn run_list(args: &ListArgs, dir: Option<&PathBuf>) -> Result<()> {
    let client = build_client(&load_config(dir)?)?;
    let catalog = load_catalog(&client, args.no_cache, dir).await?;
    render_catalog(&catalog);
    Ok(())
}

/// Runs the `find` subcommand.
///
/// # Errors
///
/// Returns an error if the window is invalid, no space matches or a
/// booking fetch fails.
#[instrument(skip_all)]
async fn run_find(args: &FindArgs, dir: Option<&PathBuf>) -> Result<()> {
    let window = args.window.resolve()?;

    let client = build_client(&load_config(dir)?)?;
    let catalog = load_catalog(&client, args.no_cache, dir).await?;
    let spaces = select_spaces(&catalog, args.venue.as_deref(), &args.spaces)?;

    tracing::info!(
        "Finding bookings in {} {}...",
        join_names(&spaces),
        describe_window(&window)
    );

    let anonymous;
    let api = match client.authenticate().await {
        Ok(()) => &client,
        Err(e) => {
            tracing::debug!(error = %e, "Authentication failed, continuing anonymously");
            tracing::warn!("Failed to authenticate. You will not see the title of the bookings.");
            anonymous = build_anonymous_client()?;
            &anonymous
        }
    };

    let venues: Vec<Venue> = spaces
        .iter()
        .filter_map(|s| catalog.venue(s.venue_id))
        .cloned()
        .collect();
    let fetched = fetch_bookings_across_venues(api, &venues, &window, api.max_in_flight())
        .await
        .context("failed to fetch bookings")?;

    let grouped = group_by_space(&catalog, &spaces, &fetched);
    render_availability(&grouped);
    Ok(())
}

/// Runs the `book` subcommand.
///
/// # Errors
///
/// Returns an error if the window or title is invalid, the spaces span
/// several venues, or Skedda refuses the booking.
#[instrument(skip_all)]
async fn run_book(args: &BookArgs, dir: Option<&PathBuf>) -> Result<()> {
    let window = args.window.resolve()?;
    ensure_bookable(&window)?;

    let title = args.title.trim();
    if title.is_empty() {
        bail!("--title is required");
    }

    let client = build_client(&load_config(dir)?)?;
    let catalog = load_catalog(&client, args.no_cache, dir).await?;
    let spaces = Matcher::new(&catalog.spaces).match_many(&args.spaces);
    let venue = single_venue(&catalog, &spaces)?;

    tracing::info!(
        "Booking {} {}",
        join_names(&spaces),
        describe_window(&window)
    );

    if !args.assume_yes
        && !prompt::confirm(&mut io::stdin().lock(), &mut io::stdout(), "Are you sure?")?
    {
        return Ok(());
    }

    client.authenticate().await?;
    let booking = NewBooking {
        venue_id: venue.id,
        space_ids: spaces.iter().map(|s| s.id).collect(),
        title: String::from(title),
        window,
    };
    client
        .create_booking(&venue.tenant, &booking)
        .await
        .context("failed to book")?;

    tracing::info!("Booked!");
    Ok(())
}

/// Returns a follow-up hint for errors the user can fix.
fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    match err.chain().find_map(|e| e.downcast_ref::<SkeddaError>())? {
        SkeddaError::CredentialsMissing => Some("Try using `skedda configure`"),
        SkeddaError::AuthenticationFailed(_) => {
            Some("Try changing credentials using `skedda configure`")
        }
        _ => None,
    }
}

/// Writes the error chain, then the hint for errors the user can fix.
fn report_error(err: &anyhow::Error, out: &mut impl io::Write) -> io::Result<()> {
    writeln!(out, "Error: {err:?}")?;
    if let Some(hint) = hint_for(err) {
        writeln!(out, "{hint}")?;
    }
    Ok(())
}

/// Entry point.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    #[cfg(not(feature = "otel"))]
    {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .init();
    }

    #[cfg(feature = "otel")]
    {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

        let otel_layer = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .and_then(|_| {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .build()
                    .ok()?;

                let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                    .with_simple_exporter(exporter)
                    .build();

                let tracer = opentelemetry::trace::TracerProvider::tracer(
                    &tracer_provider,
                    env!("CARGO_PKG_NAME"),
                );
                opentelemetry::global::set_tracer_provider(tracer_provider);

                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    }

    let cli = Cli::parse();
    let dir = cli.dir.as_ref();
    let result = match cli.command {
        Commands::Configure => run_configure(dir),
        Commands::Cache => run_cache(dir).await,
        Commands::List(args) => run_list(&args, dir).await,
        Commands::Find(args) => run_find(&args, dir).await,
        Commands::Book(args) => run_book(&args, dir).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if report_error(&err, &mut io::stderr().lock()).is_err() {
                tracing::error!("{err:?}");
            }
            ExitCode::FAILURE
        }
    }
}
