#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line driver for the statistics dashboard.
//!
//! Builds a [`Dashboard`] against the live backend, applies the requested
//! filter and drill-downs, waits for the active family to settle and
//! prints its breakdown table. With `--map` the boundary service is
//! queried too and every feature's value and fill color is printed with
//! the palette legend.
//!
//! Backend URLs, retries and timeouts come from the environment; see
//! [`geostats_dashboard::config`].

mod render;

use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use geostats_dashboard::{AnyFilter, Dashboard, DashboardConfig, DefaultFilters};
use geostats_fetch::{FetchState, FetchStatus, StatsSource};
use geostats_geography::{GeoSource, PaletteRegistry};
use geostats_geography_models::divipola;
use geostats_stats_models::{
    AdminCode, CrimeFilter, CrimeVariable, IndicatorFilter, TimeLevel, ViewMode,
};

/// Explore crime and census statistics by department and municipality.
#[derive(Parser)]
#[command(name = "geostats")]
#[command(about = "Explore crime and census statistics by department and municipality")]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Crime incidents broken down by a victim or weapon variable.
    Crime {
        /// Crime type key.
        #[arg(long, default_value = "HURTO_PERSONAS")]
        crime_type: String,

        /// Breakdown variable (`gender`, `age_group`, `weapons_types`).
        #[arg(long, default_value = "gender")]
        variable: CrimeVariable,

        /// Department code or name to drill into.
        #[arg(long, value_parser = parse_department)]
        department: Option<AdminCode>,

        /// Year to drill into.
        #[arg(long)]
        year: Option<i32>,

        /// Also print the choropleth for the current level.
        #[arg(long)]
        map: bool,
    },

    /// A census indicator column.
    Indicator {
        /// Indicator family.
        #[arg(long, value_enum)]
        family: IndicatorFamily,

        /// Indicator column; defaults to the family's initial column.
        #[arg(long)]
        column: Option<String>,

        /// Department code or name to drill into.
        #[arg(long, value_parser = parse_department)]
        department: Option<AdminCode>,

        /// Also print the choropleth for the current level.
        #[arg(long)]
        map: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum IndicatorFamily {
    Fundamental,
    Primary,
}

fn parse_department(value: &str) -> Result<AdminCode, String> {
    value
        .parse::<AdminCode>()
        .ok()
        .or_else(|| divipola::department_code(value))
        .ok_or_else(|| format!("unknown department {value:?}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();
    let config = DashboardConfig::from_env()?;
    let client = config.http_client()?;
    let source: Arc<dyn StatsSource> = Arc::new(config.stats_source(client.clone()));
    let mut dashboard = Dashboard::new(source, DefaultFilters::default(), config.selection_policy);

    let map = match cli.command {
        Commands::Crime {
            crime_type,
            variable,
            department,
            year,
            map,
        } => {
            let mut id =
                dashboard.apply_filter(AnyFilter::Crime(CrimeFilter::new(crime_type, variable)));
            if let Some(code) = department {
                id = dashboard.select_department(code)?;
            }
            if let Some(year) = year {
                id = dashboard.drill_forward(TimeLevel::Year { year })?;
            }
            log::info!("waiting for crime request {id}");

            let state = dashboard.crime().controller().settled().await;
            check(&state)?;
            let normalize = variable.label_normalizer();
            println!("{}", render::breakdown_table(&state.data.areas, normalize));
            println!("{}", render::breakdown_table(&state.data.periods, normalize));
            map
        }
        Commands::Indicator {
            family,
            column,
            department,
            map,
        } => {
            let defaults = DefaultFilters::default();
            let filter = match family {
                IndicatorFamily::Fundamental => {
                    let column = column.unwrap_or(defaults.fundamental.column);
                    AnyFilter::Fundamental(IndicatorFilter::new(column))
                }
                IndicatorFamily::Primary => {
                    let column = column.unwrap_or(defaults.primary.column);
                    AnyFilter::Primary(IndicatorFilter::new(column))
                }
            };
            let mut id = dashboard.apply_filter(filter);
            if let Some(code) = department {
                id = dashboard.select_department(code)?;
            }
            log::info!("waiting for {} request {id}", dashboard.view_mode());

            let state = match dashboard.view_mode() {
                ViewMode::Primary => dashboard.primary().controller().settled().await,
                _ => dashboard.fundamental().controller().settled().await,
            };
            check(&state)?;
            println!("{}", render::breakdown_table(&state.data, str::to_string));
            map
        }
    };

    if map {
        let geo = config.geo_source(client);
        log::info!(
            "fetching {} features of {:?}",
            dashboard.feature_level(),
            dashboard.feature_parent()
        );
        let features = geo
            .features(dashboard.feature_level(), dashboard.feature_parent())
            .await?;
        let palettes = PaletteRegistry::embedded()?;
        match dashboard.choropleth(&features, &palettes) {
            Some(choropleth) => println!("{}", render::choropleth_table(&choropleth)),
            None => log::warn!("no palette for {}", dashboard.view_mode()),
        }
    }

    Ok(())
}

fn check<D>(state: &FetchState<D>) -> Result<(), String> {
    if state.status != FetchStatus::Error {
        return Ok(());
    }
    Err(state.error.as_ref().map_or_else(
        || format!("request {} failed", state.request_id),
        |failure| {
            format!(
                "request {} failed ({}): {}",
                state.request_id, failure.kind, failure.message
            )
        },
    ))
}
