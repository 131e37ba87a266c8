//! Loads the development data set into the database, or wipes every table.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use metrics_exporter_prometheus::PrometheusBuilder;

use tours::AppState;
use tours::config::AppConfig;
use tours::domain::user::User;
use tours::repository::postgres::{create_pool, dev_data};
use tours::telemetry;
use tours::usecase::contracts::UserRepository;
use tours::usecase::password;
use tours::usecase::seed::DevData;

#[derive(Debug, Parser)]
#[command(
    name = "seed",
    about = "Import the development data set, or delete all data",
    group(ArgGroup::new("action").required(true).args(["import", "delete"]))
)]
struct CliArgs {
    /// Insert users, tours and reviews from the data directory.
    #[arg(long)]
    import: bool,
    /// Delete every booking, review, tour and user.
    #[arg(long)]
    delete: bool,
    /// Directory holding `tours.json`, `users.json` and `reviews.json`.
    #[arg(long = "data-dir", value_name = "path", default_value = "dev-data")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    dotenvy::from_filename("config.env").ok();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    let telemetry = telemetry::init(&config);

    let pool = create_pool(&config.database_url(), config.database_max_connections)
        .await
        .context("failed to create database pool")?;
    sqlx::migrate!().run(&pool).await?;

    if args.delete {
        let removed = dev_data::purge(&pool).await?;
        tracing::info!(removed, "data successfully deleted");
    } else {
        let data = DevData::load(&args.data_dir)?;
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
        let state = AppState::new(&config, pool, metrics_handle).context("failed to build mailer")?;
        import(&state, &data).await?;
    }

    telemetry.shutdown();
    Ok(())
}

/// Users first so tours can name their guides; each review recalculates
/// its tour's rating.
async fn import(state: &AppState, data: &DevData) -> anyhow::Result<()> {
    let mut user_ids = HashMap::new();
    for seed in &data.users {
        let digest = password::hash(seed.password.clone()).await?;
        let mut user = User::new(seed.name.clone(), seed.email.clone(), digest);
        user.role = seed.role;
        if let Some(photo) = &seed.photo {
            user.photo = photo.clone();
        }

        let created = state
            .users
            .repository()
            .create(&user)
            .await
            .with_context(|| format!("failed to insert user {}", seed.email))?;
        user_ids.insert(created.email.clone(), created.id);
    }

    let mut tour_ids = HashMap::new();
    for input in data.tour_inputs(&user_ids)? {
        let tour = state.tours.create(input).await?;
        tour_ids.insert(tour.name.clone(), tour.id);
    }

    let reviews = data.review_inputs(&tour_ids, &user_ids)?;
    for input in reviews {
        let author = input.user_id.unwrap_or_default();
        state.reviews_usecase.create(input, None, author).await?;
    }

    tracing::info!(
        users = user_ids.len(),
        tours = tour_ids.len(),
        reviews = data.reviews.len(),
        "data successfully loaded"
    );
    Ok(())
}
