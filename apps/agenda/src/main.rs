use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use appointment_cell::{AppointmentFilter, AppointmentStore, AppointmentWorkflow};
use shared_config::AppConfig;
use shared_models::auth::IdentityProvider;
use shared_utils::Session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,reqwest=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic agenda");

    let config = AppConfig::from_env();
    if !config.is_configured() {
        warn!("No API token configured; requests will be sent unauthenticated");
    }

    let session = Session::from_config(&config).context("Could not establish the acting user")?;
    info!("Acting as {} ({})", session.actor().id, session.actor().role);

    let identity: Arc<dyn IdentityProvider> = Arc::new(session);
    let store = Arc::new(AppointmentStore::connect(&config, identity.clone()));
    let workflow = AppointmentWorkflow::new(identity, store);

    let appointments = workflow
        .load(&AppointmentFilter::default())
        .await
        .context("Could not load appointments")?;

    for appointment in &appointments {
        let when = appointment
            .scheduled_at
            .map(|at| at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "sin fecha".to_string());

        println!(
            "{:<8} {:<16} {:<10} {:<24} {:<24} {}",
            appointment.id,
            when,
            appointment.status,
            appointment.patient_display_name,
            appointment.doctor_display_name,
            appointment.reason,
        );
    }

    let stats = workflow.stats().await;
    info!(
        "{} appointments: {} pending, {} confirmed, {} completed, {} cancelled, {} today ({} completed)",
        stats.total,
        stats.pending,
        stats.confirmed,
        stats.completed,
        stats.cancelled,
        stats.today,
        stats.completed_today
    );

    Ok(())
}
