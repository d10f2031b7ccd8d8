use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use fitting_client::models::closet::Category;
use fitting_client::models::user::LoginRequest;
use fitting_client::services::poller::PollOptions;
use fitting_client::session::{FileSessionStore, LogRedirect};
use fitting_client::{ApiClient, ClientConfig, FittingOutcome, FittingWorkflow, Session};

const USAGE: &str = "usage: fitting [top=<itemId>] [bottom=<itemId>] [outer=<itemId>]\n\
                     With no arguments, resumes the most recent fitting.";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = ClientConfig::from_env().expect("Failed to load configuration from environment");

    metrics::describe_counter!("fitting_jobs_started", "Fitting jobs submitted");
    metrics::describe_counter!("fitting_jobs_completed", "Fitting jobs that completed");
    metrics::describe_counter!("fitting_jobs_failed", "Fitting jobs that failed, timed out or errored");
    metrics::describe_counter!("fitting_polls_total", "Fitting status requests");
    metrics::describe_histogram!("fitting_wait_seconds", "Time from job start to terminal status");

    let selections = match parse_selections(std::env::args().skip(1)) {
        Ok(selections) => selections,
        Err(message) => {
            eprintln!("{message}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let session = match &config.session_path {
        Some(path) => Session::load(FileSessionStore::new(path), LogRedirect),
        None => Session::in_memory(),
    };
    let api = Arc::new(ApiClient::new(&config, session.clone()).expect("Failed to build HTTP client"));

    tracing::info!(api = %api.origin(), "Starting fitting client");

    if !session.is_authenticated() {
        let (Some(email), Some(password)) = (config.email.clone(), config.password.clone()) else {
            eprintln!("No stored session; set FITTING_EMAIL and FITTING_PASSWORD to log in");
            return ExitCode::FAILURE;
        };
        if let Err(e) = api.auth().login(&LoginRequest { email, password }).await {
            tracing::error!(error = %e, "Login failed");
            eprintln!("Login failed: {}", e.user_message());
            return ExitCode::FAILURE;
        }
    }

    let workflow = Arc::new(
        FittingWorkflow::new(Arc::clone(&api), session, PollOptions::from(&config))
            .with_estimate(config.estimated_seconds),
    );

    let mut progress = workflow.progress();
    tokio::spawn(async move {
        let mut last_bucket = 0u32;
        while progress.changed().await.is_ok() {
            let value = *progress.borrow_and_update();
            let bucket = (value / 10.0) as u32;
            if bucket != last_bucket {
                last_bucket = bucket;
                tracing::info!(progress = format!("{value:.0}%"), "Fitting in progress");
            }
        }
    });

    let outcome = tokio::select! {
        outcome = run(&workflow, &selections) => outcome,
        _ = tokio::signal::ctrl_c() => {
            workflow.cancel();
            Some(FittingOutcome::Cancelled { job_id: None })
        }
    };

    match outcome {
        Some(FittingOutcome::Completed(job)) => {
            if let Some(url) = &job.result_image_url {
                println!("{}", api.absolute_url(url));
            }
            if let Some(message) = &job.llm_message {
                println!("{message}");
            }
            ExitCode::SUCCESS
        }
        Some(other) => {
            if let Some(message) = other.user_message() {
                eprintln!("{message}");
            }
            ExitCode::FAILURE
        }
        None => {
            eprintln!("No fitting in progress");
            ExitCode::SUCCESS
        }
    }
}

async fn run(workflow: &FittingWorkflow<ApiClient>, selections: &[(Category, i64)]) -> Option<FittingOutcome> {
    if selections.is_empty() {
        return workflow.restore().await;
    }
    workflow.replace_selection(selections);
    Some(workflow.run().await)
}

/// Parse `category=itemId` pairs. Categories may be wire tokens or display labels.
fn parse_selections(args: impl Iterator<Item = String>) -> Result<Vec<(Category, i64)>, String> {
    args.map(|arg| {
        let (category, item_id) = arg
            .split_once('=')
            .ok_or_else(|| format!("expected category=itemId, got '{arg}'"))?;
        let category = Category::from_wire(category)
            .or_else(|| Category::from_label(category))
            .ok_or_else(|| format!("unknown category '{category}'"))?;
        let item_id = item_id
            .parse::<i64>()
            .map_err(|_| format!("invalid item id '{item_id}'"))?;
        Ok((category, item_id))
    })
    .collect()
}
