//! orchestrator CLI: run the dispatch server or talk to a running one.

use clap::{Parser, Subcommand};
use orchestrator::api::{Accepted, TaskList, router};
use orchestrator::config::Config;
use orchestrator::directory::ServiceDirectory;
use orchestrator::engine::{Engine, EngineConfig};
use orchestrator::model::StatusView;
use orchestrator::telemetry::{TelemetryConfig, init_telemetry};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

#[derive(Parser)]
#[command(name = "orchestrator", about = "Queue and dispatch tasks to backend services")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the dispatch server
    Serve {
        /// Listen address (overrides ORCH_BIND_ADDR)
        #[arg(long)]
        bind: Option<SocketAddr>,
        /// Service directory file (overrides ORCH_SERVICES_FILE)
        #[arg(long)]
        services: Option<PathBuf>,
        /// Number of dispatch workers (overrides ORCH_WORKERS)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// List the configured backend services
    Services {
        /// Service directory file (overrides ORCH_SERVICES_FILE)
        #[arg(long)]
        services: Option<PathBuf>,
    },
    /// Task operations against a running server
    Task {
        /// Server base URL
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
        #[command(subcommand)]
        action: TaskAction,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Submit a task
    Submit {
        /// Target service name
        service: String,
        /// JSON payload
        #[arg(long)]
        payload: Option<String>,
        /// Source reference shown alongside the task
        #[arg(long)]
        source: Option<String>,
    },
    /// Show one task's status
    Show {
        /// Task ID
        id: String,
    },
    /// List all tasks
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            bind,
            services,
            workers,
        } => cmd_serve(bind, services, workers).await,
        Command::Services { services } => {
            let config = Config::from_env()?;
            cmd_services(services.unwrap_or(config.services_file))
        }
        Command::Task { server, action } => {
            let client = reqwest::Client::new();
            let server = server.trim_end_matches('/').to_string();
            match action {
                TaskAction::Submit {
                    service,
                    payload,
                    source,
                } => cmd_task_submit(&client, &server, service, payload, source).await,
                TaskAction::Show { id } => cmd_task_show(&client, &server, id).await,
                TaskAction::List => cmd_task_list(&client, &server).await,
            }
        }
    }
}

async fn cmd_serve(
    bind: Option<SocketAddr>,
    services: Option<PathBuf>,
    workers: Option<usize>,
) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(bind) = bind {
        config.bind_addr = bind;
    }
    if let Some(services) = services {
        config.services_file = services;
    }
    if let Some(workers) = workers {
        anyhow::ensure!(workers > 0, "--workers must be at least 1");
        config.workers = workers;
    }

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "orchestrator".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let directory = ServiceDirectory::load(&config.services_file)?;
    info!(
        services = directory.len(),
        file = %config.services_file.display(),
        "service directory loaded"
    );

    let engine = Engine::new(directory, EngineConfig::from(&config));
    let pool = engine.start()?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(address = %listener.local_addr()?, "serving");
    axum::serve(listener, router(engine))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutdown requested");
        })
        .await?;

    pool.shutdown().await;
    Ok(())
}

fn cmd_services(path: PathBuf) -> anyhow::Result<()> {
    let directory = ServiceDirectory::load(&path)?;
    if directory.is_empty() {
        println!("No services in {}.", path.display());
        return Ok(());
    }

    println!(
        "{:<24}  {:<32}  {:<8}  REQUIRED",
        "NAME", "ADDRESS", "ENTRY"
    );
    println!("{}", "-".repeat(80));
    for entry in directory.entries() {
        println!(
            "{:<24}  {:<32}  {:<8}  {}",
            entry.name,
            entry.address,
            entry.entry_point,
            entry.required_field.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn cmd_task_submit(
    client: &reqwest::Client,
    server: &str,
    service: String,
    payload: Option<String>,
    source: Option<String>,
) -> anyhow::Result<()> {
    let payload: serde_json::Value = match payload {
        Some(json) => serde_json::from_str(&json)?,
        None => serde_json::json!({}),
    };

    let mut request = client
        .post(format!("{server}/run/{service}"))
        .json(&payload);
    if let Some(ref source) = source {
        request = request.query(&[("source", source)]);
    }
    let response = request.send().await?;
    if !response.status().is_success() {
        anyhow::bail!(
            "submit failed ({}): {}",
            response.status(),
            response.text().await?
        );
    }

    let accepted: Accepted = response.json().await?;
    println!("Queued: {} (service: {})", accepted.task_id, accepted.service);
    Ok(())
}

async fn cmd_task_show(client: &reqwest::Client, server: &str, id: String) -> anyhow::Result<()> {
    let response = client.get(format!("{server}/status/{id}")).send().await?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        anyhow::bail!("no task {id}");
    }
    let view: StatusView = response.error_for_status()?.json().await?;

    println!("ID:         {}", view.task_id);
    println!("Service:    {}", view.service);
    println!("Status:     {}", view.status);
    println!("Created:    {}", view.created_at);
    println!("Elapsed:    {}", view.elapsed_time);
    println!("Result:     {}", serde_json::to_string_pretty(&view.result)?);
    Ok(())
}

async fn cmd_task_list(client: &reqwest::Client, server: &str) -> anyhow::Result<()> {
    let list: TaskList = client
        .get(format!("{server}/tasks"))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    if list.tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<22}  {:<10}  {:<9}  SOURCE",
        "ID", "SERVICE", "STATUS", "ELAPSED"
    );
    println!("{}", "-".repeat(100));
    for task in &list.tasks {
        let elapsed = task
            .elapsed_time
            .map(|s| format!("{s:.3}s"))
            .unwrap_or_else(|| "pending".to_string());
        println!(
            "{:<36}  {:<22}  {:<10}  {:<9}  {}",
            task.task_id,
            task.service,
            task.status,
            elapsed,
            task.source_reference.as_deref().unwrap_or("N/A")
        );
    }
    println!("\n{} task(s)", list.tasks.len());
    Ok(())
}
