//! Genflow Server
//!
//! Axum server exposing the animation, system design and roadmap pipelines
//! as synchronous JSON endpoints and SSE progress streams.

mod routes;

use clap::Parser;
use genflow::config::GenflowConfig;
use genflow::features::{AnimationWorkflow, DesignWorkflow, RoadmapWorkflow};
use genflow::observability::{init_tracing, LogFormat};
use genflow::pipeline::Orchestrator;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use routes::{router, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about = "Genflow - staged LLM generation server")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// Log output format: pretty or json.
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,
}

fn build_state(config: &GenflowConfig) -> anyhow::Result<AppState> {
    let animation = AnimationWorkflow::new(
        Arc::new(config.llm(AnimationWorkflow::TEMPERATURE)?),
        Arc::new(config.renderer()),
    );
    let design = DesignWorkflow::new(Arc::new(config.llm(DesignWorkflow::TEMPERATURE)?))
        .with_plantuml_server(&config.plantuml_server);
    let roadmap = RoadmapWorkflow::new(Arc::new(config.llm(RoadmapWorkflow::TEMPERATURE)?));

    Ok(AppState {
        animation: Orchestrator::new(animation).with_max_transitions(config.max_transitions),
        design: Orchestrator::new(design).with_max_transitions(config.max_transitions),
        roadmap: Orchestrator::new(roadmap).with_max_transitions(config.max_transitions),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.log_format).map_err(|e| anyhow::anyhow!(e))?;

    let config = GenflowConfig::from_env()?;
    info!(
        model = %config.model,
        media_dir = %config.media_dir.display(),
        max_transitions = config.max_transitions,
        "Configuration loaded"
    );
    let app = router(Arc::new(build_state(&config)?));

    info!(addr = %args.bind, "Genflow server listening");
    let listener = TcpListener::bind(args.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
