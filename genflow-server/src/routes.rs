//! HTTP handlers for the three feature prefixes.

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use futures::{Stream, StreamExt};
use genflow::errors::InputRejected;
use genflow::features::{
    AnimationResult, AnimationWorkflow, DesignResult, DesignWorkflow, RoadmapResult,
    RoadmapWorkflow,
};
use genflow::pipeline::{Orchestrator, Workflow};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// One orchestrator per feature.
pub struct AppState {
    pub animation: Orchestrator<AnimationWorkflow>,
    pub design: Orchestrator<DesignWorkflow>,
    pub roadmap: Orchestrator<RoadmapWorkflow>,
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct CareerRequest {
    #[serde(default)]
    pub career_path: String,
}

/// Error body shaped as `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl From<InputRejected> for ApiError {
    fn from(err: InputRejected) -> Self {
        warn!(field = %err.field, "Rejected request input");
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: err.detail,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

type ProgressSse = Sse<std::pin::Pin<Box<dyn Stream<Item = Result<Event, axum::Error>> + Send>>>;

fn progress_sse<W: Workflow>(
    orchestrator: &Orchestrator<W>,
    input: &str,
) -> Result<ProgressSse, ApiError> {
    let stream = orchestrator.run(input)?;
    info!(pipeline = orchestrator.workflow().name(), "Streaming progress");
    let events = stream.map(|event| Event::default().json_data(&event));
    Ok(Sse::new(events.boxed()).keep_alive(KeepAlive::default()))
}

fn workflow_info<W: Workflow>(orchestrator: &Orchestrator<W>) -> Json<Value> {
    let workflow = orchestrator.workflow();
    Json(json!({
        "workflow": workflow.name(),
        "input_field": workflow.input_field(),
        "stages": workflow.stages(),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn animation_generate(
    State(state): State<SharedState>,
    Json(req): Json<PromptRequest>,
) -> Result<Json<AnimationResult>, ApiError> {
    let event = state.animation.run_to_completion(&req.prompt).await?;
    Ok(Json(AnimationResult::from_event(&event)))
}

async fn animation_stream(
    State(state): State<SharedState>,
    Json(req): Json<PromptRequest>,
) -> Result<ProgressSse, ApiError> {
    progress_sse(&state.animation, &req.prompt)
}

async fn animation_info(State(state): State<SharedState>) -> Json<Value> {
    workflow_info(&state.animation)
}

async fn design_generate(
    State(state): State<SharedState>,
    Json(req): Json<PromptRequest>,
) -> Result<Json<DesignResult>, ApiError> {
    let event = state.design.run_to_completion(&req.prompt).await?;
    Ok(Json(DesignResult::from_event(&event)))
}

async fn design_stream(
    State(state): State<SharedState>,
    Json(req): Json<PromptRequest>,
) -> Result<ProgressSse, ApiError> {
    progress_sse(&state.design, &req.prompt)
}

async fn design_info(State(state): State<SharedState>) -> Json<Value> {
    workflow_info(&state.design)
}

async fn roadmap_generate(
    State(state): State<SharedState>,
    Json(req): Json<CareerRequest>,
) -> Result<Json<RoadmapResult>, ApiError> {
    let event = state.roadmap.run_to_completion(&req.career_path).await?;
    Ok(Json(RoadmapResult::from_event(&event)))
}

async fn roadmap_stream(
    State(state): State<SharedState>,
    Json(req): Json<CareerRequest>,
) -> Result<ProgressSse, ApiError> {
    progress_sse(&state.roadmap, &req.career_path)
}

async fn roadmap_info(State(state): State<SharedState>) -> Json<Value> {
    workflow_info(&state.roadmap)
}

pub fn router(state: SharedState) -> Router {
    let animation = Router::new()
        .route("/generate", post(animation_generate))
        .route("/generate-stream", post(animation_stream))
        .route("/workflow-info", get(animation_info))
        .route("/health", get(health));

    let design = Router::new()
        .route("/generate", post(design_generate))
        .route("/generate-stream", post(design_stream))
        .route("/workflow-info", get(design_info))
        .route("/health", get(health));

    let roadmap = Router::new()
        .route("/generate", post(roadmap_generate))
        .route("/generate-stream", post(roadmap_stream))
        .route("/workflow-info", get(roadmap_info))
        .route("/health", get(health));

    Router::new()
        .nest("/ai-animation", animation)
        .nest("/system-design", design)
        .nest("/roadmap", roadmap)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use genflow::testing::{ScriptedLlm, StaticRenderer};
    use pretty_assertions::assert_eq;

    fn state(roadmap_llm: ScriptedLlm) -> SharedState {
        Arc::new(AppState {
            animation: Orchestrator::new(AnimationWorkflow::new(
                Arc::new(ScriptedLlm::default()),
                Arc::new(StaticRenderer::ok()),
            )),
            design: Orchestrator::new(DesignWorkflow::new(Arc::new(ScriptedLlm::default()))),
            roadmap: Orchestrator::new(RoadmapWorkflow::new(Arc::new(roadmap_llm))),
        })
    }

    #[tokio::test]
    async fn test_empty_prompt_is_bad_request() {
        let err = animation_generate(
            State(state(ScriptedLlm::default())),
            Json(PromptRequest {
                prompt: "  ".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.detail, "Prompt is required and cannot be empty");
    }

    #[tokio::test]
    async fn test_empty_career_path_is_bad_request() {
        let result = roadmap_stream(
            State(state(ScriptedLlm::default())),
            Json(CareerRequest {
                career_path: String::new(),
            }),
        )
        .await;
        let err = result.err().unwrap();
        assert_eq!(err.detail, "Career path is required and cannot be empty");
    }

    #[tokio::test]
    async fn test_roadmap_generate_returns_result() {
        let llm = ScriptedLlm::new(["{}", r#"{"nodes": [{"id": "a"}]}"#, "guide"]);
        let Json(result) = roadmap_generate(
            State(state(llm)),
            Json(CareerRequest {
                career_path: "nurse".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(result.detailed_description, "guide");
        assert!(result.roadmap_structure["nodes"][0]["position"].is_object());
        assert!(result.roadmap_id.is_some());
    }

    #[tokio::test]
    async fn test_sync_failure_is_ok_with_error_text() {
        let Json(result) = design_generate(
            State(state(ScriptedLlm::default())),
            Json(PromptRequest {
                prompt: "chat".into(),
            }),
        )
        .await
        .unwrap();
        assert!(result
            .explanation
            .starts_with("Error: Failed to analyze requirements: LLM provider exhausted"));
        assert_eq!(result.d3_components, json!({"nodes": [], "links": []}));
    }

    #[tokio::test]
    async fn test_workflow_info_lists_stages() {
        let Json(info) = roadmap_info(State(state(ScriptedLlm::default()))).await;
        assert_eq!(info["workflow"], "roadmap");
        assert_eq!(info["input_field"], "career_path");
        assert_eq!(info["stages"].as_array().unwrap().len(), 4);
        assert_eq!(info["stages"][0]["stage"], "analyze_career");
    }

    #[test]
    fn test_error_response_status() {
        let response = ApiError::from(InputRejected::empty("prompt")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
