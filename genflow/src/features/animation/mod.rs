//! Prompt to rendered Manim animation.

mod prompts;
mod sanitize;

pub use sanitize::{sanitize_code, DISALLOWED_OPERATIONS};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

use super::{copy_fields, error_explanation};
use crate::core::{PipelineState, ProgressEvent, ProgressStatus};
use crate::errors::StageError;
use crate::extract::{extract_code_block, extract_explanation, extract_json};
use crate::pipeline::{StageInfo, StageLabel, Transition, Workflow, WorkflowStep};
use crate::providers::{LlmProvider, Renderer};
use crate::utils::short_id;

/// Labels of the animation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationStage {
    /// Nothing has run yet.
    Starting,
    /// The request was analyzed.
    AnalysisComplete,
    /// Manim code was generated.
    CodeGenerated,
    /// The code passed the static checks.
    CodeSanitized,
    /// The video was rendered.
    RenderComplete,
    /// A step failed.
    Error,
}

impl StageLabel for AnimationStage {
    fn parse(label: &str) -> Option<Self> {
        match label {
            "starting" => Some(Self::Starting),
            "analysis_complete" => Some(Self::AnalysisComplete),
            "code_generated" => Some(Self::CodeGenerated),
            "code_sanitized" => Some(Self::CodeSanitized),
            "render_complete" => Some(Self::RenderComplete),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::AnalysisComplete => "analysis_complete",
            Self::CodeGenerated => "code_generated",
            Self::CodeSanitized => "code_sanitized",
            Self::RenderComplete => "render_complete",
            Self::Error => "error",
        }
    }

    fn progress(self) -> i32 {
        match self {
            Self::Starting => 0,
            Self::AnalysisComplete => 25,
            Self::CodeGenerated => 50,
            Self::CodeSanitized => 75,
            Self::RenderComplete => 100,
            Self::Error => -1,
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Starting => "Initializing animation generation...",
            Self::AnalysisComplete => "Analyzing your request and planning the animation...",
            Self::CodeGenerated => "Generating optimized Manim code...",
            Self::CodeSanitized => "Validating and securing the code...",
            Self::RenderComplete => "Animation rendered successfully!",
            Self::Error => "An error occurred during processing",
        }
    }
}

/// Steps of the animation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationStep {
    /// Ask the LLM to analyze the request.
    AnalyzePrompt,
    /// Ask the LLM for Manim code.
    GenerateCode,
    /// Statically check the code.
    SanitizeCode,
    /// Render the code into a video.
    RenderAnimation,
}

impl WorkflowStep for AnimationStep {
    fn name(self) -> &'static str {
        match self {
            Self::AnalyzePrompt => "analyze_prompt",
            Self::GenerateCode => "generate_code",
            Self::SanitizeCode => "sanitize_code",
            Self::RenderAnimation => "render_animation",
        }
    }

    fn failure_context(self) -> &'static str {
        match self {
            Self::AnalyzePrompt => "Failed to analyze prompt",
            Self::GenerateCode => "Failed to generate code",
            Self::SanitizeCode => "Failed to sanitize code",
            Self::RenderAnimation => "Failed to render animation",
        }
    }
}

/// Analysis used when the LLM answer holds no usable JSON object.
pub fn default_analysis() -> Map<String, Value> {
    let value = json!({
        "animation_type": "general",
        "complexity": "medium",
        "key_concepts": ["visualization"],
        "suggested_duration": "5-10 seconds",
        "visual_elements": ["basic shapes"],
        "manim_objects": ["Circle", "Text"],
        "animation_techniques": ["Create", "FadeIn"],
        "requirements_summary": "General animation request"
    });
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

const PAYLOAD_KEYS: [&str; 4] = ["analysis", "explanation", "video_url", "animation_id"];

/// Turns a natural-language request into a rendered Manim video.
pub struct AnimationWorkflow {
    llm: Arc<dyn LlmProvider>,
    renderer: Arc<dyn Renderer>,
}

impl std::fmt::Debug for AnimationWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationWorkflow").finish_non_exhaustive()
    }
}

impl AnimationWorkflow {
    /// Sampling temperature the LLM should be configured with.
    pub const TEMPERATURE: f32 = 0.7;

    /// Creates the workflow.
    pub fn new(llm: Arc<dyn LlmProvider>, renderer: Arc<dyn Renderer>) -> Self {
        Self { llm, renderer }
    }

    async fn analyze(&self, state: &PipelineState) -> Result<PipelineState, StageError> {
        info!(request_len = state.input().len(), "Analyzing animation request");
        let text = self.llm.generate(&prompts::analysis_prompt(state.input())).await?;
        let analysis = extract_json(&text, &default_analysis());
        Ok(state.clone().with("analysis", Value::Object(analysis)))
    }

    async fn generate_code(&self, state: &PipelineState) -> Result<PipelineState, StageError> {
        let analysis = state.require("analysis")?;
        let text = self
            .llm
            .generate(&prompts::code_prompt(state.input(), analysis))
            .await?;
        let code = extract_code_block(&text, Some("python"));
        let explanation = extract_explanation(&text);
        Ok(state
            .clone()
            .with("generated_code", code)
            .with("explanation", explanation))
    }

    fn sanitize(state: &PipelineState) -> Result<PipelineState, StageError> {
        let code = state.require_str("generated_code")?;
        let sanitized = sanitize_code(code)?;
        Ok(state.clone().with("sanitized_code", sanitized))
    }

    async fn render(&self, state: &PipelineState) -> Result<PipelineState, StageError> {
        let code = state.require_str("sanitized_code")?;
        let animation_id = short_id();
        let artifact = self.renderer.render(code, &animation_id).await?;
        Ok(state
            .clone()
            .with("animation_id", artifact.artifact_id)
            .with("video_url", artifact.location))
    }
}

#[async_trait]
impl Workflow for AnimationWorkflow {
    type Label = AnimationStage;
    type Step = AnimationStep;

    fn name(&self) -> &'static str {
        "animation"
    }

    fn transition(&self, label: AnimationStage) -> Transition<AnimationStep> {
        match label {
            AnimationStage::Starting => Transition::Run(AnimationStep::AnalyzePrompt),
            AnimationStage::AnalysisComplete => Transition::Run(AnimationStep::GenerateCode),
            AnimationStage::CodeGenerated => Transition::Run(AnimationStep::SanitizeCode),
            AnimationStage::CodeSanitized => Transition::Run(AnimationStep::RenderAnimation),
            AnimationStage::RenderComplete | AnimationStage::Error => Transition::Finish,
        }
    }

    fn completes(&self, step: AnimationStep) -> AnimationStage {
        match step {
            AnimationStep::AnalyzePrompt => AnimationStage::AnalysisComplete,
            AnimationStep::GenerateCode => AnimationStage::CodeGenerated,
            AnimationStep::SanitizeCode => AnimationStage::CodeSanitized,
            AnimationStep::RenderAnimation => AnimationStage::RenderComplete,
        }
    }

    async fn execute(
        &self,
        step: AnimationStep,
        state: &PipelineState,
    ) -> Result<PipelineState, StageError> {
        match step {
            AnimationStep::AnalyzePrompt => self.analyze(state).await,
            AnimationStep::GenerateCode => self.generate_code(state).await,
            AnimationStep::SanitizeCode => Self::sanitize(state),
            AnimationStep::RenderAnimation => self.render(state).await,
        }
    }

    fn payload(&self, state: &PipelineState) -> Map<String, Value> {
        let mut payload = copy_fields(state, &PAYLOAD_KEYS);
        let code = state
            .get("sanitized_code")
            .or_else(|| state.get("generated_code"))
            .cloned()
            .unwrap_or(Value::Null);
        payload.insert("code".to_string(), code);
        payload
    }

    fn stages(&self) -> Vec<StageInfo> {
        vec![
            StageInfo::new(
                "analyze_prompt",
                "Analyze the request and plan the animation",
                &["analysis"],
            ),
            StageInfo::new(
                "generate_code",
                "Generate Manim code and an explanation",
                &["generated_code", "explanation"],
            ),
            StageInfo::new(
                "sanitize_code",
                "Reject unsafe operations and ensure a Scene class",
                &["sanitized_code"],
            ),
            StageInfo::new(
                "render_animation",
                "Render the scene to an mp4 video",
                &["animation_id", "video_url"],
            ),
        ]
    }
}

/// Response of the synchronous animation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationResult {
    /// The sanitized (or, after a failure, the raw generated) code.
    pub code: String,
    /// Explanation of the animation, or `"Error: <message>"`.
    pub explanation: String,
    /// Public URL of the video; null unless the run completed.
    pub video_url: Option<String>,
}

impl AnimationResult {
    /// Builds the response from the final event of a run.
    pub fn from_event(event: &ProgressEvent) -> Self {
        let code = event.field_str("code").unwrap_or_default().to_string();
        if event.status == ProgressStatus::Complete {
            Self {
                code,
                explanation: event.field_str("explanation").unwrap_or_default().to_string(),
                video_url: event.field_str("video_url").map(str::to_string),
            }
        } else {
            Self {
                code,
                explanation: error_explanation(event),
                video_url: None,
            }
        }
    }
}
