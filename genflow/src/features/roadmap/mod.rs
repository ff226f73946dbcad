//! Career path to laid-out learning roadmap.

mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

use super::{copy_fields, error_explanation, str_or};
use crate::core::{PipelineState, ProgressEvent, ProgressStatus};
use crate::errors::StageError;
use crate::extract::extract_json;
use crate::layout::{layout_with, LayoutConfig, RoadmapGraph};
use crate::pipeline::{StageInfo, StageLabel, Transition, Workflow, WorkflowStep};
use crate::providers::LlmProvider;
use crate::utils::{iso_date, short_id};

/// Version stamped into roadmap metadata.
pub const ROADMAP_VERSION: &str = "1.0";

/// Completion criteria stamped into roadmap metadata.
pub const COMPLETION_CRITERIA: &str = "Complete all nodes and projects in sequence";

/// Labels of the roadmap workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoadmapStage {
    /// Nothing has run yet.
    Starting,
    /// The career path was analyzed.
    CareerAnalyzed,
    /// The roadmap graph was generated and laid out.
    RoadmapGenerated,
    /// The career guide was written.
    DescriptionGenerated,
    /// Metadata was attached.
    RoadmapComplete,
    /// A step failed.
    Error,
}

impl StageLabel for RoadmapStage {
    fn parse(label: &str) -> Option<Self> {
        match label {
            "starting" => Some(Self::Starting),
            "career_analyzed" => Some(Self::CareerAnalyzed),
            "roadmap_generated" => Some(Self::RoadmapGenerated),
            "description_generated" => Some(Self::DescriptionGenerated),
            "roadmap_complete" => Some(Self::RoadmapComplete),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::CareerAnalyzed => "career_analyzed",
            Self::RoadmapGenerated => "roadmap_generated",
            Self::DescriptionGenerated => "description_generated",
            Self::RoadmapComplete => "roadmap_complete",
            Self::Error => "error",
        }
    }

    fn progress(self) -> i32 {
        match self {
            Self::Starting => 0,
            Self::CareerAnalyzed => 25,
            Self::RoadmapGenerated => 50,
            Self::DescriptionGenerated => 75,
            Self::RoadmapComplete => 100,
            Self::Error => -1,
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Starting => "Initializing roadmap generation...",
            Self::CareerAnalyzed => "Analyzing career path and requirements...",
            Self::RoadmapGenerated => "Creating detailed learning roadmap...",
            Self::DescriptionGenerated => "Generating comprehensive career guide...",
            Self::RoadmapComplete => "Roadmap generated successfully!",
            Self::Error => "An error occurred during processing",
        }
    }
}

/// Steps of the roadmap workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoadmapStep {
    /// Ask the LLM to analyze the career path.
    AnalyzeCareer,
    /// Ask the LLM for the roadmap graph and lay it out.
    GenerateRoadmap,
    /// Ask the LLM for the career guide.
    GenerateDescription,
    /// Attach id and metadata.
    FinalizeRoadmap,
}

impl WorkflowStep for RoadmapStep {
    fn name(self) -> &'static str {
        match self {
            Self::AnalyzeCareer => "analyze_career",
            Self::GenerateRoadmap => "generate_roadmap",
            Self::GenerateDescription => "generate_description",
            Self::FinalizeRoadmap => "finalize_roadmap",
        }
    }

    fn failure_context(self) -> &'static str {
        match self {
            Self::AnalyzeCareer => "Failed to analyze career path",
            Self::GenerateRoadmap => "Failed to generate roadmap",
            Self::GenerateDescription => "Failed to generate description",
            Self::FinalizeRoadmap => "Failed to finalize roadmap",
        }
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Career analysis used when the LLM answer holds no usable JSON object.
pub fn default_analysis() -> Map<String, Value> {
    object(json!({
        "title": "Software Developer",
        "category": "software_development",
        "difficulty_level": "intermediate",
        "estimated_duration": "12 months",
        "prerequisites": ["Basic programming knowledge"],
        "core_skills": ["Programming", "Problem solving"],
        "tools_technologies": ["IDE", "Version control"],
        "job_market": {
            "demand": "high",
            "average_salary": "$60,000 - $120,000",
            "growth_prospects": "excellent"
        },
        "learning_phases": [
            {"phase": "Foundation", "duration": "3 months", "focus": "Basic programming concepts"}
        ],
        "career_progression": ["Junior", "Mid-level", "Senior"]
    }))
}

/// Roadmap used when the LLM answer holds no usable JSON object.
pub fn empty_roadmap() -> Map<String, Value> {
    object(json!({"nodes": [], "edges": [], "phases": []}))
}

const PAYLOAD_KEYS: [&str; 5] = [
    "analysis",
    "roadmap_structure",
    "detailed_description",
    "roadmap_id",
    "metadata",
];

/// Turns a career path into a laid-out learning roadmap and guide.
pub struct RoadmapWorkflow {
    llm: Arc<dyn LlmProvider>,
    layout: LayoutConfig,
}

impl std::fmt::Debug for RoadmapWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoadmapWorkflow")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl RoadmapWorkflow {
    /// Sampling temperature the LLM should be configured with. Kept low so
    /// the roadmap JSON stays well-formed.
    pub const TEMPERATURE: f32 = 0.3;

    /// Creates the workflow with the default layout.
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            layout: LayoutConfig::default(),
        }
    }

    /// Overrides the layout constants.
    #[must_use]
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    async fn analyze(&self, state: &PipelineState) -> Result<PipelineState, StageError> {
        info!(career_path = %state.input(), "Analyzing career path");
        let text = self.llm.generate(&prompts::analysis_prompt(state.input())).await?;
        let analysis = extract_json(&text, &default_analysis());
        Ok(state.clone().with("analysis", Value::Object(analysis)))
    }

    async fn generate_roadmap(&self, state: &PipelineState) -> Result<PipelineState, StageError> {
        let analysis = state.require("analysis")?;
        let text = self
            .llm
            .generate(&prompts::roadmap_prompt(state.input(), analysis))
            .await?;
        let raw = extract_json(&text, &empty_roadmap());
        let graph = layout_with(RoadmapGraph::from_map(&raw), &self.layout);
        info!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "Roadmap laid out"
        );
        Ok(state.clone().with("roadmap_structure", graph.to_value()))
    }

    async fn generate_description(
        &self,
        state: &PipelineState,
    ) -> Result<PipelineState, StageError> {
        let analysis = state.require("analysis")?;
        let summary = RoadmapGraph::from_value(state.require("roadmap_structure")?).summary();
        let text = self
            .llm
            .generate(&prompts::description_prompt(state.input(), analysis, &summary))
            .await?;
        Ok(state.clone().with("detailed_description", text.trim()))
    }

    fn finalize(state: &PipelineState) -> Result<PipelineState, StageError> {
        let analysis = state.require("analysis")?;
        let total_nodes = state
            .require("roadmap_structure")?
            .get("nodes")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let metadata = json!({
            "created_at": iso_date(),
            "version": ROADMAP_VERSION,
            "total_duration": str_or(analysis, "estimated_duration", "12 months"),
            "difficulty": str_or(analysis, "difficulty_level", "intermediate"),
            "total_nodes": total_nodes,
            "completion_criteria": COMPLETION_CRITERIA,
        });
        Ok(state
            .clone()
            .with("roadmap_id", short_id())
            .with("metadata", metadata))
    }
}

#[async_trait]
impl Workflow for RoadmapWorkflow {
    type Label = RoadmapStage;
    type Step = RoadmapStep;

    fn name(&self) -> &'static str {
        "roadmap"
    }

    fn input_field(&self) -> &'static str {
        "career_path"
    }

    fn transition(&self, label: RoadmapStage) -> Transition<RoadmapStep> {
        match label {
            RoadmapStage::Starting => Transition::Run(RoadmapStep::AnalyzeCareer),
            RoadmapStage::CareerAnalyzed => Transition::Run(RoadmapStep::GenerateRoadmap),
            RoadmapStage::RoadmapGenerated => Transition::Run(RoadmapStep::GenerateDescription),
            RoadmapStage::DescriptionGenerated => Transition::Run(RoadmapStep::FinalizeRoadmap),
            RoadmapStage::RoadmapComplete | RoadmapStage::Error => Transition::Finish,
        }
    }

    fn completes(&self, step: RoadmapStep) -> RoadmapStage {
        match step {
            RoadmapStep::AnalyzeCareer => RoadmapStage::CareerAnalyzed,
            RoadmapStep::GenerateRoadmap => RoadmapStage::RoadmapGenerated,
            RoadmapStep::GenerateDescription => RoadmapStage::DescriptionGenerated,
            RoadmapStep::FinalizeRoadmap => RoadmapStage::RoadmapComplete,
        }
    }

    async fn execute(
        &self,
        step: RoadmapStep,
        state: &PipelineState,
    ) -> Result<PipelineState, StageError> {
        match step {
            RoadmapStep::AnalyzeCareer => self.analyze(state).await,
            RoadmapStep::GenerateRoadmap => self.generate_roadmap(state).await,
            RoadmapStep::GenerateDescription => self.generate_description(state).await,
            RoadmapStep::FinalizeRoadmap => Self::finalize(state),
        }
    }

    fn payload(&self, state: &PipelineState) -> Map<String, Value> {
        copy_fields(state, &PAYLOAD_KEYS)
    }

    fn stages(&self) -> Vec<StageInfo> {
        vec![
            StageInfo::new(
                "analyze_career",
                "Analyze the career path and its requirements",
                &["analysis"],
            ),
            StageInfo::new(
                "generate_roadmap",
                "Generate the roadmap graph and lay it out as a tree",
                &["roadmap_structure"],
            ),
            StageInfo::new(
                "generate_description",
                "Write a comprehensive career guide",
                &["detailed_description"],
            ),
            StageInfo::new(
                "finalize_roadmap",
                "Attach an id and metadata",
                &["roadmap_id", "metadata"],
            ),
        ]
    }
}

/// Response of the synchronous roadmap endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapResult {
    /// Career analysis, if it was produced.
    pub analysis: Option<Value>,
    /// The laid-out graph; empty after a failure.
    pub roadmap_structure: Value,
    /// Career guide, or `"Error: <message>"`.
    pub detailed_description: String,
    /// Short id; null unless the run completed.
    pub roadmap_id: Option<String>,
    /// Roadmap metadata; null unless the run completed.
    pub metadata: Option<Value>,
}

impl RoadmapResult {
    /// Builds the response from the final event of a run.
    pub fn from_event(event: &ProgressEvent) -> Self {
        let analysis = event.field("analysis").cloned();
        if event.status == ProgressStatus::Complete {
            Self {
                analysis,
                roadmap_structure: event
                    .field("roadmap_structure")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(empty_roadmap())),
                detailed_description: event
                    .field_str("detailed_description")
                    .unwrap_or_default()
                    .to_string(),
                roadmap_id: event.field_str("roadmap_id").map(str::to_string),
                metadata: event.field("metadata").cloned(),
            }
        } else {
            Self {
                analysis,
                roadmap_structure: Value::Object(empty_roadmap()),
                detailed_description: error_explanation(event),
                roadmap_id: None,
                metadata: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LlmError;
    use crate::pipeline::Orchestrator;
    use crate::testing::{
        assert_progress_monotonic, assert_terminal_complete, assert_terminal_error,
        collect_events, ScriptedLlm,
    };
    use pretty_assertions::assert_eq;

    const ANALYSIS: &str = r#"```json
{"title": "Data Engineer", "difficulty_level": "advanced", "estimated_duration": "2 years"}
```"#;

    // Arithmetic in positions, a trailing comma and no edges.
    const ROADMAP: &str = r#"Here is your roadmap:
```json
{
  "nodes": [
    {"id": "sql", "title": "SQL", "type": "foundation", "position": {"x": -650 + 650, "y": 100}},
    {"id": "python", "title": "Python", "type": "foundation"},
    {"id": "spark", "title": "Spark", "type": "core"},
  ],
  "phases": [{"name": "Foundation Phase", "nodes": ["sql", "python"]}]
}
```"#;

    #[tokio::test]
    async fn test_happy_path() {
        let llm = Arc::new(ScriptedLlm::new([ANALYSIS, ROADMAP, "  A long guide.  "]));
        let workflow = RoadmapWorkflow::new(llm.clone());
        let events = collect_events(Orchestrator::new(workflow).run("data engineer").unwrap()).await;

        let stages: Vec<&str> = events.iter().map(|e| e.stage.as_str()).collect();
        assert_eq!(
            stages,
            vec![
                "career_analyzed",
                "roadmap_generated",
                "description_generated",
                "roadmap_complete"
            ]
        );
        assert_progress_monotonic(&events);
        let last = assert_terminal_complete(&events);

        let roadmap = &last.payload["roadmap_structure"];
        let nodes = roadmap["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 3);
        for node in nodes {
            assert!(node["position"]["x"].is_number());
            assert!(node["position"]["y"].is_number());
        }
        let edges = roadmap["edges"].as_array().unwrap();
        assert!(!edges.is_empty());
        assert_eq!(edges[0]["type"], "smoothstep");
        assert_eq!(roadmap["phases"].as_array().unwrap().len(), 1);

        assert_eq!(last.field_str("detailed_description"), Some("A long guide."));
        assert_eq!(last.field_str("roadmap_id").unwrap().len(), 8);

        let metadata = last.field("metadata").unwrap();
        assert_eq!(metadata["version"], "1.0");
        assert_eq!(metadata["total_duration"], "2 years");
        assert_eq!(metadata["difficulty"], "advanced");
        assert_eq!(metadata["total_nodes"], 3);
        assert_eq!(metadata["completion_criteria"], COMPLETION_CRITERIA);
        assert_eq!(metadata["created_at"].as_str().unwrap().len(), 10);

        assert!(llm.prompts()[2].contains("Roadmap contains 3 learning nodes across 1 phases."));
    }

    #[tokio::test]
    async fn test_unparseable_roadmap_is_empty_graph() {
        let llm = ScriptedLlm::new(["not json", "still not json", "guide"]);
        let workflow = RoadmapWorkflow::new(Arc::new(llm));
        let event = Orchestrator::new(workflow)
            .run_to_completion("designer")
            .await
            .unwrap();

        assert_eq!(
            event.field("roadmap_structure"),
            Some(&json!({"nodes": [], "edges": [], "phases": []}))
        );
        let metadata = event.field("metadata").unwrap();
        assert_eq!(metadata["total_nodes"], 0);
        assert_eq!(metadata["total_duration"], "12 months");
        assert_eq!(metadata["difficulty"], "intermediate");
    }

    #[tokio::test]
    async fn test_empty_career_path_rejected() {
        let workflow = RoadmapWorkflow::new(Arc::new(ScriptedLlm::default()));
        let err = Orchestrator::new(workflow).run("   ").unwrap_err();
        assert_eq!(err.field, "career_path");
        assert_eq!(err.detail, "Career path is required and cannot be empty");
    }

    #[tokio::test]
    async fn test_description_failure_result() {
        let llm = ScriptedLlm::new([ANALYSIS, ROADMAP]).then_fail(LlmError::EmptyResponse);
        let workflow = RoadmapWorkflow::new(Arc::new(llm));
        let events = collect_events(Orchestrator::new(workflow).run("data engineer").unwrap()).await;
        let last = assert_terminal_error(&events);

        let result = RoadmapResult::from_event(last);
        assert_eq!(
            result.detailed_description,
            "Error: Failed to generate description: LLM response contained no text"
        );
        assert_eq!(result.roadmap_structure, json!({"nodes": [], "edges": [], "phases": []}));
        assert_eq!(result.roadmap_id, None);
        assert_eq!(result.metadata, None);
        assert_eq!(result.analysis.unwrap()["title"], "Data Engineer");
    }

    #[tokio::test]
    async fn test_sync_result_on_success() {
        let llm = ScriptedLlm::new([ANALYSIS, ROADMAP, "guide"]);
        let workflow = RoadmapWorkflow::new(Arc::new(llm));
        let event = Orchestrator::new(workflow)
            .run_to_completion("data engineer")
            .await
            .unwrap();
        let result = RoadmapResult::from_event(&event);
        assert_eq!(result.detailed_description, "guide");
        assert!(result.roadmap_id.is_some());
        assert_eq!(result.roadmap_structure["nodes"].as_array().unwrap().len(), 3);
    }
}
