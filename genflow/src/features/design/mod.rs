//! Prompt to PlantUML system design with an explanation.

mod plantuml;
mod prompts;

pub use plantuml::{
    encode_plantuml, encode_plantuml_hex, extract_components, extract_plantuml, D3Components,
    D3Link, D3Node,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

use super::{copy_fields, error_explanation};
use crate::core::{PipelineState, ProgressEvent, ProgressStatus};
use crate::errors::StageError;
use crate::extract::extract_json;
use crate::pipeline::{StageInfo, StageLabel, Transition, Workflow, WorkflowStep};
use crate::providers::LlmProvider;
use crate::utils::short_id;

/// Public PlantUML server used for diagram URLs.
pub const DEFAULT_PLANTUML_SERVER: &str = "https://www.plantuml.com/plantuml";

/// Labels of the system design workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DesignStage {
    /// Nothing has run yet.
    Starting,
    /// Requirements were analyzed.
    RequirementsAnalyzed,
    /// The PlantUML diagram was generated.
    PlantumlGenerated,
    /// The architecture explanation was generated.
    ExplanationGenerated,
    /// The diagram URL and components are ready.
    DiagramComplete,
    /// A step failed.
    Error,
}

impl StageLabel for DesignStage {
    fn parse(label: &str) -> Option<Self> {
        match label {
            "starting" => Some(Self::Starting),
            "requirements_analyzed" => Some(Self::RequirementsAnalyzed),
            "plantuml_generated" => Some(Self::PlantumlGenerated),
            "explanation_generated" => Some(Self::ExplanationGenerated),
            "diagram_complete" => Some(Self::DiagramComplete),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::RequirementsAnalyzed => "requirements_analyzed",
            Self::PlantumlGenerated => "plantuml_generated",
            Self::ExplanationGenerated => "explanation_generated",
            Self::DiagramComplete => "diagram_complete",
            Self::Error => "error",
        }
    }

    fn progress(self) -> i32 {
        match self {
            Self::Starting => 0,
            Self::RequirementsAnalyzed => 25,
            Self::PlantumlGenerated => 50,
            Self::ExplanationGenerated => 75,
            Self::DiagramComplete => 100,
            Self::Error => -1,
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Starting => "Initializing system design generation...",
            Self::RequirementsAnalyzed => "Analyzing system requirements and architecture patterns...",
            Self::PlantumlGenerated => "Generating PlantUML component diagram...",
            Self::ExplanationGenerated => "Creating detailed architecture explanation...",
            Self::DiagramComplete => "System design generated successfully!",
            Self::Error => "An error occurred during processing",
        }
    }
}

/// Steps of the system design workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DesignStep {
    /// Ask the LLM for structured requirements.
    AnalyzeRequirements,
    /// Ask the LLM for a PlantUML diagram.
    GeneratePlantUml,
    /// Ask the LLM to explain the diagram.
    GenerateExplanation,
    /// Encode the diagram URL and parse components.
    CreateDiagramUrl,
}

impl WorkflowStep for DesignStep {
    fn name(self) -> &'static str {
        match self {
            Self::AnalyzeRequirements => "analyze_requirements",
            Self::GeneratePlantUml => "generate_plantuml",
            Self::GenerateExplanation => "generate_explanation",
            Self::CreateDiagramUrl => "create_diagram_url",
        }
    }

    fn failure_context(self) -> &'static str {
        match self {
            Self::AnalyzeRequirements => "Failed to analyze requirements",
            Self::GeneratePlantUml => "Failed to generate PlantUML",
            Self::GenerateExplanation => "Failed to generate explanation",
            Self::CreateDiagramUrl => "Failed to create diagram URL",
        }
    }
}

/// Requirements used when the LLM answer holds no usable JSON object.
pub fn default_analysis() -> Map<String, Value> {
    let value = json!({
        "system_type": "web_application",
        "scale": "medium",
        "key_components": ["frontend", "backend", "database"],
        "data_flow": ["user_request", "processing", "response"],
        "technologies": ["web_framework", "database", "cache"],
        "patterns": ["layered_architecture", "MVC"],
        "non_functional_requirements": ["scalability", "security"],
        "estimated_complexity": "medium",
        "recommended_architecture": "layered"
    });
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

const PAYLOAD_KEYS: [&str; 6] = [
    "analysis",
    "plantuml_code",
    "explanation",
    "diagram_url",
    "d3_components",
    "diagram_id",
];

/// Turns a system description into a PlantUML diagram and a write-up.
pub struct DesignWorkflow {
    llm: Arc<dyn LlmProvider>,
    plantuml_server: String,
}

impl std::fmt::Debug for DesignWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesignWorkflow")
            .field("plantuml_server", &self.plantuml_server)
            .finish_non_exhaustive()
    }
}

impl DesignWorkflow {
    /// Sampling temperature the LLM should be configured with.
    pub const TEMPERATURE: f32 = 0.7;

    /// Creates the workflow using the public PlantUML server.
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            plantuml_server: DEFAULT_PLANTUML_SERVER.to_string(),
        }
    }

    /// Uses another PlantUML server for diagram URLs.
    #[must_use]
    pub fn with_plantuml_server(mut self, server: impl Into<String>) -> Self {
        self.plantuml_server = server.into().trim_end_matches('/').to_string();
        self
    }

    /// The diagram image URL for `code`.
    pub fn diagram_url(&self, code: &str) -> String {
        format!("{}/img/{}", self.plantuml_server, encode_plantuml(code))
    }

    async fn analyze(&self, state: &PipelineState) -> Result<PipelineState, StageError> {
        info!(request_len = state.input().len(), "Analyzing system requirements");
        let text = self.llm.generate(&prompts::analysis_prompt(state.input())).await?;
        let analysis = extract_json(&text, &default_analysis());
        Ok(state.clone().with("analysis", Value::Object(analysis)))
    }

    async fn generate_plantuml(&self, state: &PipelineState) -> Result<PipelineState, StageError> {
        let analysis = state.require("analysis")?;
        let text = self
            .llm
            .generate(&prompts::plantuml_prompt(state.input(), analysis))
            .await?;
        Ok(state.clone().with("plantuml_code", extract_plantuml(&text)))
    }

    async fn generate_explanation(
        &self,
        state: &PipelineState,
    ) -> Result<PipelineState, StageError> {
        let analysis = state.require("analysis")?;
        let code = state.require_str("plantuml_code")?;
        let text = self
            .llm
            .generate(&prompts::explanation_prompt(state.input(), analysis, code))
            .await?;
        Ok(state.clone().with("explanation", text.trim()))
    }

    fn create_diagram(&self, state: &PipelineState) -> Result<PipelineState, StageError> {
        let code = state.require_str("plantuml_code")?;
        let components = serde_json::to_value(extract_components(code))
            .map_err(|e| StageError::invalid(e.to_string()))?;
        Ok(state
            .clone()
            .with("diagram_url", self.diagram_url(code))
            .with("d3_components", components)
            .with("diagram_id", short_id()))
    }
}

#[async_trait]
impl Workflow for DesignWorkflow {
    type Label = DesignStage;
    type Step = DesignStep;

    fn name(&self) -> &'static str {
        "system_design"
    }

    fn transition(&self, label: DesignStage) -> Transition<DesignStep> {
        match label {
            DesignStage::Starting => Transition::Run(DesignStep::AnalyzeRequirements),
            DesignStage::RequirementsAnalyzed => Transition::Run(DesignStep::GeneratePlantUml),
            DesignStage::PlantumlGenerated => Transition::Run(DesignStep::GenerateExplanation),
            DesignStage::ExplanationGenerated => Transition::Run(DesignStep::CreateDiagramUrl),
            DesignStage::DiagramComplete | DesignStage::Error => Transition::Finish,
        }
    }

    fn completes(&self, step: DesignStep) -> DesignStage {
        match step {
            DesignStep::AnalyzeRequirements => DesignStage::RequirementsAnalyzed,
            DesignStep::GeneratePlantUml => DesignStage::PlantumlGenerated,
            DesignStep::GenerateExplanation => DesignStage::ExplanationGenerated,
            DesignStep::CreateDiagramUrl => DesignStage::DiagramComplete,
        }
    }

    async fn execute(
        &self,
        step: DesignStep,
        state: &PipelineState,
    ) -> Result<PipelineState, StageError> {
        match step {
            DesignStep::AnalyzeRequirements => self.analyze(state).await,
            DesignStep::GeneratePlantUml => self.generate_plantuml(state).await,
            DesignStep::GenerateExplanation => self.generate_explanation(state).await,
            DesignStep::CreateDiagramUrl => self.create_diagram(state),
        }
    }

    fn payload(&self, state: &PipelineState) -> Map<String, Value> {
        copy_fields(state, &PAYLOAD_KEYS)
    }

    fn stages(&self) -> Vec<StageInfo> {
        vec![
            StageInfo::new(
                "analyze_requirements",
                "Analyze system requirements and architecture patterns",
                &["analysis"],
            ),
            StageInfo::new(
                "generate_plantuml",
                "Generate a PlantUML component diagram",
                &["plantuml_code"],
            ),
            StageInfo::new(
                "generate_explanation",
                "Explain the architecture in detail",
                &["explanation"],
            ),
            StageInfo::new(
                "create_diagram_url",
                "Encode the diagram URL and extract components",
                &["diagram_url", "d3_components", "diagram_id"],
            ),
        ]
    }
}

/// Response of the synchronous system design endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignResult {
    /// Requirements analysis, if it was produced.
    pub analysis: Option<Value>,
    /// The diagram source; empty if none was produced.
    pub plantuml_code: String,
    /// Architecture explanation, or `"Error: <message>"`.
    pub explanation: String,
    /// Rendered diagram URL; null unless the run completed.
    pub diagram_url: Option<String>,
    /// Parsed nodes and links.
    pub d3_components: Value,
    /// Short id of the diagram; null unless the run completed.
    pub diagram_id: Option<String>,
}

impl DesignResult {
    /// Builds the response from the final event of a run.
    pub fn from_event(event: &ProgressEvent) -> Self {
        let analysis = event.field("analysis").cloned();
        let plantuml_code = event.field_str("plantuml_code").unwrap_or_default().to_string();
        let empty_components = || json!({"nodes": [], "links": []});
        if event.status == ProgressStatus::Complete {
            Self {
                analysis,
                plantuml_code,
                explanation: event.field_str("explanation").unwrap_or_default().to_string(),
                diagram_url: event.field_str("diagram_url").map(str::to_string),
                d3_components: event
                    .field("d3_components")
                    .cloned()
                    .unwrap_or_else(empty_components),
                diagram_id: event.field_str("diagram_id").map(str::to_string),
            }
        } else {
            Self {
                analysis,
                plantuml_code,
                explanation: error_explanation(event),
                diagram_url: None,
                d3_components: empty_components(),
                diagram_id: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LlmError;
    use crate::pipeline::Orchestrator;
    use crate::providers::MockLlmProvider;
    use crate::testing::{
        assert_progress_monotonic, assert_terminal_complete, assert_terminal_error,
        collect_events, ScriptedLlm,
    };
    use mockall::predicate::function;
    use pretty_assertions::assert_eq;

    const ANALYSIS: &str = r#"{"system_type": "web_application", "key_components": ["api", "db"], "patterns": ["CQRS"], "data_flow": ["request", "store"]}"#;
    const DIAGRAM: &str = "```plantuml\n@startuml\nactor \"Users\" as users\n[API] as api\ndatabase \"Main\" as db\nusers --> api : calls\napi --> db\n@enduml\n```";
    const EXPLANATION: &str = "\n  The API fronts a single database.  \n";

    #[tokio::test]
    async fn test_happy_path() {
        let llm = Arc::new(ScriptedLlm::new([ANALYSIS, DIAGRAM, EXPLANATION]));
        let workflow = DesignWorkflow::new(llm.clone()).with_plantuml_server("http://uml.local/");
        let events = collect_events(Orchestrator::new(workflow).run("a todo app").unwrap()).await;

        let stages: Vec<&str> = events.iter().map(|e| e.stage.as_str()).collect();
        assert_eq!(
            stages,
            vec![
                "requirements_analyzed",
                "plantuml_generated",
                "explanation_generated",
                "diagram_complete"
            ]
        );
        assert_progress_monotonic(&events);

        let last = assert_terminal_complete(&events);
        let code = last.field_str("plantuml_code").unwrap();
        assert!(code.starts_with("@startuml\nactor"));
        assert!(code.ends_with("@enduml"));
        assert_eq!(
            last.field_str("diagram_url").unwrap(),
            format!("http://uml.local/img/{}", encode_plantuml(code))
        );
        assert_eq!(
            last.field_str("explanation"),
            Some("The API fronts a single database.")
        );
        let components = &last.payload["d3_components"];
        assert_eq!(components["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(components["links"][0]["label"], "calls");
        assert_eq!(last.field_str("diagram_id").unwrap().len(), 8);

        let prompts = llm.prompts();
        assert!(prompts[1].contains("Show these main components: api, db"));
        assert!(prompts[1].contains("following: request -> store"));
        assert!(prompts[2].contains("PlantUML Code: @startuml"));
    }

    #[tokio::test]
    async fn test_diagram_failure_keeps_partial_code() {
        let llm = ScriptedLlm::new([ANALYSIS, DIAGRAM])
            .then_fail(LlmError::Status {
                status: 429,
                body: "quota".into(),
            });
        let workflow = DesignWorkflow::new(Arc::new(llm));
        let event = Orchestrator::new(workflow)
            .run_to_completion("a todo app")
            .await
            .unwrap();
        let result = DesignResult::from_event(&event);

        assert!(result.plantuml_code.starts_with("@startuml"));
        assert_eq!(
            result.explanation,
            "Error: Failed to generate explanation: LLM provider returned status 429: quota"
        );
        assert_eq!(result.diagram_url, None);
        assert_eq!(result.d3_components, json!({"nodes": [], "links": []}));
        assert_eq!(result.diagram_id, None);
        assert_eq!(result.analysis.unwrap()["system_type"], "web_application");
    }

    #[tokio::test]
    async fn test_first_stage_failure() {
        let mut llm = MockLlmProvider::new();
        llm.expect_generate()
            .with(function(|prompt: &str| prompt.contains("Request: chat server")))
            .times(1)
            .returning(|_| Err(LlmError::Transport("dns".into())));

        let workflow = DesignWorkflow::new(Arc::new(llm));
        let events = collect_events(Orchestrator::new(workflow).run(" chat server ").unwrap()).await;
        let last = assert_terminal_error(&events);
        assert_eq!(
            last.error.as_deref(),
            Some("Failed to analyze requirements: LLM request failed: dns")
        );

        let result = DesignResult::from_event(last);
        assert_eq!(result.plantuml_code, "");
        assert_eq!(result.analysis, None);
    }

    #[tokio::test]
    async fn test_unparseable_analysis_uses_default() {
        let llm = Arc::new(ScriptedLlm::new(["no json here", "A --> B", "ok"]));
        let workflow = DesignWorkflow::new(llm.clone());
        let event = Orchestrator::new(workflow)
            .run_to_completion("anything")
            .await
            .unwrap();

        assert_eq!(event.field("analysis"), Some(&Value::Object(default_analysis())));
        assert_eq!(event.field_str("plantuml_code"), Some("@startuml\nA --> B\n@enduml"));
        assert!(llm.prompts()[1].contains("Use a layered architecture suited to a web_application."));
    }

    #[test]
    fn test_diagram_url_default_server() {
        let workflow = DesignWorkflow::new(Arc::new(ScriptedLlm::default()));
        let url = workflow.diagram_url("A");
        assert_eq!(
            url,
            format!("https://www.plantuml.com/plantuml/img/{}", encode_plantuml("A"))
        );
        assert!(!url.contains("~h"));
    }
}
