use serde_json::Value;

use crate::features::{join_strings, prompt_json, str_or};

pub(super) fn analysis_prompt(request: &str) -> String {
    format!(
        r#"Analyze the following system design request and list its requirements.

Request: {request}

Answer with JSON in exactly this shape:
{{
    "system_type": "web_application/mobile_app/distributed_system/microservices/data_pipeline",
    "scale": "small/medium/large/enterprise",
    "key_components": ["component1", "component2"],
    "data_flow": ["step1", "step2"],
    "technologies": ["tech1", "tech2"],
    "patterns": ["pattern1", "pattern2"],
    "non_functional_requirements": ["scalability", "reliability", "security"],
    "estimated_complexity": "low/medium/high",
    "recommended_architecture": "monolithic/microservices/serverless/hybrid"
}}

Focus on architectural patterns, scale and the main system components."#
    )
}

pub(super) fn plantuml_prompt(request: &str, analysis: &Value) -> String {
    let system_type = str_or(analysis, "system_type", "system");
    let architecture = str_or(analysis, "recommended_architecture", "layered");
    let components = join_strings(analysis.get("key_components"), ", ");
    let patterns = join_strings(analysis.get("patterns"), ", ");
    let data_flow = join_strings(analysis.get("data_flow"), " -> ");
    let analysis = prompt_json(analysis);
    format!(
        r#"Draw a PlantUML component diagram for this system.

Original Request: {request}
System Analysis: {analysis}

Rules:
- Start with @startuml, end with @enduml and include a title.
- Declare elements as: actor "User" as user, [Web App] as webapp,
  database "DB Name" as db, cloud "Service" as svc.
- Use a {architecture} architecture suited to a {system_type}.
- Show these main components: {components}
- Apply these patterns: {patterns}
- Connect elements with --> and a label, following: {data_flow}
- Group related elements in packages.

Example:
@startuml
title Web Application Architecture
package "Frontend" {{
    actor "Users" as users
    [Web Application] as webapp
}}
package "Backend" {{
    [API Gateway] as gateway
}}
database "Primary DB" as maindb
users --> webapp : HTTP requests
webapp --> gateway : API calls
gateway --> maindb : queries
@enduml

Reply with the PlantUML code only."#
    )
}

pub(super) fn explanation_prompt(request: &str, analysis: &Value, plantuml: &str) -> String {
    let analysis = prompt_json(analysis);
    format!(
        r"Explain the architecture below to software engineers.

Original Request: {request}
System Analysis: {analysis}
PlantUML Code: {plantuml}

Cover:
1. Architecture overview and the key design decisions.
2. The responsibility of each major component and suggested technologies.
3. How data moves through the system and where it is integrated.
4. Scalability, security, performance and reliability.
5. Deployment, phasing and monitoring recommendations.

Write in a clear technical style with practical advice."
    )
}
