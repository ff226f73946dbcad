use serde_json::Value;

use crate::features::prompt_json;

pub(super) fn analysis_prompt(career_path: &str) -> String {
    format!(
        r#"Analyze the following career path.

Career Path: {career_path}

Do not escape apostrophes or quotes. Reply with JSON only, in exactly this shape:

```json
{{
    "title": "Professional title for this career path",
    "category": "software_development/data_science/design/devops/testing/security/other",
    "difficulty_level": "beginner/intermediate/advanced",
    "estimated_duration": "6 months/1 year/2 years/3+ years",
    "prerequisites": ["prerequisite1", "prerequisite2"],
    "core_skills": ["skill1", "skill2", "skill3"],
    "tools_technologies": ["tool1", "tool2", "tool3"],
    "job_market": {{
        "demand": "high/medium/low",
        "average_salary": "salary range",
        "growth_prospects": "excellent/good/moderate/limited"
    }},
    "learning_phases": [
        {{"phase": "Foundation", "duration": "2-3 months", "focus": "Fundamentals"}},
        {{"phase": "Intermediate", "duration": "3-4 months", "focus": "Projects"}},
        {{"phase": "Advanced", "duration": "4-6 months", "focus": "Specialization"}}
    ],
    "career_progression": ["Junior -> Mid-level -> Senior -> Lead"]
}}
```

Give realistic, industry-relevant information and keep tool names short."#
    )
}

pub(super) fn roadmap_prompt(career_path: &str, analysis: &Value) -> String {
    let analysis = prompt_json(analysis);
    format!(
        r##"Using the analysis, build a tree-shaped learning roadmap for a React Flow view.

Career Path: {career_path}
Analysis: {analysis}

Rules:
1. Order nodes from fundamentals to advanced topics, branching for specializations.
2. Every node has a unique id, a title, a short description, a duration and resources.
3. Node "type" is one of: foundation, core, advanced, project, milestone.
4. Use plain integers for every coordinate. Never write arithmetic such as -650 + 650.
5. Do not escape apostrophes and keep every string value quoted.
6. Create 18-25 nodes: 3-4 foundation, 6-8 core, 4-6 advanced, 3-4 project, 1-2 milestone.
7. Connect foundation to core, core to advanced, advanced to project and project to milestone.

Reply with JSON only:

```json
{{
    "nodes": [
        {{
            "id": "node_1",
            "title": "Topic",
            "description": "What to learn and why it matters",
            "type": "foundation",
            "duration": "2-3 weeks",
            "resources": [
                {{"type": "course", "title": "Course name", "url": "https://example.com", "estimated_time": "20 hours"}}
            ],
            "skills_gained": ["skill1"],
            "position": {{"x": 0, "y": 100}}
        }}
    ],
    "edges": [
        {{"id": "edge_node_1_to_node_2", "source": "node_1", "target": "node_2", "type": "smoothstep", "animated": false, "label": ""}}
    ],
    "phases": [
        {{"name": "Foundation Phase", "nodes": ["node_1"], "color": "#e3f2fd", "description": "Master the fundamentals"}}
    ]
}}
```"##
    )
}

pub(super) fn description_prompt(career_path: &str, analysis: &Value, summary: &str) -> String {
    let analysis = prompt_json(analysis);
    format!(
        r"Write a career guide for someone following this roadmap.

Career Path: {career_path}
Analysis: {analysis}
Roadmap: {summary}

Cover:
1. What a {career_path} does day to day and why the role matters.
2. The technical and soft skills, tools and technologies involved.
3. How to approach the learning path and which pitfalls to avoid.
4. Portfolio projects and open source contributions.
5. Progression from entry level to senior and specialist roles.
6. Market trends, salary expectations and interview preparation.
7. Ways to keep learning and engage with the community.

Write in an encouraging tone with practical, realistic guidance."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_roadmap_prompt_keeps_phase_color_example() {
        let prompt = roadmap_prompt("nurse", &json!({"career_overview": "care"}));
        assert!(prompt.contains("Career Path: nurse"));
        assert!(prompt.contains(r##""color": "#e3f2fd""##));
        assert!(prompt.trim_end().ends_with("```"));
        assert!(prompt.contains("\"nodes\": ["));
    }

    #[test]
    fn test_description_prompt_includes_summary() {
        let prompt = description_prompt("pilot", &json!({}), "3 nodes");
        assert!(prompt.contains("Roadmap: 3 nodes"));
        assert!(prompt.contains("What a pilot does"));
    }
}
