use serde_json::Value;

use crate::features::{join_strings, prompt_json, str_or};

pub(super) fn analysis_prompt(request: &str) -> String {
    format!(
        r#"Analyze the following animation request and describe what needs to be built.

Request: {request}

Answer with JSON in exactly this shape:
{{
    "animation_type": "mathematical/scientific/algorithmic/educational/abstract",
    "complexity": "simple/medium/complex",
    "key_concepts": ["concept1", "concept2"],
    "suggested_duration": "5-15 seconds",
    "visual_elements": ["element1", "element2"],
    "manim_objects": ["Circle", "Square", "Text", "Arrow"],
    "animation_techniques": ["Create", "Transform", "FadeIn", "Write"],
    "requirements_summary": "One sentence describing the animation"
}}

Identify the concepts that need to be visualized and the Manim objects and techniques that fit them."#
    )
}

pub(super) fn code_prompt(request: &str, analysis: &Value) -> String {
    let duration = str_or(analysis, "suggested_duration", "5-10 seconds");
    let objects = join_strings(analysis.get("manim_objects"), ", ");
    let techniques = join_strings(analysis.get("animation_techniques"), ", ");
    let concepts = join_strings(analysis.get("key_concepts"), ", ");
    let analysis = prompt_json(analysis);
    format!(
        r#"Write a complete Manim animation for this request.

Original Request: {request}
Analysis: {analysis}

Requirements:
1. Start with "from manim import *".
2. Define exactly one class that extends Scene.
3. The animation should last {duration}.
4. Use these Manim objects: {objects}
5. Use techniques such as: {techniques}
6. Comment each step of the animation.
7. Choose clear colors, positions and visual hierarchy, with smooth transitions.

Concepts to visualize: {concepts}

Reply with the code in a single block:
```python
[complete Manim code]
```

After the block, briefly explain how the animation works."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_code_prompt_uses_analysis_lists() {
        let analysis = json!({
            "manim_objects": ["Circle", "Text"],
            "animation_techniques": ["Create"],
            "key_concepts": ["area"]
        });
        let prompt = code_prompt("draw a circle", &analysis);
        assert!(prompt.contains("Use these Manim objects: Circle, Text"));
        assert!(prompt.contains("last 5-10 seconds"));
        assert!(prompt.contains("Concepts to visualize: area"));
    }
}
