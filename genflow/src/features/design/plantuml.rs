//! PlantUML extraction, URL encoding and component parsing.

use base64::{
    alphabet::Alphabet,
    engine::{general_purpose::NO_PAD, GeneralPurpose},
    Engine as _,
};
use flate2::{write::DeflateEncoder, Compression};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::LazyLock;
use tracing::warn;

use crate::utils::patterns::compile_static;

const START: &str = "@startuml";
const END: &str = "@enduml";

const PLANTUML_ALPHABET: Alphabet =
    match Alphabet::new("0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_") {
        Ok(alphabet) => alphabet,
        Err(_) => panic!("PlantUML alphabet must be 64 unique ASCII characters"),
    };
const PLANTUML_ENGINE: GeneralPurpose = GeneralPurpose::new(&PLANTUML_ALPHABET, NO_PAD);

static PLANTUML_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static(r"```(?i:plantuml|puml|uml)[ \t]*\r?\n?([\s\S]*?)```")
});
static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r"```[\w+#.-]*[ \t]*\r?\n?([\s\S]*?)```"));

static ACTOR: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r#"actor\s+"([^"]+)"\s+as\s+(\w+)"#));
static COMPONENT: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r"\[([^\]]+)\]\s+as\s+(\w+)"));
static DATABASE: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r#"database\s+"([^"]+)"\s+as\s+(\w+)"#));
static CLOUD: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r#"cloud\s+"([^"]+)"\s+as\s+(\w+)"#));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r"(\w+)\s+-->\s+(\w+)(?:\s*:\s*(.+))?"));

/// Pulls a PlantUML document out of an LLM answer.
///
/// Takes the plantuml-tagged fence (or the first fence, or the whole text),
/// narrows it to the `@startuml`..`@enduml` span and adds whichever marker
/// is missing.
pub fn extract_plantuml(text: &str) -> String {
    let body = PLANTUML_FENCE
        .captures(text)
        .or_else(|| ANY_FENCE.captures(text))
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str());

    let body = match body.find(START) {
        Some(start) => {
            let from_start = &body[start..];
            match from_start.find(END) {
                Some(end) => &from_start[..end + END.len()],
                None => from_start,
            }
        }
        None => body,
    };

    let mut code = body.trim().to_string();
    if !code.starts_with(START) {
        code = format!("{START}\n{code}");
    }
    if !code.ends_with(END) {
        code = format!("{code}\n{END}");
    }
    code
}

/// Encodes a diagram for a PlantUML server URL.
///
/// The UTF-8 text is raw-deflated at the best level and written in
/// PlantUML's base64 alphabet, zero-filled to whole 3-byte groups the way
/// the server's own encoder does. Falls back to the `~h` hex form if
/// compression fails.
pub fn encode_plantuml(code: &str) -> String {
    match deflate(code.as_bytes()) {
        Ok(mut compressed) => {
            let tail = compressed.len() % 3;
            if tail != 0 {
                compressed.resize(compressed.len() + 3 - tail, 0);
            }
            PLANTUML_ENGINE.encode(compressed)
        }
        Err(e) => {
            warn!(error = %e, "PlantUML compression failed, using hex encoding");
            encode_plantuml_hex(code)
        }
    }
}

/// The uncompressed `~h` hex form accepted by PlantUML servers.
pub fn encode_plantuml_hex(code: &str) -> String {
    format!("~h{}", hex::encode(code.as_bytes()))
}

fn deflate(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// A diagram element positioned for a D3 view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct D3Node {
    /// PlantUML alias.
    pub id: String,
    /// Display label.
    pub label: String,
    /// One of `actor`, `component`, `database`, `cloud`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Horizontal position.
    pub x: i64,
    /// Vertical position, fixed per kind.
    pub y: i64,
}

/// A `-->` relation between two aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct D3Link {
    /// Source alias.
    pub source: String,
    /// Target alias.
    pub target: String,
    /// Relation label, empty when absent.
    pub label: String,
}

/// Nodes and links recovered from a PlantUML component diagram.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct D3Components {
    /// Declared elements in document order.
    pub nodes: Vec<D3Node>,
    /// Relations in document order.
    pub links: Vec<D3Link>,
}

/// Parses actors, components, databases, clouds and `-->` links, one line
/// at a time.
pub fn extract_components(code: &str) -> D3Components {
    let element_kinds: [(&Regex, &str, i64); 4] = [
        (&*ACTOR, "actor", 100),
        (&*COMPONENT, "component", 200),
        (&*DATABASE, "database", 350),
        (&*CLOUD, "cloud", 300),
    ];

    let mut components = D3Components::default();
    for line in code.lines().map(str::trim) {
        for (pattern, kind, y) in element_kinds {
            if let Some(caps) = pattern.captures(line) {
                let x = 100 + 150 * components.nodes.len() as i64;
                components.nodes.push(D3Node {
                    id: caps[2].to_string(),
                    label: caps[1].to_string(),
                    kind: kind.to_string(),
                    x,
                    y,
                });
            }
        }
        if let Some(caps) = LINK.captures(line) {
            components.links.push(D3Link {
                source: caps[1].to_string(),
                target: caps[2].to_string(),
                label: caps.get(3).map_or("", |m| m.as_str().trim()).to_string(),
            });
        }
    }
    components
}
