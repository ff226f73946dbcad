//! Leveled tree layout for roadmap graphs.

use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};

use super::graph::{NodeKind, Position, RoadmapEdge, RoadmapGraph};

/// Maximum number of foundation nodes promoted to roots when the edges
/// give no usable hierarchy.
pub const MAX_FALLBACK_ROOTS: usize = 3;

/// Edge style applied to edges that lack one.
pub const DEFAULT_EDGE_TYPE: &str = "smoothstep";

/// Geometry of the layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// y of level 0.
    pub start_y: f64,
    /// Vertical distance between levels.
    pub level_height: f64,
    /// Horizontal distance between siblings.
    pub spacing: f64,
    /// Extra spread applied on deeper, wider levels.
    pub branch_offset: f64,
    /// Fraction of `branch_offset` actually applied.
    pub branch_factor: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            start_y: 100.0,
            level_height: 350.0,
            spacing: 600.0,
            branch_offset: 300.0,
            branch_factor: 0.3,
        }
    }
}

/// Lays out `graph` with the default geometry.
#[must_use]
pub fn layout(graph: RoadmapGraph) -> RoadmapGraph {
    layout_with(graph, &LayoutConfig::default())
}

/// Lays out `graph`: assigns every node a level and a position, synthesizes
/// edges for an edgeless graph, and fills in missing node and edge fields.
///
/// Pure and deterministic; running it on its own output changes nothing.
#[must_use]
pub fn layout_with(mut graph: RoadmapGraph, config: &LayoutConfig) -> RoadmapGraph {
    normalize_ids(&mut graph);
    let levels = assign_levels(&graph);
    place(&mut graph, &levels, config);

    if graph.edges.is_empty() && graph.nodes.len() >= 2 {
        graph.edges = synthesize_edges(&graph, &levels);
    }

    apply_defaults(&mut graph);
    graph
}

/// Gives every node a non-empty, unique id.
fn normalize_ids(graph: &mut RoadmapGraph) {
    let mut seen = HashSet::with_capacity(graph.nodes.len());
    for (i, node) in graph.nodes.iter_mut().enumerate() {
        if node.id.trim().is_empty() {
            node.id = format!("node_{}", i + 1);
        }
        while seen.contains(&node.id) {
            node.id = format!("{}_{}", node.id, i + 1);
        }
        seen.insert(node.id.clone());
    }
}

/// Groups node indices into levels. Every node lands in exactly one level,
/// no level is empty, and each level is sorted by node index.
pub(crate) fn assign_levels(graph: &RoadmapGraph) -> Vec<Vec<usize>> {
    let index: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), i))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); graph.nodes.len()];
    let mut in_degree = vec![0usize; graph.nodes.len()];
    let mut valid_edges = 0usize;
    for edge in &graph.edges {
        let endpoints = edge
            .source
            .as_deref()
            .and_then(|s| index.get(s))
            .zip(edge.target.as_deref().and_then(|t| index.get(t)));
        if let Some((&source, &target)) = endpoints {
            children[source].push(target);
            in_degree[target] += 1;
            valid_edges += 1;
        }
    }

    let mut roots: Vec<usize> = if valid_edges == 0 {
        Vec::new()
    } else {
        (0..graph.nodes.len()).filter(|&i| in_degree[i] == 0).collect()
    };
    if roots.is_empty() {
        roots = graph
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.kind == Some(NodeKind::Foundation))
            .map(|(i, _)| i)
            .take(MAX_FALLBACK_ROOTS)
            .collect();
    }

    let mut level_of: Vec<Option<usize>> = vec![None; graph.nodes.len()];
    let mut level_count = 0usize;
    let mut queue: VecDeque<(usize, usize)> = roots.into_iter().map(|i| (i, 0)).collect();
    while let Some((node, level)) = queue.pop_front() {
        if level_of[node].is_some() {
            continue;
        }
        level_of[node] = Some(level);
        level_count = level_count.max(level + 1);
        for &child in &children[node] {
            if level_of[child].is_none() {
                queue.push_back((child, level + 1));
            }
        }
    }

    // Orphans are leveled against the depth of the BFS tree so that orphans
    // of one kind share a level. Milestones and unknown kinds share one
    // extra level at the bottom.
    let tree_levels = level_count;
    let mut trailing = Vec::new();
    for (i, node) in graph.nodes.iter().enumerate() {
        if level_of[i].is_some() {
            continue;
        }
        let target = match node.kind.as_ref() {
            Some(NodeKind::Foundation) => 0,
            Some(NodeKind::Core) | None => tree_levels.min(2),
            Some(NodeKind::Advanced) => tree_levels.min(3),
            Some(NodeKind::Project) => tree_levels.min(4),
            Some(NodeKind::Milestone | NodeKind::Other(_)) => {
                trailing.push(i);
                continue;
            }
        };
        level_of[i] = Some(target);
        level_count = level_count.max(target + 1);
    }
    if !trailing.is_empty() {
        for &i in &trailing {
            level_of[i] = Some(level_count);
        }
        level_count += 1;
    }

    let mut levels = vec![Vec::new(); level_count];
    for (i, level) in level_of.into_iter().enumerate() {
        if let Some(level) = level {
            levels[level].push(i);
        }
    }
    levels
}

#[allow(clippy::cast_precision_loss)]
fn place(graph: &mut RoadmapGraph, levels: &[Vec<usize>], config: &LayoutConfig) {
    for (depth, members) in levels.iter().enumerate() {
        let y = (depth as f64).mul_add(config.level_height, config.start_y);
        let count = members.len();
        let center = (count as f64 - 1.0) / 2.0;
        for (i, &node) in members.iter().enumerate() {
            let x = if count == 1 {
                0.0
            } else {
                let mut x = (i as f64 - center) * config.spacing;
                if depth > 1 && count > 2 {
                    x += (i as f64 - center) * config.branch_offset * config.branch_factor;
                }
                x
            };
            graph.nodes[node].position = Some(Position::new(x, y));
        }
    }
}

fn synthesize_edges(graph: &RoadmapGraph, levels: &[Vec<usize>]) -> Vec<RoadmapEdge> {
    let mut edges = Vec::new();
    for pair in levels.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        if current.is_empty() || next.is_empty() {
            continue;
        }
        let per_source = (next.len() / current.len()).max(1);
        let mut covered = vec![false; next.len()];

        for (i, &source) in current.iter().enumerate() {
            for slot in (i * per_source..i * per_source + per_source).filter(|&t| t < next.len()) {
                covered[slot] = true;
                edges.push(synthesized_edge(graph, source, next[slot]));
            }
        }
        // Every level pair gets fallback parents, not just the last one;
        // test_layout_is_idempotent depends on it.
        for (slot, &target) in next.iter().enumerate() {
            if !covered[slot] {
                edges.push(synthesized_edge(graph, current[0], target));
            }
        }
    }
    edges
}

fn synthesized_edge(graph: &RoadmapGraph, source: usize, target: usize) -> RoadmapEdge {
    let (source, target) = (&graph.nodes[source].id, &graph.nodes[target].id);
    let mut edge = RoadmapEdge::between(source.clone(), target.clone());
    edge.id = Some(format!("edge_{source}_to_{target}"));
    edge
}

fn apply_defaults(graph: &mut RoadmapGraph) {
    for (i, node) in graph.nodes.iter_mut().enumerate() {
        if node.kind.is_none() {
            node.kind = Some(NodeKind::Core);
        }
        if node.position.is_none() {
            node.position = Some(Position::default());
        }
        fill(&mut node.extra, "title", || json!(format!("Learning Step {}", i + 1)));
        fill(&mut node.extra, "description", || {
            json!("Important learning milestone in your journey")
        });
        fill(&mut node.extra, "duration", || json!("2-3 weeks"));
        fill(&mut node.extra, "skills_gained", || json!(["Core Skills"]));
        fill(&mut node.extra, "resources", || {
            json!([{
                "type": "course",
                "title": "Learning Resource",
                "url": "#",
                "estimated_time": "20 hours"
            }])
        });
    }

    for edge in &mut graph.edges {
        if edge.id.as_deref().map_or(true, str::is_empty) {
            edge.id = Some(format!(
                "edge_{}_to_{}",
                edge.source.as_deref().unwrap_or("unknown"),
                edge.target.as_deref().unwrap_or("unknown")
            ));
        }
        fill(&mut edge.extra, "type", || json!(DEFAULT_EDGE_TYPE));
        fill(&mut edge.extra, "animated", || json!(false));
        fill(&mut edge.extra, "label", || json!(""));
    }
}

/// Sets `key` when it is missing, null, an empty string or an empty list.
fn fill(map: &mut Map<String, Value>, key: &str, default: impl FnOnce() -> Value) {
    let empty = match map.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    };
    if empty {
        map.insert(key.to_string(), default());
    }
}
