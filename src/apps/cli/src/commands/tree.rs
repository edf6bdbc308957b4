//! Skill-tree commands: `tree`, `layout`, `generate`

use anyhow::{Context, Result};
use mentora_core::service::config::AppConfig;
use mentora_core::service::layout::{LayoutDirection, Viewport};
use mentora_core::service::skill_tree::{SkillTreeClient, SkillTreeGenerator, SkillTreeView, TopicData};
use mentora_core::{SkillTree, SkillTreeStore};
use serde::Serialize;
use std::path::Path;
use tokio::time::Instant;

#[derive(Serialize)]
struct RenderedTree<'a> {
    title: &'a str,
    direction: &'static str,
    viewport: Viewport,
    nodes: &'a [mentora_core::GraphNode],
    edges: &'a [mentora_core::GraphEdge],
}

pub fn parse_direction(value: &str) -> Result<LayoutDirection> {
    LayoutDirection::parse(value)
        .with_context(|| format!("Unknown layout direction '{}', expected TB, BT, LR or RL", value))
}

/// Lay the tree out and wait for the deferred fit view, as a renderer would
async fn render(config: &AppConfig, tree: &SkillTree, direction: Option<LayoutDirection>) -> Result<SkillTreeView> {
    let mut layout = config.layout.clone();
    if let Some(direction) = direction {
        layout.direction = direction;
    }
    let mut view = SkillTreeView::new(layout, config.fit_view, (1280.0, 720.0));
    view.load_initial(tree, Instant::now())?;

    while let Some(due) = view.next_due() {
        tokio::time::sleep_until(due).await;
        view.commit_render(Instant::now());
    }
    Ok(view)
}

fn print_view(title: &str, view: &SkillTreeView, json: bool) -> Result<()> {
    if json {
        let rendered = RenderedTree {
            title,
            direction: view.direction().as_str(),
            viewport: view.viewport(),
            nodes: view.nodes(),
            edges: view.edges(),
        };
        println!("{}", serde_json::to_string_pretty(&rendered)?);
        return Ok(());
    }

    println!("{}", title);
    for node in view.nodes() {
        let marker = if node.data.is_placeholder { " (todo)" } else { "" };
        println!(
            "  [{:>3}] {:<40} x={:>8.1} y={:>8.1}{}",
            node.id,
            node.label(),
            node.position.x,
            node.position.y,
            marker
        );
    }
    let viewport = view.viewport();
    println!(
        "  {} edges, zoom {:.2}, pan ({:.1}, {:.1})",
        view.edges().len(),
        viewport.zoom,
        viewport.x,
        viewport.y
    );
    Ok(())
}

/// `mentora tree <prompt>`: ask the backend for a tree, store it, show it
pub async fn generate_remote(
    config: &AppConfig,
    store: &SkillTreeStore,
    prompt: &str,
    goal: Option<&str>,
    direction: Option<LayoutDirection>,
    json: bool,
) -> Result<()> {
    let client = SkillTreeClient::new(config.skill_tree_endpoint())?;
    let tree = client.generate(prompt).await?;

    store.set_selected_prompt(prompt).await?;
    store.save_tree(&tree).await?;
    if let Some(goal) = goal {
        store.save_goal(goal, &tree).await?;
    }

    let view = render(config, &tree, direction).await?;
    print_view(&tree.title, &view, json)
}

pub fn read_tree(path: &Path) -> Result<SkillTree> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let tree: SkillTree = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a skill tree document", path.display()))?;
    Ok(tree.normalize())
}

/// `mentora layout <file>`: lay out a stored or exported tree
pub async fn layout_file(
    config: &AppConfig,
    store: &SkillTreeStore,
    input: Option<&Path>,
    goal: Option<&str>,
    direction: Option<LayoutDirection>,
    json: bool,
) -> Result<()> {
    let tree = match (input, goal) {
        (Some(path), _) => read_tree(path)?,
        (None, Some(goal)) => store
            .load_goal(goal)
            .await?
            .with_context(|| format!("No stored skill tree for goal '{}'", goal))?,
        (None, None) => anyhow::bail!("Provide a tree file or --goal"),
    };
    let view = render(config, &tree, direction).await?;
    print_view(&tree.title, &view, json)
}

/// `mentora generate <topics>`: build a tree locally from a topic document
pub fn generate_local(config: &AppConfig, input: &Path, max_depth: Option<usize>) -> Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let topics: TopicData = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a topic document", input.display()))?;

    let generator = SkillTreeGenerator::new(max_depth.unwrap_or(config.skill_tree.max_depth));
    let tree = generator.generate(&topics);
    println!("{}", serde_json::to_string_pretty(&tree)?);
    Ok(())
}
