use mentora_core::service::layout::{FitViewOptions, LayoutOptions, INITIAL_FIT_DELAY};
use mentora_core::service::skill_tree::TopicData;
use mentora_core::{
    JsonFileStore, KeyValueStore, LayoutDirection, SkillTreeGenerator, SkillTreeStore,
    SkillTreeView,
};
use std::sync::Arc;
use tokio::time::Instant;

fn sample_topics() -> TopicData {
    serde_json::from_str(
        r#"{
            "topic": "Big O Notation",
            "resources": [
                {"title": "Big O Cheat Sheet", "url": "https://www.bigocheatsheet.com/", "type": "reference"}
            ],
            "quiz_questions": [{
                "question": "What does Big O notation describe?",
                "option_a": "The upper bound of an algorithm's running time.",
                "option_b": "The average case of an algorithm's running time.",
                "option_c": "The best case of an algorithm's running time.",
                "option_d": "None of the above.",
                "correct_answer": "A",
                "explanation": "Big O gives an upper bound."
            }],
            "related_harder_topics": [],
            "children": [
                {"topic": "Time Complexity", "related_harder_topics": ["Amortized Analysis"]},
                {"topic": "Space Complexity"}
            ]
        }"#,
    )
    .expect("valid topic document")
}

#[tokio::test]
async fn generated_tree_persists_and_renders_after_restart() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("state.json");

    let tree = SkillTreeGenerator::default().generate(&sample_topics());
    assert_eq!(tree.nodes.len(), 4);
    assert!(tree.nodes[2].data.is_placeholder);

    {
        let store = SkillTreeStore::new(Arc::new(JsonFileStore::open(&path).await.expect("open")));
        store.save_tree(&tree).await.expect("save tree");
        store.save_goal("goal-1", &tree).await.expect("save goal");
        store
            .set_selected_prompt("Big O Notation")
            .await
            .expect("save prompt");
    }

    let file_store = Arc::new(JsonFileStore::open(&path).await.expect("reopen"));
    assert!(file_store
        .get("skill-tree:Big O Notation")
        .await
        .expect("read")
        .is_some());
    let store = SkillTreeStore::load(file_store).await.expect("load store");
    assert_eq!(store.current_prompt().as_deref(), Some("Big O Notation"));
    let restored = store
        .load_goal("goal-1")
        .await
        .expect("load goal")
        .expect("goal exists");
    assert_eq!(restored, tree);
    assert_eq!(
        store.selected_prompt().await.expect("read prompt").as_deref(),
        Some("Big O Notation")
    );

    let start = Instant::now();
    let mut view = SkillTreeView::new(
        LayoutOptions::default(),
        FitViewOptions::default(),
        (1280.0, 720.0),
    )
    .with_store(store.clone());
    view.add_learning_path("Big O", restored.clone());
    view.load_initial(&restored, start).expect("initial layout");

    let root_y = view.nodes()[0].position.y;
    assert!(view.nodes()[1..].iter().all(|n| n.position.y > root_y));
    assert_eq!(view.commit_render(start + INITIAL_FIT_DELAY), 1);
    let zoom = view.viewport().zoom;
    assert!((0.5..=2.0).contains(&zoom));

    view.set_direction(LayoutDirection::LR, start + INITIAL_FIT_DELAY)
        .expect("relayout");
    let root_x = view.nodes()[0].position.x;
    assert!(view.nodes()[1..].iter().all(|n| n.position.x > root_x));

    view.select_learning_path("Big O", start + INITIAL_FIT_DELAY)
        .await
        .expect("select path");
    assert_eq!(
        store
            .selected_learning_path()
            .await
            .expect("read path")
            .as_deref(),
        Some("Big O")
    );
}

#[tokio::test]
async fn file_store_broadcasts_changes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = JsonFileStore::open(dir.path().join("state.json"))
        .await
        .expect("open");
    let mut changes = store.subscribe();

    store
        .set("selected-prompt", serde_json::json!("graphs"))
        .await
        .expect("set");
    let change = changes.recv().await.expect("change delivered");
    assert_eq!(change.key, "selected-prompt");
    assert_eq!(change.value, Some(serde_json::json!("graphs")));
}
