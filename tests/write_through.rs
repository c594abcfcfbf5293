//! Write-through semantics: the primary confirms first, the snapshot
//! patch follows synchronously, and a failed patch never fails the write.

mod support;

use std::sync::atomic::Ordering;

use scorta::{
    ContentKind, ContentStatus, CreateItemInput, PlacementFlags, ReadSource, UpdateItemInput,
    WriteError,
};

use support::{TestEnv, published_article};

fn article_input(title: &str) -> CreateItemInput {
    CreateItemInput {
        kind: ContentKind::Article,
        title: title.to_string(),
        body: format!("{title} body"),
        excerpt: format!("{title} excerpt"),
        categories: vec!["news".to_string()],
        location: "Hamburg".to_string(),
        image_url: String::new(),
        status: ContentStatus::Published,
        placement: PlacementFlags::default(),
        event: None,
    }
}

#[tokio::test]
async fn created_item_survives_an_immediate_primary_outage() {
    let env = TestEnv::new();
    let created = env
        .writer()
        .create_item(article_input("Fresh announcement"))
        .await
        .expect("create");

    // The primary dies right after the write; the awaited snapshot patch
    // means the author still reads their own write.
    env.primary.fail_reads.store(true, Ordering::SeqCst);

    let page = env.reader().home_feed().await;
    assert_eq!(page.source, ReadSource::Snapshot);
    assert!(page.items.iter().any(|item| item.id == created.id));
}

#[tokio::test]
async fn create_rejects_invalid_input_before_touching_the_primary() {
    let env = TestEnv::new();
    let writer = env.writer();

    let mut no_title = article_input("Valid title");
    no_title.title = "   ".to_string();
    let err = writer.create_item(no_title).await.expect_err("empty title");
    assert!(matches!(err, WriteError::Validation(_)));

    let mut no_categories = article_input("Valid title");
    no_categories.categories.clear();
    let err = writer
        .create_item(no_categories)
        .await
        .expect_err("no categories");
    assert!(matches!(err, WriteError::Validation(_)));

    assert_eq!(env.primary.insert_calls.load(Ordering::SeqCst), 0);
    assert!(env.store.load().await.is_empty());
}

#[tokio::test]
async fn rejected_primary_write_never_reaches_the_snapshot() {
    let env = TestEnv::new();
    env.primary.fail_writes.store(true, Ordering::SeqCst);

    let err = env
        .writer()
        .create_item(article_input("Doomed"))
        .await
        .expect_err("insert fails");
    assert!(matches!(err, WriteError::Upstream(_)));

    assert!(env.store.load().await.is_empty());
    assert!(env.primary.items().is_empty());
}

#[tokio::test]
async fn update_overwrites_only_provided_fields_and_patches_snapshot() {
    let env = TestEnv::new();
    let writer = env.writer();
    let created = writer
        .create_item(article_input("Original headline"))
        .await
        .expect("create");

    let updated = writer
        .update_item(
            created.id,
            UpdateItemInput {
                title: Some("Corrected headline".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update");

    assert_eq!(updated.title, "Corrected headline");
    assert_eq!(updated.body, created.body);
    assert!(updated.updated_at >= created.updated_at);

    env.primary.fail_reads.store(true, Ordering::SeqCst);
    let page = env.reader().home_feed().await;
    let seen = page
        .items
        .iter()
        .find(|item| item.id == created.id)
        .expect("patched into snapshot");
    assert_eq!(seen.title, "Corrected headline");
}

#[tokio::test]
async fn update_of_unknown_id_is_not_found() {
    let env = TestEnv::new();
    let err = env
        .writer()
        .update_item(uuid::Uuid::new_v4(), UpdateItemInput::default())
        .await
        .expect_err("missing id");
    assert!(matches!(err, WriteError::NotFound));
}

#[tokio::test]
async fn delete_removes_from_primary_and_snapshot() {
    let env = TestEnv::new();
    let writer = env.writer();
    let created = writer.create_item(article_input("Ephemeral")).await.expect("create");
    assert_eq!(env.store.load().await.len(), 1);

    writer.delete_item(created.id).await.expect("delete");

    assert!(env.primary.items().is_empty());
    assert!(env.store.load().await.is_empty());

    let err = writer.delete_item(created.id).await.expect_err("already gone");
    assert!(matches!(err, WriteError::NotFound));
}

#[tokio::test]
async fn failed_primary_delete_leaves_both_copies() {
    let env = TestEnv::new();
    let writer = env.writer();
    let created = writer.create_item(article_input("Sticky")).await.expect("create");

    env.primary.fail_writes.store(true, Ordering::SeqCst);
    let err = writer.delete_item(created.id).await.expect_err("delete fails");
    assert!(matches!(err, WriteError::Upstream(_)));

    assert_eq!(env.primary.items().len(), 1);
    assert_eq!(env.store.load().await.len(), 1);
}

#[tokio::test]
async fn snapshot_patch_failure_does_not_fail_the_write() {
    let env = TestEnv::new();
    // A directory squatting on the snapshot path makes every patch fail.
    tokio::fs::create_dir_all(&env.config.snapshot_path)
        .await
        .expect("block snapshot path");

    let created = env
        .writer()
        .create_item(article_input("Primary only"))
        .await
        .expect("write must still succeed");

    assert!(env.primary.items().iter().any(|item| item.id == created.id));
}

#[tokio::test]
async fn concurrent_updates_to_same_item_keep_one_winner() {
    let env = TestEnv::new();
    env.primary.seed(vec![published_article("Contested", 10)]);
    let id = env.primary.items()[0].id;

    let writer = std::sync::Arc::new(env.writer());
    let mut handles = Vec::new();
    for n in 0..4 {
        let writer = std::sync::Arc::clone(&writer);
        handles.push(tokio::spawn(async move {
            writer
                .update_item(
                    id,
                    UpdateItemInput {
                        title: Some(format!("Revision {n}")),
                        ..Default::default()
                    },
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.expect("task").expect("update");
    }

    // Last write wins at the primary; the snapshot carries exactly one
    // revision of the item, whichever won.
    let primary_title = env.primary.items()[0].title.clone();
    assert!(primary_title.starts_with("Revision "));
    let stored: Vec<_> = env
        .store
        .load()
        .await
        .into_iter()
        .filter(|item| item.id == id)
        .collect();
    assert_eq!(stored.len(), 1);
}
