use chrono::Duration;
use storage::repository::{CatalogRepository, ProgressRepository};
use storage::sqlite::SqliteRepository;
use vocab_core::model::{LearnerId, ProgressRecord, StudyState, VocabId, VocabItem};
use vocab_core::time::{fixed_now, reference_day_key};

fn item(id: u64, position: u32, level: u32) -> VocabItem {
    VocabItem::new(
        VocabId::new(id),
        position,
        level,
        format!("term-{id}"),
        Some(format!("reading-{id}")),
        format!("meaning-{id}"),
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_catalog_roundtrip_orders_by_position() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_catalog?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.upsert_item(&item(1, 2, 1)).await.unwrap();
    repo.upsert_item(&item(2, 0, 1)).await.unwrap();
    repo.upsert_item(&item(3, 1, 2)).await.unwrap();

    let all = repo.list_items(None).await.unwrap();
    let order: Vec<u64> = all.iter().map(|i| i.id().value()).collect();
    assert_eq!(order, vec![2, 3, 1]);
    assert_eq!(all[0].reading(), Some("reading-2"));

    let level_one = repo.list_items(Some(1)).await.unwrap();
    let order: Vec<u64> = level_one.iter().map(|i| i.id().value()).collect();
    assert_eq!(order, vec![2, 1]);
}

#[tokio::test]
async fn sqlite_upsert_item_replaces_fields() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_item_upsert?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.upsert_item(&item(1, 0, 1)).await.unwrap();
    let updated = VocabItem::new(VocabId::new(1), 5, 2, "水", None, "water").unwrap();
    repo.upsert_item(&updated).await.unwrap();

    let all = repo.list_items(None).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].term(), "水");
    assert_eq!(all[0].position(), 5);
    assert_eq!(all[0].reading(), None);
}

#[tokio::test]
async fn sqlite_progress_roundtrip_preserves_all_fields() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_progress?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.upsert_item(&item(1, 0, 1)).await.unwrap();

    let learner = LearnerId::new(7);
    let now = fixed_now();
    let mut record = ProgressRecord::new_for(learner, VocabId::new(1), now);
    record.state = StudyState::Review;
    record.due_at = now + Duration::days(10);
    record.interval_days = 10;
    record.ease = 2.35;
    record.step_index = 0;
    record.last_reviewed_at = Some(now);
    record.reps = 4;
    record.lapses = 1;
    record.first_reviewed_at = Some(now - Duration::days(12));
    record.first_reviewed_day = Some(reference_day_key(now - Duration::days(12)));

    let stored = repo.upsert(&record).await.unwrap();
    assert_eq!(stored, record);

    let fetched = repo.get(learner, VocabId::new(1)).await.unwrap();
    assert_eq!(fetched, Some(record));

    let missing = repo.get(learner, VocabId::new(99)).await.unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn sqlite_list_scopes_to_learner() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_learners?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.upsert_item(&item(1, 0, 1)).await.unwrap();
    repo.upsert_item(&item(2, 1, 1)).await.unwrap();

    let now = fixed_now();
    let a = LearnerId::new(1);
    let b = LearnerId::new(2);
    repo.upsert(&ProgressRecord::new_for(a, VocabId::new(1), now))
        .await
        .unwrap();
    repo.upsert(&ProgressRecord::new_for(a, VocabId::new(2), now))
        .await
        .unwrap();
    repo.upsert(&ProgressRecord::new_for(b, VocabId::new(1), now))
        .await
        .unwrap();

    assert_eq!(repo.list(a).await.unwrap().len(), 2);
    assert_eq!(repo.list(b).await.unwrap().len(), 1);
}

#[tokio::test]
async fn sqlite_upsert_keeps_first_review_fields_write_once() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_first_review?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.upsert_item(&item(1, 0, 1)).await.unwrap();

    let learner = LearnerId::new(1);
    let now = fixed_now();
    let mut record = ProgressRecord::new_for(learner, VocabId::new(1), now);
    record.first_reviewed_at = Some(now);
    record.first_reviewed_day = Some(reference_day_key(now));
    repo.upsert(&record).await.unwrap();

    // A later write that claims a different first-review time must not win.
    let later = now + Duration::days(3);
    record.reps = 2;
    record.first_reviewed_at = Some(later);
    record.first_reviewed_day = Some(reference_day_key(later));
    let stored = repo.upsert(&record).await.unwrap();

    assert_eq!(stored.reps, 2);
    assert_eq!(stored.first_reviewed_at, Some(now));
    assert_eq!(stored.first_reviewed_day, Some(reference_day_key(now)));
}
