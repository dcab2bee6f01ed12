//! Two sessions sharing one on-disk index:
//! - edits to different drafts never clobber each other
//! - concurrent saves of the same draft are last-writer-wins

use chrono::{DateTime, Utc};
use drafts::{DraftRepository, FileStorage};
use pretty_assertions::assert_eq;
use serde_json::json;

fn at(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap()
}

#[test]
fn sessions_editing_different_drafts_do_not_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");

    let mut session_a = DraftRepository::new(Box::new(FileStorage::new(&path)));
    let mut session_b = DraftRepository::new(Box::new(FileStorage::new(&path)));

    let a = session_a
        .create("A", "nameplate", "2.0", json!({"a": 1}), at(1_000))
        .unwrap();
    let b = session_b
        .create("B", "pcf", "1.0", json!({"b": 1}), at(2_000))
        .unwrap();

    session_a
        .save(&a.draft_id, json!({"a": 2}), at(3_000))
        .unwrap();
    session_b
        .save(&b.draft_id, json!({"b": 2}), at(4_000))
        .unwrap();

    let final_view = DraftRepository::new(Box::new(FileStorage::new(&path)));
    assert_eq!(final_view.list().unwrap().len(), 2);
    assert_eq!(
        final_view.get(&a.draft_id).unwrap().unwrap().data,
        json!({"a": 2})
    );
    assert_eq!(
        final_view.get(&b.draft_id).unwrap().unwrap().data,
        json!({"b": 2})
    );
}

#[test]
fn same_draft_from_two_sessions_is_last_writer_wins() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");

    let mut session_a = DraftRepository::new(Box::new(FileStorage::new(&path)));
    let draft = session_a
        .create("Shared", "nameplate", "2.0", json!({}), at(1_000))
        .unwrap();

    let mut session_b = DraftRepository::new(Box::new(FileStorage::new(&path)));
    session_a
        .save(&draft.draft_id, json!({"edit": "a"}), at(2_000))
        .unwrap();
    session_b
        .save(&draft.draft_id, json!({"edit": "b"}), at(3_000))
        .unwrap();

    let final_view = DraftRepository::new(Box::new(FileStorage::new(&path)));
    let record = final_view.get(&draft.draft_id).unwrap().unwrap();
    assert_eq!(record.data, json!({"edit": "b"}));
    assert_eq!(record.updated_at, at(3_000));
}
