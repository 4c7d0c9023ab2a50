//! Reconciliation tests: deferred references and derived counters

use gpdb_common::db::*;
use gpdb_common::queue::{WriteOp, WriteQueue};

fn creator(username: &str) -> NewCreator {
    NewCreator {
        username: username.to_string(),
        nationality: None,
        discord: None,
        discord_uid: None,
        yt: None,
        recorder_name: "mod".to_string(),
    }
}

fn layout(name: &str, creator: &str, length: &str, masterlevel: Option<&str>) -> NewLayout {
    NewLayout {
        creator_name: creator.to_string(),
        layout_type: None,
        name: name.to_string(),
        length: length.to_string(),
        yt: None,
        music_ngid: None,
        music_name: "M1".to_string(),
        music_artist: "Bob".to_string(),
        igid: None,
        masterlevel: masterlevel.map(str::to_string),
        recorder_name: "mod".to_string(),
        recorder_notes: None,
    }
}

fn collab(name: &str, host: &str) -> NewCollab {
    NewCollab {
        host_name: host.to_string(),
        name: name.to_string(),
        builders_number: 4,
        length: "3min".to_string(),
        yt: None,
        music_ngid: None,
        music_name: "M1".to_string(),
        music_artist: "Bob".to_string(),
        igid: None,
        recorder_name: "mod".to_string(),
        recorder_notes: None,
    }
}

fn music(name: &str, artist: &str) -> NewMusic {
    NewMusic {
        name: name.to_string(),
        artist: artist.to_string(),
        length: "2min".to_string(),
        music_type: None,
        yt: None,
        soundcloud: None,
        ngid: None,
        recorder_name: "mod".to_string(),
        recorder_notes: None,
    }
}

fn artist(name: &str) -> NewArtist {
    NewArtist {
        name: name.to_string(),
        yt: None,
        soundcloud: None,
        recorder_name: "mod".to_string(),
        recorder_notes: None,
    }
}

#[tokio::test]
async fn test_layout_registered_before_its_references() {
    let store = Store::open_in_memory().await.unwrap();

    store
        .insert_layout(layout("L1", "Alice", "1min", None))
        .await
        .unwrap();
    let alice = store.insert_creator(creator("Alice")).await.unwrap();
    let bob = store.insert_artist(artist("Bob")).await.unwrap();
    let m1 = store.insert_music(music("M1", "Bob")).await.unwrap();

    let report = synchronize(&store).await.unwrap();
    assert_eq!(report.layouts_linked, 1);
    assert_eq!(report.musics_linked, 1);

    let l1 = &store.find_layout_by_name("L1").await.unwrap()[0];
    assert_eq!(l1.creator_id, Some(alice));
    assert_eq!(l1.artist_id, Some(bob));
    assert_eq!(l1.music_id, Some(m1));

    let alice = &store.find_creator_by_name("Alice").await.unwrap()[0];
    assert_eq!(alice.layouts_registered, 1);
    assert_eq!(alice.total_time_built, "1min");

    let m1 = &store.find_music_by_name("M1").await.unwrap()[0];
    assert_eq!(m1.uses, 1);
    assert_eq!(m1.artist_id, Some(bob));

    let bob = &store.find_artist_by_name("Bob").await.unwrap()[0];
    assert_eq!(bob.songs_registered, 1);
    assert_eq!(bob.total_song_uses, 1);
}

#[tokio::test]
async fn test_unresolved_references_wait_for_next_run() {
    let store = Store::open_in_memory().await.unwrap();

    store
        .insert_layout(layout("L1", "Alice", "1min", None))
        .await
        .unwrap();
    store.insert_artist(artist("Bob")).await.unwrap();
    synchronize(&store).await.unwrap();

    let l1 = &store.find_layout_by_name("L1").await.unwrap()[0];
    assert_eq!(l1.creator_id, None);
    assert_eq!(l1.music_id, None);
    assert!(l1.artist_id.is_some());

    let alice = store.insert_creator(creator("Alice")).await.unwrap();
    synchronize(&store).await.unwrap();

    let l1 = &store.find_layout_by_name("L1").await.unwrap()[0];
    assert_eq!(l1.creator_id, Some(alice));
    assert_eq!(l1.music_id, None);
}

#[tokio::test]
async fn test_creator_counters() {
    let store = Store::open_in_memory().await.unwrap();

    store.insert_creator(creator("Alice")).await.unwrap();
    store.insert_creator(creator("Eve")).await.unwrap();
    store
        .insert_layout(layout("L1", "Alice", "1h", None))
        .await
        .unwrap();
    store
        .insert_layout(layout("L2", "Alice", "30min", Some("Big Collab")))
        .await
        .unwrap();
    store
        .insert_layout(layout("L3", "Alice", "30s", Some("Other Collab")))
        .await
        .unwrap();
    // Collab rows do not count as participations
    store.insert_collab(collab("Big Collab", "Alice")).await.unwrap();

    synchronize(&store).await.unwrap();

    let alice = &store.find_creator_by_name("Alice").await.unwrap()[0];
    assert_eq!(alice.layouts_registered, 3);
    assert_eq!(alice.collab_participations, 2);
    assert_eq!(alice.total_time_built, "1h30min30s");

    let eve = &store.find_creator_by_name("Eve").await.unwrap()[0];
    assert_eq!(eve.layouts_registered, 0);
    assert_eq!(eve.collab_participations, 0);
    assert_eq!(eve.total_time_built, "0s");
}

#[tokio::test]
async fn test_collab_usage_counts_for_artist_not_music() {
    let store = Store::open_in_memory().await.unwrap();

    let host = store.insert_creator(creator("Alice")).await.unwrap();
    store.insert_artist(artist("Bob")).await.unwrap();
    let m1 = store.insert_music(music("M1", "Bob")).await.unwrap();
    store.insert_collab(collab("C1", "Alice")).await.unwrap();
    store
        .insert_layout(layout("L1", "Alice", "1min", None))
        .await
        .unwrap();

    let report = synchronize(&store).await.unwrap();
    assert_eq!(report.collabs_linked, 1);

    let c1 = &store.find_collab_by_name("C1").await.unwrap()[0];
    assert_eq!(c1.host_id, Some(host));
    assert_eq!(c1.music_id, Some(m1));

    let m1 = &store.find_music_by_name("M1").await.unwrap()[0];
    assert_eq!(m1.uses, 1);

    let bob = &store.find_artist_by_name("Bob").await.unwrap()[0];
    assert_eq!(bob.total_song_uses, 2);
}

#[tokio::test]
async fn test_duplicate_names_resolve_to_lowest_id() {
    let store = Store::open_in_memory().await.unwrap();

    let first = store.insert_creator(creator("Alice")).await.unwrap();
    store.insert_creator(creator("Alice")).await.unwrap();
    store
        .insert_layout(layout("L1", "Alice", "1min", None))
        .await
        .unwrap();

    synchronize(&store).await.unwrap();

    let l1 = &store.find_layout_by_name("L1").await.unwrap()[0];
    assert_eq!(l1.creator_id, Some(first));
}

#[tokio::test]
async fn test_second_run_changes_nothing() {
    let store = Store::open_in_memory().await.unwrap();

    store.insert_creator(creator("Alice")).await.unwrap();
    store.insert_artist(artist("Bob")).await.unwrap();
    store.insert_music(music("M1", "Bob")).await.unwrap();
    store.insert_music(music("M2", "Nobody")).await.unwrap();
    store
        .insert_layout(layout("L1", "Alice", "1min", Some("C1")))
        .await
        .unwrap();
    store
        .insert_layout(layout("L2", "Ghost", "45s", None))
        .await
        .unwrap();
    store.insert_collab(collab("C1", "Alice")).await.unwrap();

    synchronize(&store).await.unwrap();
    let first = store.snapshot().await.unwrap();

    let report = synchronize(&store).await.unwrap();
    let second = store.snapshot().await.unwrap();

    assert_eq!(report, SyncReport::default());
    assert_eq!(first.creators, second.creators);
    assert_eq!(first.layouts, second.layouts);
    assert_eq!(first.collabs, second.collabs);
    assert_eq!(first.musics, second.musics);
    assert_eq!(first.artists, second.artists);
}

#[tokio::test]
async fn test_synchronize_through_queue() {
    let store = Store::open_in_memory().await.unwrap();
    let (queue, _worker) = WriteQueue::spawn(store.clone());

    queue
        .submit(WriteOp::Register(Submission::Layout(layout(
            "L1", "Alice", "1min", None,
        ))))
        .unwrap();
    queue
        .submit(WriteOp::Register(Submission::Creator(creator("Alice"))))
        .unwrap();
    queue.submit(WriteOp::Synchronize).unwrap();
    queue.flush().await.unwrap();

    let alice = &store.find_creator_by_name("Alice").await.unwrap()[0];
    assert_eq!(alice.layouts_registered, 1);
    assert_eq!(queue.stats().failed, 0);
}
