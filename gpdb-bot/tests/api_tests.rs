//! Integration tests for the gpdb-bot command surface
//!
//! Each test builds the router over an in-memory store, a fresh write queue,
//! a temporary moderator whitelist (moderator id 1) and a temporary saves
//! directory, then drives it with `oneshot` requests.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use gpdb_bot::auth::ModeratorWhitelist;
use gpdb_bot::metadata::MetadataClient;
use gpdb_bot::{backup, build_router, AppState};
use gpdb_common::{Store, WriteOp, WriteQueue};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

const MODERATOR: i64 = 1;
const MEMBER: i64 = 2;

struct TestApp {
    app: Router,
    store: Store,
    queue: WriteQueue,
    dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let whitelist_path = dir.path().join("mod_whitelist.json");
        std::fs::write(&whitelist_path, json!({ "mods": [MODERATOR] }).to_string()).unwrap();
        let saves_dir = dir.path().join("saves");

        let store = Store::open_in_memory().await.unwrap();
        let (queue, _worker) = WriteQueue::spawn(store.clone());
        let metadata = MetadataClient::with_base_url(None, "http://127.0.0.1:9").unwrap();

        let state = AppState::new(
            store.clone(),
            queue.clone(),
            ModeratorWhitelist::new(whitelist_path),
            metadata,
            saves_dir,
        );

        Self {
            app: build_router(state),
            store,
            queue,
            dir,
        }
    }

    async fn command(&self, name: &str, invoker: i64, args: Value) -> (StatusCode, Value) {
        let body = json!({
            "invoker": { "id": invoker, "name": format!("user{}", invoker) },
            "args": args,
        });
        let request = Request::builder()
            .method("POST")
            .uri(format!("/commands/{}", name))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn settle(&self) {
        self.queue.flush().await.unwrap();
    }
}

fn field<'a>(reply: &'a Value, name: &str) -> Option<&'a str> {
    reply["fields"]
        .as_array()?
        .iter()
        .find(|f| f["name"] == name)?["value"]
        .as_str()
}

fn artist_args(name: &str) -> Value {
    json!({ "name": name, "yt": "", "soundcloud": "https://soundcloud.com/bob" })
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let t = TestApp::new().await;

    let (status, body) = t.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "gpdb-bot");
    assert!(body["version"].is_string());
    assert_eq!(body["queue"]["submitted"], 0);
    assert_eq!(body["pending_writes"], 0);
}

// =============================================================================
// Registration and authorization
// =============================================================================

#[tokio::test]
async fn test_non_moderator_cannot_register() {
    let t = TestApp::new().await;

    let (status, body) = t.command("add_artist", MEMBER, artist_args("Bob")).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(body["error"]["message"], "**You** are not authorized !");

    t.settle().await;
    assert_eq!(t.queue.stats().submitted, 0);
}

#[tokio::test]
async fn test_moderator_registers_artist() {
    let t = TestApp::new().await;

    let (status, reply) = t.command("add_artist", MODERATOR, artist_args(" Bob ")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["title"], "Registration (mod action)");
    assert_eq!(reply["description"], "Artist successfully registered");
    assert_eq!(field(&reply, "Name"), Some("Bob"));
    assert_eq!(field(&reply, "YouTube"), Some("None"));
    assert_eq!(field(&reply, "Recorder name"), Some("user1"));

    t.settle().await;

    let (status, overview) = t
        .command("get_artist_by_name", MEMBER, json!({ "name": "Bob" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["title"], "Artist overview : Bob");
    assert_eq!(field(&overview, "Songs registered"), Some("0"));
    assert_eq!(overview["thumbnail"], Value::Null);
}

#[tokio::test]
async fn test_blank_required_argument_is_rejected() {
    let t = TestApp::new().await;

    let (status, body) = t.command("add_artist", MODERATOR, artist_args("   ")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_layout_reply_has_video_thumbnail() {
    let t = TestApp::new().await;

    let (status, reply) = t
        .command(
            "add_layout",
            MODERATOR,
            json!({
                "creator_name": "Alice",
                "type": "Wave",
                "name": "L1",
                "length": "1min30s",
                "yt": "https://youtu.be/dQw4w9WgXcQ",
                "music_name": "M1",
                "music_artist": "Bob"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        reply["thumbnail"],
        "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
    );
    assert_eq!(field(&reply, "Music"), Some("M1 by Bob"));
}

// =============================================================================
// Queries
// =============================================================================

#[tokio::test]
async fn test_lookup_miss_is_not_found() {
    let t = TestApp::new().await;

    let (status, body) = t
        .command("get_creator_by_name", MEMBER, json!({ "name": "Nobody" }))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "**Creator** not found.");
}

#[tokio::test]
async fn test_reconciled_counters_show_in_overview() {
    let t = TestApp::new().await;

    t.command(
        "add_creator",
        MODERATOR,
        json!({ "username": "Alice", "nationality": "FR" }),
    )
    .await;
    t.command("add_artist", MODERATOR, artist_args("Bob")).await;
    t.command(
        "add_music",
        MODERATOR,
        json!({ "name": "M1", "artist": "Bob", "length": "2min" }),
    )
    .await;
    t.command(
        "add_layout",
        MODERATOR,
        json!({
            "creator_name": "Alice",
            "name": "L1",
            "length": "1h30s",
            "music_name": "M1",
            "music_artist": "Bob"
        }),
    )
    .await;
    t.queue.submit(WriteOp::Synchronize).unwrap();
    t.settle().await;

    let (_, creator) = t
        .command("get_creator_by_name", MEMBER, json!({ "name": "Alice" }))
        .await;
    assert_eq!(field(&creator, "Layouts registered"), Some("1"));
    assert_eq!(field(&creator, "Total time built"), Some("1h30s"));

    let (_, music) = t
        .command("get_music_by_name", MEMBER, json!({ "name": "M1" }))
        .await;
    assert_eq!(field(&music, "Uses"), Some("1"));
}

// =============================================================================
// Request review
// =============================================================================

#[tokio::test]
async fn test_request_review_and_accept() {
    let t = TestApp::new().await;

    let (status, reply) = t.command("request_artist", MEMBER, artist_args("Carol")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["title"], "Registration request");
    t.settle().await;

    // Requests are not visible in the registry until accepted
    let (status, _) = t
        .command("get_artist_by_name", MEMBER, json!({ "name": "Carol" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, pending) = t.command("review_next_request", MODERATOR, Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["title"], "Pending Artist request registration");
    assert_eq!(pending["ephemeral"], true);
    assert_eq!(field(&pending, "Request kind"), Some("artist"));
    let id: i64 = field(&pending, "Request ID").unwrap().parse().unwrap();

    let (status, accepted) = t
        .command("accept_request", MODERATOR, json!({ "kind": "artist", "id": id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["description"], "✅ Request **accepted** and **processed!**");
    t.settle().await;

    let (status, overview) = t
        .command("get_artist_by_name", MEMBER, json!({ "name": "Carol" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&overview, "Recorder name"), Some("user1"));

    let (status, empty) = t.command("review_next_request", MODERATOR, Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(empty["description"], "**No** pending requests at the moment.");
}

#[tokio::test]
async fn test_accept_unknown_request_fails() {
    let t = TestApp::new().await;

    let (status, body) = t
        .command("accept_request", MODERATOR, json!({ "kind": "music", "id": 99 }))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "**Failed** to fetch request details");
}

#[tokio::test]
async fn test_reject_deletes_request() {
    let t = TestApp::new().await;

    t.command("request_artist", MEMBER, artist_args("Dave")).await;
    t.settle().await;
    let (_, listing) = t.get("/registry/requests").await;
    assert_eq!(listing["count"], 1);
    let id = listing["rows"][0]["id"].as_i64().unwrap();

    let (status, _) = t
        .command("reject_request", MEMBER, json!({ "kind": "artist", "id": id }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, rejected) = t
        .command("reject_request", MODERATOR, json!({ "kind": "artist", "id": id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["description"], "❌ Request **rejected** and **deleted.**");
    t.settle().await;

    let (_, listing) = t.get("/registry/requests").await;
    assert_eq!(listing["count"], 0);
    assert_eq!(t.queue.stats().failed, 0);
}

// =============================================================================
// Listings
// =============================================================================

#[tokio::test]
async fn test_registry_listing() {
    let t = TestApp::new().await;
    t.command("add_artist", MODERATOR, artist_args("Bob")).await;
    t.settle().await;

    let (status, listing) = t.get("/registry/artist").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["entity"], "artist");
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["rows"][0]["name"], "Bob");

    let (status, body) = t.get("/registry/planet").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// =============================================================================
// Backups
// =============================================================================

#[tokio::test]
async fn test_load_backup_restores_snapshot() {
    let t = TestApp::new().await;
    t.command("add_artist", MODERATOR, artist_args("Bob")).await;
    t.settle().await;

    let path = backup::create_backup(&t.store, &t.dir.path().join("saves"))
        .await
        .unwrap();
    let filename = path.file_name().unwrap().to_string_lossy().into_owned();

    t.command("add_artist", MODERATOR, artist_args("Eve")).await;
    t.settle().await;

    let (status, reply) = t
        .command("load_backup", MODERATOR, json!({ "filename": filename }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&reply, "Registry rows"), Some("1"));

    let (status, _) = t
        .command("get_artist_by_name", MEMBER, json!({ "name": "Eve" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_load_backup_errors() {
    let t = TestApp::new().await;

    let (status, body) = t
        .command("load_backup", MODERATOR, json!({ "filename": "gpdb-backup-missing.json" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "BACKUP_MISSING");

    let (status, _) = t
        .command("load_backup", MODERATOR, json!({ "filename": "../mod_whitelist.json" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .command("load_backup", MEMBER, json!({ "filename": "gpdb-backup-missing.json" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
