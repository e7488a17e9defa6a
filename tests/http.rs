use once_cell::sync::Lazy;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct GuestSession {
    guest_id: String,
}

#[derive(Debug, Deserialize)]
struct Progress {
    total_xp: u64,
    level: u64,
    points_to_next_level: u64,
}

#[derive(Debug, Deserialize)]
struct StatCard {
    id: String,
    name: String,
    total_points: u64,
    can_complete: bool,
}

#[derive(Debug, Deserialize)]
struct Dashboard {
    onboarding_completed: bool,
    mirror_connected: bool,
    progress: Progress,
    stats: Vec<StatCard>,
}

#[derive(Debug, Deserialize)]
struct Outcome {
    stat_points: u64,
    leveled_up: bool,
    new_level: u64,
}

#[derive(Debug, Deserialize)]
struct LeaderboardEntry {
    user_id: String,
    total_xp: u64,
    title: String,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::Mutex;
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PIDS: Mutex<Vec<i32>> = Mutex::new(Vec::new());

    pub fn register(pid: u32) {
        if let Ok(mut pids) = PIDS.lock() {
            pids.push(pid as i32);
        }
        REGISTER.call_once(|| unsafe {
            libc::atexit(on_exit);
        });
    }

    extern "C" fn on_exit() {
        if let Ok(pids) = PIDS.lock() {
            for pid in pids.iter() {
                unsafe {
                    libc::kill(*pid, libc::SIGTERM);
                }
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_dir() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("habit_quest_http_{}_{}", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_habit_quest"))
        .env("PORT", port.to_string())
        .env("APP_DATA_DIR", unique_data_dir())
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

fn unique_user(label: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{label}-{nanos}")
}

struct Player {
    client: Client,
    base_url: String,
    header: (&'static str, String),
}

impl Player {
    fn account(server: &TestServer, user_id: String) -> Self {
        Self {
            client: Client::new(),
            base_url: server.base_url.clone(),
            header: ("x-user-id", user_id),
        }
    }

    async fn guest(server: &TestServer) -> Self {
        let client = Client::new();
        let response = client
            .post(format!("{}/api/session/guest", server.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let session: GuestSession = response.json().await.unwrap();
        Self {
            client,
            base_url: server.base_url.clone(),
            header: ("x-guest-id", session.guest_id),
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{path}", self.base_url))
            .header(self.header.0, &self.header.1)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{path}", self.base_url))
            .header(self.header.0, &self.header.1)
    }

    fn put(&self, path: &str) -> RequestBuilder {
        self.client
            .put(format!("{}{path}", self.base_url))
            .header(self.header.0, &self.header.1)
    }

    fn patch(&self, path: &str) -> RequestBuilder {
        self.client
            .patch(format!("{}{path}", self.base_url))
            .header(self.header.0, &self.header.1)
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.client
            .delete(format!("{}{path}", self.base_url))
            .header(self.header.0, &self.header.1)
    }

    async fn onboard(&self) -> Dashboard {
        let response = self
            .post("/api/onboarding")
            .json(&json!({
                "character_name": "Hero",
                "avatar": "🧙",
                "stats": [
                    { "name": "Strength", "emoji": "💪", "color": "strength" },
                    { "name": "Intelligence", "emoji": "📚", "color": "intelligence" },
                    { "name": "Endurance", "emoji": "🧘", "color": "endurance" }
                ]
            }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        response.json().await.unwrap()
    }

    async fn dashboard(&self) -> Dashboard {
        self.get("/api/dashboard")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn complete(&self, stat_id: &str) -> reqwest::Response {
        self.post(&format!("/api/stats/{stat_id}/complete"))
            .send()
            .await
            .unwrap()
    }

    async fn add_stat(&self, name: &str) -> reqwest::Response {
        self.post("/api/stats")
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn http_guest_completes_once_per_day() {
    let server = shared_server().await;
    let player = Player::guest(&server).await;

    let dashboard = player.onboard().await;
    assert!(dashboard.onboarding_completed);
    assert_eq!(dashboard.progress.level, 1);
    assert_eq!(dashboard.progress.points_to_next_level, 10);
    let stat_id = dashboard.stats[0].id.clone();

    let response = player.complete(&stat_id).await;
    assert!(response.status().is_success());
    let outcome: Outcome = response.json().await.unwrap();
    assert_eq!(outcome.stat_points, 1);
    assert!(!outcome.leveled_up);
    assert_eq!(outcome.new_level, 1);

    let again = player.complete(&stat_id).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
    let body: Value = again.json().await.unwrap();
    assert_eq!(body["error"], "already_completed_today");

    let dashboard = player.dashboard().await;
    assert_eq!(dashboard.progress.total_xp, 1);
    assert_eq!(dashboard.stats[0].total_points, 1);
    assert!(!dashboard.stats[0].can_complete);
    assert!(dashboard.stats[1].can_complete);
}

#[tokio::test]
async fn http_requests_without_session_are_rejected() {
    let server = shared_server().await;
    let response = Client::new()
        .get(format!("{}/api/dashboard", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn http_registry_bounds_are_enforced() {
    let server = shared_server().await;
    let player = Player::account(&server, unique_user("bounds"));
    player.onboard().await;

    for name in ["Code", "Cook", "Sleep"] {
        assert_eq!(player.add_stat(name).await.status(), StatusCode::CREATED);
    }
    let seventh = player.add_stat("Paint").await;
    assert_eq!(seventh.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let stats = player.dashboard().await.stats;
    assert_eq!(stats.len(), 6);
    for stat in &stats[..3] {
        let response = player
            .delete(&format!("/api/stats/{}", stat.id))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
    let last = &stats[3];
    let response = player
        .delete(&format!("/api/stats/{}", last.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "min_stats_required");
}

#[tokio::test]
async fn http_history_reports_streak_and_timeline() {
    let server = shared_server().await;
    let player = Player::guest(&server).await;
    let dashboard = player.onboard().await;
    let stat = &dashboard.stats[1];
    assert!(player.complete(&stat.id).await.status().is_success());

    let history: Value = player
        .get("/api/history")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["current_streak"], 1);
    assert_eq!(history["calendar"].as_array().unwrap().len(), 12);
    let timeline = history["timeline"].as_array().unwrap();
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0]["entries"][0]["name"], stat.name.as_str());

    let bad = player
        .get("/api/heatmap?start=2026-02-10&end=2026-02-01")
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_leaderboard_ranks_accounts_and_hides_guests() {
    let server = spawn_server().await;
    let scores = [("alpha", 3usize), ("bravo", 1), ("charlie", 2)];
    for (user, completions) in scores {
        let player = Player::account(&server, user.to_string());
        let dashboard = player.onboard().await;
        for stat in dashboard.stats.iter().take(completions) {
            assert!(player.complete(&stat.id).await.status().is_success());
        }
    }

    let viewer = Player::account(&server, "alpha".to_string());
    let board: Vec<LeaderboardEntry> = viewer
        .get("/api/leaderboard?limit=3")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ranked: Vec<(&str, u64)> = board
        .iter()
        .map(|entry| (entry.user_id.as_str(), entry.total_xp))
        .collect();
    assert_eq!(ranked, vec![("alpha", 3), ("charlie", 2), ("bravo", 1)]);
    assert_eq!(board[0].title, "New Traveler");

    let guest = Player::guest(&server).await;
    let board: Vec<LeaderboardEntry> = guest
        .get("/api/leaderboard")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(board.is_empty());
}

#[tokio::test]
async fn http_ending_guest_session_discards_it() {
    let server = shared_server().await;
    let player = Player::guest(&server).await;
    player.onboard().await;

    let response = player.delete("/api/session").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = player.get("/api/dashboard").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn http_reset_zeroes_progress() {
    let server = shared_server().await;
    let player = Player::account(&server, unique_user("reset"));
    let dashboard = player.onboard().await;
    assert!(player.complete(&dashboard.stats[0].id).await.status().is_success());

    let dashboard: Dashboard = player
        .post("/api/reset")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dashboard.progress.total_xp, 0);
    assert_eq!(dashboard.stats.len(), 3);
    assert!(dashboard.stats.iter().all(|stat| stat.can_complete));
    assert!(dashboard.stats.iter().all(|stat| !stat.name.is_empty()));
}

#[tokio::test]
async fn http_offset_header_selects_the_callers_day() {
    let server = shared_server().await;
    let player = Player::account(&server, unique_user("offset"));
    let dashboard = player.onboard().await;
    let stat_id = &dashboard.stats[0].id;
    let path = format!("/api/stats/{stat_id}/complete");

    // +14:00 and -12:00 are 26 hours apart, so they never share a calendar day.
    let ahead = player
        .post(&path)
        .header("x-utc-offset-minutes", "840")
        .send()
        .await
        .unwrap();
    assert!(ahead.status().is_success());
    let behind = player
        .post(&path)
        .header("x-utc-offset-minutes", "-720")
        .send()
        .await
        .unwrap();
    assert!(behind.status().is_success());
    let again = player
        .post(&path)
        .header("x-utc-offset-minutes", "840")
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let malformed = player
        .get("/api/dashboard")
        .header("x-utc-offset-minutes", "east")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    assert_eq!(player.dashboard().await.progress.total_xp, 2);
}

#[tokio::test]
async fn http_heatmap_counts_completed_days() {
    let server = shared_server().await;
    let player = Player::guest(&server).await;
    let dashboard = player.onboard().await;
    for stat in dashboard.stats.iter().take(2) {
        let response = player
            .post(&format!("/api/stats/{}/complete", stat.id))
            .header("x-utc-offset-minutes", "0")
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
    }

    let history: Value = player
        .get("/api/history")
        .header("x-utc-offset-minutes", "0")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let today = history["today"].as_str().unwrap().to_string();

    let map: Vec<Value> = player
        .get(&format!("/api/heatmap?start={today}&end={today}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map[0]["day"], today.as_str());
    assert_eq!(map[0]["count"], 2);

    let overflow = player
        .get("/api/heatmap?start=%2B262142-12-31&end=%2B262142-12-31")
        .send()
        .await
        .unwrap();
    assert_eq!(overflow.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_patch_edits_stat_but_keeps_points() {
    let server = shared_server().await;
    let player = Player::account(&server, unique_user("patch"));
    let dashboard = player.onboard().await;
    let stat_id = dashboard.stats[0].id.clone();
    assert!(player.complete(&stat_id).await.status().is_success());

    let response = player
        .patch(&format!("/api/stats/{stat_id}"))
        .json(&json!({ "name": "Lifting", "emoji": "🏋️" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["name"], "Lifting");
    assert_eq!(body["total_points"], 1);

    let blank = player
        .patch(&format!("/api/stats/{stat_id}"))
        .json(&json!({ "name": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let missing = player
        .patch("/api/stats/no-such-stat")
        .json(&json!({ "name": "Ghost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let stats = player.dashboard().await.stats;
    assert_eq!(stats[0].name, "Lifting");
}

#[tokio::test]
async fn http_mirror_can_be_connected_and_cleared() {
    let server = shared_server().await;
    let player = Player::account(&server, unique_user("mirror"));
    player.onboard().await;
    assert!(!player.dashboard().await.mirror_connected);

    let incomplete = player
        .put("/api/mirror")
        .json(&json!({ "token": "", "owner": "octo", "repo": "habits" }))
        .send()
        .await
        .unwrap();
    assert_eq!(incomplete.status(), StatusCode::BAD_REQUEST);

    let response = player
        .put("/api/mirror")
        .json(&json!({ "token": "ghp_test", "owner": "octo", "repo": "habits" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(player.dashboard().await.mirror_connected);

    let response = player.delete("/api/mirror").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!player.dashboard().await.mirror_connected);
}

#[tokio::test]
async fn http_feedback_is_accepted_from_guests_and_accounts() {
    let server = shared_server().await;
    let account = Player::account(&server, unique_user("feedback"));
    let response = account
        .post("/api/feedback")
        .json(&json!({ "category": "bug", "message": "streak froze", "email": "a@b.io" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["category"], "bug");
    assert!(body["user_id"].as_str().unwrap().starts_with("feedback-"));

    let guest = Player::guest(&server).await;
    let response = guest
        .post("/api/feedback")
        .json(&json!({ "message": "more colors" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["category"], "feature");
    assert!(body["user_id"].is_null());

    let empty = guest
        .post("/api/feedback")
        .json(&json!({ "message": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
}
