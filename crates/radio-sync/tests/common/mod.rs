#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// A few silent MPEG-1 Layer III frames (128 kbit/s, 44.1 kHz).
pub fn silent_mp3() -> Vec<u8> {
    let mut frame = vec![0u8; 417];
    frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
    frame.repeat(8)
}

/// Served for `/media/html*`: a successful response that is not audio.
pub const NOT_AUDIO: &[u8] = b"<html><body>Episode moved</body></html>";

/// In-process stand-in for a station's schedule API and media CDN.
pub struct MockStation {
    pub base_url: String,
    state: Arc<MockState>,
}

struct MockState {
    upcoming: Mutex<Value>,
    show: Mutex<Value>,
    audio: Vec<u8>,
    keys: Mutex<Vec<String>>,
    show_ids: Mutex<Vec<String>>,
    upcoming_hits: AtomicUsize,
    show_hits: AtomicUsize,
    media_hits: AtomicUsize,
}

impl MockStation {
    pub async fn spawn(upcoming_body: Value, show_body: Value) -> Self {
        let state = Arc::new(MockState {
            upcoming: Mutex::new(upcoming_body),
            show: Mutex::new(show_body),
            audio: silent_mp3(),
            keys: Mutex::new(Vec::new()),
            show_ids: Mutex::new(Vec::new()),
            upcoming_hits: AtomicUsize::new(0),
            show_hits: AtomicUsize::new(0),
            media_hits: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/api/broadcasts/upcoming", get(upcoming_broadcasts))
            .route("/api/show/:id", get(show_detail))
            .route("/media/:name", get(media))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock station");
        let addr = listener.local_addr().expect("mock station has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock station crashed");
        });

        Self {
            base_url: format!("http://{addr}/"),
            state,
        }
    }

    pub fn media_url(&self, name: &str) -> String {
        format!("{}media/{}", self.base_url, name)
    }

    pub fn set_upcoming(&self, upcoming: Value) {
        *self.state.upcoming.lock().unwrap() = upcoming;
    }

    pub fn keys_seen(&self) -> Vec<String> {
        self.state.keys.lock().unwrap().clone()
    }

    pub fn show_ids_seen(&self) -> Vec<String> {
        self.state.show_ids.lock().unwrap().clone()
    }

    pub fn upcoming_hits(&self) -> usize {
        self.state.upcoming_hits.load(Ordering::SeqCst)
    }

    pub fn show_hits(&self) -> usize {
        self.state.show_hits.load(Ordering::SeqCst)
    }

    pub fn media_hits(&self) -> usize {
        self.state.media_hits.load(Ordering::SeqCst)
    }

    pub fn audio(&self) -> &[u8] {
        &self.state.audio
    }
}

async fn upcoming_broadcasts(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    state.upcoming_hits.fetch_add(1, Ordering::SeqCst);
    if let Some(key) = params.get("key") {
        state.keys.lock().unwrap().push(key.clone());
    }
    Json(state.upcoming.lock().unwrap().clone())
}

async fn show_detail(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
) -> Json<Value> {
    state.show_hits.fetch_add(1, Ordering::SeqCst);
    state.show_ids.lock().unwrap().push(id);
    Json(state.show.lock().unwrap().clone())
}

async fn media(
    State(state): State<Arc<MockState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    state.media_hits.fetch_add(1, Ordering::SeqCst);
    if name.starts_with("missing") {
        return (StatusCode::NOT_FOUND, Vec::new());
    }
    if name.starts_with("html") {
        return (StatusCode::OK, NOT_AUDIO.to_vec());
    }
    (StatusCode::OK, state.audio.clone())
}

pub fn broadcast(start: &str, title: &str, media: Value) -> Value {
    json!({
        "start": start,
        "show_id": "17",
        "title": title,
        "media": media,
    })
}

pub fn morning_drive() -> Value {
    json!({
        "title": "Morning Drive",
        "short_name": "morning",
        "hosts": [{"display_name": "Alice"}, {"display_name": "Bob"}],
    })
}
