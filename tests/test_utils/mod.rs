//! Shared fixtures for the integration tests
#![allow(dead_code)]
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use echo::client::{ApiClient, TokenStore};

/// A client against `url` whose tokens live only in memory.
pub fn test_client(url: &str) -> Arc<ApiClient> {
    Arc::new(ApiClient::new(url, TokenStore::in_memory()))
}

pub fn token_body(access: &str, refresh: &str) -> String {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer",
        "expires_in": 1800,
        "user": user_json()
    })
    .to_string()
}

pub fn user_json() -> Value {
    json!({
        "id": "5b0c3c1e-8f5a-4a8e-9a43-0f6f3c2d7b11",
        "email": "learner@example.com",
        "name": "Ada Learner",
        "level": "resident",
        "specialty_interest": "pediatrics",
        "institution": "General Hospital",
        "created_at": "2025-01-02T10:00:00",
        "last_active": "2025-01-28T09:30:00",
        "preferences": {}
    })
}

pub fn case_state_json(session_id: &str, phase: &str) -> Value {
    json!({
        "session_id": session_id,
        "phase": phase,
        "patient": {
            "name": "Jane",
            "age": 4,
            "age_unit": "years",
            "sex": "female",
            "weight_kg": 16.0,
            "chief_complaint": "fever",
            "parent_name": "Maria",
            "parent_style": "anxious",
            "condition_key": "aom",
            "condition_display": "Acute Otitis Media",
            "symptoms": ["fever", "ear pulling"],
            "vitals": {"temp_c": 38.9},
            "exam_findings": []
        },
        "learner_level": "student",
        "visit_type": "sick",
        "history_gathered": [],
        "exam_performed": [],
        "differential": [],
        "plan_proposed": [],
        "hints_given": 0,
        "teaching_moments": [],
        "started_at": "2025-01-28T09:30:00.123456",
        "conversation": []
    })
}

pub fn case_response_body(message: &str, session_id: &str, phase: &str) -> String {
    json!({
        "message": message,
        "case_state": case_state_json(session_id, phase),
        "teaching_moment": null,
        "debrief": null,
        "hint_offered": false,
        "images": []
    })
    .to_string()
}

/// A canned reply served by `serve_routes`.
pub struct Route {
    path: &'static str,
    body_contains: Option<&'static str>,
    delay: Duration,
    // `None` closes the connection without answering
    reply: Option<(u16, String)>,
}

impl Route {
    pub fn new(path: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self {
            path,
            body_contains: None,
            delay: Duration::ZERO,
            reply: Some((status, body.into())),
        }
    }

    /// Drop the connection after reading the request.
    pub fn hang_up(path: &'static str) -> Self {
        Self {
            path,
            body_contains: None,
            delay: Duration::ZERO,
            reply: None,
        }
    }

    /// Only match requests whose body contains `needle`.
    pub fn matching(mut self, needle: &'static str) -> Self {
        self.body_contains = Some(needle);
        self
    }

    pub fn delayed(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }

    fn matches(&self, path: &str, body: &str) -> bool {
        self.path == path && self.body_contains.is_none_or(|needle| body.contains(needle))
    }
}

/// Serve `routes` on a local port, first match wins. Unlike mockito
/// each reply can be held back so responses land out of order.
pub async fn serve_routes(routes: Vec<Route>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = Arc::new(routes);

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let routes = Arc::clone(&routes);
            tokio::spawn(async move {
                let Ok((path, body)) = read_request(&mut stream).await else {
                    return;
                };
                let Some(route) = routes.iter().find(|r| r.matches(&path, &body)) else {
                    let _ = stream.write_all(&http_response(404, "")).await;
                    return;
                };
                tokio::time::sleep(route.delay).await;
                if let Some((status, reply)) = &route.reply {
                    let _ = stream.write_all(&http_response(*status, reply)).await;
                    let _ = stream.shutdown().await;
                }
            });
        }
    });

    format!("http://{}", addr)
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<(String, String)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    Ok((path, body))
}

fn http_response(status: u16, body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 {} Scripted\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
    .into_bytes()
}
