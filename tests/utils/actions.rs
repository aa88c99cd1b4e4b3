use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use tower::ServiceExt; // for `oneshot`
use uuid::Uuid;

use forum::RoomRepository;

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Send a request through a fresh clone of the router
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, cookie: Option<&str>, form: &[(&str, &str)]) -> Response {
        let body = form
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    /// Registers a user and returns the session cookie header value
    pub async fn register(&self, username: &str, password: &str) -> String {
        let response = self
            .post_form(
                "/register/",
                None,
                &[
                    ("username", username),
                    ("password1", password),
                    ("password2", password),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "registration failed");
        session_cookie_from(&response)
    }

    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.post_form(
            "/login/",
            None,
            &[("username", username), ("password", password)],
        )
        .await
    }

    /// Creates a room as `username` and returns its id
    pub async fn create_room(&self, username: &str, name: &str, topic: &str, description: &str) -> Uuid {
        let response = self
            .post_form(
                "/create-room/",
                Some(self.cookie(username)),
                &[("name", name), ("topic", topic), ("description", description)],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "room creation failed");

        self.rooms
            .search_rooms(name, &[])
            .await
            .unwrap()
            .into_iter()
            .find(|room| room.name == name)
            .map(|room| room.id)
            .unwrap()
    }

    pub async fn post_message(&self, username: &str, room_id: Uuid, body: &str) -> Response {
        self.post_form(
            &format!("/room/{}", room_id),
            Some(self.cookie(username)),
            &[("body", body)],
        )
        .await
    }
}

/// `name=value` part of the session Set-Cookie header
pub fn session_cookie_from(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response should set the session cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}
