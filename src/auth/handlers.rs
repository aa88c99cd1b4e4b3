use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, instrument};

use super::{
    service::AuthService,
    types::{safe_next, LoginForm, NextQuery, RegisterForm, UpdateUserForm},
};
use crate::render::Page;
use crate::session::{expired_session_cookie, session_cookie, CurrentUser};
use crate::shared::{AppError, AppState};

const LOGIN_FAILED: &str = "Invalid username or password.";
const REGISTER_FAILED: &str = "Invalid data...";

fn auth_page(
    state: &AppState,
    page: &str,
    next: &str,
    username: &str,
    flash: &[String],
) -> Result<Response, AppError> {
    let html = state.templates.render(
        "login_registration.html",
        Page::new(None)
            .with("page", page)
            .with("next", next)
            .with("username", username)
            .flash(flash),
    )?;
    Ok(html.into_response())
}

/// GET /login/
#[instrument(skip(state, current_user))]
pub async fn login_page(
    State(state): State<AppState>,
    current_user: Option<CurrentUser>,
    Query(query): Query<NextQuery>,
) -> Result<Response, AppError> {
    if current_user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    auth_page(&state, "login", &query.next, "", &[])
}

/// POST /login/
#[instrument(skip(state, current_user, jar, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    current_user: Option<CurrentUser>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if current_user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let service = AuthService::from_state(&state);
    match service.authenticate(&form.username, &form.password).await? {
        Some(user) => {
            let token = state.session_service.start_session(&user).await?;
            info!(user_id = %user.id, "User logged in");

            let jar = jar.add(session_cookie(token, state.secure_cookies));
            Ok((jar, Redirect::to(safe_next(&form.next))).into_response())
        }
        None => auth_page(
            &state,
            "login",
            &form.next,
            &form.username,
            &[LOGIN_FAILED.to_string()],
        ),
    }
}

/// GET /register/
#[instrument(skip(state))]
pub async fn register_page(State(state): State<AppState>) -> Result<Response, AppError> {
    auth_page(&state, "register", "", "", &[])
}

/// POST /register/ - creates the account and logs it in
#[instrument(skip(state, jar, form), fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let service = AuthService::from_state(&state);
    match service.register(&form).await {
        Ok(user) => {
            let token = state.session_service.start_session(&user).await?;
            let jar = jar.add(session_cookie(token, state.secure_cookies));
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(AppError::Validation(errors)) => {
            let mut flash = vec![REGISTER_FAILED.to_string()];
            flash.extend(errors);
            auth_page(&state, "register", "", &form.username, &flash)
        }
        Err(e) => Err(e),
    }
}

/// GET|POST /logout/
#[instrument(skip(state, jar), fields(user_id = %current_user.id))]
pub async fn logout(
    State(state): State<AppState>,
    current_user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    state
        .session_service
        .revoke_session(current_user.session_id)
        .await?;
    info!("User logged out");

    Ok((jar.remove(expired_session_cookie()), Redirect::to("/")).into_response())
}

/// GET /update-user/
#[instrument(skip(state), fields(user_id = %current_user.id))]
pub async fn update_user_page(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Response, AppError> {
    let html = state.templates.render(
        "update_user.html",
        Page::new(Some(&current_user)).with("username", &current_user.username),
    )?;
    Ok(html.into_response())
}

/// POST /update-user/
#[instrument(skip(state, form), fields(user_id = %current_user.id))]
pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Form(form): Form<UpdateUserForm>,
) -> Result<Response, AppError> {
    let service = AuthService::from_state(&state);
    match service.update_username(current_user.id, &form.username).await {
        Ok(()) => Ok(Redirect::to(&format!("/profile/{}", current_user.id)).into_response()),
        Err(AppError::Validation(errors)) => {
            let html = state.templates.render(
                "update_user.html",
                Page::new(Some(&current_user))
                    .with("username", &form.username)
                    .flash(&errors),
            )?;
            Ok(html.into_response())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use crate::shared::test_utils::{seed_user, session_cookie, AppStateBuilder};
    use crate::user::repository::{InMemoryUserRepository, UserRepository};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`

    fn form_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    fn location(response: &axum::response::Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    #[tokio::test]
    async fn test_register_logs_in_and_redirects_home() {
        let users = Arc::new(InMemoryUserRepository::new());
        let state = AppStateBuilder::new()
            .with_user_repository(users.clone())
            .build();
        let app = crate::router(state);

        let response = app
            .oneshot(form_post(
                "/register/",
                "username=Alice&password1=correct-horse&password2=correct-horse",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("forum_session="));
        assert!(cookie.contains("HttpOnly"));

        let stored = users.get_user_by_username("alice").await.unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn test_register_invalid_rerenders_with_errors() {
        let state = AppStateBuilder::new().build();
        let app = crate::router(state);

        let response = app
            .oneshot(form_post(
                "/register/",
                "username=alice&password1=correct-horse&password2=different-horse",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Invalid data..."));
        assert!(body.contains("didn&#x27;t match"));
    }

    #[tokio::test]
    async fn test_login_honours_next() {
        let state = AppStateBuilder::new().build();
        seed_user(&state, "alice").await;
        let app = crate::router(state);

        let response = app
            .oneshot(form_post(
                "/login/",
                "username=ALICE&password=correct-horse&next=%2Fcreate-room%2F",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/create-room/");
        assert!(response.headers().contains_key(header::SET_COOKIE));
    }

    #[tokio::test]
    async fn test_login_wrong_password_flashes() {
        let state = AppStateBuilder::new().build();
        seed_user(&state, "alice").await;
        let app = crate::router(state);

        let response = app
            .oneshot(form_post("/login/", "username=alice&password=nope"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key(header::SET_COOKIE));
        assert!(body_text(response).await.contains("Invalid username or password."));
    }

    #[tokio::test]
    async fn test_login_page_redirects_when_logged_in() {
        let state = AppStateBuilder::new().build();
        let alice = seed_user(&state, "alice").await;
        let cookie = session_cookie(&state, &alice).await;
        let app = crate::router(state);

        let request = Request::builder()
            .uri("/login/")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_logout_revokes_session() {
        let state = AppStateBuilder::new().build();
        let alice = seed_user(&state, "alice").await;
        let cookie = session_cookie(&state, &alice).await;
        let token = cookie.trim_start_matches("forum_session=").to_string();

        let request = Request::builder()
            .uri("/logout/")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let response = crate::router(state.clone()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(state.session_service.validate_session(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_update_user_requires_login() {
        let state = AppStateBuilder::new().build();
        let app = crate::router(state);

        let request = Request::builder()
            .uri("/update-user/")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login/?next=/update-user/");
    }

    #[tokio::test]
    async fn test_update_user_renames() {
        let state = AppStateBuilder::new().build();
        let alice = seed_user(&state, "alice").await;
        let cookie = session_cookie(&state, &alice).await;

        let mut request = form_post("/update-user/", "username=Alicia");
        request
            .headers_mut()
            .insert(header::COOKIE, cookie.parse().unwrap());
        let response = crate::router(state.clone()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), format!("/profile/{}", alice.id));
        let stored = state.user_repository.get_user(alice.id).await.unwrap().unwrap();
        assert_eq!(stored.username, "alicia");
    }
}
