use crate::infra::AppState;
use crate::pages;
use admitdesk::admissions::auth;
use admitdesk::admissions::domain::Identity;
use admitdesk::admissions::forms::{signup_conflict, FormErrors, LoginForm, SignupForm};
use admitdesk::admissions::IdentityStore;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

pub(crate) fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login_form).post(login_submit))
        .route("/signup", get(signup_form).post(signup_submit))
        .route("/logout", get(logout))
        .route("/dashboard", get(dashboard))
        .route("/leads", get(leads))
        .route("/applications", get(applications))
        .route("/exams", get(exams))
        .route("/finance", get(finance))
        .route("/settings", get(settings))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct LoginQuery {
    next: Option<String>,
    created: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct LoginSubmission {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    /// Checkbox: present ("on") when ticked, absent otherwise.
    remember_me: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct SignupSubmission {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password1: String,
    #[serde(default)]
    password2: String,
}

/// Only same-site paths are honored as post-login destinations.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(next) if next.starts_with('/') && !next.starts_with("//") => next,
        _ => "/dashboard",
    }
}

fn authenticated(state: &AppState, headers: &HeaderMap) -> Option<Identity> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    let token = auth::token_from_cookie_header(cookies)?;
    let identity_id = state.sessions.resolve(&token, Utc::now())?;
    state.store.identity(identity_id).ok().flatten()
}

/// Session guard for the named pages: render for an authenticated visitor,
/// otherwise bounce to the login form with the destination preserved.
fn guarded(state: &AppState, headers: &HeaderMap, destination: &str, title: &str) -> Response {
    match authenticated(state, headers) {
        Some(identity) => Html(pages::named(title, &identity.username)).into_response(),
        None => Redirect::to(&format!("/login?next={destination}")).into_response(),
    }
}

pub(crate) async fn home() -> Html<String> {
    Html(pages::home())
}

pub(crate) async fn login_form(Query(query): Query<LoginQuery>) -> Html<String> {
    let notice = query
        .created
        .is_some()
        .then_some("Account created successfully! Please login with your credentials.");
    Html(pages::login(
        &FormErrors::default(),
        notice,
        query.next.as_deref(),
    ))
}

pub(crate) async fn login_submit(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    Form(submission): Form<LoginSubmission>,
) -> Response {
    let form = LoginForm {
        username: submission.username,
        password: submission.password,
        remember_me: submission.remember_me.is_some(),
    };
    match form.validate(&*state.store) {
        Ok(verified) => {
            let session = state.sessions.establish_session(
                verified.identity.id,
                verified.remember_me,
                Utc::now(),
            );
            info!(username = %verified.identity.username, persistent = verified.remember_me, "login");
            (
                StatusCode::SEE_OTHER,
                [
                    (header::SET_COOKIE, session.cookie()),
                    (
                        header::LOCATION,
                        safe_next(query.next.as_deref()).to_string(),
                    ),
                ],
            )
                .into_response()
        }
        Err(errors) => Html(pages::login(&errors, None, query.next.as_deref())).into_response(),
    }
}

pub(crate) async fn signup_form() -> Html<String> {
    Html(pages::signup(&FormErrors::default()))
}

pub(crate) async fn signup_submit(
    State(state): State<AppState>,
    Form(submission): Form<SignupSubmission>,
) -> Response {
    let form = SignupForm {
        username: submission.username,
        email: submission.email,
        password1: submission.password1,
        password2: submission.password2,
    };
    let cleaned = match form.validate(&*state.store) {
        Ok(cleaned) => cleaned,
        Err(errors) => return Html(pages::signup(&errors)).into_response(),
    };
    match auth::register(&*state.store, cleaned) {
        Ok(identity) => {
            info!(username = %identity.username, "account created");
            Redirect::to("/login?created=1").into_response()
        }
        // A concurrent signup won the uniqueness race at commit; report it
        // exactly like the validation-layer duplicate.
        Err(conflict) => Html(pages::signup(&signup_conflict(conflict))).into_response(),
    }
}

pub(crate) async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(auth::token_from_cookie_header)
    {
        state.sessions.end_session(&token);
    }
    (
        StatusCode::SEE_OTHER,
        [
            (header::SET_COOKIE, auth::clear_session_cookie()),
            (header::LOCATION, "/login".to_string()),
        ],
    )
        .into_response()
}

pub(crate) async fn dashboard(State(state): State<AppState>, headers: HeaderMap) -> Response {
    guarded(&state, &headers, "/dashboard", "Dashboard")
}

pub(crate) async fn leads(State(state): State<AppState>, headers: HeaderMap) -> Response {
    guarded(&state, &headers, "/leads", "Leads")
}

pub(crate) async fn applications(State(state): State<AppState>, headers: HeaderMap) -> Response {
    guarded(&state, &headers, "/applications", "Applications")
}

pub(crate) async fn exams(State(state): State<AppState>, headers: HeaderMap) -> Response {
    guarded(&state, &headers, "/exams", "Exams")
}

pub(crate) async fn finance(State(state): State<AppState>, headers: HeaderMap) -> Response {
    guarded(&state, &headers, "/finance", "Finance")
}

pub(crate) async fn settings(State(state): State<AppState>, headers: HeaderMap) -> Response {
    guarded(&state, &headers, "/settings", "Settings")
}

pub(crate) async fn healthcheck() -> axum::Json<serde_json::Value> {
    axum::Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, axum::Json(payload))
}

pub(crate) async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use admitdesk::admissions::forms::ValidatedSignup;
    use admitdesk::config::SessionConfig;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn test_state() -> AppState {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        AppState::new(
            &SessionConfig {
                session_ttl_hours: 336,
            },
            Arc::new(handle),
        )
    }

    fn seeded_state() -> AppState {
        let state = test_state();
        auth::register(
            &*state.store,
            ValidatedSignup {
                username: "anita".to_string(),
                email: "anita@admissions.edu".to_string(),
                password: "Adm1t!desk".to_string(),
            },
        )
        .expect("identity seeds");
        state
    }

    fn login_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/login?next=/leads")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let response = app_router(test_state())
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_page_redirects_anonymous_visitor_with_destination() {
        let response = app_router(test_state())
            .oneshot(
                Request::builder()
                    .uri("/finance")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/login?next=/finance")
        );
    }

    #[tokio::test]
    async fn login_sets_cookie_and_honors_next_target() {
        let state = seeded_state();
        let response = app_router(state.clone())
            .oneshot(login_request(
                "username=anita&password=Adm1t!desk&remember_me=on",
            ))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/leads")
        );

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .expect("session cookie issued");
        assert!(cookie.starts_with(auth::SESSION_COOKIE));
        // remember_me=on carries the persistent expiry.
        assert!(cookie.contains("Max-Age"));

        let session_pair = cookie.split(';').next().expect("cookie pair");
        let page = app_router(state)
            .oneshot(
                Request::builder()
                    .uri("/leads")
                    .header(header::COOKIE, session_pair)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(page.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn browser_session_login_omits_max_age() {
        let state = seeded_state();
        let response = app_router(state)
            .oneshot(login_request("username=anita&password=Adm1t!desk"))
            .await
            .expect("router responds");
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .expect("session cookie issued");
        assert!(!cookie.contains("Max-Age"));
    }

    #[tokio::test]
    async fn failed_login_rerenders_form() {
        let state = seeded_state();
        let response = app_router(state)
            .oneshot(login_request("username=anita&password=wrong"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn logout_clears_cookie_and_redirects_to_login() {
        let response = app_router(test_state())
            .oneshot(
                Request::builder()
                    .uri("/logout")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/login")
        );
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .expect("clearing cookie issued");
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn open_redirects_are_not_honored() {
        assert_eq!(safe_next(Some("https://evil.example")), "/dashboard");
        assert_eq!(safe_next(Some("//evil.example")), "/dashboard");
        assert_eq!(safe_next(Some("/settings")), "/settings");
        assert_eq!(safe_next(None), "/dashboard");
    }
}
