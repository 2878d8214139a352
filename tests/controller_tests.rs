use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dashauth::{
    epoch_millis, ActivityKind, AuthApi, AuthError, MemoryPersist, Navigator, Notice, Notifier,
    Route, SessionController, SessionOptions, SessionPersist, SessionState, SessionStore, User,
};

/// Records navigation and notices so tests can assert on side effects
#[derive(Default)]
struct Recording {
    routes: Mutex<Vec<Route>>,
    notices: Mutex<Vec<Notice>>,
}

impl Navigator for Recording {
    fn navigate_to(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

impl Notifier for Recording {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

impl Recording {
    fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }

    fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

fn build_controller(
    server: &MockServer,
    persist: Arc<MemoryPersist>,
    options: SessionOptions,
) -> (SessionController, Arc<Recording>) {
    let recording = Arc::new(Recording::default());
    let api = AuthApi::new(&server.uri());
    let store = SessionStore::new(persist);
    let controller = SessionController::new(
        api,
        store,
        recording.clone(),
        recording.clone(),
        options,
    );
    (controller, recording)
}

fn login_ok_body() -> serde_json::Value {
    json!({
        "user": {
            "id": "u1",
            "name": "A",
            "email": "a@b.com",
            "role": "admin",
            "permissions": ["items:read"]
        },
        "accessToken": "x",
        "refreshToken": "y"
    })
}

fn authenticated_state(access_expiry: i64, refresh_expiry: i64) -> SessionState {
    SessionState {
        user: Some(User {
            id: "u1".into(),
            name: "A".into(),
            email: "a@b.com".into(),
            role: "admin".into(),
            permissions: vec![],
        }),
        access_token: Some("x".into()),
        refresh_token: Some("y".into()),
        access_token_expiry: Some(access_expiry),
        refresh_token_expiry: Some(refresh_expiry),
        is_authenticated: true,
        last_activity: Some(epoch_millis()),
    }
}

#[tokio::test]
async fn login_synthesizes_default_expiries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_ok_body()))
        .mount(&server)
        .await;

    let (controller, recording) =
        build_controller(&server, Arc::new(MemoryPersist::new()), SessionOptions::default());

    controller.login("a@b.com", "longenough1").await.unwrap();

    assert!(controller.is_authenticated());
    assert_eq!(controller.current_user().unwrap().name, "A");

    let state = controller.session_state();
    let now = epoch_millis();
    let access_expiry = state.access_token_expiry.unwrap();
    let refresh_expiry = state.refresh_token_expiry.unwrap();
    assert!((access_expiry - (now + 86_400_000)).abs() < 10_000);
    assert!((refresh_expiry - (now + 604_800_000)).abs() < 10_000);

    assert!(controller.has_pending_refresh());
    assert_eq!(recording.routes(), vec![Route::Dashboard]);
    assert!(recording
        .notices()
        .contains(&Notice::LoggedIn { name: "A".into() }));
}

#[tokio::test]
async fn login_without_user_name_fails_closed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {},
            "accessToken": "x",
            "refreshToken": "y"
        })))
        .mount(&server)
        .await;

    let (controller, recording) =
        build_controller(&server, Arc::new(MemoryPersist::new()), SessionOptions::default());

    let err = controller.login("a@b.com", "longenough1").await.unwrap_err();

    assert!(matches!(err, AuthError::MalformedResponse(_)));
    assert!(!controller.is_authenticated());
    assert!(!controller.has_pending_refresh());
    assert!(recording.routes().is_empty());
    assert!(recording
        .notices()
        .iter()
        .any(|n| matches!(n, Notice::LoginFailed(_))));
}

#[tokio::test]
async fn login_rate_limit_is_surfaced_distinctly() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({"message": "too many requests"})),
        )
        .mount(&server)
        .await;

    let (controller, recording) =
        build_controller(&server, Arc::new(MemoryPersist::new()), SessionOptions::default());

    let err = controller.login("a@b.com", "longenough1").await.unwrap_err();

    assert!(matches!(err, AuthError::RateLimited));
    assert!(!controller.is_authenticated());
    assert!(recording.notices().contains(&Notice::RateLimited));
}

#[tokio::test]
async fn login_surfaces_server_message_on_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "account disabled"})),
        )
        .mount(&server)
        .await;

    let (controller, _recording) =
        build_controller(&server, Arc::new(MemoryPersist::new()), SessionOptions::default());

    let err = controller.login("a@b.com", "longenough1").await.unwrap_err();

    match err {
        AuthError::InvalidCredentials(msg) => assert_eq!(msg, "account disabled"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn resume_with_expired_refresh_token_forces_logout_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let persist = Arc::new(MemoryPersist::new());
    let now = epoch_millis();
    persist
        .save(&authenticated_state(now - 10_000, now - 5_000))
        .unwrap();

    let (controller, recording) =
        build_controller(&server, persist, SessionOptions::default());

    controller.resume();

    assert!(!controller.is_authenticated());
    assert!(!controller.has_pending_refresh());
    assert_eq!(recording.routes(), vec![Route::Login]);
    assert!(recording.notices().contains(&Notice::SessionExpired));
}

#[tokio::test]
async fn scheduler_forces_logout_when_refresh_token_expired() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let persist = Arc::new(MemoryPersist::new());
    let now = epoch_millis();
    persist
        .save(&authenticated_state(now + 60_000, now - 5_000))
        .unwrap();

    let (controller, recording) =
        build_controller(&server, persist, SessionOptions::default());

    controller.schedule_refresh();

    assert!(!controller.is_authenticated());
    assert!(!controller.has_pending_refresh());
    assert_eq!(recording.routes(), vec![Route::Login]);
    assert!(recording.notices().contains(&Notice::SessionExpired));
}

#[tokio::test]
async fn idle_session_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_ok_body()))
        .mount(&server)
        .await;

    let options = SessionOptions::default()
        .with_inactivity_timeout(Duration::from_millis(200))
        .with_inactivity_check_interval(Duration::from_millis(50));
    let (controller, recording) =
        build_controller(&server, Arc::new(MemoryPersist::new()), options);

    controller.login("a@b.com", "longenough1").await.unwrap();
    assert!(controller.is_authenticated());

    // no activity at all, let the check interval catch the idle session
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(!controller.is_authenticated());
    assert!(!controller.has_pending_refresh());
    assert_eq!(recording.routes(), vec![Route::Dashboard, Route::Login]);
    assert!(recording.notices().contains(&Notice::SessionExpired));
}

#[tokio::test]
async fn activity_keeps_the_session_alive() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_ok_body()))
        .mount(&server)
        .await;

    let options = SessionOptions::default()
        .with_inactivity_timeout(Duration::from_millis(300))
        .with_inactivity_check_interval(Duration::from_millis(50))
        .with_activity_debounce(Duration::from_millis(10));
    let (controller, _recording) =
        build_controller(&server, Arc::new(MemoryPersist::new()), options);

    controller.login("a@b.com", "longenough1").await.unwrap();
    let tracker = controller.activity_tracker();

    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(80)).await;
        tracker.touch(ActivityKind::PointerDown);
    }

    assert!(controller.is_authenticated());
}

#[tokio::test]
async fn register_without_tokens_redirects_to_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "_id": "u9",
            "name": "New User",
            "email": "n@b.com",
            "role": "staff"
        })))
        .mount(&server)
        .await;

    let (controller, recording) =
        build_controller(&server, Arc::new(MemoryPersist::new()), SessionOptions::default());

    controller
        .register("New User", "n@b.com", "longenough1", "staff")
        .await
        .unwrap();

    assert!(!controller.is_authenticated());
    assert!(!controller.has_pending_refresh());
    assert_eq!(recording.routes(), vec![Route::Login]);
    assert!(recording.notices().contains(&Notice::VerificationPending));
}

#[tokio::test]
async fn register_with_tokens_auto_logs_in() {
    let server = MockServer::start().await;
    let now = epoch_millis();
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "_id": "u9",
            "name": "New User",
            "email": "n@b.com",
            "role": "staff",
            "accessToken": "x",
            "refreshToken": "y"
        })))
        .mount(&server)
        .await;
    // register passes expiries through verbatim; with none recorded the
    // scheduler refreshes immediately and learns the real lifetimes
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "x2",
            "refreshToken": "y2",
            "accessTokenExpiry": now + 3_600_000,
            "refreshTokenExpiry": now + 7_200_000
        })))
        .mount(&server)
        .await;

    let (controller, recording) =
        build_controller(&server, Arc::new(MemoryPersist::new()), SessionOptions::default());

    controller
        .register("New User", "n@b.com", "longenough1", "staff")
        .await
        .unwrap();

    assert!(controller.is_authenticated());
    assert_eq!(recording.routes(), vec![Route::Dashboard]);

    tokio::time::sleep(Duration::from_millis(400)).await;

    // the unrecorded expiries must not read as a dead refresh token: the
    // session survives, no teardown fires
    assert!(controller.is_authenticated());
    assert!(!recording.notices().contains(&Notice::SessionExpired));
    assert_eq!(recording.routes(), vec![Route::Dashboard]);
    let state = controller.session_state();
    assert_eq!(state.access_token.as_deref(), Some("x2"));
    assert!(state.access_token_expiry.is_some());
    assert!(controller.has_pending_refresh());
}

#[tokio::test]
async fn manual_refresh_with_unrecorded_expiry_asks_the_backend() {
    let server = MockServer::start().await;
    let now = epoch_millis();
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "x2",
            "refreshToken": "y2",
            "accessTokenExpiry": now + 3_600_000,
            "refreshTokenExpiry": now + 7_200_000
        })))
        .mount(&server)
        .await;

    let persist = Arc::new(MemoryPersist::new());
    let mut state = authenticated_state(0, 0);
    state.access_token_expiry = None;
    state.refresh_token_expiry = None;
    persist.save(&state).unwrap();

    let (controller, recording) =
        build_controller(&server, persist, SessionOptions::default());

    controller.refresh_access_token().await.unwrap();

    assert!(controller.is_authenticated());
    assert!(!recording.notices().contains(&Notice::SessionExpired));
    let state = controller.session_state();
    assert_eq!(state.refresh_token.as_deref(), Some("y2"));
    assert_eq!(state.refresh_token_expiry, Some(now + 7_200_000));
}

#[tokio::test]
async fn successful_refresh_rotates_tokens_and_reschedules() {
    let server = MockServer::start().await;
    let now = epoch_millis();
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"id": "u1", "name": "A", "email": "a@b.com", "role": "admin"},
            "accessToken": "x",
            "refreshToken": "y",
            "accessTokenExpiry": now + 400,
            "refreshTokenExpiry": now + 3_600_000
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "x2",
            "refreshToken": "y2",
            "accessTokenExpiry": now + 3_600_000,
            "refreshTokenExpiry": now + 7_200_000
        })))
        .mount(&server)
        .await;

    let (controller, _recording) =
        build_controller(&server, Arc::new(MemoryPersist::new()), SessionOptions::default());

    controller.login("a@b.com", "longenough1").await.unwrap();
    assert!(controller.has_pending_refresh());

    // the timer fires at ~90% of the 400ms remaining lifetime
    tokio::time::sleep(Duration::from_millis(900)).await;

    let state = controller.session_state();
    assert_eq!(state.access_token.as_deref(), Some("x2"));
    assert_eq!(state.refresh_token.as_deref(), Some("y2"));
    assert!(controller.is_authenticated());
    assert!(controller.has_pending_refresh());
}

#[tokio::test]
async fn failed_refresh_forces_logout() {
    let server = MockServer::start().await;
    let now = epoch_millis();
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"id": "u1", "name": "A", "email": "a@b.com", "role": "admin"},
            "accessToken": "x",
            "refreshToken": "y",
            "accessTokenExpiry": now + 300,
            "refreshTokenExpiry": now + 3_600_000
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "refresh rejected"})),
        )
        .mount(&server)
        .await;

    let (controller, recording) =
        build_controller(&server, Arc::new(MemoryPersist::new()), SessionOptions::default());

    controller.login("a@b.com", "longenough1").await.unwrap();

    tokio::time::sleep(Duration::from_millis(800)).await;

    assert!(!controller.is_authenticated());
    assert!(!controller.has_pending_refresh());
    assert_eq!(recording.routes(), vec![Route::Dashboard, Route::Login]);
    assert!(recording.notices().contains(&Notice::SessionExpired));
}

#[tokio::test]
async fn logout_clears_locally_even_when_endpoint_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_ok_body()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let persist = Arc::new(MemoryPersist::new());
    let (controller, recording) =
        build_controller(&server, persist.clone(), SessionOptions::default());

    controller.login("a@b.com", "longenough1").await.unwrap();
    controller.logout().await;

    assert!(!controller.is_authenticated());
    assert!(!controller.has_pending_refresh());
    assert_eq!(controller.session_state(), SessionState::default());
    assert_eq!(recording.routes(), vec![Route::Dashboard, Route::Login]);
    assert!(recording.notices().contains(&Notice::LoggedOut));

    // the persisted blob is gone as well
    assert!(persist.load().unwrap().is_none());
}

#[tokio::test]
async fn rescheduling_replaces_the_pending_timer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_ok_body()))
        .mount(&server)
        .await;

    let (controller, _recording) =
        build_controller(&server, Arc::new(MemoryPersist::new()), SessionOptions::default());

    controller.login("a@b.com", "longenough1").await.unwrap();

    controller.schedule_refresh();
    controller.schedule_refresh();
    controller.schedule_refresh();

    assert!(controller.has_pending_refresh());
    assert!(controller.is_authenticated());
}

#[tokio::test]
async fn concurrent_manual_refreshes_are_tolerated() {
    let server = MockServer::start().await;
    let now = epoch_millis();
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_ok_body()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "x2",
            "refreshToken": "y2",
            "accessTokenExpiry": now + 3_600_000,
            "refreshTokenExpiry": now + 7_200_000
        })))
        .mount(&server)
        .await;

    let (controller, _recording) =
        build_controller(&server, Arc::new(MemoryPersist::new()), SessionOptions::default());

    controller.login("a@b.com", "longenough1").await.unwrap();

    let first = controller.clone();
    let second = controller.clone();
    let (a, b) = tokio::join!(first.refresh_access_token(), second.refresh_access_token());
    a.unwrap();
    b.unwrap();

    assert!(controller.is_authenticated());
    assert!(controller.has_pending_refresh());
    assert_eq!(
        controller.session_state().access_token.as_deref(),
        Some("x2")
    );
}

#[tokio::test]
async fn resume_restarts_scheduling_for_a_valid_session() {
    let server = MockServer::start().await;

    let persist = Arc::new(MemoryPersist::new());
    let now = epoch_millis();
    persist
        .save(&authenticated_state(now + 3_600_000, now + 7_200_000))
        .unwrap();

    let (controller, recording) =
        build_controller(&server, persist, SessionOptions::default());

    controller.resume();

    assert!(controller.is_authenticated());
    assert!(controller.has_pending_refresh());
    assert!(recording.routes().is_empty());
}

#[tokio::test]
async fn forgot_password_reports_success_and_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/forgot-password"))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/forgot-password"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "smtp down"})))
        .mount(&server)
        .await;

    let (controller, recording) =
        build_controller(&server, Arc::new(MemoryPersist::new()), SessionOptions::default());

    controller.forgot_password("a@b.com").await.unwrap();
    assert!(recording.notices().contains(&Notice::PasswordResetSent));
    assert!(!controller.is_authenticated());

    let err = controller.forgot_password("a@b.com").await.unwrap_err();
    assert!(matches!(err, AuthError::Api { status: 500, .. }));
    assert!(recording
        .notices()
        .iter()
        .any(|n| matches!(n, Notice::PasswordResetFailed(_))));
}
