//! End-to-end tests for the OAuth2 authorization-code flow, driving the
//! middleware against stubbed token and profile endpoints.

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App, HttpResponse};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header as header_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doorman::{Google, GoogleResult, OAuth2, OAuth2Options};

const CALLBACK_URL: &str = "http://localhost/auth/callback/google";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn options(server: &MockServer) -> OAuth2Options {
    init_logging();
    OAuth2Options {
        client_id: "client_id".to_string(),
        client_secret: "client_secret".to_string(),
        redirect_url: Some(CALLBACK_URL.to_string()),
        scopes: vec!["email".to_string(), "profile".to_string()],
        token_url: Some(format!("{}/token", server.uri())),
        profile_url: Some(format!("{}/profile", server.uri())),
        ..OAuth2Options::default()
    }
}

async fn show(result: web::ReqData<GoogleResult>) -> HttpResponse {
    HttpResponse::Ok().body(format!(
        "token={};refresh={};id={};email={};errors={}",
        result.access_token,
        result.refresh_token,
        result.profile.id,
        result.profile.email,
        result.errors.len()
    ))
}

#[actix_web::test]
async fn login_request_redirects_to_the_provider() {
    init_logging();
    let middleware = OAuth2::<Google>::new(OAuth2Options {
        client_id: "client_id".to_string(),
        client_secret: "client_secret".to_string(),
        redirect_url: Some(CALLBACK_URL.to_string()),
        scopes: vec!["s1".to_string(), "s2".to_string()],
        ..OAuth2Options::default()
    })
    .unwrap();
    let app = test::init_service(
        App::new()
            .wrap(middleware)
            .route("/auth/callback/google", web::get().to(show)),
    )
    .await;

    let req = test::TestRequest::get().uri("/auth/google").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);

    let location = res
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    let location = Url::parse(location).unwrap();
    assert_eq!(location.host_str(), Some("accounts.google.com"));

    let params: std::collections::HashMap<_, _> = location.query_pairs().collect();
    assert_eq!(params["client_id"], "client_id");
    assert_eq!(params["redirect_uri"], CALLBACK_URL);
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["scope"], "s1 s2");
    assert_eq!(params["state"], "");
}

#[actix_web::test]
async fn callback_exchanges_code_and_fetches_profile() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header_matcher("accept", "application/json"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc123"))
        .and(body_string_contains("client_id=client_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-123",
            "refresh_token": "rt-456",
            "token_type": "bearer",
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(header_matcher("authorization", "Bearer at-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "1084",
            "name": "Go Pher",
            "email": "gopher@example.com",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = test::init_service(
        App::new()
            .wrap(OAuth2::<Google>::new(options(&server)).unwrap())
            .route("/auth/callback/google", web::get().to(show)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/auth/callback/google?code=abc123&state=")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        test::read_body(res).await,
        "token=at-123;refresh=rt-456;id=1084;email=gopher@example.com;errors=0"
    );

    server.verify().await;
}

#[actix_web::test]
async fn token_failure_skips_the_profile_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = test::init_service(
        App::new()
            .wrap(OAuth2::<Google>::new(options(&server)).unwrap())
            .route("/auth/callback/google", web::get().to(show)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/auth/callback/google?code=bad-code")
        .to_request();
    let res = test::call_service(&app, req).await;
    // The chain continues; only the attached result carries the failure
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        test::read_body(res).await,
        "token=;refresh=;id=;email=;errors=1"
    );

    server.verify().await;
}

#[actix_web::test]
async fn invalid_profile_json_keeps_tokens_and_records_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-123",
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let app = test::init_service(
        App::new()
            .wrap(OAuth2::<Google>::new(options(&server)).unwrap())
            .route("/auth/callback/google", web::get().to(show)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/auth/callback/google?code=abc123")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    // Access token survives, profile stays at its default
    assert_eq!(
        test::read_body(res).await,
        "token=at-123;refresh=;id=;email=;errors=1"
    );
}

#[actix_web::test]
async fn missing_code_records_an_error_without_calling_the_provider() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = test::init_service(
        App::new()
            .wrap(OAuth2::<Google>::new(options(&server)).unwrap())
            .route("/auth/callback/google", web::get().to(show)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/auth/callback/google?error=access_denied")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        test::read_body(res).await,
        "token=;refresh=;id=;email=;errors=1"
    );

    server.verify().await;
}

#[actix_web::test]
async fn callback_accepts_a_form_posted_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code=from-form"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-form",
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "7" })))
        .mount(&server)
        .await;

    let app = test::init_service(
        App::new()
            .wrap(OAuth2::<Google>::new(options(&server)).unwrap())
            .route("/auth/callback/google", web::post().to(show)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/auth/callback/google")
        .set_form([("code", "from-form")])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        test::read_body(res).await,
        "token=at-form;refresh=;id=7;email=;errors=0"
    );

    server.verify().await;
}
