use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::helpers::TestApp;

async fn mount_provider_login(authority: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_partial_json(serde_json::json!({ "username": "alice" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "AuthenticationResult": {
                "AccessToken": "provider-access-token",
                "ExpiresIn": 3600
            }
        })))
        .mount(authority)
        .await;
}

#[actix_web::test]
pub async fn login_forwards_credentials_and_returns_provider_token() {
    let app = TestApp::spawn_app().await;
    mount_provider_login(&app.authority).await;

    let response = app
        .api_client
        .post(format!("{}/auth/login", app.get_app_url()))
        .json(&serde_json::json!({ "username": "alice", "password": "hunter2" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);

    let body = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["token"]["AccessToken"], "provider-access-token");
}

#[actix_web::test]
pub async fn login_without_credentials_is_rejected() {
    let app = TestApp::spawn_app().await;

    let response = app
        .api_client
        .post(format!("{}/auth/login", app.get_app_url()))
        .json(&serde_json::json!({ "username": "alice" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);

    let body = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["error"], "Username and password are required");
}

#[actix_web::test]
pub async fn login_surfaces_provider_rejection_as_400() {
    let app = TestApp::spawn_app().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&app.authority)
        .await;

    let response = app
        .api_client
        .post(format!("{}/auth/login", app.get_app_url()))
        .json(&serde_json::json!({ "username": "alice", "password": "wrong" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);

    let body = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["error"], "Authentication failed. Check your credentials.");
}
