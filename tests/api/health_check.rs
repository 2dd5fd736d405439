use crate::helpers::TestApp;

#[actix_web::test]
pub async fn health_check_works() {
    let app = TestApp::spawn_app().await;

    let response = app
        .api_client
        .get(format!("{}/health", app.get_app_url()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
}
