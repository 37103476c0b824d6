use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::Secret;
use wiremock::matchers::{any, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{TestApp, ACCESS_TOKEN, APPEND_PATH, CLIENT_EMAIL, PUBLIC_KEY};
use entru_waitlist::google_auth::AssertionClaims;

#[tokio::test]
async fn subscribe_returns_200_and_appends_one_row() {
    let test_app = TestApp::spawn_app().await;

    test_app.mock_token_endpoint(200).await;
    Mock::given(method("POST"))
        .and(path(APPEND_PATH))
        .and(query_param("valueInputOption", "USER_ENTERED"))
        .and(header("Authorization", format!("Bearer {}", ACCESS_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&test_app.google_server)
        .await;

    let response = reqwest::Client::new()
        .post(&test_app.subscribe_url())
        .header("User-Agent", "waitlist-tests/1.0")
        .json(&serde_json::json!({ "email": "frank@test.com", "source": "footer" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    assert_eq!(
        response.json::<serde_json::Value>().await.unwrap(),
        serde_json::json!({ "ok": true })
    );

    let appended = test_app.appended_rows().await;
    assert_eq!(appended.len(), 1);

    let row = appended[0]["values"][0].as_array().unwrap();
    assert_eq!(row.len(), 4);
    assert!(chrono::DateTime::parse_from_rfc3339(row[0].as_str().unwrap()).is_ok());
    assert!(row[0].as_str().unwrap().ends_with('Z'));
    assert_eq!(row[1], "frank@test.com");
    assert_eq!(row[2], "footer");
    assert_eq!(row[3], "waitlist-tests/1.0");
}

#[tokio::test]
async fn subscribe_defaults_source_and_user_agent() {
    let test_app = TestApp::spawn_app().await;

    test_app.mock_token_endpoint(200).await;
    test_app.mock_append_endpoint(200).await;

    // reqwest sends no User-Agent unless asked to
    let response = test_app
        .post_subscription(serde_json::json!({ "email": "frank@test.com" }))
        .await;

    assert_eq!(200, response.status().as_u16());

    let appended = test_app.appended_rows().await;
    let row = appended[0]["values"][0].as_array().unwrap();
    assert_eq!(row[2], "coming-soon");
    assert_eq!(row[3], "");
}

#[tokio::test]
async fn subscribe_stores_the_email_as_sent() {
    let test_app = TestApp::spawn_app().await;

    test_app.mock_token_endpoint(200).await;
    test_app.mock_append_endpoint(200).await;

    test_app
        .post_subscription(serde_json::json!({ "email": "Frank@Test.com" }))
        .await;

    let appended = test_app.appended_rows().await;
    assert_eq!(appended[0]["values"][0][1], "Frank@Test.com");
}

#[tokio::test]
async fn subscribe_writes_to_the_configured_tab() {
    let test_app = TestApp::spawn_app_with(|config| {
        config.google_sheets.tab_name = Some(String::from("Wait list"));
    })
    .await;

    test_app.mock_token_endpoint(200).await;
    Mock::given(method("POST"))
        .and(path("/v4/spreadsheets/test-sheet-id/values/Wait%20list!A:D:append"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&test_app.google_server)
        .await;

    let response = test_app
        .post_subscription(serde_json::json!({ "email": "frank@test.com" }))
        .await;

    assert_eq!(200, response.status().as_u16());
    assert_eq!(
        test_app.config.google_sheets.get_tab_name(),
        "Wait list"
    );
}

#[tokio::test]
async fn subscribe_requests_a_token_with_a_signed_assertion() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(body_string_contains(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "access_token": ACCESS_TOKEN })),
        )
        .expect(1)
        .mount(&test_app.google_server)
        .await;
    test_app.mock_append_endpoint(200).await;

    test_app
        .post_subscription(serde_json::json!({ "email": "frank@test.com" }))
        .await;

    let received_requests = test_app.google_server.received_requests().await.unwrap();
    let token_request = received_requests
        .iter()
        .find(|request| request.url.path() == "/token")
        .unwrap();
    let body = String::from_utf8(token_request.body.clone()).unwrap();
    let assertion = body
        .split('&')
        .find_map(|pair| pair.strip_prefix("assertion="))
        .unwrap();

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&["https://oauth2.googleapis.com/token"]);
    let claims = decode::<AssertionClaims>(
        assertion,
        &DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap(),
        &validation,
    )
    .expect("Assertion does not verify with the service account public key.")
    .claims;

    assert_eq!(claims.iss, CLIENT_EMAIL);
    assert_eq!(claims.scope, "https://www.googleapis.com/auth/spreadsheets");
    assert_eq!(claims.exp, claims.iat + 3600);
}

#[tokio::test]
async fn subscribe_accepts_plain_text_json_bodies() {
    let test_app = TestApp::spawn_app().await;

    test_app.mock_token_endpoint(200).await;
    test_app.mock_append_endpoint(200).await;

    let response = reqwest::Client::new()
        .post(&test_app.subscribe_url())
        .header("Content-Type", "text/plain")
        .body(r#"{"email":"frank@test.com","source":"coming-soon"}"#)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    assert_eq!(test_app.appended_rows().await.len(), 1);
}

#[tokio::test]
async fn subscribe_rejects_methods_other_than_post_with_405() {
    let test_app = TestApp::spawn_app().await;
    let client = reqwest::Client::new();
    let url = test_app.subscribe_url();

    for request in [
        client.get(&url),
        client.put(&url).json(&serde_json::json!({ "email": "frank@test.com" })),
        client.delete(&url),
        client.patch(&url).body("not json"),
    ] {
        let response = request.send().await.expect("Failed to execute request.");

        assert_eq!(405, response.status().as_u16());
        assert_eq!(
            response.json::<serde_json::Value>().await.unwrap(),
            serde_json::json!({ "error": "Method not allowed" })
        );
    }

    assert_eq!(test_app.received_request_count().await, 0);
}

#[tokio::test]
async fn subscribe_returns_400_when_email_is_missing_or_invalid() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.google_server)
        .await;

    let test_cases = vec![
        (serde_json::json!({}), "missing email"),
        (serde_json::json!({ "email": "" }), "empty email"),
        (serde_json::json!({ "email": "   " }), "blank email"),
        (serde_json::json!({ "email": 42 }), "numeric email"),
        (serde_json::json!({ "email": null }), "null email"),
        (serde_json::json!({ "source": "footer" }), "only source"),
        (serde_json::json!("frank@test.com"), "string body"),
        (serde_json::json!(["frank@test.com"]), "array body"),
        (
            serde_json::json!(["frank@test.com", "footer"]),
            "positional array body",
        ),
    ];

    for (invalid_body, error_message) in test_cases {
        let response = test_app.post_subscription(invalid_body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 status when payload was {}",
            error_message
        );
        assert_eq!(
            response.json::<serde_json::Value>().await.unwrap(),
            serde_json::json!({ "error": "Email is required." })
        );
    }
}

#[tokio::test]
async fn subscribe_returns_400_for_an_empty_body() {
    let test_app = TestApp::spawn_app().await;

    let response = reqwest::Client::new()
        .post(&test_app.subscribe_url())
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    assert_eq!(test_app.received_request_count().await, 0);
}

#[tokio::test]
async fn subscribe_returns_500_before_requesting_a_token_when_sheet_id_is_missing() {
    let test_app = TestApp::spawn_app_with(|config| {
        config.google_sheets.sheet_id = None;
    })
    .await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.google_server)
        .await;

    let response = test_app
        .post_subscription(serde_json::json!({ "email": "frank@test.com" }))
        .await;

    assert_eq!(500, response.status().as_u16());
    assert_eq!(
        response.json::<serde_json::Value>().await.unwrap(),
        serde_json::json!({ "error": "Sheet ID is not configured." })
    );
}

#[tokio::test]
async fn subscribe_returns_generic_500_when_credentials_are_missing() {
    let test_app = TestApp::spawn_app_with(|config| {
        config.google_sheets.private_key = None;
    })
    .await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.google_server)
        .await;

    let response = test_app
        .post_subscription(serde_json::json!({ "email": "frank@test.com" }))
        .await;

    assert_eq!(500, response.status().as_u16());
    assert_eq!(
        response.json::<serde_json::Value>().await.unwrap(),
        serde_json::json!({ "error": "Failed to store email." })
    );
}

#[tokio::test]
async fn subscribe_returns_generic_500_when_token_exchange_fails() {
    let test_app = TestApp::spawn_app().await;

    test_app.mock_token_endpoint(401).await;
    Mock::given(path(APPEND_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.google_server)
        .await;

    let response = test_app
        .post_subscription(serde_json::json!({ "email": "frank@test.com" }))
        .await;

    assert_eq!(500, response.status().as_u16());
    assert_eq!(
        response.json::<serde_json::Value>().await.unwrap(),
        serde_json::json!({ "error": "Failed to store email." })
    );
}

#[tokio::test]
async fn subscribe_returns_generic_500_when_append_fails() {
    let test_app = TestApp::spawn_app().await;

    test_app.mock_token_endpoint(200).await;
    Mock::given(path(APPEND_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("The caller does not have permission"))
        .expect(1)
        .mount(&test_app.google_server)
        .await;

    let response = test_app
        .post_subscription(serde_json::json!({ "email": "frank@test.com" }))
        .await;

    assert_eq!(500, response.status().as_u16());

    let body = response.text().await.unwrap();
    assert_eq!(body, r#"{"error":"Failed to store email."}"#);
    assert!(!body.contains("permission"));
}

#[tokio::test]
async fn subscribe_mints_a_new_token_for_every_request() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "access_token": ACCESS_TOKEN })),
        )
        .expect(2)
        .mount(&test_app.google_server)
        .await;
    test_app.mock_append_endpoint(200).await;

    for email in ["first@test.com", "second@test.com"] {
        let response = test_app
            .post_subscription(serde_json::json!({ "email": email }))
            .await;

        assert_eq!(200, response.status().as_u16());
    }

    assert_eq!(test_app.appended_rows().await.len(), 2);
}

#[tokio::test]
async fn subscribe_requires_the_api_token_when_configured() {
    let test_app = TestApp::spawn_app_with(|config| {
        config.application.api_token = Some(Secret::new(String::from("s3cr3t")));
    })
    .await;

    test_app.mock_token_endpoint(200).await;
    test_app.mock_append_endpoint(200).await;

    let body = serde_json::json!({ "email": "frank@test.com" });
    let unauthorized = test_app.post_subscription(body.clone()).await;

    assert_eq!(401, unauthorized.status().as_u16());
    assert_eq!(
        unauthorized.json::<serde_json::Value>().await.unwrap(),
        serde_json::json!({ "error": "Unauthorized" })
    );
    assert_eq!(test_app.received_request_count().await, 0);

    let authorized = reqwest::Client::new()
        .post(&test_app.subscribe_url())
        .bearer_auth("s3cr3t")
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, authorized.status().as_u16());
}
