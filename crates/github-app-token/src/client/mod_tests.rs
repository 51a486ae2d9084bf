//! Tests for the GitHub REST client.
//!
//! The GitHub API is replaced with a wiremock server; each test pins the
//! request shape (method, path, headers, body) the client must send.

use super::*;
use crate::auth::GitHubAppId;
use chrono::{Duration, TimeZone};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app_token() -> JsonWebToken {
    let now = Utc::now();
    JsonWebToken::new(
        "app.jwt.token".to_string(),
        GitHubAppId::new(123),
        now,
        now + Duration::minutes(1),
    )
}

fn client_for(server: &MockServer) -> GitHubClient {
    GitHubClient::new(ClientConfig::default().with_github_api_url(server.uri())).unwrap()
}

fn acme_widgets() -> RepositoryName {
    "acme/widgets".parse().unwrap()
}

mod config_tests {
    use super::*;

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::default();

        assert_eq!(config.github_api_url, "https://api.github.com");
        assert!(config.user_agent.starts_with("github-app-token/"));
    }

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::builder()
            .user_agent("custom-agent/2.0")
            .github_api_url("https://ghe.example.com/api/v3")
            .build();

        assert_eq!(config.user_agent, "custom-agent/2.0");
        assert_eq!(config.github_api_url, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn test_client_rejects_invalid_api_url() {
        for url in ["not a url", "mailto:octocat@example.com", "ftp://example.com"] {
            let result = GitHubClient::new(ClientConfig::default().with_github_api_url(url));
            assert!(
                matches!(result, Err(ApiError::Configuration { .. })),
                "{url:?} should be rejected"
            );
        }
    }
}

mod find_repository_installation_tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_installation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/installation"))
            .and(header("authorization", "Bearer app.jwt.token"))
            .and(header("accept", "application/vnd.github+json"))
            .and(header("x-github-api-version", GITHUB_API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 999,
                "app_id": 123,
                "account": { "id": 1, "login": "acme" },
                "repository_selection": "all"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let installation = client_for(&server)
            .find_repository_installation(&app_token(), &acme_widgets())
            .await
            .unwrap();

        assert_eq!(installation.id, InstallationId::new(999));
        assert_eq!(installation.repository_selection, Some(RepositorySelection::All));
    }

    #[tokio::test]
    async fn test_not_installed_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/installation"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Not Found",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server)
            .find_repository_installation(&app_token(), &acme_widgets())
            .await;

        match result {
            Err(ApiError::NotFound { message }) => assert_eq!(message, "Not Found"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    /// The API base may carry a path, as on GitHub Enterprise Server.
    #[tokio::test]
    async fn test_api_url_with_path_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/repos/acme/widgets/installation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 7 })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GitHubClient::new(
            ClientConfig::default().with_github_api_url(format!("{}/api/v3/", server.uri())),
        )
        .unwrap();
        let installation = client
            .find_repository_installation(&app_token(), &acme_widgets())
            .await
            .unwrap();

        assert_eq!(installation.id, InstallationId::new(7));
    }

    #[tokio::test]
    async fn test_sends_configured_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", "custom-agent/2.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GitHubClient::new(
            ClientConfig::builder()
                .github_api_url(server.uri())
                .user_agent("custom-agent/2.0")
                .build(),
        )
        .unwrap();

        client
            .find_repository_installation(&app_token(), &acme_widgets())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_success_body_is_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .find_repository_installation(&app_token(), &acme_widgets())
            .await;

        assert!(matches!(result, Err(ApiError::JsonError(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_client_error() {
        let client =
            GitHubClient::new(ClientConfig::default().with_github_api_url("http://127.0.0.1:1"))
                .unwrap();

        let result = client
            .find_repository_installation(&app_token(), &acme_widgets())
            .await;

        assert!(matches!(result, Err(ApiError::HttpClientError(_))));
    }
}

mod create_installation_token_tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_token_with_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/app/installations/999/access_tokens"))
            .and(header("authorization", "Bearer app.jwt.token"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "token": "ghs_abc",
                "expires_at": "2024-01-01T13:00:00Z",
                "permissions": { "contents": "read", "issues": "write" },
                "repository_selection": "selected"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = client_for(&server)
            .create_installation_token(&app_token(), InstallationId::new(999))
            .await
            .unwrap();

        assert_eq!(token.token(), "ghs_abc");
        assert_eq!(token.installation_id(), InstallationId::new(999));
        assert_eq!(
            token.expires_at(),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 13, 0, 0).unwrap())
        );
        assert_eq!(
            token.permissions().get("issues"),
            Some(&PermissionLevel::Write)
        );
        assert_eq!(
            token.repository_selection(),
            Some(&RepositorySelection::Selected)
        );
    }

    #[tokio::test]
    async fn test_token_only_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/app/installations/1/access_tokens"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "token": "ghs_min" })))
            .mount(&server)
            .await;

        let token = client_for(&server)
            .create_installation_token(&app_token(), InstallationId::new(1))
            .await
            .unwrap();

        assert_eq!(token.token(), "ghs_min");
        assert!(token.expires_at().is_none());
        assert!(token.permissions().is_empty());
    }

    #[tokio::test]
    async fn test_bad_credentials_maps_to_authentication_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })),
            )
            .mount(&server)
            .await;

        let result = client_for(&server)
            .create_installation_token(&app_token(), InstallationId::new(999))
            .await;

        match result {
            Err(ApiError::AuthenticationFailed { message }) => {
                assert_eq!(message, "Bad credentials")
            }
            other => panic!("expected AuthenticationFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_keeps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .create_installation_token(&app_token(), InstallationId::new(999))
            .await;

        match result {
            Err(ApiError::HttpError { status, message }) => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream unavailable");
            }
            other => panic!("expected HttpError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_error_body_uses_reason_phrase() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .create_installation_token(&app_token(), InstallationId::new(999))
            .await;

        match result {
            Err(ApiError::HttpError { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal Server Error");
            }
            other => panic!("expected HttpError, got {other:?}"),
        }
    }
}
