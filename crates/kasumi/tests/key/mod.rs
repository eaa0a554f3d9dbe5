use kasumi::{
    key::{
        KeyProvider, LicenseClient, LicenseKey, LicenseKeyType, LocalKeyProvider,
        RemoteKeyProvider,
    },
    pssh::PsshBox,
    HttpClient, KasumiError, KasumiResult,
};
use url::Url;
use wiremock::{
    matchers::{body_bytes, body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::{AssertWrapper, KID_PSSH};

const CONTENT_KEY: &str = "edef8ba979d64acea3c827dcd51d21ed:00112233445566778899aabbccddeeff";

struct FakeLicenseClient;

impl LicenseClient for FakeLicenseClient {
    fn challenge(&self, pssh: &PsshBox) -> KasumiResult<Vec<u8>> {
        assert!(pssh.is_widevine());
        Ok(b"challenge".to_vec())
    }

    fn keys(&self, challenge: &[u8], response: &[u8]) -> KasumiResult<Vec<LicenseKey>> {
        assert_eq!(challenge, b"challenge");
        assert_eq!(response, b"license");
        Ok(vec![
            LicenseKey {
                r#type: LicenseKeyType::Signing,
                id: "00000000000000000000000000000000".to_string(),
                key: "ffff".to_string(),
            },
            LicenseKey {
                r#type: LicenseKeyType::Content,
                id: "edef8ba979d64acea3c827dcd51d21ed".to_string(),
                key: "00112233445566778899aabbccddeeff".to_string(),
            },
        ])
    }
}

fn client() -> HttpClient {
    HttpClient::browser().assert_success()
}

#[tokio::test]
async fn test_local_provider_keeps_content_keys() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/license"))
        .and(header("x-custom-token", "abc"))
        .and(body_bytes(b"challenge".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"license".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let headers = vec!["X-Custom-Token: abc".to_string()];
    let provider = LocalKeyProvider::new(FakeLicenseClient, client(), headers.as_slice());
    let keys = provider
        .acquire(KID_PSSH, &format!("{}/license", server.uri()))
        .await
        .assert_success();

    assert_eq!(keys.len(), 1);
    assert_eq!(keys.to_string(), CONTENT_KEY);
}

#[tokio::test]
async fn test_local_provider_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/license"))
        .respond_with(ResponseTemplate::new(403).set_body_string("not entitled"))
        .mount(&server)
        .await;

    let provider = LocalKeyProvider::new(FakeLicenseClient, client(), ());
    let result = provider
        .acquire(KID_PSSH, &format!("{}/license", server.uri()))
        .await;
    assert!(matches!(result, Err(KasumiError::LicenseError(_))));
}

#[tokio::test]
async fn test_remote_provider() {
    let server = MockServer::start().await;
    let license_url = "https://license.example.com/widevine";
    Mock::given(method("POST"))
        .and(path("/api"))
        .and(body_partial_json(serde_json::json!({
            "pssh": KID_PSSH,
            "licurl": license_url,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": format!("{CONTENT_KEY}\n00000000000000000000000000000002:aabb\n"),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let provider = RemoteKeyProvider::new(client(), endpoint, ());
    let keys = provider.acquire(KID_PSSH, license_url).await.assert_success();

    let keys: Vec<_> = keys.iter().map(ToString::to_string).collect();
    assert_eq!(
        keys,
        vec![
            CONTENT_KEY.to_string(),
            "00000000000000000000000000000002:aabb".to_string()
        ]
    );
}

#[tokio::test]
async fn test_remote_provider_without_keys() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Invalid license URL",
        })))
        .mount(&server)
        .await;

    let endpoint = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let provider = RemoteKeyProvider::new(client(), endpoint, ());
    let result = provider
        .acquire(KID_PSSH, "https://license.example.com/widevine")
        .await;
    assert!(matches!(result, Err(KasumiError::LicenseError(_))));
}

#[tokio::test]
async fn test_remote_provider_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let endpoint = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let provider = RemoteKeyProvider::new(client(), endpoint, ());
    let result = provider
        .acquire(KID_PSSH, "https://license.example.com/widevine")
        .await;
    assert!(matches!(result, Err(KasumiError::LicenseError(_))));
}

#[tokio::test]
async fn test_remote_provider_not_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let endpoint = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let provider = RemoteKeyProvider::new(client(), endpoint, ());
    let result = provider
        .acquire(KID_PSSH, "https://license.example.com/widevine")
        .await;
    assert!(matches!(result, Err(KasumiError::LicenseError(_))));
}

#[tokio::test]
async fn test_local_provider_unreachable() {
    let provider = LocalKeyProvider::new(FakeLicenseClient, client(), ());
    let result = provider.acquire(KID_PSSH, "http://127.0.0.1:1/license").await;
    assert!(matches!(result, Err(KasumiError::LicenseError(_))));
}
