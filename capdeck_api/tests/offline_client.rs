use std::sync::atomic::{AtomicBool, Ordering};

use capdeck_api::{
    ApiClient, ApiRequest, CachingTransport, FailureReason, RawResponse,
    Transport, TransportError,
};

/// Backend that answers `/status` until it is unplugged.
#[derive(Default)]
struct Flaky {
    down: AtomicBool,
}

impl Transport for Flaky {
    async fn send(
        &self,
        request: &ApiRequest,
    ) -> Result<RawResponse, TransportError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(TransportError::Network("unplugged".into()));
        }
        match request.path().as_str() {
            "/status" => Ok(RawResponse::new(
                200,
                r#"{"streamingActive": true, "clientCount": 4}"#,
            )),
            path => Ok(RawResponse::new(404, format!(r#"{{"error": "{path}"}}"#))),
        }
    }
}

#[tokio::test]
async fn status_survives_losing_the_network() {
    let client = ApiClient::new(CachingTransport::new(Flaky::default()));

    let online = client.status().await.unwrap();
    assert!(online.streaming_active);

    client.transport().inner().down.store(true, Ordering::SeqCst);

    let offline = client.status().await.unwrap();
    assert_eq!(online, offline);
}

#[tokio::test]
async fn uncached_reads_report_offline() {
    let client = ApiClient::new(CachingTransport::new(Flaky::default()));
    client.transport().inner().down.store(true, Ordering::SeqCst);

    let err = client.image_settings().await.unwrap_err();
    assert_eq!(err.reason, FailureReason::Offline);
    assert_eq!(err.status, Some(503));
}

#[tokio::test]
async fn writes_fail_as_transport_errors_while_offline() {
    let client = ApiClient::new(CachingTransport::new(Flaky::default()));
    client.transport().inner().down.store(true, Ordering::SeqCst);

    let err = client.set_capture_fps(60).await.unwrap_err();
    assert_eq!(err.reason, FailureReason::Transport);
}

#[tokio::test]
async fn backend_errors_pass_through() {
    let client = ApiClient::new(CachingTransport::new(Flaky::default()));

    let err = client.preset("missing").await.unwrap_err();
    assert_eq!(err.reason, FailureReason::Http);
    assert_eq!(err.message, "/presets/missing");
}
