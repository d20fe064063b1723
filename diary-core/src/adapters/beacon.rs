use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use reqwest::{Client, Url};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::ports::LockoutNotifier;

const LOCKOUT_EVENT: &str = "password_lockout";

#[derive(Debug, Serialize, PartialEq, Eq)]
struct BeaconPayload<'a> {
    url: &'a str,
    event: &'a str,
}

/// Fire-and-forget lockout report to an analytics endpoint.
///
/// Reports run as background tasks. A short-lived process should call
/// [`BeaconNotifier::flush`] before its runtime shuts down, or pending
/// reports are cancelled with it.
#[derive(Debug, Clone)]
pub struct BeaconNotifier {
    client: Client,
    endpoint: Url,
    page_url: String,
    pending: Arc<Mutex<JoinSet<()>>>,
}

impl BeaconNotifier {
    pub fn new(endpoint: Url, page_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            page_url: page_url.into(),
            pending: Arc::default(),
        }
    }

    fn payload(&self) -> BeaconPayload<'_> {
        BeaconPayload {
            url: &self.page_url,
            event: LOCKOUT_EVENT,
        }
    }

    /// Waits up to `timeout` for reports still in flight; the rest are aborted.
    pub async fn flush(&self, timeout: Duration) {
        let mut pending = std::mem::take(&mut *self.lock());
        if pending.is_empty() {
            return;
        }

        let drained = tokio::time::timeout(timeout, async {
            while pending.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(left = pending.len(), "lockout beacon still pending, giving up");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.pending.lock().expect("beacon task lock poisoned")
    }
}

impl LockoutNotifier for BeaconNotifier {
    fn notify_lockout(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime, lockout beacon not sent");
            return;
        };

        let request = self
            .client
            .post(self.endpoint.clone())
            .json(&self.payload());
        let endpoint = self.endpoint.clone();

        self.lock().spawn_on(
            async move {
                match request.send().await.and_then(|r| r.error_for_status()) {
                    Ok(_) => debug!(%endpoint, "lockout beacon sent"),
                    Err(e) => warn!(%endpoint, error = %e, "lockout beacon failed"),
                }
            },
            &handle,
        );
    }
}

/// Beacon when an endpoint is configured, nothing otherwise.
impl<N: LockoutNotifier> LockoutNotifier for Option<N> {
    fn notify_lockout(&self) {
        if let Some(notifier) = self {
            notifier.notify_lockout();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::TcpListener,
        sync::mpsc,
        thread,
    };

    use super::*;

    /// Accepts one connection, answers 204 and hands back what was received.
    fn one_shot_listener() -> (Url, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = Url::parse(&format!("http://{}/event", listener.local_addr().unwrap())).unwrap();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = stream.read(&mut buf).unwrap_or(0);
                received.extend_from_slice(&buf[..n]);
                if n == 0 || String::from_utf8_lossy(&received).contains(LOCKOUT_EVENT) {
                    break;
                }
            }
            let _ = stream.write_all(
                b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
            let _ = tx.send(String::from_utf8_lossy(&received).into_owned());
        });

        (url, rx)
    }

    #[test]
    fn payload_names_page_and_event() {
        let beacon = BeaconNotifier::new(
            Url::parse("https://stats.example.com/event").unwrap(),
            "https://diary.example.com/",
        );
        assert_eq!(
            serde_json::to_value(beacon.payload()).unwrap(),
            serde_json::json!({ "url": "https://diary.example.com/", "event": "password_lockout" })
        );
    }

    #[test]
    fn without_runtime_it_does_not_panic() {
        let beacon = BeaconNotifier::new(Url::parse("http://127.0.0.1:9/").unwrap(), "page");
        beacon.notify_lockout();
    }

    #[test]
    fn flushed_report_survives_runtime_shutdown() {
        let (url, received) = one_shot_listener();
        let beacon = BeaconNotifier::new(url, "https://diary.example.com/");

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            beacon.notify_lockout();
            beacon.flush(Duration::from_secs(5)).await;
        });
        drop(runtime);

        let request = received.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(request.starts_with("POST /event"));
        assert!(request.contains(r#""event":"password_lockout""#));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_swallowed_by_flush() {
        let beacon = BeaconNotifier::new(Url::parse("http://127.0.0.1:9/").unwrap(), "page");
        beacon.notify_lockout();
        beacon.flush(Duration::from_secs(5)).await;
        assert!(beacon.lock().is_empty());
    }
}
