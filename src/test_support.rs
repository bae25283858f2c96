//! In-process stand-in for the remote prompt service.

use crate::config::Settings;
use std::net::SocketAddr;
use tokio::task::JoinHandle;

pub struct StubService {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl StubService {
    pub async fn start(router: axum::Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub local addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("stub server error");
        });
        Self { addr, handle }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for StubService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn settings_for(api_url: &str) -> Settings {
    Settings::new(Some(api_url.to_string()), Some(5), None)
}
