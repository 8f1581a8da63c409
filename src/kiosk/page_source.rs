use std::future::Future;

use reqwest::{Client, header};
use tracing::{Instrument, info_span, warn};

/// Default host of the kiosk pages
pub const KIOSK_BASE_URL: &str = "https://myrapidbus.prasarana.com.my";

/// Something that can return the HTML of a kiosk page.
pub trait PageSource {
    /// Fetches `path_and_query` (e.g. `/kiosk?bus=&route=673`) and returns the body.
    fn fetch_page(&self, path_and_query: &str)
    -> impl Future<Output = Result<String, FetchError>> + Send;
}

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("error fetching {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// HTTP status of the failed response, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
        }
    }
}

/// [`PageSource`] backed by the live kiosk website.
#[derive(Clone, Debug)]
pub struct KioskClient {
    client: Client,
    base_url: String,
}

impl KioskClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent("Mozilla/5.0").build()?;

        Ok(KioskClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl PageSource for KioskClient {
    #[tracing::instrument(err, skip(self))]
    async fn fetch_page(&self, path_and_query: &str) -> Result<String, FetchError> {
        let url = format!("{}{}", self.base_url, path_and_query);
        let transport = |source| FetchError::Transport {
            url: url.clone(),
            source,
        };

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "text/html")
            .send()
            .instrument(info_span!("Fetching kiosk page"))
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.clone(),
            });
        }

        let html = response
            .text()
            .instrument(info_span!("Reading body of response"))
            .await
            .map_err(transport)?;

        if looks_blocked(&html) {
            warn!("{url} looks like a bot protection page, results may be empty");
        }

        Ok(html)
    }
}

fn looks_blocked(html: &str) -> bool {
    html.contains("Incapsula") || html.contains("captcha")
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        spawn,
        task::JoinHandle,
    };

    use super::*;

    /// Answers one HTTP request with `response` and returns the raw request head.
    async fn serve_once(
        response: &'static str,
    ) -> Result<(String, JoinHandle<String>), anyhow::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);

        let server = spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = vec![];
            let mut buf = [0; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        Ok((base_url, server))
    }

    #[tokio::test]
    async fn error_status_is_reported_with_url() -> Result<(), anyhow::Error> {
        let (base_url, server) = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await?;
        let kiosk = KioskClient::new(format!("{base_url}/"))?;

        let err = kiosk.fetch_page("/kiosk?bus=&route=673").await.unwrap_err();

        match &err {
            FetchError::Status { status, url } => {
                assert_eq!(*status, 503);
                assert_eq!(url, &format!("{base_url}/kiosk?bus=&route=673"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.status(), Some(503));

        let request = server.await?.to_ascii_lowercase();
        assert!(request.starts_with("get /kiosk?bus=&route=673 http/1.1\r\n"));
        assert!(request.contains("\r\nuser-agent: mozilla/5.0\r\n"));
        assert!(request.contains("\r\naccept: text/html\r\n"));

        Ok(())
    }

    #[tokio::test]
    async fn returns_body_of_successful_response() -> Result<(), anyhow::Error> {
        let (base_url, server) = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 19\r\nconnection: close\r\n\r\n<select id=\"route\">",
        )
        .await?;
        let kiosk = KioskClient::new(base_url)?;

        assert_eq!(kiosk.fetch_page("/kiosk").await?, "<select id=\"route\">");
        server.await?;

        Ok(())
    }

    #[test]
    fn detects_bot_protection() {
        assert!(looks_blocked(
            "<html><script src=\"/_Incapsula_Resource?SWJIYLWA=1\"></script></html>"
        ));
        assert!(!looks_blocked("<select id=\"route\"></select>"));
    }
}
