use std::time::Duration;

use reqwest::Url;

use crate::prelude::*;

/// Optional liveness ping sent after every published cycle.
pub struct Client {
    inner: reqwest::Client,
    url: Option<Url>,
}

impl Client {
    pub fn new(url: Option<Url>) -> Result<Self> {
        let inner = reqwest::Client::builder().timeout(Duration::from_secs(3)).build()?;
        Ok(Self { inner, url })
    }

    pub async fn send(&self) {
        if let Some(url) = &self.url
            && let Err(error) = self.send_fallible(url.clone()).await
        {
            warn!("failed to send the heartbeat: {error:#}");
        }
    }

    #[instrument(skip_all)]
    async fn send_fallible(&self, url: Url) -> Result {
        debug!("sending a heartbeat…");
        self.inner.post(url).send().await?.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn disabled_ok() -> Result {
        Client::new(None)?.send().await;
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_is_ignored() -> Result {
        let url = {
            let listener = TcpListener::bind("127.0.0.1:0").await?;
            Url::parse(&format!("http://{}/ping", listener.local_addr()?))?
        };
        Client::new(Some(url))?.send().await;
        Ok(())
    }
}
