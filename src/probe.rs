//! Reachability probes for remote URLs.
//!
//! The iframe and card-image checks only need to know whether a URL answers a
//! `HEAD` request, so they take a [`UrlProbe`] and tests swap in a fake.

use anyhow::Result;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

pub trait UrlProbe: Sync {
    /// Status code of a `HEAD` request, or the transport error.
    fn head(&self, url: &str) -> Result<u16, String>;
}

/// Statuses below 400 count as reachable; redirects are not followed.
pub const fn is_ok_status(status: u16) -> bool {
    status < 400
}

/// Blocking HTTP prober.
pub struct HttpProbe {
    client: reqwest::blocking::Client,
}

impl HttpProbe {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

impl UrlProbe for HttpProbe {
    fn head(&self, url: &str) -> Result<u16, String> {
        self.client
            .head(url)
            .send()
            .map(|response| response.status().as_u16())
            .map_err(|err| err.to_string())
    }
}

#[cfg(test)]
pub mod fake {
    use super::UrlProbe;
    use std::collections::HashMap;

    /// Answers from a fixed table; unknown URLs fail to connect.
    #[derive(Default)]
    pub struct FakeProbe {
        pub responses: HashMap<String, u16>,
    }

    impl FakeProbe {
        pub fn with(entries: &[(&str, u16)]) -> Self {
            Self {
                responses: entries.iter().map(|(u, s)| (u.to_string(), *s)).collect(),
            }
        }
    }

    impl UrlProbe for FakeProbe {
        fn head(&self, url: &str) -> Result<u16, String> {
            self.responses
                .get(url)
                .copied()
                .ok_or_else(|| "connection refused".to_string())
        }
    }
}
