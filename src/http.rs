//! HTTP client with rate limiting and cookie management for Deezer APIs.
//!
//! Wraps `reqwest::Client` and throttles metadata and license calls to
//! Deezer's quota of 50 calls per 5 seconds. Requests that would exceed the
//! quota are delayed, not rejected. Stream transfers go through
//! [`Client::unlimited`]: they are few and long.

use std::{future::Future, num::NonZeroU32, sync::Arc, time::Duration};

use futures_util::{FutureExt, TryFutureExt};
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{
    cookie::CookieStore,
    header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE},
    Body, Method, Url,
};

use crate::{
    config::Config,
    error::{Error, Result},
};

/// HTTP client with built-in rate limiting and cookie support.
pub struct Client {
    /// Underlying client without rate limiting.
    pub unlimited: reqwest::Client,

    rate_limiter: DefaultDirectRateLimiter,

    pub cookie_jar: Option<Arc<dyn CookieStore>>,
}

impl Client {
    /// Rolling window of the API quota.
    const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(5);

    /// Calls allowed per window.
    const RATE_LIMIT_CALLS_PER_INTERVAL: u32 = 50;

    /// Duration to keep idle connections alive.
    const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Maximum time between two reads of a response.
    ///
    /// Generous because the sink may apply backpressure to a stream transfer.
    const READ_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a new client with optional cookie storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built, e.g. because the
    /// user agent is not a valid header value.
    pub fn new<C>(config: &Config, cookie_jar: Option<C>) -> Result<Self>
    where
        C: CookieStore + 'static,
    {
        // Not having `Accept-Language` set is non-fatal.
        let mut headers = HeaderMap::new();
        if let Ok(lang) = HeaderValue::from_str(&config.app_lang) {
            headers.insert(ACCEPT_LANGUAGE, lang);
        }

        let cookie_jar = cookie_jar.map(Arc::new);

        let mut http_client = reqwest::Client::builder()
            .tcp_keepalive(Self::KEEPALIVE_TIMEOUT)
            .read_timeout(Self::READ_TIMEOUT)
            .default_headers(headers)
            .user_agent(&config.user_agent);

        if let Some(ref jar) = cookie_jar {
            http_client = http_client.cookie_provider(Arc::clone(jar));
        }

        Ok(Self {
            unlimited: http_client.build()?,
            rate_limiter: governor::RateLimiter::direct(Self::quota()?),
            cookie_jar: cookie_jar.map(|jar| jar as _),
        })
    }

    /// Creates a new client with cookie storage, for the gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn with_cookies<C>(config: &Config, cookie_jar: C) -> Result<Self>
    where
        C: CookieStore + 'static,
    {
        Self::new(config, Some(cookie_jar))
    }

    /// Creates a new client without cookie storage, for public endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn without_cookies(config: &Config) -> Result<Self> {
        Self::new(config, None::<reqwest::cookie::Jar>)
    }

    /// Spreads the calls of a window evenly, allowing a full window's burst.
    fn quota() -> Result<Quota> {
        let replenish_interval = Self::RATE_LIMIT_INTERVAL / Self::RATE_LIMIT_CALLS_PER_INTERVAL;
        let burst = NonZeroU32::new(Self::RATE_LIMIT_CALLS_PER_INTERVAL)
            .ok_or_else(|| Error::internal("calls per interval is zero"))?;

        Quota::with_period(replenish_interval)
            .map(|quota| quota.allow_burst(burst))
            .ok_or_else(|| Error::internal("quota time interval is zero"))
    }

    /// Builds a request with specified method, URL and body.
    pub fn request<U, T>(&self, method: Method, url: U, body: T) -> reqwest::Request
    where
        U: Into<Url>,
        T: Into<Body>,
    {
        let mut request = reqwest::Request::new(method, url.into());
        *request.body_mut() = Some(body.into());
        request
    }

    pub fn post<U, T>(&self, url: U, body: T) -> reqwest::Request
    where
        U: Into<Url>,
        T: Into<Body>,
    {
        self.request(Method::POST, url, body)
    }

    /// Builds a GET request without a body.
    pub fn get<U>(&self, url: U) -> reqwest::Request
    where
        U: Into<Url>,
    {
        reqwest::Request::new(Method::GET, url.into())
    }

    /// Executes a request after waiting for the rate limiter.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails at the transport level. HTTP
    /// error statuses are not errors here.
    pub fn execute(
        &self,
        request: reqwest::Request,
    ) -> impl Future<Output = Result<reqwest::Response>> + '_ {
        // No need to await with jitter because the level of concurrency is low.
        let throttle = self.rate_limiter.until_ready();
        throttle.then(|()| self.unlimited.execute(request).map_err(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_allows_full_burst() {
        let quota = Client::quota().unwrap();
        assert_eq!(quota.burst_size().get(), 50);
        assert_eq!(quota.replenish_interval(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn builds_requests() {
        let config = Config::with_arl("abcdef".parse().unwrap()).unwrap();
        let client = Client::without_cookies(&config).unwrap();
        assert!(client.cookie_jar.is_none());

        let url: Url = "https://api.deezer.com/track/3135556".parse().unwrap();
        let request = client.get(url.clone());
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url(), &url);
        assert!(request.body().is_none());

        let request = client.post(url, "{}");
        assert_eq!(request.method(), Method::POST);
        assert!(request.body().is_some());
    }
}
