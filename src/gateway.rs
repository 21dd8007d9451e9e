//! Client for the Deezer gateway (`www.deezer.com/ajax/gw-light.php`).
//!
//! The gateway authenticates with the `arl` cookie. Logging in fetches the
//! user data, which carries the API token for all further calls and the
//! account's streaming rights.

use std::sync::Arc;

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    credentials::CredentialCache,
    error::{Error, ErrorKind, Result},
    http::Client as HttpClient,
    protocol::{
        self,
        gateway::{self, Method, SongData, SongQuery, UserData},
    },
    track::TrackId,
};

pub struct Gateway {
    http_client: HttpClient,
    user_data: Option<UserData>,
    cache: Arc<dyn CredentialCache>,
    client_id: usize,
}

impl Gateway {
    /// The URL of the Deezer cookie origin.
    ///
    /// What matters is that the domain matches with `deezer.com`.
    const COOKIE_ORIGIN: &'static str = "https://www.deezer.com";

    const GATEWAY_URL: &'static str = "https://www.deezer.com/ajax/gw-light.php";

    const GATEWAY_VERSION: &'static str = "1.0";

    const GATEWAY_INPUT: usize = 3;

    /// Although the bodies of all gateway requests are JSON, the
    /// `Content-Type` is not.
    const PLAIN_TEXT_CONTENT: HeaderValue = HeaderValue::from_static("text/plain;charset=UTF-8");

    const EMPTY_JSON_OBJECT: &'static str = "{}";

    /// Creates a gateway client that is not logged in yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or the cookies cannot be set up.
    pub fn new(config: &Config, cache: Arc<dyn CredentialCache>) -> Result<Self> {
        let cookie_jar = Self::cookie_jar(config)?;
        let http_client = HttpClient::with_cookies(config, cookie_jar)?;

        Ok(Self {
            http_client,
            user_data: None,
            cache,
            client_id: fastrand::usize(100_000_000..1_000_000_000),
        })
    }

    fn cookie_jar(config: &Config) -> Result<reqwest::cookie::Jar> {
        let cookie_jar = reqwest::cookie::Jar::default();
        let cookie_origin = reqwest::Url::parse(Self::COOKIE_ORIGIN)?;

        let lang_cookie = format!(
            "dz_lang={}; Domain=deezer.com; Path=/; Secure; HttpOnly",
            config.app_lang
        );
        cookie_jar.add_cookie_str(&lang_cookie, &cookie_origin);

        let arl_cookie = format!(
            "arl={}; Domain=deezer.com; Path=/; Secure; HttpOnly",
            config.arl
        );
        cookie_jar.add_cookie_str(&arl_cookie, &cookie_origin);

        Ok(cookie_jar)
    }

    /// Logs in, reusing cached user data when available.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unauthenticated` if the `arl` is invalid or expired,
    /// or the transport error if the gateway cannot be reached.
    pub async fn login(&mut self) -> Result<&UserData> {
        if let Some(data) = self.cache.load().filter(UserData::is_logged_in) {
            debug!("reusing cached session of user {}", data.user.id);
            return Ok(&*self.user_data.insert(data));
        }

        self.refresh().await?;
        self.user_data()
    }

    /// Fetches fresh user data and stores it in the cache.
    ///
    /// # Errors
    ///
    /// See [`login`](Self::login).
    pub async fn refresh(&mut self) -> Result<()> {
        // The API token is tied to the session; drop the stale one.
        self.user_data = None;

        let data = match self
            .request::<UserData>(Self::EMPTY_JSON_OBJECT.to_owned())
            .await
        {
            Ok(response) => response
                .into_first()
                .ok_or_else(|| Error::unauthenticated("no user data received"))?,
            Err(e) if e.kind == ErrorKind::InvalidArgument => {
                // For an invalid or expired `arl`, the response has some
                // fields typed differently, which fails deserialization.
                return Err(Error::unauthenticated(format!(
                    "{e}: please refresh your arl"
                )));
            }
            Err(e) => return Err(e),
        };

        if !data.is_logged_in() {
            return Err(Error::unauthenticated(
                "arl is invalid or expired: please refresh your arl",
            ));
        }

        info!(
            "logged in as {} (country: {}, hq: {}, lossless: {})",
            data.user.name,
            data.country,
            data.can_stream_hq(),
            data.can_stream_lossless()
        );

        self.cache.store(data.clone());
        self.user_data = Some(data);
        Ok(())
    }

    /// Calls a gateway method and parses its response envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be
    /// parsed.
    pub async fn request<T>(&self, body: impl Into<reqwest::Body>) -> Result<gateway::Response<T>>
    where
        T: std::fmt::Debug + Method + for<'de> Deserialize<'de>,
    {
        // Get the API token from the user data or use an empty string.
        let api_token = self
            .user_data
            .as_ref()
            .map(|data| data.api_token.as_str())
            .unwrap_or_default();

        let url = format!(
            "{}?method={}&input={}&api_version={}&api_token={api_token}&cid={}",
            Self::GATEWAY_URL,
            T::METHOD,
            Self::GATEWAY_INPUT,
            Self::GATEWAY_VERSION,
            self.client_id,
        )
        .parse::<reqwest::Url>()?;

        let mut request = self.http_client.post(url, body);
        request
            .headers_mut()
            .insert(CONTENT_TYPE, Self::PLAIN_TEXT_CONTENT);

        let response = self
            .http_client
            .execute(request)
            .await?
            .error_for_status()?;
        let body = response.text().await?;

        protocol::json(&body, T::METHOD)
    }

    /// Calls a gateway method with a JSON body and returns its first result.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the gateway reports an error or no
    /// result.
    pub async fn call<Q, T>(&self, query: &Q) -> Result<T>
    where
        Q: Serialize,
        T: std::fmt::Debug + Method + for<'de> Deserialize<'de>,
    {
        let body = serde_json::to_string(query)?;
        let response = self.request::<T>(body).await?;

        if let Some(message) = response.error_message() {
            return Err(Error::not_found(format!("{}: {message}", T::METHOD)));
        }

        response
            .into_first()
            .ok_or_else(|| Error::not_found(format!("{}: no results", T::METHOD)))
    }

    /// Fetches the gateway metadata of a track.
    ///
    /// # Errors
    ///
    /// Returns `Error::FailedPrecondition` when not logged in, or the error of
    /// the call.
    pub async fn song_data(&self, id: TrackId) -> Result<SongData> {
        if self.user_data.is_none() {
            return Err(Error::failed_precondition("not logged in"));
        }

        self.call(&SongQuery { id }).await
    }

    /// User data of the current session.
    ///
    /// # Errors
    ///
    /// Returns `Error::FailedPrecondition` when not logged in.
    pub fn user_data(&self) -> Result<&UserData> {
        self.user_data
            .as_ref()
            .ok_or_else(|| Error::failed_precondition("not logged in"))
    }

    /// The underlying HTTP client, sharing the session cookies.
    #[must_use]
    pub fn http_client(&self) -> &HttpClient {
        &self.http_client
    }
}

#[cfg(test)]
mod tests {
    use reqwest::cookie::CookieStore;

    use super::*;
    use crate::credentials::{MemoryCache, NoCache};

    fn config() -> Config {
        Config::with_arl("abcdef0123".parse().unwrap()).unwrap()
    }

    #[test]
    fn arl_cookie_is_set() {
        let gateway = Gateway::new(&config(), Arc::new(NoCache)).unwrap();
        let origin = reqwest::Url::parse(Gateway::COOKIE_ORIGIN).unwrap();

        let cookies = gateway
            .http_client()
            .cookie_jar
            .as_ref()
            .and_then(|jar| jar.cookies(&origin))
            .unwrap();
        let cookies = cookies.to_str().unwrap();
        assert!(cookies.contains("arl=abcdef0123"));
        assert!(cookies.contains("dz_lang=en"));
    }

    #[tokio::test]
    async fn login_uses_cached_user_data() {
        let cache = Arc::new(MemoryCache::default());
        let data: UserData = serde_json::from_str(
            r#"{"USER": {"USER_ID": "42", "OPTIONS": {"web_hq": true}}, "checkForm": "token"}"#,
        )
        .unwrap();
        cache.store(data);

        let mut gateway = Gateway::new(&config(), cache).unwrap();
        let user = gateway.login().await.unwrap();
        assert_eq!(user.user.id, 42);
        assert!(user.can_stream_hq());
    }

    #[tokio::test]
    async fn song_data_requires_login() {
        let gateway = Gateway::new(&config(), Arc::new(NoCache)).unwrap();
        let id = "3135556".parse().unwrap();
        let err = gateway.song_data(id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::FailedPrecondition);
    }
}
