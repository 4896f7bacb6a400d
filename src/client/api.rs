//! Client side of the REST API

use std::cell::RefCell;

use async_trait::async_trait;
use reqwest::{header, redirect, Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::auth::models::CurrentUser;
use crate::auth::SESSION_COOKIE;
use crate::restaurants::{CreateRestaurant, Restaurant, RestaurantPatch};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error("not signed in")]
    Unauthenticated,

    #[error("restaurant not found")]
    NotFound,

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("not possible right now: {0}")]
    InvalidState(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Restaurant API as seen from the map. Single-threaded like the UI loop
/// that drives it, hence `?Send`.
#[async_trait(?Send)]
pub trait RestaurantApi {
    /// `None` for an anonymous visitor
    async fn current_user(&self) -> Result<Option<CurrentUser>>;
    async fn list(&self) -> Result<Vec<Restaurant>>;
    async fn create(&self, data: &CreateRestaurant) -> Result<Restaurant>;
    async fn update(&self, id: &str, patch: &RestaurantPatch) -> Result<Restaurant>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn logout(&self) -> Result<()>;
}

#[derive(Debug, Deserialize, Serialize)]
struct ErrorBody {
    error: String,
    code: String,
}

/// `reqwest` implementation carrying the session cookie explicitly
pub struct HttpRestaurantApi {
    url: String,
    client: Client,
    session: RefCell<Option<String>>,
}

impl HttpRestaurantApi {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            url: url.into().trim_end_matches('/').to_string(),
            client,
            session: RefCell::new(None),
        }
    }

    pub fn with_session(url: impl Into<String>, session_id: impl Into<String>) -> Self {
        let api = Self::new(url);
        api.set_session(Some(session_id.into()));
        api
    }

    pub fn set_session(&self, session_id: Option<String>) {
        *self.session.borrow_mut() = session_id;
    }

    fn add_session_cookie(&self, req: RequestBuilder) -> RequestBuilder {
        match self.session.borrow().as_deref() {
            Some(session_id) => {
                req.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, session_id))
            }
            None => req,
        }
    }

    async fn send<T>(&self, req: RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.add_session_cookie(req).send().await?;
        into_json(response).await
    }

    async fn send_json<D, T>(&self, req: RequestBuilder, data: &D) -> Result<T>
    where
        T: DeserializeOwned,
        D: Serialize,
    {
        let response = self.add_session_cookie(req).json(data).send().await?;
        into_json(response).await
    }
}

async fn into_json<T>(response: Response) -> Result<T>
where
    T: DeserializeOwned,
{
    if response.status().is_success() {
        Ok(response.json().await?)
    } else {
        Err(into_error(response).await)
    }
}

async fn into_error(response: Response) -> ClientError {
    let status = response.status();
    let body = response.json::<ErrorBody>().await.ok();
    debug!(status = %status, body = ?body, "API request failed");

    match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthenticated,
        StatusCode::NOT_FOUND => ClientError::NotFound,
        _ => match body {
            Some(body) if body.code == "VALIDATION_ERROR" => ClientError::Validation(body.error),
            Some(body) => ClientError::Server {
                status: status.as_u16(),
                message: body.error,
            },
            None => ClientError::Server {
                status: status.as_u16(),
                message: status.to_string(),
            },
        },
    }
}

#[async_trait(?Send)]
impl RestaurantApi for HttpRestaurantApi {
    async fn current_user(&self) -> Result<Option<CurrentUser>> {
        let url = format!("{}/user", self.url);
        match self.send(self.client.get(&url)).await {
            Ok(user) => Ok(Some(user)),
            Err(ClientError::Unauthenticated) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list(&self) -> Result<Vec<Restaurant>> {
        let url = format!("{}/user/restaurants", self.url);
        self.send(self.client.get(&url)).await
    }

    async fn create(&self, data: &CreateRestaurant) -> Result<Restaurant> {
        let url = format!("{}/user/restaurants", self.url);
        self.send_json(self.client.post(&url), data).await
    }

    async fn update(&self, id: &str, patch: &RestaurantPatch) -> Result<Restaurant> {
        let url = format!("{}/user/restaurants/{}", self.url, urlencoding::encode(id));
        self.send_json(self.client.put(&url), patch).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = format!("{}/user/restaurants/{}", self.url, urlencoding::encode(id));
        let response = self.add_session_cookie(self.client.delete(&url)).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(into_error(response).await)
        }
    }

    async fn logout(&self) -> Result<()> {
        let url = format!("{}/auth/logout", self.url);
        let response = self.add_session_cookie(self.client.post(&url)).send().await?;
        self.set_session(None);

        // the server answers with a redirect to the frontend
        if response.status().is_success() || response.status().is_redirection() {
            Ok(())
        } else {
            Err(into_error(response).await)
        }
    }
}
