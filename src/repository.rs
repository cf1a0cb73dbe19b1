//! Card repository: the list/create/delete calls against the remote API.
//!
//! `CardRepository` is the seam the controller depends on. The production
//! implementation, `HttpCardRepository`, issues one request per call with no
//! retry, and turns every non-2xx status or transport failure into a
//! `RepoError`. It never touches controller state; reflecting results into
//! the form and saved-card list is the controller's job.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::card::{FormFields, SavedCard};
use crate::error::{RepoError, RepoResult, RequestFailure};

const LIST_PATH: &str = "CreditCard/CardList";
const CREATE_PATH: &str = "CreditCard/New";
const DELETE_PATH: &str = "CreditCard/Delete/";

/// Persistence operations for card records.
///
/// The returned futures are `Send` so the controller can run on a spawned
/// tokio task.
pub trait CardRepository: Send + Sync {
    fn list_cards(&self) -> impl Future<Output = RepoResult<Vec<SavedCard>>> + Send;

    fn create_card(
        &self,
        fields: &FormFields,
    ) -> impl Future<Output = RepoResult<SavedCard>> + Send;

    fn delete_card(&self, id: &str) -> impl Future<Output = RepoResult<()>> + Send;
}

// ── Configuration ────────────────────────────────────────────────────────────

/// Where the API lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Absolute base URL, always ending in `/`.
    pub base_url: String,
    /// `None` means requests may hang indefinitely.
    pub timeout: Option<Duration>,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Parse and normalize an API base URL given on the command line.
///
/// Only absolute `http`/`https` URLs are accepted. A trailing `/` is added
/// when missing so endpoint paths land beneath the base path.
pub fn parse_base_url(raw: &str) -> Result<String, String> {
    let url = Url::parse(raw.trim()).map_err(|e| format!("invalid URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme `{}`", url.scheme()));
    }
    // Endpoint paths are appended to the base, so it must end in its path.
    if url.query().is_some() || url.fragment().is_some() {
        return Err("base URL must not carry a query or fragment".to_string());
    }
    let mut base = url.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Ok(base)
}

// ── HTTP implementation ──────────────────────────────────────────────────────

/// `CardRepository` backed by the JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpCardRepository {
    client: Client,
    base_url: String,
}

impl HttpCardRepository {
    pub fn new(config: &ApiConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn delete_endpoint(&self, id: &str) -> String {
        self.endpoint(&format!("{DELETE_PATH}{}", urlencoding::encode(id)))
    }
}

impl CardRepository for HttpCardRepository {
    async fn list_cards(&self) -> RepoResult<Vec<SavedCard>> {
        let url = self.endpoint(LIST_PATH);
        debug!(%url, "listing cards");
        let response = send_checked(self.client.get(&url))
            .await
            .map_err(RepoError::Fetch)?;
        let cards: Vec<SavedCard> = decode(response).await.map_err(RepoError::Fetch)?;
        info!(count = cards.len(), "fetched saved cards");
        Ok(cards)
    }

    async fn create_card(&self, fields: &FormFields) -> RepoResult<SavedCard> {
        let url = self.endpoint(CREATE_PATH);
        debug!(%url, "creating card");
        let response = send_checked(self.client.post(&url).json(fields))
            .await
            .map_err(RepoError::Save)?;
        let card: SavedCard = decode(response).await.map_err(RepoError::Save)?;
        info!(id = %card.id, "card saved");
        Ok(card)
    }

    async fn delete_card(&self, id: &str) -> RepoResult<()> {
        let url = self.delete_endpoint(id);
        debug!(%url, "deleting card");
        send_checked(self.client.delete(&url))
            .await
            .map_err(|source| RepoError::Delete {
                id: id.to_string(),
                source,
            })?;
        info!(id, "card deleted");
        Ok(())
    }
}

/// Send a request and reject anything but a 2xx answer.
async fn send_checked(request: RequestBuilder) -> Result<Response, RequestFailure> {
    let response = request.send().await.map_err(RequestFailure::Transport)?;
    let status = response.status();
    if !status.is_success() {
        return Err(RequestFailure::Status(status));
    }
    Ok(response)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RequestFailure> {
    response.json::<T>().await.map_err(|e| {
        if e.is_decode() {
            RequestFailure::Decode(e)
        } else {
            RequestFailure::Transport(e)
        }
    })
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        extract::{Path, State},
        http::StatusCode as ServerStatus,
        routing::{delete, get, post},
    };
    use serde_json::{Value, json};

    use super::*;

    /// Serve `router` on an ephemeral loopback port and return the API base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/api/")
    }

    fn repo(base_url: &str) -> HttpCardRepository {
        HttpCardRepository::new(&ApiConfig::new(base_url)).unwrap()
    }

    fn fields() -> FormFields {
        FormFields {
            card_number: "4111111111111111".into(),
            expiry_date: "12/25".into(),
            cardholder_name: "Jose Perez".into(),
            cvv: "123".into(),
        }
    }

    type Received = Arc<Mutex<Vec<Value>>>;

    async fn echo_create(State(received): State<Received>, Json(body): Json<Value>) -> Json<Value> {
        received.lock().unwrap().push(body.clone());
        let mut card = body;
        card["id"] = json!("1");
        if let Some(obj) = card.as_object_mut() {
            obj.remove("cvv");
        }
        Json(card)
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        assert_eq!(
            parse_base_url("http://localhost:5000/api").unwrap(),
            "http://localhost:5000/api/"
        );
        assert_eq!(
            parse_base_url("https://cards.example.com/").unwrap(),
            "https://cards.example.com/"
        );
    }

    #[test]
    fn base_url_rejects_relative_and_foreign_schemes() {
        assert!(parse_base_url("api/").is_err());
        assert!(parse_base_url("ftp://example.com/").is_err());
    }

    #[test]
    fn base_url_rejects_query_and_fragment() {
        assert!(parse_base_url("http://localhost:5000/api?key=v").is_err());
        assert!(parse_base_url("http://localhost:5000/api/?").is_err());
        assert!(parse_base_url("http://localhost:5000/api#top").is_err());
    }

    #[test]
    fn endpoints_join_beneath_base() {
        let repo = repo("http://localhost:5000/api/");
        assert_eq!(
            repo.endpoint(LIST_PATH),
            "http://localhost:5000/api/CreditCard/CardList"
        );
        assert_eq!(
            repo.delete_endpoint("card 7"),
            "http://localhost:5000/api/CreditCard/Delete/card%207"
        );
    }

    #[tokio::test]
    async fn list_decodes_cards() {
        let router = Router::new().route(
            "/api/CreditCard/CardList",
            get(|| async {
                Json(json!([
                    {"id": "1", "cardNumber": "4111111111111111", "expiryDate": "12/25", "cardholderName": "Jose Perez"},
                    {"id": 2, "cardNumber": "5375441145400954", "expiryDate": "06/24", "cardholderName": "Ana"}
                ]))
            }),
        );
        let base = serve(router).await;

        let cards = repo(&base).list_cards().await.unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].id, "1");
        assert_eq!(cards[0].cardholder_name, "Jose Perez");
        assert_eq!(cards[1].id, "2");
    }

    #[tokio::test]
    async fn list_with_bad_body_is_a_decode_failure() {
        let router = Router::new().route(
            "/api/CreditCard/CardList",
            get(|| async { Json(json!({"not": "a list"})) }),
        );
        let base = serve(router).await;

        let err = repo(&base).list_cards().await.unwrap_err();
        assert!(matches!(err, RepoError::Fetch(RequestFailure::Decode(_))));
    }

    #[tokio::test]
    async fn create_posts_json_and_returns_server_record() {
        let received: Received = Arc::default();
        let router = Router::new()
            .route("/api/CreditCard/New", post(echo_create))
            .with_state(received.clone());
        let base = serve(router).await;

        let card = repo(&base).create_card(&fields()).await.unwrap();
        assert_eq!(
            card,
            SavedCard {
                id: "1".into(),
                card_number: "4111111111111111".into(),
                expiry_date: "12/25".into(),
                cardholder_name: "Jose Perez".into(),
            }
        );

        let bodies = received.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["cardNumber"], "4111111111111111");
        assert_eq!(bodies[0]["cvv"], "123");
    }

    #[tokio::test]
    async fn create_rejected_by_server_is_a_save_error() {
        let router = Router::new().route(
            "/api/CreditCard/New",
            post(|| async { ServerStatus::INTERNAL_SERVER_ERROR }),
        );
        let base = serve(router).await;

        let err = repo(&base).create_card(&fields()).await.unwrap_err();
        match err {
            RepoError::Save(RequestFailure::Status(status)) => assert_eq!(status.as_u16(), 500),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_hits_encoded_id_path() {
        let router = Router::new().route(
            "/api/CreditCard/Delete/:id",
            delete(|Path(id): Path<String>| async move {
                if id == "card 7" {
                    ServerStatus::NO_CONTENT
                } else {
                    ServerStatus::NOT_FOUND
                }
            }),
        );
        let base = serve(router).await;
        let repo = repo(&base);

        repo.delete_card("card 7").await.unwrap();

        let err = repo.delete_card("missing").await.unwrap_err();
        match err {
            RepoError::Delete { id, source: RequestFailure::Status(status) } => {
                assert_eq!(id, "missing");
                assert_eq!(status.as_u16(), 404);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_failure() {
        // Bind and immediately drop a listener to get a port nobody serves.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = repo(&format!("http://{addr}/api/"))
            .list_cards()
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Fetch(RequestFailure::Transport(_))));
    }
}
