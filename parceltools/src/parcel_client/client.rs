use std::fmt::Display;

use anyhow::{anyhow, Result};
use log::debug;
use parcel_engine::{
    db_types::{Order, Participant},
    order_objects::{ClientStatus, OrderView, StatusChangeResult, StatusChoice},
    BroadcastReport,
    BulkReport,
    ImportReport,
    ImportRow,
    ReminderReport,
};
use parcel_server::{
    data_objects::{
        BulkOrdersRequest,
        BulkStatusRequest,
        ReminderRequest,
        StatusListEntry,
        StatusUpdateRequest,
        SummarizedReport,
        UnpaidReport,
    },
    middleware::ADMIN_ID_HEADER,
};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
    RequestBuilder,
    Response,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use crate::config::ClientConfig;

pub struct ParcelServerClient {
    client: Client,
    config: ClientConfig,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl ParcelServerClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .user_agent("Parcel Tracker Client")
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create the HTTP client. {e}"))?;
        Ok(Self { client, config })
    }

    pub fn server(&self) -> &Url {
        &self.config.server
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        self.config.server.join(path).map_err(|e| anyhow!("Failed to join URL: {}", e))
    }

    pub async fn health(&self) -> Result<String> {
        let res = self.client.get(self.url("/health")?).send().await?;
        Ok(res.text().await?)
    }

    /// The client-facing status query. This is the only call that does not need an admin id.
    pub async fn client_status(&self, order_id: &str) -> Result<ClientStatus> {
        let id = urlencoding::encode(order_id.trim());
        let res = self.client.get(self.url(&format!("/status/{id}"))?).send().await?;
        read_json(res, "query the order status").await
    }

    pub async fn statuses(&self) -> Result<Vec<StatusListEntry>> {
        self.admin_get("/api/statuses", &[]).await
    }

    pub async fn recent_orders(&self, limit: u32) -> Result<Vec<Order>> {
        self.admin_get("/api/orders/recent", &[("limit", limit.to_string())]).await
    }

    pub async fn orders_by_status(&self, statuses: &[String]) -> Result<Vec<Order>> {
        self.admin_get("/api/orders/by_status", &[("status", statuses.join("|"))]).await
    }

    pub async fn search_orders(&self, fragment: &str) -> Result<Vec<Order>> {
        self.admin_get("/api/orders/search", &[("q", fragment.to_string())]).await
    }

    pub async fn order_view(&self, order_id: &str) -> Result<OrderView> {
        let id = urlencoding::encode(order_id.trim());
        self.admin_get(&format!("/api/orders/{id}"), &[]).await
    }

    pub async fn orders_for_participant(&self, username: &str) -> Result<Vec<Order>> {
        let name = urlencoding::encode(username.trim().trim_start_matches('@'));
        self.admin_get(&format!("/api/participants/{name}/orders"), &[]).await
    }

    pub async fn set_status(&self, order_id: &str, status: StatusChoice, force: bool) -> Result<StatusChangeResult> {
        let id = urlencoding::encode(order_id.trim());
        let body = StatusUpdateRequest { status, force };
        self.admin_send(Method::POST, &format!("/api/orders/{id}/status"), &body, "change the status").await
    }

    pub async fn bulk_status(&self, request: &BulkStatusRequest) -> Result<SummarizedReport<BulkReport>> {
        self.admin_send(Method::POST, "/api/orders/bulk/status", request, "run the bulk status update").await
    }

    pub async fn bulk_delete(&self, request: &BulkOrdersRequest) -> Result<SummarizedReport<BulkReport>> {
        self.admin_send(Method::POST, "/api/orders/bulk/delete", request, "run the bulk delete").await
    }

    pub async fn import_orders(&self, rows: &[ImportRow]) -> Result<SummarizedReport<ImportReport>> {
        self.admin_send(Method::POST, "/api/orders/import", rows, "import orders").await
    }

    pub async fn unpaid_report(&self) -> Result<UnpaidReport> {
        self.admin_get("/api/participants/unpaid", &[]).await
    }

    pub async fn toggle_paid(&self, order_id: &str, username: &str) -> Result<Participant> {
        let id = urlencoding::encode(order_id.trim());
        let name = urlencoding::encode(username.trim().trim_start_matches('@'));
        let path = format!("/api/orders/{id}/participants/{name}/paid");
        self.admin_send(Method::POST, &path, &(), "toggle the paid flag").await
    }

    pub async fn remind_unpaid(
        &self,
        order_id: &str,
        message: Option<String>,
    ) -> Result<SummarizedReport<ReminderReport>> {
        let id = urlencoding::encode(order_id.trim());
        let body = ReminderRequest { message };
        self.admin_send(Method::POST, &format!("/api/orders/{id}/remind"), &body, "send reminders").await
    }

    pub async fn broadcast_reminders(&self, message: Option<String>) -> Result<SummarizedReport<BroadcastReport>> {
        let body = ReminderRequest { message };
        self.admin_send(Method::POST, "/api/reminders/broadcast", &body, "broadcast reminders").await
    }

    fn with_admin(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        let admin_id = self
            .config
            .admin_id
            .ok_or_else(|| anyhow!("No admin id is configured. Set PARCEL_ADMIN_ID or pass --admin."))?;
        Ok(builder.header(ADMIN_ID_HEADER, admin_id.to_string()))
    }

    async fn admin_get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path)?;
        debug!("GET {url}");
        let res = self.with_admin(self.client.get(url).query(query))?.send().await?;
        read_json(res, &format!("fetch {path}")).await
    }

    async fn admin_send<B, T>(&self, method: Method, path: &str, body: &B, what: &str) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        debug!("{method} {url}");
        let res = self.with_admin(self.client.request(method, url).json(body))?.send().await?;
        read_json(res, what).await
    }
}

impl Display for ParcelServerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.server())?;
        match self.config.admin_id {
            Some(id) => write!(f, " (admin {id})"),
            None => write!(f, " (anonymous)"),
        }
    }
}

async fn read_json<T: DeserializeOwned>(res: Response, what: &str) -> Result<T> {
    let code = res.status();
    if code.is_success() {
        return Ok(res.json().await?);
    }
    let body = res.text().await?;
    Err(anyhow!("Error {code}. Could not {what}. {}", error_message(&body)))
}

/// The server answers failures with `{"error": "..."}`. Anything else is shown as is.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body).map(|e| e.error).unwrap_or_else(|_| body.trim().to_string())
}
