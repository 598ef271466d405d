use std::{collections::BTreeMap, fmt::Display};

use parcel_engine::{
    db_types::OrderId,
    helpers::split_tokens,
    order_objects::StatusChoice,
    traits::ParticipantQuery,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: StatusChoice,
    /// Clear every subscriber's watermark first so that all of them are notified.
    #[serde(default)]
    pub force: bool,
}

/// Order ids can be given as a list, as a free-text blob (as pasted into the staff chat), or both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkOrdersRequest {
    #[serde(default)]
    pub order_ids: Vec<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl BulkOrdersRequest {
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = self.order_ids.clone();
        if let Some(text) = &self.text {
            tokens.extend(split_tokens(text).into_iter().map(String::from));
        }
        tokens
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkStatusRequest {
    #[serde(flatten)]
    pub orders: BulkOrdersRequest,
    pub status: StatusChoice,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReminderRequest {
    /// Replaces the default reminder text.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantsRequest {
    pub usernames: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub user_id: i64,
    pub order_id: String,
}

impl SubscriptionRequest {
    pub fn order_id(&self) -> OrderId {
        OrderId::normalize(&self.order_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentOrdersParams {
    #[serde(default)]
    pub limit: Option<u32>,
}

/// `status` holds one status, or several separated by `|`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusFilterParams {
    pub status: String,
}

impl StatusFilterParams {
    pub fn statuses(&self) -> Vec<String> {
        self.status.split('|').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteSearchParams {
    pub q: String,
}

/// Query string form of [`ParticipantQuery`]. The order id is normalised before it reaches the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantSearchParams {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub paid: Option<bool>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

impl From<ParticipantSearchParams> for ParticipantQuery {
    fn from(params: ParticipantSearchParams) -> Self {
        let mut query = ParticipantQuery::default();
        if let Some(order_id) = params.order_id.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.with_order_id(OrderId::normalize(order_id));
        }
        if let Some(paid) = params.paid {
            query = query.with_paid(paid);
        }
        if let Some(search) = params.search {
            query = query.with_search(search);
        }
        let limit = params.limit.unwrap_or(query.limit);
        query.with_page(limit, params.offset.unwrap_or_default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusListEntry {
    pub index: usize,
    pub label: String,
}

/// A machine-readable report plus the text the staff chat would show for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizedReport<T> {
    pub report: T,
    pub summary: String,
}

impl<T> SummarizedReport<T> {
    pub fn new(report: T, summary: String) -> Self {
        Self { report, summary }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnpaidReport {
    pub orders: BTreeMap<OrderId, Vec<String>>,
    pub summary: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bulk_tokens_merge_list_and_text() {
        let req: BulkStatusRequest = serde_json::from_str(
            r#"{"order_ids": ["cn-1"], "text": "KR-2, kr-3\nnonsense", "status": {"index": 4}}"#,
        )
        .unwrap();
        assert_eq!(req.status, StatusChoice::Index(4));
        assert_eq!(req.orders.tokens(), ["cn-1", "KR-2", "kr-3", "nonsense"]);
    }

    #[test]
    fn participant_params() {
        let params = ParticipantSearchParams {
            order_id: Some(" cn-7 ".into()),
            paid: Some(false),
            limit: Some(10),
            ..Default::default()
        };
        let query = ParticipantQuery::from(params);
        assert_eq!(query.order_id, Some(OrderId::from("CN-7")));
        assert_eq!(query.paid, Some(false));
        assert_eq!(query.limit, 10);
        assert_eq!(query.offset, 0);
        assert_eq!(ParticipantQuery::from(ParticipantSearchParams::default()), ParticipantQuery::default());
    }

    #[test]
    fn status_filters() {
        let params = StatusFilterParams { status: "🛒 Purchased| 🚚 Shipped ||".into() };
        assert_eq!(params.statuses(), ["🛒 Purchased", "🚚 Shipped"]);
    }
}
