//! JSON-RPC access to a Sui fullnode

use crate::{
    types::{ObjectId, SuiAddress},
    wallet::SignedTransaction,
    CapsuleError, Config, Result,
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

// ================================
// Request Options
// ================================

/// Which parts of an object the fullnode should return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDataOptions {
    pub show_type: bool,
    pub show_content: bool,
    pub show_display: bool,
    pub show_owner: bool,
}

impl ObjectDataOptions {
    /// Type plus fully expanded Move fields
    pub fn with_content() -> Self {
        Self {
            show_type: true,
            show_content: true,
            ..Self::default()
        }
    }

    pub fn with_display(mut self) -> Self {
        self.show_display = true;
        self
    }
}

/// Filter for `suix_getOwnedObjects`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ObjectFilter {
    StructType(String),
    MatchAny(Vec<ObjectFilter>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedObjectsQuery {
    pub filter: Option<ObjectFilter>,
    pub options: ObjectDataOptions,
}

// ================================
// Response Types
// ================================

/// One entry of `sui_getObject` / `sui_multiGetObjects`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ObjectResponse {
    pub data: Option<ObjectData>,
    pub error: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectData {
    pub object_id: ObjectId,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(rename = "type", default)]
    pub object_type: Option<String>,
    /// Kept untyped so one malformed member cannot fail a whole batch
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub display: Option<DisplayResponse>,
}

impl ObjectData {
    /// Fields and type of a Move object; `None` for packages or missing content
    pub fn move_object(&self) -> Option<(&str, &Map<String, Value>)> {
        let content = self.content.as_ref()?.as_object()?;
        if content.get("dataType")?.as_str()? != "moveObject" {
            return None;
        }
        let object_type = content.get("type").and_then(Value::as_str).unwrap_or_default();
        let fields = content.get("fields")?.as_object()?;
        Some((object_type, fields))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DisplayResponse {
    pub data: Option<Map<String, Value>>,
}

/// Page of `suix_getOwnedObjects`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectsPage {
    pub data: Vec<ObjectResponse>,
    pub next_cursor: Option<ObjectId>,
    pub has_next_page: bool,
}

/// Response of `sui_executeTransactionBlock`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBlockResponse {
    pub digest: String,
    #[serde(default)]
    pub effects: Option<TransactionEffects>,
    #[serde(default)]
    pub object_changes: Option<Vec<ObjectChange>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionEffects {
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExecutionStatus {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Object change reported by the fullnode; only creations are inspected
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ObjectChange {
    Created {
        #[serde(rename = "objectId")]
        object_id: ObjectId,
        #[serde(rename = "objectType")]
        object_type: String,
    },
    #[serde(other)]
    Other,
}

// ================================
// RPC Trait
// ================================

/// Remote calls the client depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SuiRpc: Send + Sync {
    async fn get_object(&self, id: ObjectId, options: ObjectDataOptions) -> Result<ObjectResponse>;

    async fn multi_get_objects(
        &self,
        ids: Vec<ObjectId>,
        options: ObjectDataOptions,
    ) -> Result<Vec<ObjectResponse>>;

    async fn get_owned_objects(
        &self,
        owner: SuiAddress,
        query: OwnedObjectsQuery,
        cursor: Option<ObjectId>,
    ) -> Result<ObjectsPage>;

    async fn execute_transaction_block(
        &self,
        signed: SignedTransaction,
    ) -> Result<TransactionBlockResponse>;
}

// ================================
// HTTP Implementation
// ================================

/// JSON-RPC request envelope
#[derive(Debug, Serialize)]
struct RpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: Value,
}

/// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// `SuiRpc` over HTTP
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.rpc_timeout)
            .build()?;

        Ok(Self {
            http,
            url: config.rpc_url.clone(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &'static str, params: Value) -> Result<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!("RPC {} (id {})", method, request.id);

        let response: RpcResponse<T> = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(CapsuleError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        response.result.ok_or_else(|| CapsuleError::Rpc {
            code: -32603,
            message: format!("{method} returned neither result nor error"),
        })
    }
}

#[async_trait]
impl SuiRpc for JsonRpcClient {
    async fn get_object(&self, id: ObjectId, options: ObjectDataOptions) -> Result<ObjectResponse> {
        self.call("sui_getObject", json!([id, options])).await
    }

    async fn multi_get_objects(
        &self,
        ids: Vec<ObjectId>,
        options: ObjectDataOptions,
    ) -> Result<Vec<ObjectResponse>> {
        self.call("sui_multiGetObjects", json!([ids, options])).await
    }

    async fn get_owned_objects(
        &self,
        owner: SuiAddress,
        query: OwnedObjectsQuery,
        cursor: Option<ObjectId>,
    ) -> Result<ObjectsPage> {
        self.call("suix_getOwnedObjects", json!([owner, query, cursor, Value::Null]))
            .await
    }

    async fn execute_transaction_block(
        &self,
        signed: SignedTransaction,
    ) -> Result<TransactionBlockResponse> {
        let options = json!({
            "showEffects": true,
            "showObjectChanges": true,
            "showRawEffects": true,
        });
        self.call(
            "sui_executeTransactionBlock",
            json!([
                signed.tx_bytes,
                signed.signatures,
                options,
                "WaitForLocalExecution"
            ]),
        )
        .await
    }
}
