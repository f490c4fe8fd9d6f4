//! NFTs owned by the connected address

use crate::{
    rpc::{ObjectDataOptions, ObjectFilter, ObjectResponse, OwnedObjectsQuery, SuiRpc},
    types::{ObjectId, SuiAddress},
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

/// Struct type listed when no other type is requested
pub const DEFAULT_NFT_TYPE: &str = "0x2::devnet_nft::DevNetNFT";

/// Display summary of one NFT
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NftSummary {
    pub id: ObjectId,
    pub name: String,
    pub collection: String,
    pub image_url: String,
    pub description: String,
}

impl NftSummary {
    fn from_response(response: &ObjectResponse) -> Option<Self> {
        let data = response.data.as_ref()?;
        let empty = Map::new();
        let display = data
            .display
            .as_ref()
            .and_then(|d| d.data.as_ref())
            .unwrap_or(&empty);
        let text = |key: &str| display.get(key).and_then(Value::as_str).map(str::to_string);

        Some(Self {
            id: data.object_id,
            name: text("name").unwrap_or_else(|| "Unknown NFT".to_string()),
            collection: text("collection").unwrap_or_else(|| "Unknown Collection".to_string()),
            image_url: text("image_url").or_else(|| text("image")).unwrap_or_default(),
            description: text("description").unwrap_or_default(),
        })
    }
}

/// All NFTs of `struct_type` owned by `owner`. Errors are logged and yield
/// an empty list.
pub async fn fetch_owned_nfts(rpc: &dyn SuiRpc, owner: SuiAddress, struct_type: &str) -> Vec<NftSummary> {
    let query = OwnedObjectsQuery {
        filter: Some(ObjectFilter::MatchAny(vec![ObjectFilter::StructType(
            struct_type.to_string(),
        )])),
        options: ObjectDataOptions::with_content().with_display(),
    };

    let mut nfts = Vec::new();
    let mut cursor = None;
    loop {
        let page = match rpc.get_owned_objects(owner, query.clone(), cursor).await {
            Ok(page) => page,
            Err(e) => {
                error!("Error fetching NFTs for {}: {}", owner, e);
                return Vec::new();
            }
        };

        nfts.extend(page.data.iter().filter_map(NftSummary::from_response));

        match page.next_cursor {
            Some(next) if page.has_next_page && cursor != Some(next) => cursor = Some(next),
            Some(next) if page.has_next_page => {
                warn!("Node repeated cursor {} for {}, stopping", next, owner);
                break;
            }
            _ => break,
        }
    }

    debug!("Found {} NFTs for {}", nfts.len(), owner);
    nfts
}
