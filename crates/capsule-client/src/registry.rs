//! Registry reads: registry object → member ids → capsule records

use crate::{
    rpc::{ObjectDataOptions, ObjectResponse, SuiRpc},
    types::{ObjectId, RawCapsuleRecord},
    CapsuleError, Result,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registry field holding member capsule ids
const MEMBERS_FIELD: &str = "capsules";

/// Reads the capsule registry. Holds no state, so every call re-fetches.
#[derive(Clone)]
pub struct RegistryReader {
    rpc: Arc<dyn SuiRpc>,
}

impl RegistryReader {
    pub fn new(rpc: Arc<dyn SuiRpc>) -> Self {
        Self { rpc }
    }

    /// Fetch every well-formed capsule listed by the registry
    pub async fn fetch_capsules(&self, registry_id: ObjectId) -> Result<Vec<RawCapsuleRecord>> {
        let registry = self
            .rpc
            .get_object(registry_id, ObjectDataOptions::with_content())
            .await?;

        let ids = member_ids(registry_id, &registry)?;
        if ids.is_empty() {
            debug!("Registry {} has no capsules", registry_id);
            return Ok(Vec::new());
        }

        let requested = ids.len();
        let members = self
            .rpc
            .multi_get_objects(ids, ObjectDataOptions::with_content())
            .await?;

        let records: Vec<RawCapsuleRecord> = members.iter().filter_map(parse_capsule).collect();
        info!(
            "Fetched {} of {} capsules from registry {}",
            records.len(),
            requested,
            registry_id
        );
        Ok(records)
    }
}

fn member_ids(registry_id: ObjectId, registry: &ObjectResponse) -> Result<Vec<ObjectId>> {
    let invalid = |reason: &str| CapsuleError::InvalidRegistry(format!("{registry_id}: {reason}"));

    let data = registry.data.as_ref().ok_or_else(|| invalid("object not found"))?;
    let (_, fields) = data
        .move_object()
        .ok_or_else(|| invalid("not a Move object"))?;

    let members = fields
        .get(MEMBERS_FIELD)
        .ok_or_else(|| invalid("no capsules field"))?;
    serde_json::from_value(members.clone())
        .map_err(|e| invalid(&format!("malformed member list: {e}")))
}

/// Parse one member; anything malformed is dropped
fn parse_capsule(response: &ObjectResponse) -> Option<RawCapsuleRecord> {
    let data = response.data.as_ref()?;
    let Some((_, fields)) = data.move_object() else {
        warn!("Skipping capsule {}: not a Move object", data.object_id);
        return None;
    };

    // The record id comes from the object, not the nested UID field
    let mut fields = fields.clone();
    fields.insert("id".to_string(), Value::String(data.object_id.to_hex_literal()));

    match serde_json::from_value(Value::Object(fields)) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Skipping malformed capsule {}: {}", data.object_id, e);
            None
        }
    }
}
