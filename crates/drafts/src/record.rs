use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One named in-progress snapshot. Several drafts may exist for the same
/// `(template_key, version)` pair; the name tells them apart, the id is
/// derived from the pair plus the creation instant so it never collides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    pub draft_id: String,
    pub name: String,
    pub template_key: String,
    pub version: String,
    pub data: Value,
    pub updated_at: DateTime<Utc>,
}

impl DraftRecord {
    pub fn new(
        name: impl Into<String>,
        template_key: impl Into<String>,
        version: impl Into<String>,
        data: Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        let template_key = template_key.into();
        let version = version.into();
        let draft_id = derive_id(&template_key, &version, created_at);
        Self {
            draft_id,
            name: name.into(),
            template_key,
            version,
            data,
            updated_at: created_at,
        }
    }
}

fn derive_id(template_key: &str, version: &str, created_at: DateTime<Utc>) -> String {
    format!(
        "{template_key}:{version}:{}",
        created_at.timestamp_millis()
    )
}
