//! Wire types shared by the registration handshake and user sends.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::role::Role;

/// Role-specific fields the caller attaches to the registration payload
/// (e.g. an agent's display name and device tag). Configuration, not a
/// bootstrapper concern.
pub type RegistrationExtras = serde_json::Map<String, Value>;

/// The unit sent over an established connection, and the persisted history
/// entry. Append-only; equality and identity are irrelevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub request_type: String,
    pub data: Value,
}

/// Build the single registration frame for a role.
///
/// The issued token always rides in `data`; extras are merged in after it.
pub fn registration_record(role: Role, token: &str, extras: &RegistrationExtras) -> MessageRecord {
    let mut data = serde_json::Map::new();
    data.insert("token".to_string(), Value::String(token.to_string()));
    for (key, value) in extras {
        data.insert(key.clone(), value.clone());
    }
    MessageRecord {
        request_type: role.registration_request_type(),
        data: Value::Object(data),
    }
}
