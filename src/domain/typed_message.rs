//! Typed message contract layered over raw [`super::Envelope`] tags.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A payload type bound to a fixed wire tag.
///
/// Implementors can be published with
/// [`crate::client::ClientAdapter::send_typed`] and subscribed to with
/// [`crate::client::ClientAdapter::on`].
pub trait TypedMessage: Serialize + DeserializeOwned {
    /// Wire tag carried in the envelope's `type` field.
    const TYPE: &'static str;
}

/// Anti-forgery token header shared between tabs.
///
/// When one tab receives a fresh token it publishes it so every other tab
/// can attach the same header to its next request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct CsrfToken {
    /// Header name, e.g. `x-csrf-header`.
    pub name: String,
    /// Token value.
    pub value: String,
}

impl TypedMessage for CsrfToken {
    const TYPE: &'static str = "CSRF_TOKEN";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csrf_token_wire_shape() {
        let token = CsrfToken {
            name: "x-csrf-header".to_string(),
            value: "abc".to_string(),
        };
        let value = serde_json::to_value(&token).unwrap_or_default();
        assert_eq!(value, serde_json::json!({"name": "x-csrf-header", "value": "abc"}));
        assert_eq!(CsrfToken::TYPE, "CSRF_TOKEN");
    }
}
