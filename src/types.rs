use serde::{Deserialize, Serialize};

/// Body of a nonce request: the stark key the issued nonce will be bound to.
///
/// The serialized field name `stark_key` is the wire contract expected by the
/// nonce endpoint and must not change. The key string itself is opaque here:
/// no trimming, normalization, or format checking happens at this layer.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct GetNonceMessage {
    pub stark_key: String,
}

impl GetNonceMessage {
    pub fn new(stark_key: String) -> Self {
        GetNonceMessage { stark_key }
    }
}

/// Nonce value as issued by the server, kept separate from the request shape.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NonceData {
    pub nonce: u64,
}

/// Envelope the nonce endpoint answers with: "OK" status and data on
/// success, an error message otherwise.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GetNonceResponse {
    pub status: String,
    pub error: Option<String>,
    pub data: Option<NonceData>,
}

impl GetNonceResponse {
    pub fn ok(nonce: u64) -> Self {
        GetNonceResponse {
            status: "OK".to_string(),
            error: None,
            data: Some(NonceData { nonce }),
        }
    }

    pub fn error(message: String) -> Self {
        GetNonceResponse {
            status: "ERROR".to_string(),
            error: Some(message),
            data: None,
        }
    }
}

/// A replay-protected request: the signature covers the nonce together with
/// the message bytes, so a captured nonce cannot be reused for new content.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignedRequest {
    pub stark_key: String,
    pub nonce: u64,
    pub message: Vec<u8>,
    pub signature: Vec<u8>,
    pub public_key: Vec<u8>,
}

/// Canonical byte string a client signs: the nonce as 8 big-endian bytes
/// followed by the raw message.
pub fn signing_bytes(nonce: u64, message: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + message.len());
    bytes.extend_from_slice(&nonce.to_be_bytes());
    bytes.extend_from_slice(message);
    bytes
}

/// Lowercase hex rendering of public key bytes, used as the stark key
/// identifier.
pub fn hex_key(public_key: &[u8]) -> String {
    format!("0x{}", hex::encode(public_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_message_serializes_to_stark_key_field() {
        let message = GetNonceMessage::new("0x04d".to_string());
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(json, r#"{"stark_key":"0x04d"}"#);
    }

    #[test]
    fn empty_key_is_kept_not_omitted() {
        let message = GetNonceMessage::new(String::new());
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(json, r#"{"stark_key":""}"#);
    }

    #[test]
    fn default_serializes_like_empty_key() {
        let json = serde_json::to_string(&GetNonceMessage::default()).unwrap();
        assert_eq!(json, r#"{"stark_key":""}"#);
    }

    #[test]
    fn nonce_message_deserializes_from_stark_key_field() {
        let message: GetNonceMessage = serde_json::from_str(r#"{"stark_key":"abc123"}"#).unwrap();
        assert_eq!(message.stark_key, "abc123");
    }

    #[test]
    fn missing_stark_key_is_a_deserialization_error() {
        let result = serde_json::from_str::<GetNonceMessage>("{}");
        assert!(result.is_err());
    }

    #[test]
    fn key_value_round_trips_verbatim() {
        for key in ["0x04D3e", "  spaced  ", "ключ日本語", ""] {
            let json = serde_json::to_string(&GetNonceMessage::new(key.to_string())).unwrap();
            let back: GetNonceMessage = serde_json::from_str(&json).unwrap();
            assert_eq!(back.stark_key, key);
        }
    }

    #[test]
    fn reserializing_a_parsed_message_is_idempotent() {
        let input = r#"{"stark_key":"0x04d"}"#;
        let parsed: GetNonceMessage = serde_json::from_str(input).unwrap();
        assert_eq!(serde_json::to_string(&parsed).unwrap(), input);
    }

    #[test]
    fn nonce_response_parses_service_envelope() {
        let json = r#"{"status":"OK","error":"","error_code":0,"data":{"nonce":2}}"#;
        let response: GetNonceResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status, "OK");
        assert_eq!(response.data, Some(NonceData { nonce: 2 }));
    }

    #[test]
    fn error_envelope_carries_no_data() {
        let response = GetNonceResponse::error("stark_key is required".to_string());
        let json = serde_json::to_string(&response).unwrap();
        let back: GetNonceResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, "ERROR");
        assert!(back.data.is_none());
    }

    #[test]
    fn signing_bytes_prefixes_big_endian_nonce() {
        let bytes = signing_bytes(258, b"hi");
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0, 1, 2, b'h', b'i']);
    }

    #[test]
    fn hex_key_is_lowercase_and_prefixed() {
        assert_eq!(hex_key(&[0x00, 0xAB, 0x1f]), "0x00ab1f");
    }
}
