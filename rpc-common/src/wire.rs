//! # Wire Envelopes
//!
//! The two schema-serialized payloads that ride inside a [`crate::codec`]
//! frame. Both are plain `serde` structs; the "schema compiler" the
//! specification treats as an external collaborator is modeled here as
//! `bincode`, so any `Serialize + Deserialize` request/response type can be
//! carried in `params`/`content` without this crate knowing its shape.

use serde::{Deserialize, Serialize};

/// Request envelope sent from client to server: `service/method` plus the
/// already-serialized request message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcHeader {
    pub service_name: String,
    pub method_name: String,
    pub params: Vec<u8>,
}

impl RpcHeader {
    pub fn new(service_name: impl Into<String>, method_name: impl Into<String>, params: Vec<u8>) -> Self {
        RpcHeader {
            service_name: service_name.into(),
            method_name: method_name.into(),
            params,
        }
    }
}

/// Request envelope the proxy frontend reads off its inbound listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeader {
    pub message_id: u32,
    pub content: Vec<u8>,
}

impl RequestHeader {
    pub fn new(message_id: u32, content: Vec<u8>) -> Self {
        RequestHeader { message_id, content }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    #[test]
    fn rpc_header_round_trips() {
        let header = RpcHeader::new("UserService", "Login", b"params".to_vec());
        let encoded = codec::encode_payload(&header).unwrap();
        let decoded: RpcHeader = codec::decode_payload(&encoded).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn request_header_round_trips() {
        let header = RequestHeader::new(7, b"content".to_vec());
        let encoded = codec::encode_payload(&header).unwrap();
        let decoded: RequestHeader = codec::decode_payload(&encoded).unwrap();
        assert_eq!(header, decoded);
    }
}
