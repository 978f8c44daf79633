use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A response as stored in the cache: status, ordered headers and body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    #[serde(with = "body_base64")]
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of the header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

mod body_base64 {
    use super::*;

    pub fn serialize<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded)
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_body_survives_json() {
        let response = CachedResponse::new(
            200,
            vec![("content-type".to_string(), "image/png".to_string())],
            Bytes::from_static(&[0x89, b'P', b'N', b'G', 0x00, 0xff]),
        );
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"iVBORwD/\""));
        let back: CachedResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, response);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let response = CachedResponse::new(
            404,
            vec![("Cache-Control".to_string(), "public".to_string())],
            Bytes::new(),
        );
        assert_eq!(response.header("cache-control"), Some("public"));
        assert_eq!(response.header("content-type"), None);
        assert!(!response.is_success());
    }
}
