//! HMAC-signed, time-limited download URLs.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature does not match")]
    Mismatch,
    #[error("url expired at {0}")]
    Expired(i64),
}

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("signing key rejected")]
    InvalidKey,
    #[error("invalid public url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("public url `{0}` cannot carry a path")]
    NotABase(String),
}

/// Produces and verifies `?expires=&signature=` query pairs for object URLs.
#[derive(Clone)]
pub struct UrlSigner {
    mac: HmacSha256,
    base_url: Url,
}

impl UrlSigner {
    pub fn new(key: &[u8], base_url: &str) -> Result<Self, SignerError> {
        let mac = HmacSha256::new_from_slice(key).map_err(|_| SignerError::InvalidKey)?;
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(SignerError::NotABase(base_url.to_string()));
        }
        Ok(Self { mac, base_url })
    }

    fn mac(&self, bucket: &str, key: &str, expires: i64) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(format!("GET\n{bucket}\n{key}\n{expires}").as_bytes());
        mac
    }

    pub fn signature(&self, bucket: &str, key: &str, expires: i64) -> String {
        URL_SAFE_NO_PAD.encode(self.mac(bucket, key, expires).finalize().into_bytes())
    }

    /// Build a read URL for `bucket/key` valid for `ttl` from `now`.
    ///
    /// Bucket and key segments are percent-encoded; the `/objects` route
    /// decodes them back before the signature is checked.
    pub fn presign(&self, bucket: &str, key: &str, ttl: Duration, now: DateTime<Utc>) -> String {
        let expires = (now + ttl).timestamp();
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("objects")
                .push(bucket)
                .extend(key.split('/'));
        }
        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string())
            .append_pair("signature", &self.signature(bucket, key, expires));
        url.to_string()
    }

    /// Check a presented signature. Comparison is constant-time.
    pub fn verify(
        &self,
        bucket: &str,
        key: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let presented = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SignatureError::Mismatch)?;
        self.mac(bucket, key, expires)
            .verify_slice(&presented)
            .map_err(|_| SignatureError::Mismatch)?;
        if now.timestamp() > expires {
            return Err(SignatureError::Expired(expires));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> UrlSigner {
        UrlSigner::new(b"test-key", "http://localhost:3000/").unwrap()
    }

    fn query_param<'a>(url: &'a str, name: &str) -> &'a str {
        let query = url.split_once('?').unwrap().1;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix(&format!("{name}=")))
            .unwrap()
    }

    #[test]
    fn presigned_url_layout() {
        let now = Utc::now();
        let url = signer().presign("qr-bucket", "codes/a.png", Duration::seconds(3600), now);
        assert!(url.starts_with("http://localhost:3000/objects/qr-bucket/codes/a.png?expires="));
        assert_eq!(
            query_param(&url, "expires"),
            (now.timestamp() + 3600).to_string()
        );
    }

    #[test]
    fn presigned_url_encodes_path_segments() {
        let now = Utc::now();
        let key = "q%41r/a b?#.png";
        let url = signer().presign("qr-bucket", key, Duration::seconds(3600), now);

        let uri: axum::http::Uri = url.parse().unwrap();
        assert_eq!(uri.path(), "/objects/qr-bucket/q%2541r/a%20b%3F%23.png");
        let expires = (now.timestamp() + 3600).to_string();
        assert_eq!(query_param(&url, "expires"), expires);
        assert_eq!(
            query_param(&url, "signature"),
            signer().signature("qr-bucket", key, now.timestamp() + 3600)
        );
    }

    #[test]
    fn keeps_base_url_path_prefix() {
        let signer = UrlSigner::new(b"k", "https://cdn.example.com/qr/").unwrap();
        let url = signer.presign("qr-bucket", "a.png", Duration::seconds(60), Utc::now());
        assert!(url.starts_with("https://cdn.example.com/qr/objects/qr-bucket/a.png?expires="));
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            UrlSigner::new(b"k", "not a url"),
            Err(SignerError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            UrlSigner::new(b"k", "mailto:qr@example.com"),
            Err(SignerError::NotABase(_))
        ));
    }

    #[test]
    fn verifies_own_signature() {
        let now = Utc::now();
        let url = signer().presign("qr-bucket", "codes/a.png", Duration::seconds(3600), now);
        let expires: i64 = query_param(&url, "expires").parse().unwrap();
        let sig = query_param(&url, "signature");

        assert_eq!(signer().verify("qr-bucket", "codes/a.png", expires, sig, now), Ok(()));
    }

    #[test]
    fn rejects_tampering() {
        let now = Utc::now();
        let expires = now.timestamp() + 60;
        let sig = signer().signature("qr-bucket", "codes/a.png", expires);

        let s = signer();
        assert_eq!(
            s.verify("qr-bucket", "codes/b.png", expires, &sig, now),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            s.verify("qr-bucket", "codes/a.png", expires + 1, &sig, now),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            s.verify("qr-bucket", "codes/a.png", expires, "not base64!", now),
            Err(SignatureError::Mismatch)
        );
        let other = UrlSigner::new(b"other-key", "http://localhost:3000").unwrap();
        assert_eq!(
            other.verify("qr-bucket", "codes/a.png", expires, &sig, now),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_expired() {
        let now = Utc::now();
        let expires = now.timestamp() - 1;
        let sig = signer().signature("qr-bucket", "codes/a.png", expires);
        assert_eq!(
            signer().verify("qr-bucket", "codes/a.png", expires, &sig, now),
            Err(SignatureError::Expired(expires))
        );
    }
}
