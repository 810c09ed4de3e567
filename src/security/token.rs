//! Short-lived, action-scoped tokens bound to one actor.
//!
//! A token is the truncated HMAC-SHA256 of `"<tick>|<action>|<actor id>"`
//! where `tick = now / (lifetime / 2)`. Verification accepts the current
//! and the previous tick, so a token lives between half and one full
//! lifetime.

use std::fmt;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::infra::error::{Result, TrashLogError};
use crate::trash::clock::Clock;

type HmacSha256 = Hmac<Sha256>;

/// Bytes of MAC kept in a token (hex doubles it).
const TOKEN_BYTES: usize = 10;

/// Token families. A token minted for one family never verifies for another.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenAction {
    /// In-page admin actions: generate, delete, purge, download.
    Admin,
    /// Direct download links handed out by the exporter.
    DownloadLink,
}

impl TokenAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenAction::Admin => "trash_log_admin",
            TokenAction::DownloadLink => "trash_log_download_csv",
        }
    }
}

impl fmt::Display for TokenAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct TokenIssuer {
    keyed: HmacSha256,
    lifetime_secs: u64,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], lifetime_secs: u64, clock: Arc<dyn Clock>) -> Result<Self> {
        if secret.is_empty() {
            return Err(TrashLogError::ConfigValidation(
                "token secret must not be empty".to_string(),
            ));
        }
        let keyed = HmacSha256::new_from_slice(secret)
            .map_err(|e| TrashLogError::ConfigValidation(format!("token secret: {e}")))?;
        Ok(Self {
            keyed,
            lifetime_secs: lifetime_secs.max(2),
            clock,
        })
    }

    /// 32 random bytes, for installs that do not configure a secret.
    pub fn generate_secret() -> Vec<u8> {
        let mut secret = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        secret
    }

    fn tick(&self) -> i64 {
        let half = (self.lifetime_secs / 2) as i64;
        self.clock.now_secs().div_euclid(half)
    }

    fn mac(&self, tick: i64, action: TokenAction, actor_id: u64) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(format!("{tick}|{action}|{actor_id}").as_bytes());
        mac
    }

    pub fn create(&self, action: TokenAction, actor_id: u64) -> String {
        let digest = self.mac(self.tick(), action, actor_id).finalize().into_bytes();
        hex::encode(&digest[..TOKEN_BYTES])
    }

    pub fn verify(&self, token: &str, action: TokenAction, actor_id: u64) -> bool {
        let Some(bytes) = hex::decode(token.trim()) else {
            return false;
        };
        if bytes.len() != TOKEN_BYTES {
            return false;
        }

        let tick = self.tick();
        [tick, tick - 1].into_iter().any(|t| {
            self.mac(t, action, actor_id)
                .verify_truncated_left(&bytes)
                .is_ok()
        })
    }
}

mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 || !s.is_ascii() {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
            .collect()
    }
}
