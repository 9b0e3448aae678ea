use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use password_hash::rand_core::{OsRng, RngCore};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtpError {
    #[error("Phone number is required")]
    MissingPhone,

    #[error("OTP not found or expired")]
    NotFound,

    #[error("OTP expired")]
    Expired,

    #[error("Invalid OTP")]
    Mismatch,
}

#[derive(Debug, Clone)]
struct Entry {
    code: String,
    expires_at: Instant,
}

/// One-time login codes keyed by normalized phone number.
///
/// A code is removed when it is verified or found expired; issuing a new code
/// for the same phone replaces the previous one.
#[derive(Debug)]
pub struct OtpStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl OtpStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn issue(&self, phone: &str) -> Result<(String, String), OtpError> {
        let phone = normalize_phone(phone).ok_or(OtpError::MissingPhone)?;
        let code = format!("{:06}", OsRng.next_u32() % 1_000_000);
        self.insert(&phone, code.clone()).await;
        Ok((phone, code))
    }

    pub async fn insert(&self, phone: &str, code: String) {
        let entry = Entry {
            code,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.lock().await.insert(phone.to_string(), entry);
    }

    /// Check `code` for `phone`; a match consumes the entry. Returns the normalized phone.
    pub async fn verify(&self, phone: &str, code: &str) -> Result<String, OtpError> {
        let phone = normalize_phone(phone).ok_or(OtpError::MissingPhone)?;
        let mut entries = self.entries.lock().await;
        let entry = entries.get(&phone).ok_or(OtpError::NotFound)?;

        if Instant::now() >= entry.expires_at {
            entries.remove(&phone);
            return Err(OtpError::Expired);
        }
        if entry.code != code.trim() {
            return Err(OtpError::Mismatch);
        }
        entries.remove(&phone);
        Ok(phone)
    }

    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }
}

/// Trim whitespace and drop a single leading trunk `0`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let phone = trimmed.strip_prefix('0').unwrap_or(trimmed);
    if phone.is_empty() {
        None
    } else {
        Some(phone.to_string())
    }
}
