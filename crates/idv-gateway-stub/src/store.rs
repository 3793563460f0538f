//! In-memory storage backend using DashMap.
//!
//! One verification record per user, keyed by bearer token.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

/// How the stub answers well-formed submissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Decision {
    #[default]
    Approve,
    Reject,
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "invalid IDV_STUB_DECISION {other:?}: expected approve or reject"
            )),
        }
    }
}

/// An approved verification.
#[derive(Debug, Clone)]
pub struct VerificationRecord {
    pub verification_id: Uuid,
    pub verified_at: DateTime<Utc>,
    pub back_provided: bool,
}

struct Inner {
    records: DashMap<String, VerificationRecord>,
    decision: Decision,
}

/// Shared application state.
///
/// Cheaply cloneable via `Arc`; all clones share the same data.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl AppState {
    pub fn new(decision: Decision) -> Self {
        Self {
            inner: Arc::new(Inner {
                records: DashMap::new(),
                decision,
            }),
        }
    }

    pub fn decision(&self) -> Decision {
        self.inner.decision
    }

    pub fn record(&self, user: &str) -> Option<VerificationRecord> {
        self.inner.records.get(user).map(|r| r.value().clone())
    }

    /// Record an approval. Returns `None` if the user already had one.
    pub fn approve(&self, user: &str, back_provided: bool) -> Option<VerificationRecord> {
        match self.inner.records.entry(user.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let record = VerificationRecord {
                    verification_id: Uuid::new_v4(),
                    verified_at: Utc::now(),
                    back_provided,
                };
                slot.insert(record.clone());
                Some(record)
            }
        }
    }
}
