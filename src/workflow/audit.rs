use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{Status, UserId};

/// One immutable status-change event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    /// Position in the trail, starting at 1
    pub sequence: u64,
    pub comment: Option<String>,
    /// Previous status, `None` when the change left the status untouched
    pub from_status: Option<Status>,
    pub to_status: Status,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub assignee_id: Option<UserId>,
}

/// Fields of an entry before the trail assigns its position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub comment: Option<String>,
    pub from_status: Option<Status>,
    pub to_status: Status,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub assignee_id: Option<UserId>,
}

/// Append-only history, oldest first. There is no update or delete.
/// Deserialization goes through [`AuditTrail::from_entries`], so a stored
/// trail with gaps is rejected rather than loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AuditEntry>", into = "Vec<AuditEntry>")]
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
}

impl TryFrom<Vec<AuditEntry>> for AuditTrail {
    type Error = String;

    fn try_from(entries: Vec<AuditEntry>) -> Result<Self, Self::Error> {
        Self::from_entries(entries)
    }
}

impl From<AuditTrail> for Vec<AuditEntry> {
    fn from(trail: AuditTrail) -> Self {
        trail.entries
    }
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a trail from persisted entries, rejecting gaps or reordering
    pub fn from_entries(mut entries: Vec<AuditEntry>) -> Result<Self, String> {
        entries.sort_by_key(|e| e.sequence);
        for (index, entry) in entries.iter().enumerate() {
            let expected = index as u64 + 1;
            if entry.sequence != expected {
                return Err(format!(
                    "audit trail sequence gap: expected {expected}, found {}",
                    entry.sequence
                ));
            }
        }
        Ok(Self { entries })
    }

    pub fn append(&mut self, entry: NewAuditEntry) -> &AuditEntry {
        let sequence = self.entries.len() as u64 + 1;
        self.entries.push(AuditEntry {
            id: Uuid::new_v4(),
            sequence,
            comment: entry.comment,
            from_status: entry.from_status,
            to_status: entry.to_status,
            created_by: entry.created_by,
            created_at: entry.created_at,
            assignee_id: entry.assignee_id,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn latest(&self) -> Option<&AuditEntry> {
        self.entries.last()
    }

    pub fn all(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Entries appended after the given sequence number
    pub fn since(&self, sequence: u64) -> &[AuditEntry] {
        let start = (sequence as usize).min(self.entries.len());
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
