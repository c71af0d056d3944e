use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use diesel::prelude::*;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::note::{Note, NoteReceipt, RetrievedNote, MAX_TTL_SECS};
use crate::validation;
use crate::Pool;

/// A note on its way into the backend.
#[derive(Clone, Debug)]
pub struct NewRecord {
    pub content: String,
    pub is_encrypted: bool,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

/// A note on its way out. Producing this value destroyed the row.
#[derive(Clone, Debug)]
pub struct StoredNote {
    pub content: String,
    pub is_encrypted: bool,
    pub expires_at: SystemTime,
}

/// The backend contract: insert a row, and take (read-and-delete) a row in
/// one atomic operation. Atomicity of `take` is what makes the one-time
/// guarantee hold when two readers race on the same id; a backend that
/// reads and deletes in two steps does not satisfy this trait.
pub trait StoreBackend: Send + Sync {
    fn insert(&self, record: NewRecord) -> Result<String, ServiceError>;
    fn take(&self, note_id: &str) -> Result<Option<StoredNote>, ServiceError>;
}

/// Postgres backend. `take` is a single `DELETE .. RETURNING`, so two
/// concurrent retrievals of the same id are serialized by the database and
/// exactly one of them sees the row.
#[derive(Clone)]
pub struct PgBackend {
    pool: Pool,
}

impl PgBackend {
    pub fn new(pool: Pool) -> PgBackend {
        PgBackend { pool }
    }

    /// Deletes rows past their expiry. Called from the background sweep;
    /// retrieval does not depend on it.
    pub fn sweep_expired(&self) -> Result<usize, ServiceError> {
        use crate::schema::notes::dsl::{expires_at, notes};
        let mut connection = self.pool.get()?;
        Ok(
            diesel::delete(notes.filter(expires_at.le(SystemTime::now())))
                .execute(&mut connection)?,
        )
    }
}

impl StoreBackend for PgBackend {
    fn insert(&self, record: NewRecord) -> Result<String, ServiceError> {
        use crate::schema::notes::dsl::notes;
        let mut connection = self.pool.get()?;

        let note = Note {
            id: Uuid::new_v4().to_string(),
            content: record.content,
            is_encrypted: record.is_encrypted,
            created_at: record.created_at,
            expires_at: record.expires_at,
        };
        diesel::insert_into(notes)
            .values(&note)
            .execute(&mut connection)?;

        Ok(note.id)
    }

    fn take(&self, note_id: &str) -> Result<Option<StoredNote>, ServiceError> {
        use crate::schema::notes::dsl::notes;
        let mut connection = self.pool.get()?;

        let row = diesel::delete(notes.find(note_id.to_string()))
            .get_result::<Note>(&mut connection)
            .optional()?;

        Ok(row.map(|note| StoredNote {
            content: note.content,
            is_encrypted: note.is_encrypted,
            expires_at: note.expires_at,
        }))
    }
}

/// In-process backend. `HashMap::remove` under one lock is the atomic
/// take. Used by the test suite and handy for development setups.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    rows: Mutex<HashMap<String, StoredNote>>,
}

impl MemoryBackend {
    pub fn new() -> MemoryBackend {
        MemoryBackend::default()
    }
}

impl StoreBackend for MemoryBackend {
    fn insert(&self, record: NewRecord) -> Result<String, ServiceError> {
        let note_id = Uuid::new_v4().to_string();
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        rows.insert(
            note_id.clone(),
            StoredNote {
                content: record.content,
                is_encrypted: record.is_encrypted,
                expires_at: record.expires_at,
            },
        );
        Ok(note_id)
    }

    fn take(&self, note_id: &str) -> Result<Option<StoredNote>, ServiceError> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows.remove(note_id))
    }
}

/// The one-time protocol over any conforming backend: validated creation,
/// and retrieval that observes a note at most once.
pub struct OneTimeStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> OneTimeStore<B> {
    pub fn new(backend: B) -> OneTimeStore<B> {
        OneTimeStore { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Persists a note and returns the receipt used to build the share
    /// link. All input validation happens before the backend is touched.
    pub fn create(
        &self,
        raw_content: &str,
        ttl_secs: u64,
        is_encrypted: bool,
    ) -> Result<NoteReceipt, ServiceError> {
        let content = validation::validate_content(raw_content)?;

        if ttl_secs == 0 {
            return Err(ServiceError::Validation("lifetime is too short"));
        }
        if ttl_secs > MAX_TTL_SECS {
            return Err(ServiceError::Validation("lifetime is too long"));
        }

        let created_at = SystemTime::now();
        let expires_at = created_at
            .checked_add(Duration::from_secs(ttl_secs))
            .ok_or(ServiceError::Validation("lifetime is too long"))?;

        let id = self.backend.insert(NewRecord {
            content,
            is_encrypted,
            created_at,
            expires_at,
        })?;

        Ok(NoteReceipt {
            id,
            created_at,
            expires_at,
        })
    }

    /// Retrieves and destroys a note in one step. A malformed id never
    /// reaches the backend; a missing row and an expired row both end the
    /// note's life with nothing left to observe.
    pub fn retrieve(&self, note_id: &str) -> Result<RetrievedNote, ServiceError> {
        validation::validate_id(note_id)?;

        match self.backend.take(note_id)? {
            Some(note) => {
                if note.expires_at <= SystemTime::now() {
                    // the take already destroyed the row; all that is left
                    // to report is that the note is gone
                    return Err(ServiceError::Expired);
                }
                Ok(RetrievedNote {
                    content: note.content,
                    is_encrypted: note.is_encrypted,
                })
            }
            None => Err(ServiceError::NotFound),
        }
    }
}
