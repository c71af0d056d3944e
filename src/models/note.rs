use std::time::SystemTime;

use diesel::{Insertable, Queryable};
use serde_derive::{Deserialize, Serialize};

use crate::schema::notes;

/// Default lifetime when the request does not pick one: 24 hours.
pub const DEFAULT_TTL_SECS: u64 = 86_400;
/// Two years, the longest expiry the policy allows.
pub const MAX_TTL_SECS: u64 = 63_115_200;

/// One persisted note row. `content` is opaque to the store: either the
/// raw text or a serialized envelope, with `is_encrypted` telling the
/// retriever which.
#[derive(Debug, Insertable, Queryable)]
#[diesel(table_name = notes)]
pub struct Note {
    pub id: String,
    pub content: String,
    pub is_encrypted: bool,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

#[derive(Debug, Deserialize)]
pub struct NewNoteRequest {
    pub content: String,
    pub lifetime_in_secs: Option<u64>,
    pub is_encrypted: Option<bool>,
}

/// What the author gets back: enough to build the share link, never the
/// content itself.
#[derive(Clone, Debug, Serialize)]
pub struct NoteReceipt {
    pub id: String,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct RetrievedNote {
    pub content: String,
    pub is_encrypted: bool,
}

impl NoteReceipt {
    /// Builds the shareable retrieval link. The optional passphrase rides
    /// in the URL fragment, which browsers never send to the server.
    pub fn share_url(&self, base: &str, passphrase: Option<&str>) -> String {
        let mut url = format!("{}/note?id={}", base.trim_end_matches('/'), self.id);
        if let Some(passphrase) = passphrase {
            url.push_str("#key=");
            url.push_str(&fragment_encode(passphrase));
        }
        url
    }
}

// percent-encodes everything outside the URL-unreserved set
fn fragment_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn receipt(id: &str) -> NoteReceipt {
        let now = SystemTime::now();
        NoteReceipt {
            id: id.to_string(),
            created_at: now,
            expires_at: now + Duration::from_secs(DEFAULT_TTL_SECS),
        }
    }

    #[test]
    fn share_url_without_passphrase_has_no_fragment() {
        let url = receipt("abc").share_url("https://example.com", None);
        assert_eq!(url, "https://example.com/note?id=abc");
    }

    #[test]
    fn share_url_carries_passphrase_in_fragment() {
        let url = receipt("abc").share_url("https://example.com/", Some("p@ss w0rd"));
        assert_eq!(url, "https://example.com/note?id=abc#key=p%40ss%20w0rd");
    }

    #[test]
    fn fragment_encoding_leaves_unreserved_characters_alone() {
        assert_eq!(fragment_encode("Aa0-_.~"), "Aa0-_.~");
        assert_eq!(fragment_encode("a/b"), "a%2Fb");
    }
}
