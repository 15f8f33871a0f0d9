use sha2::{Digest, Sha256};
use uuid::Uuid;

const KEY_LEN: usize = 16;
const TAG_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Cursor is malformed or does not belong to this listing")]
pub struct InvalidCursor;

/// Opaque, tamper-evident pagination cursors.
///
/// A cursor is `hex(key || tag)`, where `tag` is a truncated SHA-256 over the
/// server secret, the listing scope and the key. Cursors carry no state on
/// the server; decoding with a different scope fails.
#[derive(Clone)]
pub struct CursorCodec {
    secret: Vec<u8>,
}

impl CursorCodec {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn encode(&self, scope: &str, key: Uuid) -> String {
        let mut raw = Vec::with_capacity(KEY_LEN + TAG_LEN);
        raw.extend_from_slice(key.as_bytes());
        raw.extend_from_slice(&self.tag(scope, key.as_bytes()));
        hex::encode(raw)
    }

    pub fn decode(&self, scope: &str, cursor: &str) -> Result<Uuid, InvalidCursor> {
        let raw = hex::decode(cursor).map_err(|_| InvalidCursor)?;
        if raw.len() != KEY_LEN + TAG_LEN {
            return Err(InvalidCursor);
        }
        let (key, tag) = raw.split_at(KEY_LEN);
        if !constant_time_eq(tag, &self.tag(scope, key)) {
            return Err(InvalidCursor);
        }
        Uuid::from_slice(key).map_err(|_| InvalidCursor)
    }

    fn tag(&self, scope: &str, key: &[u8]) -> [u8; TAG_LEN] {
        let digest = Sha256::new()
            .chain_update(&self.secret)
            .chain_update((scope.len() as u64).to_be_bytes())
            .chain_update(scope.as_bytes())
            .chain_update(key)
            .finalize();
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&digest[..TAG_LEN]);
        tag
    }
}

impl std::fmt::Debug for CursorCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorCodec").finish_non_exhaustive()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
