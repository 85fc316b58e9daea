//! Time-based issue id generation.
//!
//! Each new issue gets a local segment of the form `{time}-{suffix}`:
//!
//! - `time` is the creation instant in milliseconds, base36 encoded, so ids
//!   created later sort later within the same length
//! - `suffix` is a short base36 digest of the title, a nanosecond timestamp
//!   and a per-generator sequence number, which makes same-millisecond ids
//!   distinct
//!
//! Child issues append their segment to the parent's id
//! (`lq3k9z-a7f.lq3ka1-0k2`).
//!
//! # Example
//!
//! ```
//! use ghost::id_generation::IdGenerator;
//!
//! let mut generator = IdGenerator::new();
//! let root = generator.generate("Write the parser", None).unwrap();
//! let child = generator.generate("Tokenizer", Some(&root)).unwrap();
//!
//! assert_eq!(child.parent(), Some(root));
//! ```

use crate::domain::IssueId;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

const BASE36_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MAX_NONCE: u32 = 100;
const SUFFIX_LENGTH: usize = 3;
const MAX_SUFFIX_LENGTH: usize = 6;

/// Errors that can occur during ID generation
#[derive(Debug, Error)]
pub enum IdGenerationError {
    /// Unable to generate a unique ID after exhausting all nonces and length increases
    #[error("Unable to generate unique ID after {attempts} attempts")]
    CollisionExhausted {
        /// Number of candidates tried
        attempts: u32,
    },

    /// The generated segment was rejected by [`IssueId`] validation
    #[error("Generated an invalid segment: {0}")]
    InvalidSegment(String),
}

/// Issue id generator.
///
/// An instance never hands out the same id twice. Collisions with stored
/// issues are the caller's concern.
#[derive(Debug, Default)]
pub struct IdGenerator {
    issued: HashSet<IssueId>,
    sequence: u64,
}

impl IdGenerator {
    /// Create a generator with no known ids.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a new unique id, nested under `parent` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if no unique id could be produced.
    pub fn generate(
        &mut self,
        title: &str,
        parent: Option<&IssueId>,
    ) -> Result<IssueId, IdGenerationError> {
        let time = encode_base36(u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0), 0);
        let mut attempts = 0;

        for length in SUFFIX_LENGTH..=MAX_SUFFIX_LENGTH {
            for nonce in 0..MAX_NONCE {
                attempts += 1;
                let segment = format!("{time}-{}", self.suffix(title, nonce, length));
                let id = match parent {
                    Some(parent) => parent.child(segment),
                    None => IssueId::root(segment),
                }
                .map_err(|e| IdGenerationError::InvalidSegment(e.to_string()))?;

                if self.issued.insert(id.clone()) {
                    if nonce > 0 {
                        debug!(nonce, length, "Generated unique ID after collision retries");
                    }
                    return Ok(id);
                }
            }
            warn!(
                length,
                max_nonce = MAX_NONCE,
                "All nonces exhausted, increasing suffix length"
            );
        }

        Err(IdGenerationError::CollisionExhausted { attempts })
    }

    fn suffix(&mut self, title: &str, nonce: u32, length: usize) -> String {
        self.sequence = self.sequence.wrapping_add(1);
        let content = format!(
            "{}|{}|{}|{}",
            title,
            Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            self.sequence,
            nonce
        );

        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let hash_bytes = hasher.finalize();

        let mut num: u64 = 0;
        for &byte in &hash_bytes[..8] {
            num = num.wrapping_shl(8).wrapping_add(u64::from(byte));
        }
        encode_base36(num, length)
    }
}

/// Encode `num` in base36, left-padded with zeros to at least `min_length`
/// digits. For a non-zero `min_length` only the lowest `min_length` digits are kept.
fn encode_base36(mut num: u64, min_length: usize) -> String {
    let mut digits = Vec::new();
    loop {
        digits.push(BASE36_CHARS[(num % 36) as usize]);
        num /= 36;
        let done = if min_length == 0 {
            num == 0
        } else {
            digits.len() >= min_length
        };
        if done {
            break;
        }
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base36_encoding() {
        assert_eq!(encode_base36(0, 0), "0");
        assert_eq!(encode_base36(35, 0), "z");
        assert_eq!(encode_base36(36, 0), "10");
        assert_eq!(encode_base36(1, 3), "001");
        assert_eq!(encode_base36(36 * 36 * 36 + 5, 3), "005");
    }

    #[test]
    fn test_root_id_shape() {
        let mut generator = IdGenerator::new();
        let id = generator.generate("Title", None).unwrap();

        assert_eq!(id.depth(), 1);
        let (time, suffix) = id.local().split_once('-').unwrap();
        assert!(!time.is_empty());
        assert_eq!(suffix.len(), SUFFIX_LENGTH);
        assert!(id.local().chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
    }

    #[test]
    fn test_child_id_is_nested_under_parent() {
        let mut generator = IdGenerator::new();
        let parent = generator.generate("Parent", None).unwrap();
        let child = generator.generate("Child", Some(&parent)).unwrap();

        assert_eq!(child.depth(), 2);
        assert_eq!(child.parent(), Some(parent));
    }

    #[test]
    fn test_ids_are_unique_for_identical_titles() {
        let mut generator = IdGenerator::new();
        let ids: HashSet<IssueId> = (0..500)
            .map(|_| generator.generate("Same title", None).unwrap())
            .collect();
        assert_eq!(ids.len(), 500);
    }
}
