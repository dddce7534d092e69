//! Round-robin API key selection

use crate::config::ApiKeys;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

/// API keys of one provider, handed out round-robin
///
/// Each provider owns its own rotation, so searches against one provider never
/// shift the other's index.
#[derive(Debug)]
pub struct KeyRotation {
    keys: Vec<String>,
    counter: AtomicUsize,
}

impl KeyRotation {
    /// Build a rotation from configured keys
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming `setting` when no usable key is configured.
    pub fn new(setting: &str, keys: &ApiKeys) -> Result<Self> {
        let keys = keys.keys();
        if keys.is_empty() {
            return Err(Error::config(setting, format!("{} is not set", setting)));
        }
        Ok(Self {
            keys,
            counter: AtomicUsize::new(0),
        })
    }

    /// Key for the next request
    pub fn next_key(&self) -> &str {
        if self.keys.len() == 1 {
            return &self.keys[0];
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        &self.keys[n % self.keys.len()]
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn many(keys: &[&str]) -> ApiKeys {
        ApiKeys::Many(keys.iter().map(|k| k.to_string()).collect())
    }

    #[test]
    fn test_missing_keys_is_config_error() {
        let err = KeyRotation::new("pexels_api_keys", &ApiKeys::default()).unwrap_err();
        match err {
            Error::Config { key, message } => {
                assert_eq!(key.as_deref(), Some("pexels_api_keys"));
                assert!(message.contains("pexels_api_keys"));
            }
            other => panic!("expected config error, got {other:?}"),
        }

        let blank = KeyRotation::new("k", &ApiKeys::Single("  ".into()));
        assert!(blank.is_err());
    }

    #[test]
    fn test_single_key_always_used() {
        let rotation = KeyRotation::new("k", &ApiKeys::Single("only".into())).unwrap();
        for _ in 0..5 {
            assert_eq!(rotation.next_key(), "only");
        }
    }

    #[test]
    fn test_round_robin_order() {
        let rotation = KeyRotation::new("k", &many(&["a", "b", "c"])).unwrap();
        let picked: Vec<&str> = (0..6).map(|_| rotation.next_key()).collect();
        assert_eq!(picked, vec!["b", "c", "a", "b", "c", "a"]);
    }

    #[test]
    fn test_rotations_are_independent() {
        let first = KeyRotation::new("k1", &many(&["a", "b"])).unwrap();
        let second = KeyRotation::new("k2", &many(&["x", "y"])).unwrap();
        assert_eq!(first.next_key(), "b");
        assert_eq!(first.next_key(), "a");
        assert_eq!(second.next_key(), "y", "second rotation starts fresh");
    }

    #[test]
    fn test_concurrent_rotation_is_fair() {
        let rotation = Arc::new(KeyRotation::new("k", &many(&["a", "b", "c", "d"])).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let rotation = rotation.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| rotation.next_key().to_string())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for handle in handles {
            for key in handle.join().unwrap() {
                *counts.entry(key).or_default() += 1;
            }
        }
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|&c| c == 200), "{counts:?}");
    }
}
