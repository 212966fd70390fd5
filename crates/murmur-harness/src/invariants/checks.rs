//! Standard invariant checks.

use std::collections::{BTreeMap, HashSet};

use super::{Invariant, InvariantResult, StoreSnapshot, Violation};

/// No message id appears twice in the message list.
pub struct UniqueMessageIds;

impl Invariant for UniqueMessageIds {
    fn name(&self) -> &'static str {
        "unique_message_ids"
    }

    fn check(&self, state: &StoreSnapshot) -> InvariantResult {
        let mut seen = HashSet::new();
        for id in &state.message_ids {
            if !seen.insert(id) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("message {id} appears more than once"),
                });
            }
        }
        Ok(())
    }
}

/// Every emoji key in a reaction map has at least one reactor.
pub struct NoEmptyReactionSets;

impl Invariant for NoEmptyReactionSets {
    fn name(&self) -> &'static str {
        "no_empty_reaction_sets"
    }

    fn check(&self, state: &StoreSnapshot) -> InvariantResult {
        for (id, reactions) in &state.reactions {
            if let Some((emoji, _)) = reactions.iter().find(|(_, users)| users.is_empty()) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("message {id} keeps empty reaction set for {emoji}"),
                });
            }
        }
        Ok(())
    }
}

/// The persisted identity and token exist exactly when a session does, and
/// the persisted token is the one in memory.
///
/// Only meaningful while storage writes succeed.
pub struct SessionPairPersisted;

impl Invariant for SessionPairPersisted {
    fn name(&self) -> &'static str {
        "session_pair_persisted"
    }

    fn check(&self, state: &StoreSnapshot) -> InvariantResult {
        let violation = |message: String| Err(Violation { invariant: self.name(), message });

        match &state.session_token {
            Some(token) => {
                if state.persisted_user.is_none() {
                    return violation("logged in but identity not persisted".to_owned());
                }
                if state.persisted_token.as_ref() != Some(token) {
                    return violation(format!(
                        "in-memory token differs from persisted {:?}",
                        state.persisted_token
                    ));
                }
            },
            None => {
                if state.persisted_user.is_some() || state.persisted_token.is_some() {
                    return violation("logged out but session data still persisted".to_owned());
                }
            },
        }
        Ok(())
    }
}

/// Unread counts are keyed by trimmed, non-blank conversation ids.
pub struct UnreadKeysNormalized;

impl Invariant for UnreadKeysNormalized {
    fn name(&self) -> &'static str {
        "unread_keys_normalized"
    }

    fn check(&self, state: &StoreSnapshot) -> InvariantResult {
        match state.unread.keys().find(|key| key.is_empty() || key.trim() != key.as_str()) {
            Some(key) => Err(Violation {
                invariant: self.name(),
                message: format!("unread key {key:?} is not normalized"),
            }),
            None => Ok(()),
        }
    }
}

/// The persisted unread map matches the in-memory one.
///
/// A missing key counts as an empty map. Only meaningful while storage
/// writes succeed.
pub struct UnreadPersisted;

impl Invariant for UnreadPersisted {
    fn name(&self) -> &'static str {
        "unread_persisted"
    }

    fn check(&self, state: &StoreSnapshot) -> InvariantResult {
        let violation = |message: String| Err(Violation { invariant: self.name(), message });

        let persisted = match &state.persisted_unread {
            None => BTreeMap::new(),
            Some(raw) => match serde_json::from_str::<BTreeMap<String, u32>>(raw) {
                Ok(map) => map,
                Err(error) => return violation(format!("persisted unread map unreadable: {error}")),
            },
        };
        if persisted != state.unread {
            return violation(format!(
                "persisted unread {persisted:?} differs from in-memory {:?}",
                state.unread
            ));
        }
        Ok(())
    }
}

/// A message's delivery status never moves backwards.
pub struct StatusMonotonicity;

impl Invariant for StatusMonotonicity {
    fn name(&self) -> &'static str {
        "status_monotonicity"
    }

    fn check(&self, state: &StoreSnapshot) -> InvariantResult {
        for (id, history) in &state.status_history {
            for window in history.windows(2) {
                if window[1] < window[0] {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("message {id}: status went {} → {}", window[0], window[1]),
                    });
                }
            }
        }
        Ok(())
    }
}
