//! Actor allow-list loading and validation.
//!
//! The allow-list is a JSON file (`identities.json`) enumerating every
//! principal permitted to talk to the gateway. The file itself sits under a
//! policy-protected path, so agents cannot propose modifications to it.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use gavel_contracts::{GavelError, GavelResult};

/// One allow-listed principal.
///
/// Actor ids are `kind:name`, e.g. `agent:coder`, `human:alice`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub actor_id: String,
    /// Free-form role label, e.g. `agent`, `admin`.
    pub role: String,
    /// Only `active` identities may act.
    pub status: String,
    /// Autonomy tier; see [`crate::tier`].
    #[serde(default)]
    pub tier: u8,
}

impl Identity {
    /// True when the identity is allowed to act at all.
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

#[derive(Deserialize)]
struct IdentityFile {
    actors: HashMap<String, Identity>,
}

/// The loaded allow-list.
#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    actors: HashMap<String, Identity>,
}

impl IdentityRegistry {
    /// Parse an allow-list from its JSON text form:
    ///
    /// ```json
    /// { "actors": { "agent:coder": { "role": "agent", "status": "active", "tier": 1 } } }
    /// ```
    pub fn from_json_str(s: &str) -> GavelResult<Self> {
        let file: IdentityFile = serde_json::from_str(s).map_err(|e| GavelError::Config {
            reason: format!("failed to parse identities JSON: {e}"),
        })?;

        let actors = file
            .actors
            .into_iter()
            .map(|(actor_id, mut identity)| {
                identity.actor_id = actor_id.clone();
                (actor_id, identity)
            })
            .collect();

        Ok(Self { actors })
    }

    /// Read and parse the allow-list file at `path`.
    pub fn from_file(path: &Path) -> GavelResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| GavelError::Config {
            reason: format!("failed to read identities file '{}': {e}", path.display()),
        })?;
        Self::from_json_str(&contents)
    }

    /// Look up an actor without validating it.
    pub fn get(&self, actor_id: &str) -> Option<&Identity> {
        self.actors.get(actor_id)
    }

    /// Validate that `actor_id` exists and is active.
    pub fn validate(&self, actor_id: &str) -> GavelResult<&Identity> {
        let identity = self
            .actors
            .get(actor_id)
            .ok_or_else(|| GavelError::Unauthenticated {
                reason: format!("unknown actor '{actor_id}'"),
            })?;
        if !identity.is_active() {
            return Err(GavelError::Unauthenticated {
                reason: format!("actor '{actor_id}' is {}", identity.status),
            });
        }
        Ok(identity)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}
