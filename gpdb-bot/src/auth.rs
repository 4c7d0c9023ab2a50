//! Moderator authorization
//!
//! Moderators are listed by numeric user id in a JSON whitelist:
//!
//! ```json
//! { "mods": [123456789012345678] }
//! ```
//!
//! The file is read on every check, so edits apply without a restart.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::api::Invoker;

/// Outcome of a moderator check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Authorized,
    Denied { reason: String },
}

impl Authorization {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Authorization::Authorized)
    }
}

#[derive(Debug, Deserialize)]
struct WhitelistFile {
    #[serde(default)]
    mods: Vec<i64>,
}

/// Moderator whitelist backed by a JSON file
#[derive(Debug, Clone)]
pub struct ModeratorWhitelist {
    path: PathBuf,
}

impl ModeratorWhitelist {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Check whether `invoker` may run moderator commands
    pub async fn check(&self, invoker: &Invoker, command: &str) -> Authorization {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Moderator whitelist unreadable, denying"
                );
                return Authorization::Denied {
                    reason: format!("moderator whitelist unavailable: {}", e),
                };
            }
        };

        let whitelist: WhitelistFile = match serde_json::from_str(&content) {
            Ok(whitelist) => whitelist,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Moderator whitelist malformed, denying"
                );
                return Authorization::Denied {
                    reason: format!("moderator whitelist malformed: {}", e),
                };
            }
        };

        if whitelist.mods.contains(&invoker.id) {
            debug!(user = %invoker.name, command, "Moderator authorized");
            Authorization::Authorized
        } else {
            warn!(
                user = %invoker.name,
                user_id = invoker.id,
                command,
                "Unauthorized user tried to use a moderator command"
            );
            Authorization::Denied {
                reason: "user was not found in the whitelist".to_string(),
            }
        }
    }
}
