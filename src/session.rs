//! Session context for the logged-in user.
//!
//! Holds the identity established at login and cleared at logout. Passed
//! explicitly to the components that need it instead of living in a
//! process-wide static.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AvatarError, Result};
use crate::paths::UserId;

/// Role granted to a user by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only access to dashboards.
    Viewer,
    /// Can build reports and ingest data.
    Analyst,
    /// Full administrative access.
    Admin,
}

/// Identity of a logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user identifier.
    pub user_id: UserId,
    /// Name shown in the UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Granted roles.
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl Identity {
    /// Identity with no display name and no roles.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            display_name: None,
            roles: Vec::new(),
        }
    }

    /// Set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Add a role.
    pub fn with_role(mut self, role: Role) -> Self {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }
}

/// The current session: either logged out or holding one identity.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    identity: Option<Identity>,
}

impl SessionContext {
    /// A logged-out session.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session already logged in as `identity`.
    pub fn logged_in(identity: Identity) -> Self {
        let mut session = Self::new();
        session.login(identity);
        session
    }

    /// Start a session, replacing any previous identity.
    pub fn login(&mut self, identity: Identity) {
        info!(user_id = %identity.user_id, "Session started");
        if let Some(previous) = self.identity.replace(identity) {
            debug!(user_id = %previous.user_id, "Replaced previous session");
        }
    }

    /// End the session, returning the identity that was logged in.
    pub fn logout(&mut self) -> Option<Identity> {
        let previous = self.identity.take();
        if let Some(ref identity) = previous {
            info!(user_id = %identity.user_id, "Session ended");
        }
        previous
    }

    /// The logged-in identity.
    pub fn current(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Whether someone is logged in.
    pub fn is_logged_in(&self) -> bool {
        self.identity.is_some()
    }

    /// The logged-in user's id.
    ///
    /// # Errors
    ///
    /// Returns `NoSession` when logged out.
    pub fn user_id(&self) -> Result<&UserId> {
        self.identity
            .as_ref()
            .map(|i| &i.user_id)
            .ok_or(AvatarError::NoSession)
    }

    /// Whether the logged-in user holds `role`.
    pub fn has_role(&self, role: Role) -> bool {
        self.identity
            .as_ref()
            .is_some_and(|i| i.roles.contains(&role))
    }
}
