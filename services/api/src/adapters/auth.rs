//! services/api/src/adapters/auth.rs
//!
//! The default `AuthenticationService`: accepts any well-formed email with a
//! non-empty password and fabricates a user record. Swap in a real backend by
//! implementing the same port.

use async_trait::async_trait;
use regex::Regex;
use study_aid_core::{
    domain::{Credentials, User},
    ports::{AuthenticationService, PortError, PortResult},
};
use uuid::Uuid;

pub struct SimulatedAuthenticator {
    email_pattern: Regex,
}

impl SimulatedAuthenticator {
    pub fn new() -> Self {
        Self {
            email_pattern: Regex::new(r"^[^@\s]+@[^@\s]+$").expect("static email pattern"),
        }
    }
}

impl Default for SimulatedAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthenticationService for SimulatedAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> PortResult<User> {
        let email = credentials.email.trim();
        if !self.email_pattern.is_match(email) || credentials.password.is_empty() {
            return Err(PortError::Unauthorized);
        }
        let name = email.split('@').next().unwrap_or(email).to_string();
        Ok(User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name,
        })
    }
}
