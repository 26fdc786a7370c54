// src/core/identity.rs

//! The identity store behind `sign in` and `sign up`.
//!
//! Real credential storage lives outside this crate. The shell only needs to
//! know which mode a successful sign-in grants, so that is the whole contract.

use crate::core::permission::Mode;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("name cannot be empty")]
    EmptyName,

    #[error("name '{0}' is reserved")]
    Reserved(String),

    #[error("{0}")]
    Rejected(String),
}

/// Decides which identity a set of credentials maps to.
pub trait IdentityStore: Send + Sync + fmt::Debug {
    /// Authenticates `name` and returns the mode the connection should take.
    fn sign_in(&self, name: &str, password: &str) -> Result<Mode, IdentityError>;

    /// Registers a new account and returns the mode of the signed-up identity.
    fn sign_up(&self, name: &str, password: &str) -> Result<Mode, IdentityError>;
}

/// Accepts any credentials. Names listed as root sign in as administrators,
/// everyone else as a regular user.
#[derive(Debug, Default)]
pub struct StubIdentityStore {
    root_names: HashSet<String>,
}

impl StubIdentityStore {
    pub fn new(root_names: impl IntoIterator<Item = String>) -> Self {
        Self {
            root_names: root_names.into_iter().collect(),
        }
    }
}

impl IdentityStore for StubIdentityStore {
    fn sign_in(&self, name: &str, _password: &str) -> Result<Mode, IdentityError> {
        if name.is_empty() {
            return Err(IdentityError::EmptyName);
        }
        if self.root_names.contains(name) {
            Ok(Mode::ROOT)
        } else {
            Ok(Mode::USER)
        }
    }

    fn sign_up(&self, name: &str, _password: &str) -> Result<Mode, IdentityError> {
        if name.is_empty() {
            return Err(IdentityError::EmptyName);
        }
        if self.root_names.contains(name) {
            return Err(IdentityError::Reserved(name.to_string()));
        }
        Ok(Mode::USER)
    }
}
