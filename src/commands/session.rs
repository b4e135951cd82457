//! Session commands
//!
//! The library sits behind a static password. Unlocking sets a session flag;
//! logging out clears it and releases every held handle.

use super::library::LibraryState;
use crate::utils::{AppError, ErrorResponse};
use std::sync::atomic::{AtomicBool, Ordering};

/// Static-password gate with a per-process session flag
#[derive(Debug)]
pub struct PasswordGate {
    password: Option<String>,
    unlocked: AtomicBool,
}

impl PasswordGate {
    /// Gate requiring `password`; `None` means always open
    pub fn new(password: Option<String>) -> Self {
        Self {
            password,
            unlocked: AtomicBool::new(false),
        }
    }

    pub fn unlock(&self, attempt: &str) -> bool {
        let accepted = match &self.password {
            Some(password) => password == attempt,
            None => true,
        };
        if accepted {
            self.unlocked.store(true, Ordering::SeqCst);
        }
        accepted
    }

    pub fn lock(&self) {
        self.unlocked.store(false, Ordering::SeqCst);
    }

    pub fn is_unlocked(&self) -> bool {
        self.password.is_none() || self.unlocked.load(Ordering::SeqCst)
    }

    pub(crate) fn ensure_unlocked(&self) -> Result<(), AppError> {
        if self.is_unlocked() {
            Ok(())
        } else {
            Err(AppError::Locked)
        }
    }
}

/// Unlock the library
pub async fn login(state: &LibraryState, password: &str) -> Result<(), ErrorResponse> {
    if state.gate.unlock(password) {
        tracing::info!("Library unlocked");
        Ok(())
    } else {
        tracing::warn!("Rejected unlock attempt");
        Err(AppError::InvalidPassword.into())
    }
}

/// Lock the library and release every held handle
pub async fn logout(state: &LibraryState) -> usize {
    state.gate.lock();
    state.library.teardown()
}
