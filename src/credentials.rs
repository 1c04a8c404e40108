// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Random credential generation for auto-created secrets.
//!
//! The generator is handed to the reconciler through the controller context
//! rather than drawn from a process-wide source, so tests can seed it.

use crate::constants::GENERATED_PASSWORD_LENGTH;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// Produces alphanumeric passwords from a cryptographically secure RNG.
#[derive(Debug)]
pub struct PasswordGenerator {
    rng: Mutex<StdRng>,
}

impl PasswordGenerator {
    /// Generator seeded from operating system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic generator for tests and reproducible runs.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Returns a fresh password of [`GENERATED_PASSWORD_LENGTH`] characters.
    pub fn generate(&self) -> String {
        // A panic while holding the lock cannot leave the RNG half-updated.
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        (0..GENERATED_PASSWORD_LENGTH)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect()
    }
}

impl Default for PasswordGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod credentials_tests;
