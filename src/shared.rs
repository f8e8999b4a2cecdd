// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Thread-safe handle around one engine.
//!
//! Every operation runs under a single lock, so calls against the engine are
//! serialised and each one observes the complete effect of the previous.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::Engine;

pub struct SharedEngine<H, T, A> {
    inner: Arc<Mutex<Engine<H, T, A>>>,
}

impl<H, T, A> Clone for SharedEngine<H, T, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H, T, A> SharedEngine<H, T, A> {
    pub fn new(engine: Engine<H, T, A>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut Engine<H, T, A>) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Recover the engine once every other handle has been dropped.
    pub fn try_unwrap(self) -> Result<Engine<H, T, A>, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::InMemoryEngine;
    use crate::types::{Address, CallContext};

    #[test]
    fn calls_from_threads_are_serialised() {
        let engine = InMemoryEngine::in_memory(&EngineConfig::default()).expect("test: default config");
        let shared = SharedEngine::new(engine);

        let handles: Vec<_> = (0..4u64)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    shared.with(|e| e.change_dispute_period(&CallContext::new("dao", i), 60 + i))
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("test: thread").expect("test: dao call");
        }

        let engine = shared.try_unwrap().ok().expect("test: last handle");
        assert_eq!(engine.events().len(), 4);
        assert!((60..64).contains(&engine.params().dispute_window));
        assert_eq!(engine.dao(), &Address::from("dao"));
    }
}
