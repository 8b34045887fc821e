//! Shared test doubles. Compiled only for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;

use crate::backend::{BackendError, BackendEvent, BackendFuture, MusicBackend, MusicSession};
use crate::prompt::PromptSet;

/// Scripted backend: counts connects, records prompt sets, and lets a test
/// push events into the currently live session.
#[derive(Default)]
pub(crate) struct MockBackend {
    pub connects: AtomicUsize,
    /// Number of upcoming connect attempts that should fail.
    pub fail_first_connects: AtomicUsize,
    pub prompts: Mutex<Vec<PromptSet>>,
    pub plays: AtomicUsize,
    pub pauses: AtomicUsize,
    events: Mutex<Option<UnboundedSender<BackendEvent>>>,
}

impl MockBackend {
    pub fn push(&self, ev: BackendEvent) {
        let guard = self.events.lock().unwrap();
        guard.as_ref().expect("no live session").send(ev).unwrap();
    }

    /// Prompt sets whose combined text contains `needle`.
    pub fn prompt_sets_containing(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|set| set.iter().any(|p| p.text.contains(needle)))
            .count()
    }
}

pub(crate) struct MockSession {
    backend: Arc<MockBackend>,
}

impl MusicSession for MockSession {
    fn play(&mut self) -> BackendFuture<'_, Result<(), BackendError>> {
        self.backend.plays.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }

    fn pause(&mut self) -> BackendFuture<'_, Result<(), BackendError>> {
        self.backend.pauses.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }

    fn set_weighted_prompts(
        &mut self,
        prompts: PromptSet,
    ) -> BackendFuture<'_, Result<(), BackendError>> {
        self.backend.prompts.lock().unwrap().push(prompts);
        Box::pin(async { Ok(()) })
    }
}

impl MusicBackend for Arc<MockBackend> {
    fn connect<'a>(
        &'a self,
        _model: &'a str,
        events: UnboundedSender<BackendEvent>,
    ) -> BackendFuture<'a, Result<Box<dyn MusicSession>, BackendError>> {
        Box::pin(async move {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.fail_first_connects.load(Ordering::SeqCst) > 0 {
                self.fail_first_connects.fetch_sub(1, Ordering::SeqCst);
                return Err(BackendError::Connect("scripted failure".into()));
            }
            events.send(BackendEvent::SetupComplete).unwrap();
            *self.events.lock().unwrap() = Some(events);
            Ok(Box::new(MockSession {
                backend: self.clone(),
            }) as Box<dyn MusicSession>)
        })
    }
}
