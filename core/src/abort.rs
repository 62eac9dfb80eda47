//! Cooperative request cancellation.
//!
//! An `AbortController` owns the flag; any number of `AbortSignal` clones
//! observe it. Aborting is sticky and best effort: the in-flight transport
//! future is dropped, but work the server already started is not undone.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct AbortController {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the controller aborts. Never resolves if the controller
    /// is dropped without aborting.
    pub async fn aborted(&mut self) {
        let closed = self.rx.wait_for(|aborted| *aborted).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}
