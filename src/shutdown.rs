use tokio::sync::watch;

/// Process-wide stop-accepting flag, flipped once by the EXIT command path.
/// The accept loop races `subscribe()`d receivers against `accept`, which
/// makes the pending accept cancellable without any wake-up tricks.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
