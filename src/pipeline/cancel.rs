use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

/// Owner side of the process-wide cancellation signal.
///
/// Cancelling any clone (or dropping the last one) disconnects the channel
/// behind every [`CancellationToken`], which wakes any stage selecting on it.
#[derive(Clone, Debug)]
pub struct Cancellation {
    sender: Arc<Mutex<Option<Sender<()>>>>,
    token: CancellationToken,
}

/// Observer side of [`Cancellation`], cloned into every stage.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    receiver: Receiver<()>,
}

impl Cancellation {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(0);
        Self {
            sender: Arc::new(Mutex::new(Some(sender))),
            token: CancellationToken { receiver },
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Callable from any thread; only the first call has an effect.
    pub fn cancel(&self) {
        let mut sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if sender.take().is_some() {
            log::debug!("Cancellation requested");
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// Receiver that becomes ready (disconnected) once cancellation happens.
    /// Nothing is ever sent on it; use it as a `select!` arm.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.receiver.try_recv(),
            Err(crossbeam_channel::TryRecvError::Disconnected)
        )
    }
}
