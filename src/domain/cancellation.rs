//! Cooperative cancellation signal
//!
//! A thin wrapper over a `tokio::sync::watch` channel: the caller keeps the
//! sender and flips it to `true` to cancel; every unit of work holding a clone
//! of the signal observes the change.

use tokio::sync::watch;

/// Sender half used to cancel a request
pub type CancellationTrigger = watch::Sender<bool>;

/// Receiver half observed by in-flight work
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    receiver: Option<watch::Receiver<bool>>,
}

impl CancellationSignal {
    /// Wraps an existing watch receiver (e.g. a process shutdown channel)
    pub fn new(receiver: watch::Receiver<bool>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    /// A signal that never fires
    pub fn never() -> Self {
        Self { receiver: None }
    }

    /// Creates a linked trigger and signal
    ///
    /// # Example
    ///
    /// ```
    /// use fhirgate::domain::CancellationSignal;
    ///
    /// let (trigger, signal) = CancellationSignal::channel();
    /// assert!(!signal.is_cancelled());
    /// trigger.send(true).unwrap();
    /// assert!(signal.is_cancelled());
    /// ```
    pub fn channel() -> (CancellationTrigger, Self) {
        let (sender, receiver) = watch::channel(false);
        (sender, Self::new(receiver))
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.receiver
            .as_ref()
            .map(|receiver| *receiver.borrow())
            .unwrap_or(false)
    }

    /// Completes once cancellation is requested
    ///
    /// Never completes if the signal was created with [`CancellationSignal::never`]
    /// or if the trigger is dropped without firing.
    pub async fn cancelled(&self) {
        let Some(receiver) = &self.receiver else {
            return std::future::pending().await;
        };

        let mut receiver = receiver.clone();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            if receiver.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}
