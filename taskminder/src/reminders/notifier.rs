//! Notifier abstraction: how a fired reminder reaches the user.
//!
//! Implementations include:
//! - [`ConsoleNotifier`]: logs the alert and prints it to stderr
//! - [`NullNotifier`]: for platforms without notification support
//! - [`ChannelNotifier`]: forwards alerts over an mpsc channel (UI layers, tests)
//!
//! The concrete notifier is chosen once at startup with [`select_notifier`].

use std::sync::Arc;

use taskminder_model::reminder::Notification;
use tokio::sync::mpsc;

/// Errors a notifier may report when delivering.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The delivery mechanism is not available on this platform.
    #[error("notifications unavailable: {0}")]
    Unavailable(String),
    /// The mechanism exists but this delivery failed.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Delivers rendered reminders.
///
/// # Invariant
///
/// `deliver` must be safe to call even when the mechanism is unavailable;
/// the scheduler logs any error and carries on.
pub trait Notifier: Send + Sync {
    /// Delivers one notification.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the notification could not be shown.
    fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Whether reminders may be scheduled at all. Queried once per process.
    fn permission_granted(&self) -> bool;
}

/// Which notifier to use, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifierKind {
    /// Print alerts on the console.
    #[default]
    Console,
    /// No delivery mechanism; scheduling runs degraded.
    None,
}

impl std::str::FromStr for NotifierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "none" | "off" => Ok(Self::None),
            other => Err(format!("unknown notifier '{other}' (expected console or none)")),
        }
    }
}

impl std::fmt::Display for NotifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Console => write!(f, "console"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Builds the notifier for the configured kind.
#[must_use]
pub fn select_notifier(kind: NotifierKind) -> Arc<dyn Notifier> {
    match kind {
        NotifierKind::Console => Arc::new(ConsoleNotifier),
        NotifierKind::None => Arc::new(NullNotifier),
    }
}

/// Prints alerts to stderr and records them in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            kind = %notification.payload.kind,
            task_id = ?notification.payload.task_id.as_ref().map(ToString::to_string),
            "{}: {}",
            notification.heading,
            notification.body
        );
        eprintln!("{}\n  {}", notification.heading, notification.body);
        Ok(())
    }

    fn permission_granted(&self) -> bool {
        true
    }
}

/// Notifier for platforms with no delivery mechanism.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn deliver(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Unavailable("no notifier configured".into()))
    }

    fn permission_granted(&self) -> bool {
        false
    }
}

/// Forwards every notification into an mpsc channel.
///
/// A full or closed channel is reported as [`NotifyError::DeliveryFailed`].
pub struct ChannelNotifier {
    tx: mpsc::Sender<Notification>,
    granted: bool,
}

impl ChannelNotifier {
    /// Creates a notifier and the receiver that observes its deliveries.
    #[must_use]
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx, granted: true }, rx)
    }

    /// Sets what [`Notifier::permission_granted`] reports.
    #[must_use]
    pub const fn with_permission(mut self, granted: bool) -> Self {
        self.granted = granted;
        self
    }
}

impl Notifier for ChannelNotifier {
    fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.tx
            .try_send(notification.clone())
            .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))
    }

    fn permission_granted(&self) -> bool {
        self.granted
    }
}
