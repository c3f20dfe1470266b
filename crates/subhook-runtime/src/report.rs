//! Per-descriptor activation results.

use std::fmt;

use subhook_core::{ActivationError, CallbackId, SubscriptionHandle};

/// What happened to one descriptor during an activation pass.
#[derive(Debug, Clone)]
pub enum ActivationOutcome {
    /// The descriptor went from Pending to Active in this pass.
    Activated(SubscriptionHandle),
    /// The descriptor was already Active; no backend call was made.
    AlreadyActive,
    /// Provisioning or registration failed; the descriptor stays Pending.
    Failed(ActivationError),
    /// The pass was cancelled before this descriptor was reached, or the
    /// registry was reset while it was in flight. No registration survives.
    Cancelled,
}

impl ActivationOutcome {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Activated(_) | Self::AlreadyActive)
    }

    pub fn error(&self) -> Option<&ActivationError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// One line of an [`ActivationReport`].
#[derive(Debug, Clone)]
pub struct ActivationEntry {
    pub callback: CallbackId,
    /// `project/subscription` as tagged.
    pub subscription: String,
    pub outcome: ActivationOutcome,
}

/// Outcome of [`ActivationEngine::activate_all`](crate::ActivationEngine::activate_all),
/// in registry order.
#[derive(Debug, Clone, Default)]
pub struct ActivationReport {
    entries: Vec<ActivationEntry>,
}

impl ActivationReport {
    pub(crate) fn new(entries: Vec<ActivationEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ActivationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Outcome for one callback, if it was part of the pass.
    pub fn outcome(&self, callback: CallbackId) -> Option<&ActivationOutcome> {
        self.entries
            .iter()
            .find(|e| e.callback == callback)
            .map(|e| &e.outcome)
    }

    /// Entries that became Active in this pass.
    pub fn activated(&self) -> impl Iterator<Item = &ActivationEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, ActivationOutcome::Activated(_)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&ActivationEntry, &ActivationError)> {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.error().map(|err| (e, err)))
    }

    pub fn activated_count(&self) -> usize {
        self.activated().count()
    }

    pub fn already_active_count(&self) -> usize {
        self.count(|o| matches!(o, ActivationOutcome::AlreadyActive))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, ActivationOutcome::Failed(_)))
    }

    pub fn cancelled_count(&self) -> usize {
        self.count(|o| matches!(o, ActivationOutcome::Cancelled))
    }

    /// `true` when every descriptor ended the pass Active.
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.outcome.is_active())
    }

    fn count(&self, pred: impl Fn(&ActivationOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }
}

impl fmt::Display for ActivationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} subscriptions: {} activated, {} already active, {} failed, {} cancelled",
            self.len(),
            self.activated_count(),
            self.already_active_count(),
            self.failed_count(),
            self.cancelled_count()
        )
    }
}
