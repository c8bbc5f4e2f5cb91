use tokio::task::AbortHandle;
use tracing::debug;

/// Proof that a search was issued at a given epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket {
    epoch: u64,
}

/// Keeps only the most recent search alive. Starting a new search aborts
/// the in-flight task, and a result carrying an older ticket is refused
/// even if it slipped past the abort.
#[derive(Debug, Default)]
pub struct SearchTracker {
    epoch: u64,
    in_flight: Option<AbortHandle>,
}

impl SearchTracker {
    pub fn begin(&mut self) -> SearchTicket {
        self.cancel();
        SearchTicket { epoch: self.epoch }
    }

    pub fn attach(&mut self, ticket: SearchTicket, handle: AbortHandle) {
        if self.is_current(ticket) {
            self.in_flight = Some(handle);
        } else {
            handle.abort();
        }
    }

    pub fn is_current(&self, ticket: SearchTicket) -> bool {
        ticket.epoch == self.epoch
    }

    /// Claims the result slot for `ticket`. False means the result is stale
    /// and must be dropped.
    pub fn finish(&mut self, ticket: SearchTicket) -> bool {
        if !self.is_current(ticket) {
            debug!(
                stale = ticket.epoch,
                current = self.epoch,
                "Dropping superseded search result"
            );
            return false;
        }
        self.in_flight = None;
        true
    }

    /// Invalidates whatever is in flight.
    pub fn cancel(&mut self) {
        self.epoch += 1;
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }

    pub fn is_searching(&self) -> bool {
        self.in_flight.is_some()
    }
}
