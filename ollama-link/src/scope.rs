//! Cancellation scopes for client calls.
//!
//! Every call takes a [`CancellationToken`]. There is no separate timeout
//! setting: a deadline is simply a scope that cancels itself.

use std::ops::Deref;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A cancellation scope with a timer attached.
///
/// Dereferences to its [`CancellationToken`], so `&deadline` can be passed
/// wherever a call expects a scope. The timer task lives only as long as this
/// value: dropping it stops the timer without cancelling the scope, so keep it
/// alive for as long as the calls it bounds.
#[derive(Debug)]
pub struct Deadline {
    scope: CancellationToken,
    timer: JoinHandle<()>,
}

impl Deadline {
    /// The scope itself, for handing to other tasks.
    pub fn token(&self) -> &CancellationToken {
        &self.scope
    }
}

impl Deref for Deadline {
    type Target = CancellationToken;

    fn deref(&self) -> &CancellationToken {
        &self.scope
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// A fresh scope cancelled automatically after `after`.
///
/// Must be called from within a Tokio runtime.
pub fn deadline(after: Duration) -> Deadline {
    deadline_from(&CancellationToken::new(), after)
}

/// A child of `parent` that is also cancelled after `after`.
///
/// Cancelling `parent` cancels the child; the child's timer never affects the
/// parent.
pub fn deadline_from(parent: &CancellationToken, after: Duration) -> Deadline {
    let scope = parent.child_token();
    let timer_scope = scope.clone();
    let timer = tokio::spawn(async move {
        tokio::select! {
            _ = timer_scope.cancelled() => {}
            _ = tokio::time::sleep(after) => timer_scope.cancel(),
        }
    });
    Deadline { scope, timer }
}
