use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// One-shot signal that can be released exactly once, opening every [`Gate`]
/// derived from it.
///
/// ```
/// use herald_sync::Latch;
///
/// # tokio_test::block_on(async {
/// let latch = Latch::new();
/// let gate = latch.gate();
///
/// tokio::spawn(async move {
///     latch.release();
/// });
///
/// gate.opened().await;
/// assert!(gate.is_open());
/// # })
/// ```
#[derive(Debug, Default, Clone)]
pub struct Latch {
    token: CancellationToken,
}

/// Observer side of a [`Latch`]. Cheap to clone; any number of tasks may wait
/// on it at any time.
#[derive(Debug, Clone)]
pub struct Gate {
    token: CancellationToken,
}

impl Latch {
    /// Returns a new, unreleased [`Latch`].
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Returns a new [`Gate`] linked to this latch.
    pub fn gate(&self) -> Gate {
        Gate {
            token: self.token.clone(),
        }
    }

    /// Releases this latch. Repeated calls have no further effect.
    pub fn release(&self) {
        self.token.cancel();
    }

    /// Reports whether this latch has been released.
    pub fn is_released(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Arranges for this latch to be released at the given instant, unless it
    /// is released earlier. Must be called within a tokio runtime.
    pub fn release_at(&self, deadline: Instant) {
        let token = self.token.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => token.cancel(),
            }
        });
    }
}

impl Gate {
    /// Waits until the linked [`Latch`] is released. Resolves immediately if
    /// it already was.
    pub async fn opened(&self) {
        self.token.cancelled().await;
    }

    /// Reports whether the linked [`Latch`] has been released.
    pub fn is_open(&self) -> bool {
        self.token.is_cancelled()
    }
}
