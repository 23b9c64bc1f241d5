use crate::GridError;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// Caller-supplied cancellation signal with an optional deadline.
///
/// Clones share the same flag, so cancelling any clone cancels all of
/// them.
#[derive(Debug, Clone, Default)]
pub struct Cancel {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancel {
    /// Returns a token that is only cancelled by an explicit call to
    /// [`Cancel::cancel`].
    pub fn never() -> Self {
        Self::default()
    }

    /// Returns a token that cancels itself once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
            || self
                .deadline
                .map_or(false, |deadline| Instant::now() >= deadline)
    }

    /// Returns `Err(GridError::Cancelled)` if this token has fired.
    pub fn check(&self) -> Result<(), GridError> {
        if self.is_cancelled() {
            Err(GridError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Cancel;
    use std::time::Duration;

    #[test]
    fn test_clones_share_flag() {
        let cancel = Cancel::never();
        let clone = cancel.clone();
        assert!(!clone.is_cancelled());
        cancel.cancel();
        assert!(clone.is_cancelled());
        assert!(clone.check().is_err());
    }

    #[test]
    fn test_timeout() {
        assert!(Cancel::with_timeout(Duration::ZERO).is_cancelled());
        assert!(!Cancel::with_timeout(Duration::from_secs(3600)).is_cancelled());
    }
}
