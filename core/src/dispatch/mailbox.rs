use crate::prelude::{EngineError, EngineResult};
use std::sync::Mutex;
use tokio::sync::Notify;

struct Slot<T> {
    value: Option<T>,
    closed: bool,
}

/// Single-slot "drain to newest" channel: posting overwrites whatever is
/// still pending, so a consumer only ever sees the latest value.
pub struct Mailbox<T> {
    slot: Mutex<Slot<T>>,
    notify: Notify,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                value: None,
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    /// Stores `value`; returns true if an unread value was superseded.
    pub fn post(&self, value: T) -> EngineResult<bool> {
        let superseded = match self.slot.lock() {
            Ok(mut slot) if !slot.closed => slot.value.replace(value).is_some(),
            _ => return Err(EngineError::Closed),
        };
        self.notify.notify_one();
        Ok(superseded)
    }

    pub fn take(&self) -> Option<T> {
        self.slot.lock().ok().and_then(|mut slot| slot.value.take())
    }

    /// Waits for the next value; `None` once the mailbox is closed and drained.
    pub async fn recv(&self) -> Option<T> {
        loop {
            {
                let mut slot = self.slot.lock().ok()?;
                if let Some(value) = slot.value.take() {
                    return Some(value);
                }
                if slot.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    pub fn close(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            slot.closed = true;
        }
        self.notify.notify_waiters();
        self.notify.notify_one();
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn newest_value_wins() {
        let mailbox = Mailbox::new();
        assert!(!mailbox.post("first").unwrap());
        assert!(mailbox.post("second").unwrap());
        assert!(mailbox.post("third").unwrap());
        assert_eq!(mailbox.take(), Some("third"));
        assert_eq!(mailbox.take(), None);
    }

    #[tokio::test]
    async fn recv_wakes_on_post() {
        let mailbox = Arc::new(Mailbox::new());
        let consumer = {
            let mailbox = mailbox.clone();
            tokio::spawn(async move { mailbox.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        mailbox.post(7u32).unwrap();
        assert_eq!(consumer.await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn close_drains_then_ends() {
        let mailbox = Mailbox::new();
        mailbox.post(1u32).unwrap();
        mailbox.close();
        assert!(matches!(mailbox.post(2), Err(EngineError::Closed)));
        assert_eq!(mailbox.recv().await, Some(1));
        assert_eq!(mailbox.recv().await, None);
    }
}
