use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable trigger for the server-wide shutdown flag
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, rx)
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

// Resolves once shutdown is requested; never resolves if the trigger is gone
pub async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        let triggered = *rx.borrow_and_update();
        if triggered {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_wait_resolves_after_trigger() {
        let (handle, mut rx) = ShutdownHandle::new();
        let waiter = tokio::spawn(async move { wait_for_shutdown(&mut rx).await });

        handle.trigger();
        assert!(handle.is_triggered());
        timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_wait_after_trigger_returns_immediately() {
        let (handle, mut rx) = ShutdownHandle::new();
        handle.trigger();
        timeout(Duration::from_millis(100), wait_for_shutdown(&mut rx))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_pending_without_trigger() {
        let (_handle, mut rx) = ShutdownHandle::new();
        assert!(timeout(Duration::from_millis(50), wait_for_shutdown(&mut rx))
            .await
            .is_err());
    }
}
