//! Elastic channel bridge between the OS notifier and the watch pipeline.
//!
//! The notifier thread must never block on a slow consumer: the pipe's input
//! half accepts without waiting and buffers up to its capacity; beyond that
//! events are dropped, matching the overflow behavior of the OS layer
//! itself.

use tokio::sync::mpsc;

/// Input half of a pipe. Cheap to clone; dropping every clone closes the
/// pipe and, transitively, its output half.
pub struct PipeSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Clone for PipeSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> PipeSender<T> {
    /// Hand a value to the pipe without blocking. Returns false when the
    /// value was dropped (buffer full or pipe closed).
    pub fn send(&self, value: T) -> bool {
        self.tx.try_send(value).is_ok()
    }
}

/// Create a pipe with explicit input and output halves, each buffering up to
/// `capacity` values.
pub fn pipe<T: Send + 'static>(capacity: usize) -> (PipeSender<T>, mpsc::Receiver<T>) {
    let (in_tx, mut in_rx) = mpsc::channel(capacity);
    let (out_tx, out_rx) = mpsc::channel(capacity);

    tokio::spawn(async move {
        while let Some(value) = in_rx.recv().await {
            if out_tx.send(value).await.is_err() {
                break;
            }
        }
    });

    (PipeSender { tx: in_tx }, out_rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_values_flow_in_order() {
        let (tx, mut rx) = pipe::<u32>(16);
        for i in 0..10 {
            assert!(tx.send(i));
        }
        for i in 0..10 {
            assert_eq!(rx.recv().await, Some(i));
        }
    }

    #[tokio::test]
    async fn test_dropping_input_closes_output() {
        let (tx, mut rx) = pipe::<u32>(4);
        assert!(tx.send(7));
        drop(tx);
        assert_eq!(rx.recv().await, Some(7));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_overflow_drops_instead_of_blocking() {
        let (tx, _rx) = pipe::<u32>(2);
        // Nothing drains the pipe; the sender must keep returning without
        // blocking once both halves are full.
        let mut accepted = 0;
        for i in 0..100 {
            if tx.send(i) {
                accepted += 1;
            }
        }
        assert!(accepted < 100);
        assert!(accepted >= 2);
    }
}
