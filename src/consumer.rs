//! Persistence worker: datagram in, one document out.
//!
//! The loop is strictly sequential. A slow insert delays the next receive, and
//! anything that overflows the OS buffer meanwhile is lost upstream without a
//! trace. Failures never leave this module: they are logged and the loop moves
//! on to the next datagram.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::datagram::DatagramReceiver;
use crate::error::{Error, pause_after_error};
use crate::form::{self, DecodeError};
use crate::store::{DocumentStore, Record, StoreError};

/// Why a single datagram did not become a record.
#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

pub struct Consumer<S> {
    receiver: DatagramReceiver,
    store: S,
}

impl<S: DocumentStore> Consumer<S> {
    pub fn new(receiver: DatagramReceiver, store: S) -> Self {
        Self { receiver, store }
    }

    /// Receives and persists datagrams until `shutdown` is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), Error> {
        if let Ok(addr) = self.receiver.local_addr() {
            info!(addr = %addr, buffer_size = self.receiver.buffer_size(), "datagram server listening");
        }

        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    info!("shutdown signal received, stopping consumer");
                    break;
                }

                res = self.receiver.recv() => {
                    let payload = match res {
                        Ok((payload, peer)) => {
                            info!(peer = %peer, bytes = payload.len(), "datagram received");
                            payload.to_vec()
                        }
                        Err(e) => {
                            pause_after_error("datagram receive", &e).await;
                            continue;
                        }
                    };

                    if let Err(e) = process(&self.store, &payload).await {
                        error!(error = %e, payload = %String::from_utf8_lossy(&payload), "failed to save data");
                    }
                }
            }
        }

        info!("datagram server stopped");
        Ok(())
    }
}

/// Decodes one payload, stamps it, and inserts it.
///
/// Nothing is written unless the whole payload decodes.
pub async fn process<S: DocumentStore>(store: &S, payload: &[u8]) -> Result<Record, ConsumeError> {
    let record = Record::now(form::decode(payload)?);
    store.insert(record.clone()).await?;
    debug!(fields = record.fields.len(), "record stored");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::datagram::DatagramSender;
    use crate::store::MemoryStore;

    /// Rejects the inserts whose (zero-based) call index is listed.
    struct FlakyStore {
        calls: AtomicUsize,
        fail_on: Vec<usize>,
        stored: Mutex<Vec<Record>>,
    }

    impl FlakyStore {
        fn failing_on(fail_on: &[usize]) -> Self {
            Self { calls: AtomicUsize::new(0), fail_on: fail_on.to_vec(), stored: Mutex::new(Vec::new()) }
        }
    }

    impl DocumentStore for FlakyStore {
        async fn insert(&self, record: Record) -> Result<(), StoreError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.contains(&n) {
                return Err(StoreError::Unavailable(format!("insert #{n} rejected")));
            }
            self.stored.lock().unwrap().push(record);
            Ok(())
        }
    }

    #[tokio::test]
    async fn stores_decoded_fields_with_date() {
        let store = MemoryStore::new();
        let before = Utc::now();

        let record = process(&store, b"a=1&b=two%2Bthree").await.unwrap();

        assert_eq!(record.fields["a"], "1");
        assert_eq!(record.fields["b"], "two+three");
        assert!(record.date >= before && record.date <= Utc::now());
        assert_eq!(store.records(), vec![record]);
    }

    #[tokio::test]
    async fn latin1_form_is_stored_with_replacement_char() {
        let store = MemoryStore::new();

        let record = process(&store, b"name=Jos%E9").await.unwrap();

        assert_eq!(record.fields["name"], "Jos\u{FFFD}");
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_stores_nothing() {
        let store = MemoryStore::new();

        let err = process(&store, b"novalue").await.unwrap_err();
        assert!(matches!(err, ConsumeError::Decode(DecodeError::MalformedPair { .. })));
        let err = process(&store, b"a=1=2").await.unwrap_err();
        assert!(matches!(err, ConsumeError::Decode(_)));

        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn store_failure_does_not_affect_next_record() {
        let store = FlakyStore::failing_on(&[0]);

        let err = process(&store, b"n=1").await.unwrap_err();
        assert!(matches!(err, ConsumeError::Store(_)));
        process(&store, b"n=2").await.unwrap();

        let stored = store.stored.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].fields["n"], "2");
    }

    async fn wait_for(store: &MemoryStore, count: usize) {
        for _ in 0..200 {
            if store.records().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn loop_survives_bad_datagrams() {
        let receiver = DatagramReceiver::bind("127.0.0.1:0".parse().unwrap(), 1024).await.unwrap();
        let tx = DatagramSender::bind(receiver.local_addr().unwrap()).await.unwrap();
        let store = MemoryStore::new();
        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(Consumer::new(receiver, store.clone()).run(shutdown.clone()));

        tx.send(b"novalue").await.unwrap();
        tx.send(&[0xff, 0xfe]).await.unwrap();
        tx.send(b"field=value").await.unwrap();
        wait_for(&store, 1).await;

        shutdown.cancel();
        worker.await.unwrap().unwrap();

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields["field"], "value");
    }
}
