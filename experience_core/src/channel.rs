//! Inbound message channel: a background receiver feeding a FIFO queue.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{DecodeError, ManagerError};
use crate::events::InboundBatch;
use crate::transport::{PlatformClient, Transport};

/// A decoded batch, or the decode failure the consumer must surface.
pub type Delivery = Result<InboundBatch, DecodeError>;

/// Consumer side of the inbound queue.
///
/// Batches arrive in the order the receiver fetched them; the queue is unbounded.
pub struct MessageChannel {
    receiver: Receiver<Delivery>,
}

impl MessageChannel {
    /// Start the receiver thread. It polls `transport` every `interval` for the
    /// life of the process, riding out offline stretches, and is never joined.
    pub fn spawn<C>(transport: Arc<Transport<C>>, interval: Duration) -> std::io::Result<Self>
    where
        C: PlatformClient + 'static,
    {
        let (sender, receiver) = unbounded();
        thread::Builder::new()
            .name("platform-receiver".to_string())
            .spawn(move || receive_loop(&transport, &sender, interval))?;
        Ok(Self { receiver })
    }

    /// Non-blocking dequeue. `Ok(None)` when nothing is queued; an error if the
    /// receiver thread died and the queue is drained.
    pub fn try_dequeue(&self) -> Result<Option<Delivery>, ManagerError> {
        match self.receiver.try_recv() {
            Ok(delivery) => Ok(Some(delivery)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ManagerError::ChannelClosed),
        }
    }

    /// Number of batches waiting.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

fn receive_loop<C: PlatformClient>(transport: &Transport<C>, sender: &Sender<Delivery>, interval: Duration) {
    loop {
        // Offline polls come back empty; the probe keeps retrying on its own schedule.
        match transport.receive() {
            Ok(Some(records)) => {
                let delivery = InboundBatch::decode(&records);
                if let Ok(batch) = &delivery {
                    debug!(records = batch.len(), "inbound batch queued");
                }
                if sender.send(delivery).is_err() {
                    debug!("message channel dropped, receiver exiting");
                    return;
                }
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "receive failed"),
        }
        thread::sleep(interval);
    }
}
