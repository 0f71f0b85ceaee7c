//! The control bus: a bounded mailbox shared by every consumer task that issues commands, and
//! every [`crate::controller::Controller`] worker that processes them.
//!
//! Unlike the data bus, this is single-dispatch: each submitted command is handed to exactly one
//! waiting consumer (whichever locks the receiver first), which replies on a private one-shot
//! channel. Multiple `Controller::run` loops may be spawned against the same [`ControlBus`] to
//! process commands concurrently; nothing about the bus itself assumes there is only one.

use crate::command::{ControlAck, ControlMessage};
use crate::error::ControlError;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};

/// Default mailbox depth before [`ControlBus::send`] starts awaiting room.
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// A command paired with the reply channel its submitter is awaiting.
#[derive(Debug)]
pub struct PendingCommand {
    pub message: ControlMessage,
    reply: oneshot::Sender<ControlAck>,
}

impl PendingCommand {
    /// Send the acknowledgement back to the submitter. Silently dropped if the submitter already
    /// gave up waiting (e.g. its own task was cancelled).
    pub fn respond(self, ack: ControlAck) {
        let _ = self.reply.send(ack);
    }
}

#[derive(Debug, Clone)]
pub struct ControlBus {
    sender: mpsc::Sender<PendingCommand>,
    receiver: Arc<AsyncMutex<mpsc::Receiver<PendingCommand>>>,
}

impl ControlBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Arc::new(AsyncMutex::new(receiver)),
        }
    }

    /// Submit a command and await its acknowledgement. Fails if every receiving end of the bus
    /// has been dropped (i.e. no [`Controller`](crate::controller::Controller) is running).
    pub async fn send(&self, message: ControlMessage) -> Result<ControlAck, ControlError> {
        let (reply, reply_rx) = oneshot::channel();
        self.sender
            .send(PendingCommand { message, reply })
            .await
            .map_err(|_| ControlError::BusClosed)?;
        reply_rx.await.map_err(|_| ControlError::BusClosed)
    }

    /// Pull the next pending command. Any number of tasks may call this concurrently against a
    /// clone of the same bus: the shared receiver's lock ensures each command reaches exactly
    /// one caller.
    pub async fn recv(&self) -> Option<PendingCommand> {
        let mut receiver = self.receiver.lock().await;
        receiver.recv().await
    }
}

impl Default for ControlBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ControlCommand;
    use kestrel_schema::{CanonicalType, ProviderId};

    #[tokio::test]
    async fn send_blocks_until_a_consumer_responds() {
        let bus = ControlBus::new(4);
        let worker_bus = bus.clone();

        let worker = tokio::spawn(async move {
            let pending = worker_bus.recv().await.unwrap();
            let ack = ControlAck::ok("m1", 1);
            pending.respond(ack);
        });

        let message = ControlMessage::new(
            "consumer-a",
            ControlCommand::Subscribe {
                provider: ProviderId::Mock,
                canonical_type: CanonicalType::parse("TRADE").unwrap(),
                filters: vec![],
            },
        );
        let ack = bus.send(message).await.unwrap();
        assert!(ack.success);

        worker.await.unwrap();
    }

    #[tokio::test]
    async fn send_fails_once_every_receiver_is_dropped() {
        let (sender, receiver) = mpsc::channel::<PendingCommand>(4);
        drop(receiver);
        let orphaned = ControlBus {
            sender,
            receiver: Arc::new(AsyncMutex::new(mpsc::channel(1).1)),
        };

        let message = ControlMessage::new(
            "consumer-a",
            ControlCommand::Unsubscribe {
                provider: ProviderId::Mock,
                canonical_type: CanonicalType::parse("TRADE").unwrap(),
            },
        );
        assert!(matches!(orphaned.send(message).await, Err(ControlError::BusClosed)));
    }
}
