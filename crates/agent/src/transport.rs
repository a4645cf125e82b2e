use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::message::Message;
use crate::types::AgentId;

/// Message transport seen by one agent.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), TransportError>;

    /// Waits up to `timeout` for the next inbound message. A zero timeout only
    /// checks what is already queued.
    async fn receive(&mut self, timeout: Duration) -> Result<Option<Message>, TransportError>;
}

/// In-process message router with one bounded mailbox per address.
#[derive(Clone)]
pub struct MessageRouter {
    mailboxes: Arc<DashMap<AgentId, mpsc::Sender<Message>>>,
    capacity: usize,
}

impl MessageRouter {
    pub fn new(capacity: usize) -> Self {
        Self {
            mailboxes: Arc::new(DashMap::new()),
            capacity,
        }
    }

    /// Opens a mailbox for `address`, replacing any previous one.
    pub fn register(&self, address: AgentId) -> Mailbox {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.mailboxes.insert(address.clone(), tx);
        debug!(address = %address, "Mailbox registered");
        Mailbox {
            address,
            router: self.clone(),
            rx,
        }
    }

    pub fn unregister(&self, address: &AgentId) {
        self.mailboxes.remove(address);
    }

    pub fn is_registered(&self, address: &AgentId) -> bool {
        self.mailboxes.contains_key(address)
    }

    pub fn deliver(&self, message: Message) -> Result<(), TransportError> {
        let to = message.to.clone();
        let sender = self
            .mailboxes
            .get(&to)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TransportError::UnknownRecipient(to.clone()))?;

        trace!(to = %to, performative = %message.performative, "Delivering message");

        sender.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::MailboxFull(to),
            mpsc::error::TrySendError::Closed(_) => TransportError::Disconnected(to),
        })
    }
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new(256)
    }
}

pub struct Mailbox {
    address: AgentId,
    router: MessageRouter,
    rx: mpsc::Receiver<Message>,
}

impl Mailbox {
    pub fn address(&self) -> &AgentId {
        &self.address
    }
}

#[async_trait]
impl Transport for Mailbox {
    async fn send(&self, mut message: Message) -> Result<(), TransportError> {
        if message.sender.is_none() {
            message.sender = Some(self.address.clone());
        }
        self.router.deliver(message)
    }

    async fn receive(&mut self, timeout: Duration) -> Result<Option<Message>, TransportError> {
        if timeout.is_zero() {
            return match self.rx.try_recv() {
                Ok(message) => Ok(Some(message)),
                Err(mpsc::error::TryRecvError::Empty) => Ok(None),
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    Err(TransportError::Disconnected(self.address.clone()))
                }
            };
        }

        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(message)) => Ok(Some(message)),
            Ok(None) => Err(TransportError::Disconnected(self.address.clone())),
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ontology, Performative};

    fn msg(to: &str) -> Message {
        Message::new(AgentId::new(to), Performative::Inform, ontology::VIDEO_ANALYSIS)
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let router = MessageRouter::new(8);
        let a = router.register(AgentId::new("a"));
        let mut b = router.register(AgentId::new("b"));

        a.send(msg("b")).await.unwrap();
        let received = b.receive(Duration::from_millis(50)).await.unwrap().unwrap();
        assert_eq!(received.sender, Some(AgentId::new("a")));
    }

    #[tokio::test]
    async fn test_receive_timeout_is_not_error() {
        let router = MessageRouter::new(8);
        let mut a = router.register(AgentId::new("a"));
        assert!(a.receive(Duration::from_millis(5)).await.unwrap().is_none());
        assert!(a.receive(Duration::ZERO).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_recipient() {
        let router = MessageRouter::new(8);
        let a = router.register(AgentId::new("a"));
        let err = a.send(msg("nobody")).await.unwrap_err();
        assert_eq!(err, TransportError::UnknownRecipient(AgentId::new("nobody")));
    }

    #[tokio::test]
    async fn test_mailbox_full() {
        let router = MessageRouter::new(1);
        let a = router.register(AgentId::new("a"));
        let _b = router.register(AgentId::new("b"));
        a.send(msg("b")).await.unwrap();
        let err = a.send(msg("b")).await.unwrap_err();
        assert_eq!(err, TransportError::MailboxFull(AgentId::new("b")));
    }
}
