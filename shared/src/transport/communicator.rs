use crate::{
    transport::{error::TransportError, PacketReceiver, PacketSender},
    types::{ProcessGroup, Rank},
};

/// One rank's view of the group together with its transport endpoints
pub struct Communicator {
    group: ProcessGroup,
    sender: Box<dyn PacketSender>,
    receiver: Box<dyn PacketReceiver>,
}

impl Communicator {
    pub fn new(
        group: ProcessGroup,
        sender: Box<dyn PacketSender>,
        receiver: Box<dyn PacketReceiver>,
    ) -> Self {
        Self {
            group,
            sender,
            receiver,
        }
    }

    pub fn group(&self) -> &ProcessGroup {
        &self.group
    }

    pub fn rank(&self) -> Rank {
        self.group.rank()
    }

    pub fn size(&self) -> u32 {
        self.group.size()
    }

    pub fn send(&mut self, to: Rank, payload: &[u8]) -> Result<(), TransportError> {
        if to >= self.group.size() {
            return Err(TransportError::UnknownRank {
                rank: to,
                size: self.group.size(),
            });
        }
        self.sender.send(to, payload)
    }

    pub fn wait_all(&mut self) -> Result<(), TransportError> {
        self.sender.wait_all()
    }

    pub fn receive(&mut self, from: Rank) -> Result<Option<Box<[u8]>>, TransportError> {
        self.receiver.receive(from)
    }

    /// Splits back into transport endpoints, e.g. to wrap them
    pub fn into_parts(self) -> (ProcessGroup, Box<dyn PacketSender>, Box<dyn PacketReceiver>) {
        (self.group, self.sender, self.receiver)
    }
}
