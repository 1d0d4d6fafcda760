use std::collections::{HashMap, VecDeque};

use smol::channel::{self, Receiver, Sender, TryRecvError};

use crate::{
    transport::{
        communicator::Communicator, error::TransportError, PacketReceiver, PacketSender,
    },
    types::{ProcessGroup, Rank},
};

type Packet = (Rank, Box<[u8]>);

/// In-memory transport: one unbounded mailbox per rank
pub struct ChannelTransport;

impl ChannelTransport {
    /// Builds a connected communicator for every rank of a group of `size`
    pub fn group(size: u32) -> Vec<Communicator> {
        let (senders, receivers): (Vec<Sender<Packet>>, Vec<Receiver<Packet>>) =
            (0..size).map(|_| channel::unbounded()).unzip();

        receivers
            .into_iter()
            .enumerate()
            .filter_map(|(rank, mailbox)| {
                let group = ProcessGroup::new(rank as Rank, size)?;
                let sender = ChannelSender {
                    rank: rank as Rank,
                    peers: senders.clone(),
                };
                let receiver = ChannelReceiver {
                    mailbox,
                    pending: HashMap::new(),
                };
                Some(Communicator::new(group, Box::new(sender), Box::new(receiver)))
            })
            .collect()
    }
}

struct ChannelSender {
    rank: Rank,
    peers: Vec<Sender<Packet>>,
}

impl PacketSender for ChannelSender {
    fn send(&mut self, to: Rank, payload: &[u8]) -> Result<(), TransportError> {
        let peer = self.peers.get(to as usize).ok_or(TransportError::UnknownRank {
            rank: to,
            size: self.peers.len() as u32,
        })?;
        peer.try_send((self.rank, payload.into()))
            .map_err(|_| TransportError::SendFailed { to })
    }
}

struct ChannelReceiver {
    mailbox: Receiver<Packet>,
    pending: HashMap<Rank, VecDeque<Box<[u8]>>>,
}

impl PacketReceiver for ChannelReceiver {
    fn receive(&mut self, from: Rank) -> Result<Option<Box<[u8]>>, TransportError> {
        loop {
            match self.mailbox.try_recv() {
                Ok((source, payload)) => {
                    self.pending.entry(source).or_default().push_back(payload);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Closed) => {
                    // packets already queued are still deliverable
                    if self.pending.get(&from).map_or(true, VecDeque::is_empty) {
                        return Err(TransportError::Disconnected);
                    }
                    break;
                }
            }
        }

        Ok(self
            .pending
            .get_mut(&from)
            .and_then(|queue| queue.pop_front()))
    }
}
