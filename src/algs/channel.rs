//! Sequenced, typed frame channel between the coordinator and one worker.
//!
//! Each side keeps its own send and receive counters. Every frame carries the
//! sender's counter; the receiver insists on the next number, the expected
//! topic and the expected payload kind. Any mismatch is a
//! [`MeshError::Protocol`] naming the peer.

use crate::algs::communicator::{CommTag, Communicator};
use crate::algs::wire::{Frame, Payload, PayloadKind, Topic, encode_frame};
use crate::mesh_error::MeshError;
use crate::topology::mesh::MeshCell;

/// Tag of the mesh distribution channel.
pub const MESH_CHANNEL: CommTag = CommTag::new(0x4d44);
/// Tag of the dof map channel.
pub const DOF_CHANNEL: CommTag = CommTag::new(0x4446);

pub struct FrameChannel<'a, C: Communicator + ?Sized> {
    comm: &'a C,
    peer: usize,
    tag: CommTag,
    send_seq: u32,
    recv_seq: u32,
}

impl<'a, C: Communicator + ?Sized> FrameChannel<'a, C> {
    pub fn new(comm: &'a C, peer: usize, tag: CommTag) -> Self {
        Self {
            comm,
            peer,
            tag,
            send_seq: 0,
            recv_seq: 0,
        }
    }

    pub fn peer(&self) -> usize {
        self.peer
    }

    pub fn send(&mut self, topic: Topic, payload: &Payload) -> Result<(), MeshError> {
        let bytes = encode_frame(topic, self.send_seq, payload)
            .map_err(|e| MeshError::protocol(self.peer, e.to_string()))?;
        self.comm.send(self.peer, self.tag, &bytes)?;
        self.send_seq = self.send_seq.wrapping_add(1);
        Ok(())
    }

    /// Receive the next frame, which must be about `topic`.
    pub fn recv(&mut self, topic: Topic) -> Result<Payload, MeshError> {
        let bytes = self.comm.recv(self.peer, self.tag)?;
        let frame = Frame::decode(bytes).map_err(|e| {
            MeshError::protocol(self.peer, format!("frame #{}: {e}", self.recv_seq))
        })?;
        if frame.seq != self.recv_seq {
            return Err(MeshError::protocol(
                self.peer,
                format!("expected frame #{}, got #{}", self.recv_seq, frame.seq),
            ));
        }
        if frame.topic != topic {
            return Err(MeshError::protocol(
                self.peer,
                format!(
                    "frame #{} carries {:?}, expected {topic:?}",
                    frame.seq, frame.topic
                ),
            ));
        }
        self.recv_seq = self.recv_seq.wrapping_add(1);
        Ok(frame.payload)
    }

    fn wrong_kind(&self, topic: Topic, expected: PayloadKind, got: &Payload) -> MeshError {
        MeshError::protocol(
            self.peer,
            format!("{topic:?} should be {expected:?}, got {:?}", got.kind()),
        )
    }

    pub fn send_scalar(&mut self, topic: Topic, v: usize) -> Result<(), MeshError> {
        self.send(topic, &Payload::Scalar(v as u64))
    }

    pub fn send_ints(&mut self, topic: Topic, v: Vec<u64>) -> Result<(), MeshError> {
        self.send(topic, &Payload::IntVector(v))
    }

    pub fn recv_scalar(&mut self, topic: Topic) -> Result<usize, MeshError> {
        match self.recv(topic)? {
            Payload::Scalar(v) => usize::try_from(v)
                .map_err(|_| MeshError::protocol(self.peer, format!("{topic:?} overflows usize"))),
            other => Err(self.wrong_kind(topic, PayloadKind::Scalar, &other)),
        }
    }

    pub fn recv_ints(&mut self, topic: Topic) -> Result<Vec<u64>, MeshError> {
        match self.recv(topic)? {
            Payload::IntVector(v) => Ok(v),
            other => Err(self.wrong_kind(topic, PayloadKind::IntVector, &other)),
        }
    }

    pub fn recv_text(&mut self, topic: Topic) -> Result<String, MeshError> {
        match self.recv(topic)? {
            Payload::Text(s) => Ok(s),
            other => Err(self.wrong_kind(topic, PayloadKind::Text, &other)),
        }
    }

    pub fn recv_cells(&mut self, topic: Topic) -> Result<Vec<MeshCell>, MeshError> {
        match self.recv(topic)? {
            Payload::CellList(c) => Ok(c),
            other => Err(self.wrong_kind(topic, PayloadKind::CellList, &other)),
        }
    }

    pub fn recv_name_map(&mut self, topic: Topic) -> Result<(String, Vec<u64>), MeshError> {
        match self.recv(topic)? {
            Payload::NameVectorMap { name, ids } => Ok((name, ids)),
            other => Err(self.wrong_kind(topic, PayloadKind::NameVectorMap, &other)),
        }
    }

    pub fn recv_named_cells(&mut self, topic: Topic) -> Result<(String, Vec<MeshCell>), MeshError> {
        match self.recv(topic)? {
            Payload::NamedCellList { name, cells } => Ok((name, cells)),
            other => Err(self.wrong_kind(topic, PayloadKind::NamedCellList, &other)),
        }
    }

    pub fn recv_reals(&mut self, topic: Topic) -> Result<Vec<f64>, MeshError> {
        match self.recv(topic)? {
            Payload::RealVector(v) => Ok(v),
            other => Err(self.wrong_kind(topic, PayloadKind::RealVector, &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::LocalComm;
    use crate::algs::wire::WireHdr;

    #[test]
    fn typed_exchange_in_order() {
        let world = LocalComm::world(2);
        let mut tx = FrameChannel::new(&world[0], 1, MESH_CHANNEL);
        let mut rx = FrameChannel::new(&world[1], 0, MESH_CHANNEL);
        tx.send_scalar(Topic::GroupCounts, 3).unwrap();
        tx.send(Topic::ElementalHeader, &Payload::Text("left".into())).unwrap();
        tx.send_ints(Topic::OwnedNodes, vec![4, 5]).unwrap();

        assert_eq!(rx.recv_scalar(Topic::GroupCounts).unwrap(), 3);
        assert_eq!(rx.recv_text(Topic::ElementalHeader).unwrap(), "left");
        assert_eq!(rx.recv_ints(Topic::OwnedNodes).unwrap(), vec![4, 5]);
    }

    #[test]
    fn topic_mismatch_is_a_protocol_error() {
        let world = LocalComm::world(2);
        let mut tx = FrameChannel::new(&world[0], 1, MESH_CHANNEL);
        let mut rx = FrameChannel::new(&world[1], 0, MESH_CHANNEL);
        tx.send_ints(Topic::OwnedNodes, vec![1]).unwrap();
        let err = rx.recv_ints(Topic::RankElementCounts).unwrap_err();
        assert!(matches!(err, MeshError::Protocol { peer: 0, .. }), "{err}");
    }

    #[test]
    fn kind_mismatch_is_a_protocol_error() {
        let world = LocalComm::world(2);
        let mut tx = FrameChannel::new(&world[0], 1, MESH_CHANNEL);
        let mut rx = FrameChannel::new(&world[1], 0, MESH_CHANNEL);
        tx.send_scalar(Topic::GroupCounts, 2).unwrap();
        assert!(matches!(
            rx.recv_ints(Topic::GroupCounts),
            Err(MeshError::Protocol { .. })
        ));
    }

    #[test]
    fn skipped_frame_is_detected() {
        let world = LocalComm::world(2);
        let mut tx = FrameChannel::new(&world[0], 1, MESH_CHANNEL);
        tx.send_scalar(Topic::GroupCounts, 1).unwrap();
        tx.send_scalar(Topic::GroupCounts, 2).unwrap();

        // a receiver that already consumed frame #0 elsewhere
        let _ = world[1].recv(0, MESH_CHANNEL).unwrap();
        let mut fresh = FrameChannel::new(&world[1], 0, MESH_CHANNEL);
        let err = fresh.recv_scalar(Topic::GroupCounts).unwrap_err();
        assert!(err.to_string().contains("expected frame #0, got #1"), "{err}");
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let world = LocalComm::world(2);
        world[0].send(1, DOF_CHANNEL, &[0u8; WireHdr::SIZE - 1]).unwrap();
        let mut rx = FrameChannel::new(&world[1], 0, DOF_CHANNEL);
        assert!(matches!(
            rx.recv(Topic::DofScalars),
            Err(MeshError::Protocol { .. })
        ));
    }
}
