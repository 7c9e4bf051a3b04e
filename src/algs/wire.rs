//! Fixed, versioned, little-endian frames for the distribution protocol.
//!
//! A frame is a [`WireHdr`] followed by `len` payload bytes. The header names
//! the payload kind, the logical topic, the per-channel sequence number and
//! an FNV-1a checksum of the payload, so a receiver that expects something
//! else gets a [`WireError`] instead of silently misreading bytes.

use crate::topology::cell_type::CellType;
use crate::topology::mesh::MeshCell;
use crate::topology::point::{CellId, NodeId};
use bytemuck::{Pod, Zeroable};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::mem::{align_of, size_of};
use thiserror::Error;

/// Bump when the layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 2;

/// Errors raised while encoding or decoding a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("frame shorter than its header ({0} bytes)")]
    ShortFrame(usize),
    #[error("wire version {got}, expected {expected}")]
    Version { expected: u16, got: u16 },
    #[error("unknown payload kind {0}")]
    UnknownKind(u16),
    #[error("unknown topic {0}")]
    UnknownTopic(u16),
    #[error("header announces {declared} payload bytes, frame carries {got}")]
    Length { declared: usize, got: usize },
    #[error("payload checksum mismatch")]
    Checksum,
    #[error("payload truncated while reading {0}")]
    Truncated(&'static str),
    #[error("{0} trailing payload bytes")]
    Trailing(usize),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("payload of {0} bytes does not fit a frame")]
    Oversize(usize),
}

/// All multi-byte integers in the header are **little-endian** on the wire.
/// We store them pre-LE with `.to_le()` and decode with `.from_le()`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireHdr {
    pub version_le: u16,
    pub kind_le: u16,
    pub topic_le: u16,
    pub reserved_le: u16, // keep zero
    pub seq_le: u32,
    pub len_le: u32,
    pub checksum_le: u64,
}

impl WireHdr {
    pub const SIZE: usize = 24;

    pub fn new(kind: PayloadKind, topic: Topic, seq: u32, payload: &[u8]) -> Result<Self, WireError> {
        let len = u32::try_from(payload.len()).map_err(|_| WireError::Oversize(payload.len()))?;
        Ok(Self {
            version_le: WIRE_VERSION.to_le(),
            kind_le: (kind as u16).to_le(),
            topic_le: (topic as u16).to_le(),
            reserved_le: 0,
            seq_le: seq.to_le(),
            len_le: len.to_le(),
            checksum_le: fnv1a(payload).to_le(),
        })
    }
    pub fn version(&self) -> u16 {
        u16::from_le(self.version_le)
    }
    pub fn kind(&self) -> u16 {
        u16::from_le(self.kind_le)
    }
    pub fn topic(&self) -> u16 {
        u16::from_le(self.topic_le)
    }
    pub fn seq(&self) -> u32 {
        u32::from_le(self.seq_le)
    }
    pub fn payload_len(&self) -> usize {
        u32::from_le(self.len_le) as usize
    }
    pub fn checksum(&self) -> u64 {
        u64::from_le(self.checksum_le)
    }
}

const _: () = {
    assert!(size_of::<WireHdr>() == WireHdr::SIZE);
    assert!(align_of::<WireHdr>() == 8);
};

/// 64-bit FNV-1a.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |h, &b| (h ^ u64::from(b)).wrapping_mul(PRIME))
}

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $val:literal),+ $(,)? }, $err:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum $name {
            $($variant = $val),+
        }

        impl TryFrom<u16> for $name {
            type Error = WireError;
            fn try_from(v: u16) -> Result<Self, WireError> {
                match v {
                    $($val => Ok($name::$variant),)+
                    other => Err(WireError::$err(other)),
                }
            }
        }
    };
}

wire_enum!(
    /// Shape of a frame's payload.
    PayloadKind {
        Scalar = 1,
        IntVector = 2,
        Text = 3,
        CellList = 4,
        NameVectorMap = 5,
        NamedCellList = 6,
        RealVector = 7,
    },
    UnknownKind
);

wire_enum!(
    /// What a frame is about. Together with the sequence number this pins
    /// every frame to one step of the exchange.
    Topic {
        GroupCounts = 1,
        ElementalHeader = 2,
        NodalHeader = 3,
        ElementalSlice = 4,
        BulkCells = 5,
        NodalSlice = 6,
        RankElementCounts = 7,
        PartitionVector = 8,
        OwnedNodes = 9,
        GlobalScalars = 10,
        DofScalars = 11,
        NodalDofRows = 12,
        LocalCellDofs = 13,
        SparsityRows = 14,
        Handshake = 15,
        OwnedNodeCoords = 16,
    },
    UnknownTopic
);

/// Decoded payload of one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Scalar(u64),
    IntVector(Vec<u64>),
    Text(String),
    CellList(Vec<MeshCell>),
    NameVectorMap { name: String, ids: Vec<u64> },
    NamedCellList { name: String, cells: Vec<MeshCell> },
    RealVector(Vec<f64>),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Scalar(_) => PayloadKind::Scalar,
            Payload::IntVector(_) => PayloadKind::IntVector,
            Payload::Text(_) => PayloadKind::Text,
            Payload::CellList(_) => PayloadKind::CellList,
            Payload::NameVectorMap { .. } => PayloadKind::NameVectorMap,
            Payload::NamedCellList { .. } => PayloadKind::NamedCellList,
            Payload::RealVector(_) => PayloadKind::RealVector,
        }
    }

    fn encode(&self, out: &mut BytesMut) {
        match self {
            Payload::Scalar(v) => out.put_u64_le(*v),
            Payload::IntVector(v) => put_u64s(out, v),
            Payload::Text(s) => put_str(out, s),
            Payload::CellList(cells) => put_cells(out, cells),
            Payload::NameVectorMap { name, ids } => {
                put_str(out, name);
                put_u64s(out, ids);
            }
            Payload::NamedCellList { name, cells } => {
                put_str(out, name);
                put_cells(out, cells);
            }
            Payload::RealVector(v) => {
                out.put_u64_le(v.len() as u64);
                for x in v {
                    out.put_f64_le(*x);
                }
            }
        }
    }

    fn decode(kind: PayloadKind, mut buf: Bytes) -> Result<Self, WireError> {
        let payload = match kind {
            PayloadKind::Scalar => Payload::Scalar(get_u64(&mut buf, "scalar")?),
            PayloadKind::IntVector => Payload::IntVector(get_u64s(&mut buf)?),
            PayloadKind::Text => Payload::Text(get_str(&mut buf)?),
            PayloadKind::CellList => Payload::CellList(get_cells(&mut buf)?),
            PayloadKind::NameVectorMap => Payload::NameVectorMap {
                name: get_str(&mut buf)?,
                ids: get_u64s(&mut buf)?,
            },
            PayloadKind::NamedCellList => Payload::NamedCellList {
                name: get_str(&mut buf)?,
                cells: get_cells(&mut buf)?,
            },
            PayloadKind::RealVector => {
                let n = get_len(&mut buf, 8, "real vector")?;
                Payload::RealVector((0..n).map(|_| buf.get_f64_le()).collect())
            }
        };
        if buf.has_remaining() {
            return Err(WireError::Trailing(buf.remaining()));
        }
        Ok(payload)
    }
}

/// One header + payload unit.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub topic: Topic,
    pub seq: u32,
    pub payload: Payload,
}

impl Frame {
    pub fn encode(&self) -> Result<Bytes, WireError> {
        encode_frame(self.topic, self.seq, &self.payload)
    }

    /// Decode and verify a frame. Sequence and topic are checked by the caller.
    pub fn decode(mut bytes: Bytes) -> Result<Self, WireError> {
        if bytes.len() < WireHdr::SIZE {
            return Err(WireError::ShortFrame(bytes.len()));
        }
        let hdr: WireHdr = bytemuck::pod_read_unaligned(&bytes[..WireHdr::SIZE]);
        if hdr.version() != WIRE_VERSION {
            return Err(WireError::Version {
                expected: WIRE_VERSION,
                got: hdr.version(),
            });
        }
        let kind = PayloadKind::try_from(hdr.kind())?;
        let topic = Topic::try_from(hdr.topic())?;
        let body = bytes.split_off(WireHdr::SIZE);
        if body.len() != hdr.payload_len() {
            return Err(WireError::Length {
                declared: hdr.payload_len(),
                got: body.len(),
            });
        }
        if fnv1a(&body) != hdr.checksum() {
            return Err(WireError::Checksum);
        }
        Ok(Frame {
            topic,
            seq: hdr.seq(),
            payload: Payload::decode(kind, body)?,
        })
    }
}

/// Encode a frame without taking ownership of the payload.
pub fn encode_frame(topic: Topic, seq: u32, payload: &Payload) -> Result<Bytes, WireError> {
    let mut body = BytesMut::new();
    payload.encode(&mut body);
    let hdr = WireHdr::new(payload.kind(), topic, seq, &body)?;
    let mut out = BytesMut::with_capacity(WireHdr::SIZE + body.len());
    out.put_slice(bytemuck::bytes_of(&hdr));
    out.put_slice(&body);
    Ok(out.freeze())
}

// ===== payload primitives =================================================

fn put_u64s(out: &mut BytesMut, v: &[u64]) {
    out.put_u64_le(v.len() as u64);
    for x in v {
        out.put_u64_le(*x);
    }
}

fn put_str(out: &mut BytesMut, s: &str) {
    out.put_u64_le(s.len() as u64);
    out.put_slice(s.as_bytes());
}

fn put_cells(out: &mut BytesMut, cells: &[MeshCell]) {
    out.put_u64_le(cells.len() as u64);
    for c in cells {
        out.put_u64_le(c.id.get());
        out.put_u8(c.cell_type.vtk_id());
        out.put_u8(c.dim);
        out.put_u64_le(c.phys_id as u64);
        out.put_u32_le(c.nodes.len() as u32);
        for n in &c.nodes {
            out.put_u64_le(n.get());
        }
        for xyz in &c.coords {
            for x in xyz {
                out.put_f64_le(*x);
            }
        }
        out.put_u32_le(c.dof_ids.len() as u32);
        for d in &c.dof_ids {
            out.put_u64_le(*d as u64);
        }
    }
}

fn need(buf: &Bytes, n: usize, what: &'static str) -> Result<(), WireError> {
    if buf.remaining() < n {
        return Err(WireError::Truncated(what));
    }
    Ok(())
}

fn get_u64(buf: &mut Bytes, what: &'static str) -> Result<u64, WireError> {
    need(buf, 8, what)?;
    Ok(buf.get_u64_le())
}

/// Read an element count and check `count * elem` bytes follow.
fn get_len(buf: &mut Bytes, elem: usize, what: &'static str) -> Result<usize, WireError> {
    let n = usize::try_from(get_u64(buf, what)?).map_err(|_| WireError::Truncated(what))?;
    need(buf, n.checked_mul(elem).ok_or(WireError::Truncated(what))?, what)?;
    Ok(n)
}

fn get_u64s(buf: &mut Bytes) -> Result<Vec<u64>, WireError> {
    let n = get_len(buf, 8, "integer vector")?;
    Ok((0..n).map(|_| buf.get_u64_le()).collect())
}

fn get_str(buf: &mut Bytes) -> Result<String, WireError> {
    let n = get_len(buf, 1, "text")?;
    let raw = buf.split_to(n);
    String::from_utf8(raw.to_vec()).map_err(|e| WireError::Malformed(e.to_string()))
}

fn get_cells(buf: &mut Bytes) -> Result<Vec<MeshCell>, WireError> {
    // smallest record: id, vtk, dim, phys, node count, dof count
    let n = get_len(buf, 8 + 1 + 1 + 8 + 4 + 4, "cell list")?;
    let mut cells = Vec::with_capacity(n);
    for _ in 0..n {
        need(buf, 8 + 1 + 1 + 8 + 4, "cell header")?;
        let id = CellId::new(buf.get_u64_le()).map_err(|e| WireError::Malformed(e.to_string()))?;
        let cell_type = CellType::from_vtk(buf.get_u8()).map_err(|e| WireError::Malformed(e.to_string()))?;
        let dim = buf.get_u8();
        let phys_id = buf.get_u64_le() as usize;
        let nn = buf.get_u32_le() as usize;
        need(buf, nn * (8 + 24) + 4, "cell nodes")?;
        let nodes = (0..nn)
            .map(|_| NodeId::new(buf.get_u64_le()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| WireError::Malformed(e.to_string()))?;
        let coords = (0..nn)
            .map(|_| [buf.get_f64_le(), buf.get_f64_le(), buf.get_f64_le()])
            .collect();
        let nd = buf.get_u32_le() as usize;
        need(buf, nd * 8, "cell dofs")?;
        let dof_ids = (0..nd).map(|_| buf.get_u64_le() as usize).collect();
        cells.push(MeshCell {
            id,
            cell_type,
            dim,
            nodes,
            phys_id,
            coords,
            dof_ids,
        });
    }
    Ok(cells)
}
