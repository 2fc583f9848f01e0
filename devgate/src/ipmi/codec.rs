//! RMCP / IPMI v1.5 LAN framing.
//!
//! # Packet Layout
//!
//! ```text
//! RMCP header     06 00 ff 07
//! session header  auth type, sequence (LE u32), session id (LE u32),
//!                 [16-byte auth code unless auth type is none], length
//! message         rsAddr, netFn/LUN, chk1, rqAddr, rqSeq/LUN, cmd, data.., chk2
//! ```
//!
//! Responses swap the two addresses and put the completion code before the
//! data.

use bytes::{Buf, BufMut, BytesMut};
use md5::{Digest, Md5};

use crate::error::TransportError;

const RMCP_VERSION: u8 = 0x06;
const RMCP_NO_ACK: u8 = 0xff;
const RMCP_CLASS_IPMI: u8 = 0x07;

pub const BMC_ADDRESS: u8 = 0x20;
pub const CONSOLE_ADDRESS: u8 = 0x81;

/// Length of auth codes, passwords and user names on the wire.
pub const FIELD_LEN: usize = 16;

/// Fixed part of a response message: addresses, netfn, seq, cmd, code and
/// both checksums.
const MIN_RESPONSE_LEN: usize = 8;

/// Session authentication type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    None,
    Md5,
    Password,
}

impl AuthType {
    pub fn code(self) -> u8 {
        match self {
            Self::None => 0x00,
            Self::Md5 => 0x02,
            Self::Password => 0x04,
        }
    }

    /// Strongest type in a channel's support bitmap.
    pub fn select(supported: u8) -> Option<Self> {
        [Self::Md5, Self::Password, Self::None]
            .into_iter()
            .find(|auth| supported & (1 << auth.code()) != 0)
    }
}

/// Pad a name or password to the fixed wire width.
pub fn pad(value: &str) -> Result<[u8; FIELD_LEN], TransportError> {
    let bytes = value.as_bytes();
    if bytes.len() > FIELD_LEN {
        return Err(TransportError::Ipmi(format!(
            "value longer than {FIELD_LEN} bytes"
        )));
    }
    let mut out = [0u8; FIELD_LEN];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

/// Two's complement checksum: the bytes plus the checksum sum to zero.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |sum, b| sum.wrapping_add(*b))
        .wrapping_neg()
}

/// Session fields stamped into every outgoing packet.
#[derive(Debug, Clone)]
pub struct SessionHeader<'a> {
    pub auth: AuthType,
    pub sequence: u32,
    pub session_id: u32,
    pub password: &'a [u8; FIELD_LEN],
}

/// Build a request message addressed to the BMC.
pub fn encode_message(netfn: u8, command: u8, rq_seq: u8, data: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(7 + data.len());
    msg.push(BMC_ADDRESS);
    msg.push(netfn << 2);
    msg.push(checksum(&msg[..2]));
    msg.push(CONSOLE_ADDRESS);
    msg.push(rq_seq << 2);
    msg.push(command);
    msg.extend_from_slice(data);
    msg.push(checksum(&msg[3..]));
    msg
}

/// Auth code for a message under `header`, if the type carries one.
pub fn auth_code(header: &SessionHeader<'_>, message: &[u8]) -> Option<[u8; FIELD_LEN]> {
    match header.auth {
        AuthType::None => None,
        AuthType::Password => Some(*header.password),
        AuthType::Md5 => {
            let mut hasher = Md5::new();
            hasher.update(header.password);
            hasher.update(header.session_id.to_le_bytes());
            hasher.update(message);
            hasher.update(header.sequence.to_le_bytes());
            hasher.update(header.password);
            let mut code = [0u8; FIELD_LEN];
            code.copy_from_slice(&hasher.finalize());
            Some(code)
        }
    }
}

/// Wrap a message in the RMCP and session headers.
pub fn encode_packet(header: &SessionHeader<'_>, message: &[u8]) -> Result<BytesMut, TransportError> {
    let length = u8::try_from(message.len())
        .map_err(|_| TransportError::Ipmi(format!("message of {} bytes is too long", message.len())))?;

    let mut buf = BytesMut::with_capacity(4 + 10 + FIELD_LEN + message.len());
    buf.put_slice(&[RMCP_VERSION, 0x00, RMCP_NO_ACK, RMCP_CLASS_IPMI]);
    buf.put_u8(header.auth.code());
    buf.put_u32_le(header.sequence);
    buf.put_u32_le(header.session_id);
    if let Some(code) = auth_code(header, message) {
        buf.put_slice(&code);
    }
    buf.put_u8(length);
    buf.put_slice(message);
    Ok(buf)
}

/// A decoded response message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub session_id: u32,
    pub netfn: u8,
    pub rq_seq: u8,
    pub command: u8,
    pub code: u8,
    pub data: Vec<u8>,
}

/// Parse one datagram.
pub fn decode_packet(packet: &[u8]) -> Result<Reply, TransportError> {
    let mut buf = packet;
    if buf.remaining() < 4 + 1 + 8 + 1 {
        return Err(malformed("short packet"));
    }
    if buf.get_u8() != RMCP_VERSION {
        return Err(malformed("not an RMCP packet"));
    }
    buf.advance(2);
    if buf.get_u8() & 0x1f != RMCP_CLASS_IPMI {
        return Err(malformed("not an IPMI message"));
    }

    let auth = buf.get_u8();
    let _sequence = buf.get_u32_le();
    let session_id = buf.get_u32_le();
    if auth != AuthType::None.code() {
        if buf.remaining() < FIELD_LEN + 1 {
            return Err(malformed("truncated auth code"));
        }
        buf.advance(FIELD_LEN);
    }

    let length = usize::from(buf.get_u8());
    if buf.remaining() < length || length < MIN_RESPONSE_LEN {
        return Err(malformed("truncated message"));
    }
    let msg = &buf[..length];

    if checksum(&msg[..2]) != msg[2] {
        return Err(malformed("header checksum mismatch"));
    }
    if checksum(&msg[3..length - 1]) != msg[length - 1] {
        return Err(malformed("data checksum mismatch"));
    }

    Ok(Reply {
        session_id,
        netfn: msg[1] >> 2,
        rq_seq: msg[4] >> 2,
        command: msg[5],
        code: msg[6],
        data: msg[7..length - 1].to_vec(),
    })
}

fn malformed(reason: &str) -> TransportError {
    TransportError::Ipmi(format!("malformed response: {reason}"))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Encode a response the way a BMC would, without authentication.
    pub fn encode_reply(netfn: u8, command: u8, rq_seq: u8, code: u8, data: &[u8]) -> Vec<u8> {
        let mut msg = vec![CONSOLE_ADDRESS, netfn << 2];
        msg.push(checksum(&msg));
        msg.extend_from_slice(&[BMC_ADDRESS, rq_seq << 2, command, code]);
        msg.extend_from_slice(data);
        msg.push(checksum(&msg[3..]));

        let mut packet = vec![RMCP_VERSION, 0x00, RMCP_NO_ACK, RMCP_CLASS_IPMI, 0x00];
        packet.extend_from_slice(&[0; 8]);
        packet.push(msg.len() as u8);
        packet.extend_from_slice(&msg);
        packet
    }
}
