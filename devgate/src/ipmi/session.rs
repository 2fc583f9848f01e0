//! Authenticated IPMI v1.5 LAN session over UDP.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use secrecy::ExposeSecret;
use tokio::net::{UdpSocket, lookup_host};

use super::codec::{self, AuthType, FIELD_LEN, Reply, SessionHeader};
use super::payload::{RawRequest, RawResponse};
use super::{BmcConnector, BmcSession};
use crate::error::{Result, TransportError};
use crate::params::IpmiParameters;

const NETFN_APP: u8 = 0x06;

const CMD_GET_CHANNEL_AUTH_CAPS: u8 = 0x38;
const CMD_GET_SESSION_CHALLENGE: u8 = 0x39;
const CMD_ACTIVATE_SESSION: u8 = 0x3a;
const CMD_SET_SESSION_PRIVILEGE: u8 = 0x3b;
const CMD_CLOSE_SESSION: u8 = 0x3c;

/// Channel number meaning "the channel this request arrived on".
const CURRENT_CHANNEL: u8 = 0x0e;
const PRIVILEGE_ADMINISTRATOR: u8 = 0x04;

/// Sequence number the BMC starts at for its outbound packets.
const INITIAL_OUTBOUND_SEQUENCE: u32 = 1;

const MAX_DATAGRAM: usize = 1024;

/// Opens LAN sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct LanConnector;

#[async_trait]
impl BmcConnector for LanConnector {
    async fn open(&self, params: &IpmiParameters) -> Result<Box<dyn BmcSession>> {
        Ok(Box::new(LanSession::open(params).await?))
    }
}

/// An activated session at administrator privilege.
pub struct LanSession {
    socket: UdpSocket,
    peer: SocketAddr,
    auth: AuthType,
    password: [u8; FIELD_LEN],
    session_id: u32,
    sequence: u32,
    rq_seq: u8,
    timeout: Duration,
    active: bool,
}

impl LanSession {
    pub async fn open(params: &IpmiParameters) -> Result<Self> {
        let peer = lookup_host((params.host.as_str(), params.port))
            .await
            .map_err(|source| TransportError::ConnectionFailed {
                host: params.host.clone(),
                port: params.port,
                source,
            })?
            .next()
            .ok_or_else(|| TransportError::Ipmi(format!("cannot resolve '{}'", params.host)))?;

        let local: SocketAddr = if peer.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await.map_err(TransportError::Io)?;
        socket.connect(peer).await.map_err(TransportError::Io)?;

        info!("opening ipmi session to {peer} as '{}'", params.username);
        let mut session = Self {
            socket,
            peer,
            auth: AuthType::None,
            password: codec::pad(params.password.expose_secret())?,
            session_id: 0,
            sequence: 0,
            rq_seq: 0,
            timeout: Duration::from_secs(params.timeouts.response_secs),
            active: false,
        };
        if let Err(e) = session.authenticate(&params.username).await {
            // An activated session holds a BMC slot until closed.
            if session.active {
                if let Err(close) = session.close().await {
                    warn!("cannot close ipmi session {:#010x}: {close}", session.session_id);
                }
            }
            return Err(e);
        }
        Ok(session)
    }

    async fn authenticate(&mut self, username: &str) -> Result<()> {
        let caps = self
            .request(
                NETFN_APP,
                CMD_GET_CHANNEL_AUTH_CAPS,
                &[CURRENT_CHANNEL, PRIVILEGE_ADMINISTRATOR],
            )
            .await?;
        let caps = expect_success(caps, "get channel auth capabilities", 2)?;
        let auth = AuthType::select(caps.data[1]).ok_or_else(|| {
            TransportError::Ipmi(format!(
                "no supported authentication type (bitmap {:#04x})",
                caps.data[1]
            ))
        })?;
        debug!("ipmi auth type {auth:?}");

        let mut challenge_data = vec![auth.code()];
        challenge_data.extend_from_slice(&codec::pad(username)?);
        let challenge = self
            .request(NETFN_APP, CMD_GET_SESSION_CHALLENGE, &challenge_data)
            .await?;
        let challenge = expect_success(challenge, "get session challenge", 4 + FIELD_LEN)
            .map_err(|e| match e {
                TransportError::Ipmi(_) => TransportError::AuthenticationFailed {
                    user: username.to_string(),
                },
                other => other,
            })?;

        self.auth = auth;
        self.session_id = le_u32(&challenge.data[..4]);

        let mut activate_data = vec![auth.code(), PRIVILEGE_ADMINISTRATOR];
        activate_data.extend_from_slice(&challenge.data[4..4 + FIELD_LEN]);
        activate_data.extend_from_slice(&INITIAL_OUTBOUND_SEQUENCE.to_le_bytes());
        let activated = self
            .request(NETFN_APP, CMD_ACTIVATE_SESSION, &activate_data)
            .await?;
        let activated = expect_success(activated, "activate session", 10).map_err(|_| {
            TransportError::AuthenticationFailed {
                user: username.to_string(),
            }
        })?;

        self.session_id = le_u32(&activated.data[1..5]);
        self.sequence = le_u32(&activated.data[5..9]).max(1);
        self.active = true;

        let privilege = self
            .request(NETFN_APP, CMD_SET_SESSION_PRIVILEGE, &[PRIVILEGE_ADMINISTRATOR])
            .await?;
        expect_success(privilege, "set session privilege", 0)?;
        debug!("ipmi session {:#010x} active", self.session_id);
        Ok(())
    }

    async fn request(&mut self, netfn: u8, command: u8, data: &[u8]) -> Result<Reply> {
        self.rq_seq = (self.rq_seq + 1) & 0x3f;
        let message = codec::encode_message(netfn, command, self.rq_seq, data);
        let header = SessionHeader {
            auth: self.auth,
            sequence: self.sequence,
            session_id: self.session_id,
            password: &self.password,
        };
        let packet = codec::encode_packet(&header, &message)?;
        if self.active {
            self.sequence = self.sequence.wrapping_add(1).max(1);
        }

        self.socket.send(&packet).await.map_err(TransportError::Io)?;

        let deadline = tokio::time::Instant::now() + self.timeout;
        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            let len = tokio::time::timeout_at(deadline, self.socket.recv(&mut buf))
                .await
                .map_err(|_| TransportError::Timeout(self.timeout))?
                .map_err(TransportError::Io)?;

            match codec::decode_packet(&buf[..len]) {
                Ok(reply)
                    if reply.rq_seq == self.rq_seq
                        && reply.command == command
                        && reply.netfn == netfn + 1 =>
                {
                    return Ok(reply);
                }
                Ok(reply) => debug!(
                    "ignoring stale ipmi reply (seq {}, cmd {:#04x})",
                    reply.rq_seq, reply.command
                ),
                Err(e) => debug!("ignoring datagram from {}: {e}", self.peer),
            }
        }
    }
}

#[async_trait]
impl BmcSession for LanSession {
    async fn raw(&mut self, request: &RawRequest) -> Result<RawResponse> {
        let reply = self
            .request(request.netfn, request.command, &request.data)
            .await?;
        Ok(RawResponse {
            netfn: reply.netfn,
            command: reply.command,
            code: reply.code,
            data: reply.data,
        })
    }

    async fn close(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        let id = self.session_id.to_le_bytes();
        let reply = self.request(NETFN_APP, CMD_CLOSE_SESSION, &id).await?;
        if reply.code != 0 {
            warn!(
                "ipmi close session {:#010x} returned code {:#04x}",
                self.session_id, reply.code
            );
        }
        Ok(())
    }
}

fn expect_success(reply: Reply, step: &str, min_data: usize) -> std::result::Result<Reply, TransportError> {
    if reply.code != 0 {
        return Err(TransportError::Ipmi(format!(
            "{step} failed with completion code {:#04x}",
            reply.code
        )));
    }
    if reply.data.len() < min_data {
        return Err(TransportError::Ipmi(format!(
            "{step} returned {} bytes, expected {min_data}",
            reply.data.len()
        )));
    }
    Ok(reply)
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(word)
}
