//! Raw commands to baseboard management controllers.
//!
//! Requests are structured `(netfn, command, data)` triples rather than free
//! text, so the destructive-command gate never sees them.

mod codec;
pub mod payload;
mod session;

pub use payload::{RawRequest, RawResponse};
pub use session::{LanConnector, LanSession};

use async_trait::async_trait;
use log::warn;

use crate::error::Result;
use crate::params::IpmiParameters;

/// An authenticated BMC session.
#[async_trait]
pub trait BmcSession: Send {
    async fn raw(&mut self, request: &RawRequest) -> Result<RawResponse>;

    async fn close(&mut self) -> Result<()>;
}

/// Opens authenticated BMC sessions.
#[async_trait]
pub trait BmcConnector: Send + Sync {
    async fn open(&self, params: &IpmiParameters) -> Result<Box<dyn BmcSession>>;
}

/// Open a session, issue one raw command and close the session.
pub async fn execute(
    connector: &dyn BmcConnector,
    params: &IpmiParameters,
    request: &RawRequest,
) -> Result<RawResponse> {
    let mut session = connector.open(params).await?;
    let outcome = session.raw(request).await;
    match (outcome, session.close().await) {
        (Ok(response), Ok(())) => Ok(response),
        (Ok(response), Err(e)) => {
            warn!("failed to close ipmi session to {}: {e}", params.host);
            Ok(response)
        }
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!("failed to close ipmi session to {}: {close_err}", params.host);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory BMC that echoes requests.

    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone, Default)]
    pub struct MockBmcConnector {
        pub requests: Arc<Mutex<Vec<RawRequest>>>,
        pub closed: Arc<Mutex<usize>>,
    }

    struct MockBmc {
        requests: Arc<Mutex<Vec<RawRequest>>>,
        closed: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl BmcConnector for MockBmcConnector {
        async fn open(&self, _params: &IpmiParameters) -> Result<Box<dyn BmcSession>> {
            Ok(Box::new(MockBmc {
                requests: self.requests.clone(),
                closed: self.closed.clone(),
            }))
        }
    }

    #[async_trait]
    impl BmcSession for MockBmc {
        async fn raw(&mut self, request: &RawRequest) -> Result<RawResponse> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(RawResponse {
                netfn: request.netfn + 1,
                command: request.command,
                code: 0,
                data: request.data.clone(),
            })
        }

        async fn close(&mut self) -> Result<()> {
            *self.closed.lock().unwrap() += 1;
            Ok(())
        }
    }
}
