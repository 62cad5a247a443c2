//! Position-addressed block retrieval.
//!
//! Each call signs a seek request, opens its own Deliver session, and waits
//! for a single block under a local timer.

use crate::error::{ClientError, Result};
use crate::signer::{now, Signer};
use crate::transport::{DeliverMessage, Deliverer};
use futures::StreamExt;
use hfc_types::common::{self, ChannelHeader, Envelope, Header, HeaderType, Payload};
use hfc_types::orderer::{SeekBehavior, SeekInfo, SeekPosition};
use hfc_types::Message;
use std::time::Duration;
use tracing::{debug, info};

/// Signs a seek request for blocks `start..=stop` on `channel_id`.
///
/// The server blocks until a matching block exists.
pub fn seek_envelope(
    signer: &Signer,
    channel_id: &str,
    start: SeekPosition,
    stop: SeekPosition,
) -> Result<Envelope> {
    let tx_id = signer.new_transaction_id();
    let channel_header = ChannelHeader {
        r#type: HeaderType::DeliverSeekInfo as i32,
        version: 0,
        timestamp: Some(now()),
        channel_id: channel_id.to_string(),
        tx_id: tx_id.id().to_string(),
        epoch: 0,
        extension: Vec::new(),
        tls_cert_hash: Vec::new(),
    };
    let seek = SeekInfo {
        start: Some(start),
        stop: Some(stop),
        behavior: SeekBehavior::BlockUntilReady as i32,
    };
    let payload = Payload {
        header: Some(Header {
            channel_header: channel_header.encode_to_vec(),
            signature_header: signer.signature_header(&tx_id).encode_to_vec(),
        }),
        data: seek.encode_to_vec(),
    };
    signer.sign_payload(&payload)
}

/// Fetches single blocks from an ordering service.
#[derive(Debug, Clone)]
pub struct DeliverClient {
    signer: Signer,
    timeout: Duration,
}

impl DeliverClient {
    /// Creates a client waiting at most `timeout` per request.
    pub fn new(signer: Signer, timeout: Duration) -> Self {
        Self { signer, timeout }
    }

    /// Fetches the first block matching `start..=stop`.
    ///
    /// # Errors
    ///
    /// [`ClientError::OrdererTimeout`] if no block arrives in time,
    /// [`ClientError::DeliverRejected`] if the session ends with a status
    /// instead, and transport errors unchanged.
    pub async fn fetch(
        &self,
        deliverer: &dyn Deliverer,
        channel_id: &str,
        start: SeekPosition,
        stop: SeekPosition,
    ) -> Result<common::Block> {
        let seek = seek_envelope(&self.signer, channel_id, start, stop)?;
        tokio::time::timeout(self.timeout, first_block(deliverer, seek))
            .await
            .map_err(|_| ClientError::OrdererTimeout(self.timeout))?
    }

    /// Fetches block `number`.
    pub async fn block(
        &self,
        deliverer: &dyn Deliverer,
        channel_id: &str,
        number: u64,
    ) -> Result<common::Block> {
        self.fetch(
            deliverer,
            channel_id,
            SeekPosition::specified(number),
            SeekPosition::specified(number),
        )
        .await
    }

    /// Fetches the genesis block of `channel_id`.
    pub async fn genesis_block(
        &self,
        deliverer: &dyn Deliverer,
        channel_id: &str,
    ) -> Result<common::Block> {
        info!(channel = %channel_id, "fetching genesis block");
        self.block(deliverer, channel_id, 0).await
    }

    /// Fetches the newest block of `channel_id`.
    pub async fn newest_block(
        &self,
        deliverer: &dyn Deliverer,
        channel_id: &str,
    ) -> Result<common::Block> {
        self.fetch(
            deliverer,
            channel_id,
            SeekPosition::newest(),
            SeekPosition::newest(),
        )
        .await
    }

    /// Fetches the configuration block in force at the tip of `channel_id`.
    ///
    /// Reads the last-config index from the newest block, then fetches that
    /// block in a second session.
    pub async fn last_config_block(
        &self,
        deliverer: &dyn Deliverer,
        channel_id: &str,
    ) -> Result<common::Block> {
        let tip = self.newest_block(deliverer, channel_id).await?;
        let index = hfc_block::last_config_index(&tip)?;
        info!(channel = %channel_id, index, "fetching last config block");
        self.block(deliverer, channel_id, index).await
    }
}

async fn first_block(deliverer: &dyn Deliverer, seek: Envelope) -> Result<common::Block> {
    let mut stream = deliverer.deliver(seek).await?;
    while let Some(message) = stream.next().await {
        match message? {
            DeliverMessage::Block(block) => return Ok(block),
            DeliverMessage::Status(status) => return Err(ClientError::DeliverRejected { status }),
            DeliverMessage::FilteredBlock(block) => {
                debug!(number = block.number, "ignoring filtered block");
            }
        }
    }
    Err(ClientError::Transport(
        "deliver stream closed without a block".to_string(),
    ))
}
