//! Block event streaming.
//!
//! An [`EventListener`] moves through
//! `Created → Seeking → Streaming → (Closed | Failed)`. Once streaming, a
//! background task decodes every delivered block and pushes it onto a
//! bounded queue. A block that fails to decode is logged and skipped, so
//! consumers must tolerate gaps in block numbers.
//!
//! Cancellation is cooperative: the receive loop checks the token before
//! every read and every queue send, then drops the stream, which tears
//! down the connection. There is no reconnect; start a fresh listener.

use crate::deliver::seek_envelope;
use crate::error::{ClientError, Result};
use crate::signer::Signer;
use crate::transport::{DeliverMessage, DeliverStream, Deliverer};
use futures::StreamExt;
use hfc_block::{decode_block, filter_block, Block, FilterBlock, FilterTransaction};
use hfc_types::common::{Envelope, Status};
use hfc_types::orderer::SeekPosition;
use hfc_types::peer::{FilteredBlock, TxValidationCode};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default capacity of the output queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// How delivered blocks are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Every transaction in full.
    Full,
    /// Read-write sets and validation codes only.
    Filtered,
}

/// Listener lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Constructed; no seek requested yet.
    Created,
    /// Seek request signed; stream not yet open.
    Seeking,
    /// Receive loop running.
    Streaming,
    /// Ended by a success status, cancellation or a dropped consumer.
    Closed,
    /// Ended by a transport error or a failure status.
    Failed,
}

/// A decoded block delivered to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockEvent {
    /// Produced in [`DecodeMode::Full`].
    Full(Box<Block>),
    /// Produced in [`DecodeMode::Filtered`].
    Filtered(FilterBlock),
}

impl BlockEvent {
    /// Number of the block.
    pub fn number(&self) -> u64 {
        match self {
            Self::Full(block) => block.number,
            Self::Filtered(block) => block.block_num,
        }
    }
}

/// A persistent block listener on one peer and channel.
pub struct EventListener {
    signer: Signer,
    deliverer: Arc<dyn Deliverer>,
    channel_id: String,
    mode: DecodeMode,
    capacity: usize,
    state: Arc<RwLock<ListenerState>>,
    seek: Option<Envelope>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl EventListener {
    /// Creates a listener in the `Created` state.
    pub fn new(
        signer: Signer,
        deliverer: Arc<dyn Deliverer>,
        channel_id: impl Into<String>,
        mode: DecodeMode,
    ) -> Self {
        Self {
            signer,
            deliverer,
            channel_id: channel_id.into(),
            mode,
            capacity: DEFAULT_QUEUE_CAPACITY,
            state: Arc::new(RwLock::new(ListenerState::Created)),
            seek: None,
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Sets the output queue capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Current state.
    pub fn state(&self) -> ListenerState {
        *self.state.read()
    }

    /// Channel being listened to.
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// A token that stops the receive loop when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Requests the stream to start at the current tip.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidOperation`] unless the listener is `Created`.
    pub fn seek_newest(&mut self) -> Result<()> {
        self.seek(SeekPosition::newest(), SeekPosition::specified(u64::MAX))
    }

    /// Requests blocks `start..=stop`.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidOperation`] unless the listener is `Created`.
    pub fn seek_range(&mut self, start: u64, stop: u64) -> Result<()> {
        self.seek(SeekPosition::specified(start), SeekPosition::specified(stop))
    }

    fn seek(&mut self, start: SeekPosition, stop: SeekPosition) -> Result<()> {
        self.expect_state(ListenerState::Created, "seek")?;
        self.seek = Some(seek_envelope(&self.signer, &self.channel_id, start, stop)?);
        *self.state.write() = ListenerState::Seeking;
        debug!(channel = %self.channel_id, "seek request signed");
        Ok(())
    }

    /// Opens the stream and starts the receive loop.
    ///
    /// Returns the queue decoded blocks are pushed to. The queue closes when
    /// the loop ends.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidOperation`] unless the listener is `Seeking`;
    /// a transport error if the stream cannot be opened, after which the
    /// listener is `Failed`.
    pub async fn listen(&mut self) -> Result<mpsc::Receiver<BlockEvent>> {
        self.expect_state(ListenerState::Seeking, "listen")?;
        let seek = self
            .seek
            .take()
            .ok_or_else(|| ClientError::InvalidOperation("no seek request".to_string()))?;

        let stream = match self.deliverer.deliver(seek).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(channel = %self.channel_id, error = %e, "failed to open event stream");
                *self.state.write() = ListenerState::Failed;
                return Err(e);
            }
        };

        let (sender, receiver) = mpsc::channel(self.capacity);
        *self.state.write() = ListenerState::Streaming;
        info!(channel = %self.channel_id, mode = ?self.mode, "event stream open");

        self.task = Some(tokio::spawn(receive_loop(
            stream,
            sender,
            self.mode,
            Arc::clone(&self.state),
            self.cancel.clone(),
            self.channel_id.clone(),
        )));
        Ok(receiver)
    }

    /// Stops the receive loop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the receive loop to end.
    pub async fn finished(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "event task ended abnormally");
                *self.state.write() = ListenerState::Failed;
            }
        }
    }

    fn expect_state(&self, expected: ListenerState, operation: &str) -> Result<()> {
        let state = self.state();
        if state != expected {
            return Err(ClientError::InvalidOperation(format!(
                "{operation} requires state {expected:?}, listener is {state:?}"
            )));
        }
        Ok(())
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for EventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListener")
            .field("channel_id", &self.channel_id)
            .field("mode", &self.mode)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

async fn receive_loop(
    mut stream: DeliverStream,
    sender: mpsc::Sender<BlockEvent>,
    mode: DecodeMode,
    state: Arc<RwLock<ListenerState>>,
    cancel: CancellationToken,
    channel: String,
) {
    let end = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(channel = %channel, "event stream cancelled");
                break ListenerState::Closed;
            }
            next = stream.next() => next,
        };

        let message = match next {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                error!(channel = %channel, error = %e, "event stream failed");
                break ListenerState::Failed;
            }
            None => {
                warn!(channel = %channel, "event stream closed without status");
                break ListenerState::Failed;
            }
        };

        let event = match message {
            DeliverMessage::Status(status) if status == Status::Success as i32 => {
                info!(channel = %channel, "event stream completed");
                break ListenerState::Closed;
            }
            DeliverMessage::Status(status) => {
                error!(channel = %channel, status, "event stream ended with failure status");
                break ListenerState::Failed;
            }
            DeliverMessage::Block(raw) => {
                let decoded = match mode {
                    DecodeMode::Full => decode_block(&raw).map(|b| BlockEvent::Full(Box::new(b))),
                    DecodeMode::Filtered => filter_block(&raw).map(BlockEvent::Filtered),
                };
                match decoded {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(channel = %channel, error = %e, "skipping undecodable block");
                        continue;
                    }
                }
            }
            DeliverMessage::FilteredBlock(block) => match mode {
                DecodeMode::Filtered => BlockEvent::Filtered(from_peer_filtered(&block)),
                DecodeMode::Full => {
                    warn!(channel = %channel, number = block.number, "skipping filtered block in full mode");
                    continue;
                }
            },
        };

        debug!(channel = %channel, number = event.number(), "block queued");
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(channel = %channel, "event stream cancelled");
                break ListenerState::Closed;
            }
            sent = sender.send(event) => sent,
        };
        if sent.is_err() {
            info!(channel = %channel, "event consumer dropped");
            break ListenerState::Closed;
        }
    };

    *state.write() = end;
}

/// Projects a peer-side filtered block onto the filtered view.
///
/// Peers do not send read-write sets or hashes in this form, so those stay
/// empty.
pub fn from_peer_filtered(block: &FilteredBlock) -> FilterBlock {
    let transactions: Vec<FilterTransaction> = block
        .filtered_transactions
        .iter()
        .enumerate()
        .map(|(index, tx)| {
            let code = u8::try_from(tx.tx_validation_code).unwrap_or(u8::MAX);
            FilterTransaction {
                index,
                tx_id: tx.txid.clone(),
                validation_code: code,
                validation_code_name: TxValidationCode::name_of(code).to_string(),
                ..Default::default()
            }
        })
        .collect();
    FilterBlock {
        tx_num: transactions.len(),
        block_num: block.number,
        transaction_filter: transactions.iter().map(|t| t.validation_code).collect(),
        transactions,
        ..Default::default()
    }
}
