//! Browser/renderer messaging for error-page interaction.
//!
//! The renderer process is isolated from the browser process; the only way a
//! button press on a generated error page reaches the coordinator is a framed
//! [`IpcMessage::ErrorPageClick`] sent over a [`LocalIpcEndpoint`].

use pd_core::BrowserError;
use pd_core::BrowserResult;
use pd_core::ViewId;
use std::sync::mpsc;
use std::time::Duration;

const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;
const HARD_MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;
const FRAME_PREFIX_BYTES: usize = 4;
const MESSAGE_TAG_LISTEN: u8 = 1;
const MESSAGE_TAG_CLICK: u8 = 2;
const MESSAGE_TAG_RELEASE: u8 = 3;
const MESSAGE_TAG_SHUTDOWN: u8 = 4;

/// Process roles taking part in the error-page channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRole {
    Browser,
    Renderer,
}

impl ProcessRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Renderer => "renderer",
        }
    }
}

/// Typed IPC message envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpcMessage {
    /// Browser -> renderer: start forwarding button presses for this page.
    ListenErrorPage { view_id: ViewId },
    /// Renderer -> browser: the user pressed a button on an error page.
    ErrorPageClick { view_id: ViewId, button_index: u32 },
    /// Browser -> renderer: the page was navigated away from.
    ReleaseErrorPage { view_id: ViewId },
    Shutdown,
}

impl IpcMessage {
    fn tag(&self) -> u8 {
        match self {
            Self::ListenErrorPage { .. } => MESSAGE_TAG_LISTEN,
            Self::ErrorPageClick { .. } => MESSAGE_TAG_CLICK,
            Self::ReleaseErrorPage { .. } => MESSAGE_TAG_RELEASE,
            Self::Shutdown => MESSAGE_TAG_SHUTDOWN,
        }
    }
}

/// Defines how processes communicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub role: ProcessRole,
    pub max_message_bytes: usize,
}

impl ChannelConfig {
    pub fn hardened(role: ProcessRole) -> BrowserResult<Self> {
        let config = Self {
            role,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BrowserResult<()> {
        if self.max_message_bytes == 0 {
            return Err(BrowserError::new(
                "ipc.max_message_bytes_invalid",
                "channel max_message_bytes must be greater than zero",
            ));
        }

        if self.max_message_bytes > HARD_MAX_MESSAGE_BYTES {
            return Err(BrowserError::new(
                "ipc.max_message_bytes_too_large",
                "channel max_message_bytes exceeds hard limit (16 MiB)",
            ));
        }

        Ok(())
    }
}

/// In-memory endpoint that applies framing and message-size checks.
pub struct LocalIpcEndpoint {
    tx: mpsc::Sender<Vec<u8>>,
    rx: mpsc::Receiver<Vec<u8>>,
    config: ChannelConfig,
}

impl LocalIpcEndpoint {
    pub fn role(&self) -> ProcessRole {
        self.config.role
    }

    pub fn send(&self, message: &IpcMessage) -> BrowserResult<()> {
        let frame = encode_message(message, self.config.max_message_bytes)?;
        self.tx.send(frame).map_err(|error| {
            BrowserError::new(
                "ipc.send_failed",
                format!(
                    "failed to send message from {} endpoint: {error}",
                    self.config.role.as_str()
                ),
            )
        })
    }

    pub fn recv_timeout(&self, timeout: Duration) -> BrowserResult<IpcMessage> {
        let frame = self.rx.recv_timeout(timeout).map_err(|error| {
            BrowserError::new(
                "ipc.recv_failed",
                format!(
                    "failed to receive message for {} endpoint: {error}",
                    self.config.role.as_str()
                ),
            )
        })?;
        decode_message(&frame, self.config.max_message_bytes)
    }

    /// Returns the next queued message without blocking.
    pub fn try_recv(&self) -> BrowserResult<Option<IpcMessage>> {
        match self.rx.try_recv() {
            Ok(frame) => decode_message(&frame, self.config.max_message_bytes).map(Some),
            Err(mpsc::TryRecvError::Empty) => Ok(None),
            Err(mpsc::TryRecvError::Disconnected) => Err(BrowserError::new(
                "ipc.peer_disconnected",
                format!(
                    "peer of {} endpoint has disconnected",
                    self.config.role.as_str()
                ),
            )),
        }
    }
}

/// Creates paired in-memory IPC endpoints.
pub fn local_channel_pair(
    left: ChannelConfig,
    right: ChannelConfig,
) -> BrowserResult<(LocalIpcEndpoint, LocalIpcEndpoint)> {
    left.validate()?;
    right.validate()?;

    let (left_to_right_tx, left_to_right_rx) = mpsc::channel();
    let (right_to_left_tx, right_to_left_rx) = mpsc::channel();

    Ok((
        LocalIpcEndpoint {
            tx: left_to_right_tx,
            rx: right_to_left_rx,
            config: left,
        },
        LocalIpcEndpoint {
            tx: right_to_left_tx,
            rx: left_to_right_rx,
            config: right,
        },
    ))
}

/// Encodes a payload as a length-prefixed frame.
pub fn encode_frame(payload: &[u8], max_message_bytes: usize) -> BrowserResult<Vec<u8>> {
    if payload.len() > max_message_bytes {
        return Err(BrowserError::new(
            "ipc.message_too_large",
            format!(
                "payload exceeds max_message_bytes ({} > {max_message_bytes})",
                payload.len()
            ),
        ));
    }

    let len_u32 = u32::try_from(payload.len()).map_err(|_| {
        BrowserError::new(
            "ipc.message_too_large",
            "payload length does not fit in 32-bit frame prefix",
        )
    })?;

    let mut out = Vec::with_capacity(FRAME_PREFIX_BYTES + payload.len());
    out.extend_from_slice(&len_u32.to_be_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Decodes a length-prefixed frame and validates payload size.
pub fn decode_frame(frame: &[u8], max_message_bytes: usize) -> BrowserResult<&[u8]> {
    let Some((prefix, payload)) = frame.split_first_chunk::<FRAME_PREFIX_BYTES>() else {
        return Err(BrowserError::new(
            "ipc.frame_too_short",
            "frame is shorter than the 4-byte length prefix",
        ));
    };

    let payload_len = u32::from_be_bytes(*prefix) as usize;
    if payload_len > max_message_bytes {
        return Err(BrowserError::new(
            "ipc.message_too_large",
            format!("decoded payload exceeds max_message_bytes ({payload_len} > {max_message_bytes})"),
        ));
    }

    if payload.len() != payload_len {
        return Err(BrowserError::new(
            "ipc.frame_length_mismatch",
            format!(
                "frame length mismatch: prefix announces {payload_len} bytes, got {}",
                payload.len()
            ),
        ));
    }

    Ok(payload)
}

/// Encodes a typed IPC message as a framed payload.
pub fn encode_message(message: &IpcMessage, max_message_bytes: usize) -> BrowserResult<Vec<u8>> {
    let mut payload = vec![message.tag()];
    match message {
        IpcMessage::ListenErrorPage { view_id } | IpcMessage::ReleaseErrorPage { view_id } => {
            payload.extend_from_slice(&view_id.get().to_be_bytes());
        }
        IpcMessage::ErrorPageClick {
            view_id,
            button_index,
        } => {
            payload.extend_from_slice(&view_id.get().to_be_bytes());
            payload.extend_from_slice(&button_index.to_be_bytes());
        }
        IpcMessage::Shutdown => {}
    }
    encode_frame(&payload, max_message_bytes)
}

/// Decodes a framed typed IPC message.
pub fn decode_message(frame: &[u8], max_message_bytes: usize) -> BrowserResult<IpcMessage> {
    let mut reader = PayloadReader::new(decode_frame(frame, max_message_bytes)?);
    let message = match reader.u8("tag")? {
        MESSAGE_TAG_LISTEN => IpcMessage::ListenErrorPage {
            view_id: ViewId::new(reader.u64("view_id")?),
        },
        MESSAGE_TAG_CLICK => IpcMessage::ErrorPageClick {
            view_id: ViewId::new(reader.u64("view_id")?),
            button_index: reader.u32("button_index")?,
        },
        MESSAGE_TAG_RELEASE => IpcMessage::ReleaseErrorPage {
            view_id: ViewId::new(reader.u64("view_id")?),
        },
        MESSAGE_TAG_SHUTDOWN => IpcMessage::Shutdown,
        other => {
            return Err(BrowserError::new(
                "ipc.message_tag_unknown",
                format!("unknown typed IPC message tag `{other}`"),
            ));
        }
    };
    reader.finish()?;
    Ok(message)
}

struct PayloadReader<'a> {
    remaining: &'a [u8],
    consumed: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(payload: &'a [u8]) -> Self {
        Self {
            remaining: payload,
            consumed: 0,
        }
    }

    fn take<const N: usize>(&mut self, field: &str) -> BrowserResult<[u8; N]> {
        let Some((head, tail)) = self.remaining.split_first_chunk::<N>() else {
            return Err(BrowserError::new(
                "ipc.message_truncated",
                format!("typed IPC payload ended while reading `{field}` (need {N} bytes)"),
            ));
        };
        self.remaining = tail;
        self.consumed += N;
        Ok(*head)
    }

    fn u8(&mut self, field: &str) -> BrowserResult<u8> {
        self.take::<1>(field).map(|[value]| value)
    }

    fn u32(&mut self, field: &str) -> BrowserResult<u32> {
        self.take::<4>(field).map(u32::from_be_bytes)
    }

    fn u64(&mut self, field: &str) -> BrowserResult<u64> {
        self.take::<8>(field).map(u64::from_be_bytes)
    }

    fn finish(self) -> BrowserResult<()> {
        if self.remaining.is_empty() {
            return Ok(());
        }
        Err(BrowserError::new(
            "ipc.message_trailing_bytes",
            format!(
                "typed IPC payload has {} trailing bytes after {} decoded",
                self.remaining.len(),
                self.consumed
            ),
        ))
    }
}
