//! Length-prefixed parameter frames
//!
//! Wire format of one frame: a 4-byte unsigned little-endian length `L`,
//! followed by `L` bytes of UTF-8 JSON. Frames are written back to back on
//! one open sink with no other delimiter.
//!
//! [`ParamsWriter`] is the producer half. [`ParamsReader`] is the matching
//! consumer used by in-process peers and tests.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum FrameError {
    /// Sink or source failure, carried unchanged
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to encode frame payload: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode frame payload: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("frame payload of {0} bytes does not fit a u32 length prefix")]
    TooLarge(usize),
    #[error("stream ended inside a frame")]
    Truncated,
}

/// Encodes `value` as one frame: length prefix followed by the JSON bytes.
pub fn encode_frame<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, FrameError> {
    let payload = serde_json::to_vec(value).map_err(FrameError::Encode)?;
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::TooLarge(payload.len()))?;

    let mut frame = Vec::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

// ============================================================================
// WRITER
// ============================================================================

/// Writes parameter frames to an open sink.
pub struct ParamsWriter<W> {
    sink: W,
}

impl<W: AsyncWrite + Unpin> ParamsWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Writes `value` as exactly one frame. Sink failures are returned
    /// unchanged; nothing is retried.
    pub async fn write_params<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), FrameError> {
        let frame = encode_frame(value)?;
        self.sink.write_all(&frame).await?;
        debug!("Wrote params frame ({} payload bytes)", frame.len() - LENGTH_PREFIX_LEN);
        Ok(())
    }

    /// Flushes and closes the sink.
    pub async fn end(mut self) -> Result<(), FrameError> {
        self.sink.shutdown().await?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

// ============================================================================
// READER
// ============================================================================

/// Reads parameter frames from a source.
pub struct ParamsReader<R> {
    source: R,
}

impl<R: AsyncRead + Unpin> ParamsReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    /// Reads the next frame's raw payload.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(bytes))` - One complete frame
    /// * `Ok(None)` - Clean end of stream at a frame boundary
    /// * `Err(FrameError::Truncated)` - Stream ended inside a frame
    pub async fn read_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        let mut prefix = [0u8; LENGTH_PREFIX_LEN];
        let mut filled = 0;
        while filled < LENGTH_PREFIX_LEN {
            let n = self.source.read(&mut prefix[filled..]).await?;
            if n == 0 {
                return if filled == 0 { Ok(None) } else { Err(FrameError::Truncated) };
            }
            filled += n;
        }

        let len = u32::from_le_bytes(prefix) as usize;
        let mut payload = vec![0u8; len];
        match self.source.read_exact(&mut payload).await {
            Ok(_) => Ok(Some(payload)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(FrameError::Truncated),
            Err(e) => Err(FrameError::Io(e)),
        }
    }

    /// Reads and parses the next frame.
    pub async fn read_params<T: DeserializeOwned>(&mut self) -> Result<Option<T>, FrameError> {
        match self.read_frame().await? {
            Some(payload) => serde_json::from_slice(&payload)
                .map(Some)
                .map_err(FrameError::Decode),
            None => Ok(None),
        }
    }
}
