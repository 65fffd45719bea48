//! Controller to worker handoff
//!
//! The worker is this same binary, started with [`WORKER_MODE_ENV`] set. It
//! finds the namespace handle on [`NAMESPACE_FD`] and one framed
//! [`WorkerMessage`] on the pipe at [`PAYLOAD_FD`]:
//!
//! ```text
//! +-------+-------------+--------------+-----------+
//! | NSRN  | version u16 | length u32   | JSON body |
//! +-------+-------------+--------------+-----------+
//! ```
//!
//! Integers are big-endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use netnsrun_core::{Error, NamespaceId, ProcessId, Result, TargetCommand};
use serde::{Deserialize, Serialize};
use std::os::fd::RawFd;

/// Environment variable that switches the binary into worker mode
pub const WORKER_MODE_ENV: &str = "NETNSRUN_WORKER";

/// Environment variable carrying the worker's log filter
pub const WORKER_LOG_ENV: &str = "NETNSRUN_LOG";

/// Descriptor holding the inherited namespace handle
pub const NAMESPACE_FD: RawFd = 3;

/// Descriptor holding the read end of the payload pipe
pub const PAYLOAD_FD: RawFd = 4;

/// Frame magic
pub const MAGIC: [u8; 4] = *b"NSRN";

/// Current frame version
pub const VERSION: u16 = 1;

/// Bytes before the body
pub const HEADER_LEN: usize = 4 + 2 + 4;

/// Largest body accepted
pub const MAX_BODY_LEN: usize = 32 * 1024;

/// Worker exit status: the namespace could not be joined
pub const EXIT_ATTACH_FAILED: i32 = 125;

/// Worker exit status: the payload was missing or malformed
pub const EXIT_PAYLOAD_FAILED: i32 = 126;

/// Worker exit status: the target command could not be started
pub const EXIT_LAUNCH_FAILED: i32 = 127;

/// Whether the current process was started as a worker
#[must_use]
pub fn is_worker_invocation() -> bool {
    std::env::var_os(WORKER_MODE_ENV).is_some_and(|v| v == "1")
}

/// Everything a worker needs besides the namespace handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerMessage {
    /// Command to run inside the namespace
    pub command: TargetCommand,
    /// Representative process the handle was opened from
    pub origin_pid: ProcessId,
    /// Namespace the handle refers to
    pub namespace: NamespaceId,
}

impl WorkerMessage {
    /// Frame the message
    ///
    /// # Errors
    /// Returns error if the body cannot be serialized or exceeds
    /// [`MAX_BODY_LEN`]
    pub fn encode(&self) -> Result<Bytes> {
        let body = serde_json::to_vec(self)?;
        if body.len() > MAX_BODY_LEN {
            return Err(Error::Protocol {
                message: format!("payload of {} bytes exceeds {MAX_BODY_LEN}", body.len()),
            });
        }

        let mut frame = BytesMut::with_capacity(HEADER_LEN + body.len());
        frame.put_slice(&MAGIC);
        frame.put_u16(VERSION);
        #[allow(clippy::cast_possible_truncation)]
        frame.put_u32(body.len() as u32);
        frame.put_slice(&body);

        Ok(frame.freeze())
    }

    /// Unframe a message
    ///
    /// # Errors
    /// Returns error on bad magic, unknown version, wrong length or malformed
    /// body
    pub fn decode(mut frame: &[u8]) -> Result<Self> {
        if frame.remaining() < HEADER_LEN {
            return Err(protocol_error(format!(
                "truncated header ({} bytes)",
                frame.remaining()
            )));
        }

        let mut magic = [0u8; 4];
        frame.copy_to_slice(&mut magic);
        if magic != MAGIC {
            return Err(protocol_error(format!("bad magic {magic:02x?}")));
        }

        let version = frame.get_u16();
        if version != VERSION {
            return Err(protocol_error(format!("unsupported version {version}")));
        }

        let len = frame.get_u32() as usize;
        if len > MAX_BODY_LEN {
            return Err(protocol_error(format!("body length {len} exceeds {MAX_BODY_LEN}")));
        }
        if frame.remaining() < len {
            return Err(protocol_error(format!(
                "truncated body ({} of {len} bytes)",
                frame.remaining()
            )));
        }
        if frame.remaining() > len {
            return Err(protocol_error(format!(
                "{} trailing bytes after body",
                frame.remaining() - len
            )));
        }

        Ok(serde_json::from_slice(frame)?)
    }
}

fn protocol_error(message: String) -> Error {
    Error::Protocol { message }
}
