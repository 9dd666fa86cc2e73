use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::{self, Instant};
use tracing::trace;

use crate::types::ScanOutcome;

/// Read deadline for the banner grab, independent of the dial timeout.
pub const BANNER_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Connect to `host:port` and, if it accepts, optionally read a banner.
///
/// - Connect time is bounded by `dial_timeout`; name resolution counts against it.
/// - Any connect failure (refused, timed out, unreachable, bad host) yields `open = false`.
/// - With `banner_read_bytes > 0`, a single read of up to that many bytes is attempted
///   within [`BANNER_READ_TIMEOUT`].
/// - The reported duration covers the whole probe, banner read included.
pub async fn probe(
    host: &str,
    port: u16,
    dial_timeout: Duration,
    banner_read_bytes: usize,
) -> ScanOutcome {
    let start = Instant::now();
    let connect_res = time::timeout(dial_timeout, TcpStream::connect((host, port))).await;

    let (open, banner) = match connect_res {
        Ok(Ok(mut stream)) => {
            let banner = if banner_read_bytes > 0 {
                read_banner(&mut stream, banner_read_bytes).await
            } else {
                None
            };
            drop(stream);
            (true, banner)
        }
        Ok(Err(e)) => {
            trace!(%host, port, error = %e, "connect failed");
            (false, None)
        }
        Err(_) => {
            trace!(%host, port, "connect timed out");
            (false, None)
        }
    };

    ScanOutcome {
        host: host.to_string(),
        port,
        open,
        banner,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

/// Try to read up to `max` bytes within the banner deadline and return the trimmed,
/// lossily decoded text. Nothing read, only whitespace, or a read error give `None`.
async fn read_banner(stream: &mut TcpStream, max: usize) -> Option<String> {
    let mut buf = vec![0u8; max];
    match time::timeout(BANNER_READ_TIMEOUT, stream.read(&mut buf)).await {
        Ok(Ok(n)) if n > 0 => {
            buf.truncate(n);
            let text = String::from_utf8_lossy(&buf);
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        _ => None,
    }
}
