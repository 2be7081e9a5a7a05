use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::dispatcher::{dispatch, Outcome};
use crate::shutdown::Shutdown;
use crate::storage::Store;

/// One accepted connection: read a request line, dispatch it, write the
/// response line, repeat until the peer goes away or EXIT is served.
pub struct Session {
    stream: TcpStream,
    store: Arc<Store>,
    shutdown: Shutdown,
    read_timeout: Option<Duration>,
    peer: String,
}

impl Session {
    pub fn new(
        stream: TcpStream,
        store: Arc<Store>,
        shutdown: Shutdown,
        read_timeout: Option<Duration>,
    ) -> Self {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            stream,
            store,
            shutdown,
            read_timeout,
            peer,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let (read_half, mut write_half) = self.stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut line = String::new();

        loop {
            line.clear();

            let read = match self.read_timeout {
                Some(limit) => match timeout(limit, reader.read_line(&mut line)).await {
                    Ok(read) => read,
                    Err(_) => {
                        warn!("Read timeout for client {}, closing connection", self.peer);
                        break;
                    }
                },
                None => reader.read_line(&mut line).await,
            };

            let n = match read {
                Ok(n) => n,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
                    ) =>
                {
                    debug!("Connection reset by client {}", self.peer);
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                debug!("Client {} disconnected", self.peer);
                break;
            }

            let message = line.trim();
            if message.is_empty() {
                continue;
            }
            debug!("Request from {}: {}", self.peer, message);

            let (response, exit) = match dispatch(&self.store, message) {
                Outcome::Reply(response) => (response, false),
                Outcome::Shutdown(response) => (response, true),
            };

            let payload = format!("{}\n", response);
            if let Err(e) = write_half.write_all(payload.as_bytes()).await {
                if matches!(
                    e.kind(),
                    ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
                ) {
                    debug!("Client {} disconnected before response was sent", self.peer);
                    break;
                }
                return Err(e.into());
            }

            if exit {
                info!("Shutdown command received from {}", self.peer);
                self.shutdown.trigger();
                break;
            }
        }

        Ok(())
    }
}
