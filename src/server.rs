use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::session::Session;
use crate::shutdown::Shutdown;
use crate::storage::Store;

pub async fn run(config: &ServerConfig) -> Result<()> {
    let store = Arc::new(Store::open(&config.store_file)?);
    info!(
        "Loaded {} word(s) from {}",
        store.len(),
        config.store_file.display()
    );

    let listener = TcpListener::bind(config.listen_address.as_str()).await?;
    info!("Server listening on {}", config.listen_address);

    serve(
        listener,
        store,
        config.max_connections,
        config.read_timeout(),
    )
    .await
}

/// Accept loop. One task per connection, bounded by `max_connections`
/// permits; the EXIT command path flips the shutdown flag, which cancels the
/// pending accept. In-flight sessions are drained before returning.
pub async fn serve(
    listener: TcpListener,
    store: Arc<Store>,
    max_connections: usize,
    read_timeout: Option<Duration>,
) -> Result<()> {
    let shutdown = Shutdown::new();
    let mut signal = shutdown.subscribe();
    let limiter = Arc::new(Semaphore::new(max_connections));

    loop {
        let (socket, peer) = tokio::select! {
            _ = signal.changed() => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            }
        };

        let permit = tokio::select! {
            _ = signal.changed() => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
            permit = limiter.clone().acquire_owned() => permit?,
        };

        info!("New connection from {}", peer);
        let store = Arc::clone(&store);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let session = Session::new(socket, store, shutdown, read_timeout);
            if let Err(e) = session.run().await {
                error!("Session error for {}: {}", peer, e);
            } else {
                info!("Session completed for {}", peer);
            }
        });
    }

    drop(listener);
    let _ = limiter.acquire_many(max_connections as u32).await;
    info!("All sessions closed, server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tempfile::TempDir;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
    use tokio::net::TcpStream;
    use tokio::task::JoinHandle;

    async fn spawn_server(
        store: Arc<Store>,
        read_timeout: Option<Duration>,
    ) -> (SocketAddr, JoinHandle<Result<()>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(serve(listener, store, 8, read_timeout));
        (addr, handle)
    }

    struct TestClient {
        reader: BufReader<OwnedReadHalf>,
        writer: OwnedWriteHalf,
    }

    impl TestClient {
        async fn connect(addr: SocketAddr) -> Self {
            let stream = TcpStream::connect(addr).await.unwrap();
            let (read_half, writer) = stream.into_split();
            Self {
                reader: BufReader::new(read_half),
                writer,
            }
        }

        async fn request(&mut self, line: &str) -> String {
            self.writer.write_all(line.as_bytes()).await.unwrap();
            self.writer.write_all(b"\n").await.unwrap();

            let mut response = String::new();
            self.reader.read_line(&mut response).await.unwrap();
            response.trim().to_string()
        }
    }

    #[tokio::test]
    async fn end_to_end_dictionary_session() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dictionary.txt");
        std::fs::write(&path, "cat:feline;small carnivore\n").unwrap();
        let store = Arc::new(Store::open(path).unwrap());

        let (addr, _server) = spawn_server(store, None).await;
        let mut client = TestClient::connect(addr).await;

        let response = client.request(r#"{"command":"SEARCH","word":"Cat"}"#).await;
        assert!(response.starts_with("SUCCESS:"));
        assert!(response.contains("feline"));
        assert!(response.contains("small carnivore"));

        let response = client
            .request(r#"{"command":"ADD","word":"cat","meaning":"x"}"#)
            .await;
        assert_eq!(response, "ERROR: Word already exists.");

        // Malformed input is answered, and the connection stays usable
        let response = client.request("{not json").await;
        assert_eq!(response, "ERROR: Malformed request.");

        let response = client
            .request(
                r#"{"command":"UPDATE","word":"cat","exMeaning":"feline","newMeaning":"domestic cat"}"#,
            )
            .await;
        assert_eq!(response, "SUCCESS: Meaning updated.");

        let response = client.request(r#"{"command":"SEARCH","word":"cat"}"#).await;
        assert!(response.contains("domestic cat"));
        assert!(!response.contains("feline"));
    }

    #[tokio::test]
    async fn concurrent_adds_both_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dictionary.txt");
        let store = Arc::new(Store::open(&path).unwrap());

        let (addr, _server) = spawn_server(store, None).await;
        let mut first = TestClient::connect(addr).await;
        let mut second = TestClient::connect(addr).await;

        let (a, b) = tokio::join!(
            first.request(r#"{"command":"ADD","word":"alpha","meaning":"first letter"}"#),
            second.request(r#"{"command":"ADD","word":"beta","meaning":"second letter"}"#),
        );
        assert_eq!(a, "SUCCESS: Word added.");
        assert_eq!(b, "SUCCESS: Word added.");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("alpha:first letter"));
        assert!(content.contains("beta:second letter"));
    }

    #[tokio::test]
    async fn exit_stops_the_server() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(Store::open(dir.path().join("dictionary.txt")).unwrap());

        let (addr, server) = spawn_server(store, None).await;
        let mut client = TestClient::connect(addr).await;

        let response = client.request(r#"{"command":"EXIT"}"#).await;
        assert_eq!(response, "SUCCESS: Server shutting down.");

        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server did not stop after EXIT")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn idle_connection_times_out() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(Store::open(dir.path().join("dictionary.txt")).unwrap());

        let (addr, _server) = spawn_server(store, Some(Duration::from_millis(100))).await;
        let stream = TcpStream::connect(addr).await.unwrap();
        let mut reader = BufReader::new(stream);

        // The server closes the idle connection, so the read sees EOF
        let mut line = String::new();
        let n = tokio::time::timeout(Duration::from_secs(5), reader.read_line(&mut line))
            .await
            .expect("server did not close the idle connection")
            .unwrap();
        assert_eq!(n, 0);
    }
}
