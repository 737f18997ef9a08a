//! Mock console server for protocol-level testing.
//!
//! [`MockConsoleServer`] is a scripted TCP listener standing in for a real
//! mixing console, enabling deterministic testing of client connections
//! and vendor backends without hardware on the network.
//!
//! # Example
//!
//! ```
//! use mixlib_test_harness::MockConsoleServer;
//!
//! # async fn example() -> mixlib_core::Result<()> {
//! let mut server = MockConsoleServer::new().await?;
//!
//! // When the client sends this request frame, reply with the state frame.
//! server.expect(&[0x7F, 0x08, 0x00, 0x00], &[0x7F, 0x09, 0x02, 0x00, 0x01, 0x02]);
//! // Then push an unsolicited fader-change frame.
//! server.push(&[0x7F, 0x11, 0x01, 0x00, 0x42]);
//!
//! let addr = server.addr().to_string();
//! server.start();
//! // ... connect a TcpConnection to `addr` and test ...
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use mixlib_core::error::{Error, Result};

/// One step of a scripted console session.
#[derive(Debug, Clone)]
enum ScriptStep {
    /// Read exactly these bytes from the client, then send the response.
    Expect {
        request: Vec<u8>,
        response: Vec<u8>,
    },
    /// Send these bytes without waiting for anything, the way a console
    /// pushes surface changes and meter frames unprompted.
    Push { bytes: Vec<u8> },
}

/// A scripted mock console listening on localhost.
///
/// The listener is bound in [`new`](MockConsoleServer::new), so the
/// address is connectable immediately; [`start`](MockConsoleServer::start)
/// accepts a single client and plays the script in order. A client that
/// sends bytes not matching the next expectation fails the script, which
/// [`wait`](MockConsoleServer::wait) reports.
pub struct MockConsoleServer {
    listener: Option<TcpListener>,
    addr: String,
    script: VecDeque<ScriptStep>,
    server_handle: Option<JoinHandle<std::result::Result<(), String>>>,
}

impl MockConsoleServer {
    /// Bind a listener on a random localhost port.
    pub async fn new() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| Error::Transport(format!("failed to bind mock console: {e}")))?;
        let addr = listener.local_addr().map_err(Error::Io)?.to_string();
        Ok(Self {
            listener: Some(listener),
            addr,
            script: VecDeque::new(),
            server_handle: None,
        })
    }

    /// The address the server is listening on.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Script a request/response exchange.
    ///
    /// Steps play in the order they were added: the server reads exactly
    /// `request` from the client, verifies it byte-for-byte, and replies
    /// with `response`.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.script.push_back(ScriptStep::Expect {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Script an unsolicited send.
    pub fn push(&mut self, bytes: &[u8]) {
        self.script.push_back(ScriptStep::Push {
            bytes: bytes.to_vec(),
        });
    }

    /// Accept one client and play the script in a background task.
    ///
    /// After the script completes the connection is held open until the
    /// client disconnects, so clients can close at their own pace.
    pub fn start(&mut self) {
        let listener = match self.listener.take() {
            Some(l) => l,
            // start() called twice; the second call has nothing to run.
            None => return,
        };
        let script: Vec<ScriptStep> = self.script.drain(..).collect();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener
                .accept()
                .await
                .map_err(|e| format!("failed to accept connection: {e}"))?;

            for (i, step) in script.iter().enumerate() {
                match step {
                    ScriptStep::Expect { request, response } => {
                        let mut buf = vec![0u8; request.len()];
                        let mut total_read = 0;
                        while total_read < request.len() {
                            let n = stream
                                .read(&mut buf[total_read..])
                                .await
                                .map_err(|e| format!("step {i}: read error: {e}"))?;
                            if n == 0 {
                                return Err(format!(
                                    "step {i}: client disconnected after {total_read} bytes \
                                     (expected {})",
                                    request.len()
                                ));
                            }
                            total_read += n;
                        }
                        if &buf != request {
                            return Err(format!(
                                "step {i}: request mismatch: expected {request:02X?}, got {buf:02X?}"
                            ));
                        }
                        stream
                            .write_all(response)
                            .await
                            .map_err(|e| format!("step {i}: write error: {e}"))?;
                        stream
                            .flush()
                            .await
                            .map_err(|e| format!("step {i}: flush error: {e}"))?;
                    }
                    ScriptStep::Push { bytes } => {
                        stream
                            .write_all(bytes)
                            .await
                            .map_err(|e| format!("step {i}: push error: {e}"))?;
                        stream
                            .flush()
                            .await
                            .map_err(|e| format!("step {i}: flush error: {e}"))?;
                    }
                }
            }

            // Script done; linger until the client hangs up.
            let mut drain = [0u8; 256];
            loop {
                match stream.read(&mut drain).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            Ok(())
        });

        self.server_handle = Some(handle);
    }

    /// Wait for the script to finish and report any mismatch.
    pub async fn wait(self) -> std::result::Result<(), String> {
        if let Some(handle) = self.server_handle {
            handle
                .await
                .map_err(|e| format!("server task panicked: {e}"))?
        } else {
            Ok(())
        }
    }
}
