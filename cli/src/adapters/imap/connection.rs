use async_imap::types::Mailbox;
use async_imap::Session;
use async_native_tls::TlsStream;
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info, warn};

use email_triage::TriageError;

// TLS over tokio TCP, bridged to futures-io for async-imap.
pub type ImapSession = Session<TlsStream<Compat<TcpStream>>>;

pub struct ImapConnection {
    pub session: ImapSession,
    /// EXAMINE instead of SELECT, so nothing gets marked as seen
    pub read_only: bool,
}

impl ImapConnection {
    pub async fn select_folder(&mut self, folder: &str) -> Result<Mailbox, TriageError> {
        let mailbox = if self.read_only {
            self.session.examine(folder).await
        } else {
            self.session.select(folder).await
        }
        .map_err(|e| TriageError::Backend(format!("SELECT {} failed: {}", folder, e)))?;

        debug!(folder = %folder, exists = mailbox.exists, read_only = self.read_only, "Folder selected");
        Ok(mailbox)
    }

    pub async fn logout(mut self) {
        if let Err(e) = self.session.logout().await {
            warn!("IMAP logout failed: {}", e);
        }
    }
}

pub async fn connect(
    host: &str,
    port: u16,
    username: &str,
    password: &str,
    read_only: bool,
) -> Result<ImapConnection, TriageError> {
    info!(host = %host, port = port, "Connecting to IMAP server");

    let tcp = TcpStream::connect((host, port))
        .await
        .map_err(|e| TriageError::Network(format!("TCP connection failed: {}", e)))?;

    let tcp = tcp.compat();
    let tls = async_native_tls::TlsConnector::new();
    let tls_stream = tls
        .connect(host, tcp)
        .await
        .map_err(|e| TriageError::Network(format!("TLS handshake failed: {}", e)))?;

    let client = async_imap::Client::new(tls_stream);

    let session = client
        .login(username, password)
        .await
        .map_err(|(e, _)| TriageError::Backend(format!("Login failed: {}", e)))?;

    Ok(ImapConnection { session, read_only })
}
