use clap::Parser;
use std::{
    io,
    net::SocketAddr,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tonic::transport::{Certificate, Identity, ServerTlsConfig};

/// Serve the remote jobs gRPC API
#[derive(Debug, Parser)]
pub struct ServerConfig {
    /// Address to listen on
    #[clap(short = 'a', long, env = "JOBSERVER_ADDR", default_value = "[::1]:50051")]
    pub addr: SocketAddr,

    /// PEM certificate presented by the server, enables TLS
    #[clap(long, env = "JOBSERVER_TLS_CERT")]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key for --tls-cert
    #[clap(long, env = "JOBSERVER_TLS_KEY")]
    pub tls_key: Option<PathBuf>,

    /// PEM CA used to verify client certificates, enables client authentication
    #[clap(long, env = "JOBSERVER_CLIENT_CA")]
    pub client_ca: Option<PathBuf>,

    /// Bytes requested per read of a job's output pipes
    #[clap(long, env = "JOBSERVER_CAPTURE_CHUNK", default_value = "4096")]
    pub capture_chunk_size: usize,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("--tls-cert and --tls-key must be given together")]
    PartialIdentity,
    #[error("--client-ca requires --tls-cert and --tls-key")]
    ClientCaWithoutTls,
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ServerConfig {
    /// Clients are identified by their certificate only when a client CA is configured.
    pub fn authenticates_clients(&self) -> bool {
        self.client_ca.is_some()
    }

    /// Load the TLS material, `None` when serving plaintext.
    pub async fn tls(&self) -> Result<Option<ServerTlsConfig>, ConfigError> {
        let (cert, key) = match (&self.tls_cert, &self.tls_key) {
            (Some(cert), Some(key)) => (cert, key),
            (None, None) if self.client_ca.is_some() => return Err(ConfigError::ClientCaWithoutTls),
            (None, None) => return Ok(None),
            _ => return Err(ConfigError::PartialIdentity),
        };

        let identity = Identity::from_pem(read_pem(cert).await?, read_pem(key).await?);
        let mut tls = ServerTlsConfig::new().identity(identity);
        if let Some(ca) = &self.client_ca {
            tls = tls.client_ca_root(Certificate::from_pem(read_pem(ca).await?));
        }
        Ok(Some(tls))
    }
}

async fn read_pem(path: &Path) -> Result<Vec<u8>, ConfigError> {
    tokio::fs::read(path).await.map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}
