mod config;
mod interceptors;
mod services;

use clap::Parser;
use config::ServerConfig;
use interceptors::cert;
use joblib::{Supervisor, SupervisorConfig};
use jobproto::remote_jobs_server::RemoteJobsServer;
use services::jobservice::RemoteJobsService;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{transport::Server, Request, Status};
use tracing::info;
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    init_tracing();
    let config = ServerConfig::parse();
    let listener = TcpListener::bind(config.addr).await?;
    serve(listener, &config).await
}

/// Log to stdout, filtered by `RUST_LOG` and defaulting to `info`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

async fn serve(listener: TcpListener, config: &ServerConfig) -> Result<(), BoxError> {
    let tls = config.tls().await?;
    let authenticate: fn(Request<()>) -> Result<Request<()>, Status> =
        if config.authenticates_clients() {
            cert::extract_subj_uid
        } else {
            cert::anonymous_user
        };

    let supervisor = Supervisor::with_config(SupervisorConfig {
        capture_chunk_size: config.capture_chunk_size,
    });
    let job_service = RemoteJobsService::new(supervisor);
    let remote_jobs_server = RemoteJobsServer::with_interceptor(job_service, authenticate);

    info!(
        addr = %listener.local_addr()?,
        tls = tls.is_some(),
        client_auth = config.authenticates_clients(),
        "listening"
    );
    let mut builder = Server::builder();
    if let Some(tls) = tls {
        builder = builder.tls_config(tls)?;
    }
    builder
        .add_service(remote_jobs_server)
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await?;

    Ok(())
}
