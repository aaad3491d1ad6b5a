mod arg_parser;
mod client_cli;

use arg_parser::{ArgParser, SubCommand};
use client_cli::{ClientCli, TlsFiles};

use clap::Parser;
use std::error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn error::Error>> {
    let args = ArgParser::parse();
    let tls = match (args.ca.as_deref(), args.cert.as_deref(), args.key.as_deref()) {
        (Some(ca), Some(cert), Some(key)) => Some(TlsFiles {
            ca,
            identity: Some((cert, key)),
        }),
        (Some(ca), None, None) => Some(TlsFiles { ca, identity: None }),
        (None, None, None) => None,
        _ => return Err("--cert and --key need each other and --ca".into()),
    };
    let mut client = ClientCli::connect(&args.server, tls).await?;

    match args.sub_command {
        SubCommand::Start {
            command,
            args,
            dir,
            envs,
        } => {
            client
                .start_job(&command, &args, dir.as_deref(), &envs)
                .await?;
        }
        SubCommand::Stop { job_id } => {
            client.stop_job(job_id).await?;
        }
        SubCommand::Status { job_id } => {
            client.query_status(job_id).await?;
        }
    }

    Ok(())
}
