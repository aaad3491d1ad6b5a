use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// Start, stop, and check on jobs run by a remote job server
#[derive(Debug, Parser)]
pub struct ArgParser {
    /// The address of the server, e.g. https://localhost:50051
    #[clap(short = 's', long = "server", env = "JOBCTL_SERVER")]
    pub server: String,

    /// PEM CA which signed the server certificate, enables TLS
    #[clap(long, env = "JOBCTL_CA")]
    pub ca: Option<PathBuf>,

    /// PEM client certificate identifying the user
    #[clap(long, env = "JOBCTL_CERT")]
    pub cert: Option<PathBuf>,

    /// PEM private key for --cert
    #[clap(long, env = "JOBCTL_KEY")]
    pub key: Option<PathBuf>,

    /// The sub-command to use
    #[clap(subcommand)]
    pub sub_command: SubCommand,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Subcommand)]
pub enum SubCommand {
    /// start a new job
    Start {
        #[clap(long)]
        /// name of the command to run
        command: String,

        #[clap(long, multiple_values = true)]
        /// a list of args to the command
        args: Vec<String>,

        #[clap(long)]
        /// working directory for the command, defaults to the server's
        dir: Option<String>,

        #[clap(long, multiple_values = true, parse(try_from_str = var_eq_val))]
        /// list of environment variables
        envs: Vec<(String, String)>,
    },
    /// stop a job
    Stop {
        /// Uuid v4 string
        job_id: Uuid,
    },
    /// get a job's status and output
    Status {
        /// Uuid v4 string
        job_id: Uuid,
    },
}

/// try_from_str parse function for command env variables
fn var_eq_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((var, val)) if !var.is_empty() => Ok((var.to_string(), val.to_string())),
        _ => Err("Required format is VAR=VAL".to_string()),
    }
}
