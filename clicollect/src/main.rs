//! Run CLI commands on a network appliance over SSH and save their output.
//!
//! # Usage
//!
//! ```bash
//! clicollect --host 192.0.2.1 -u admin -c cli-commands.txt -o output-file.txt
//! ```
//!
//! Omit `--password` to be prompted for it. Set `RUST_LOG` or pass `-v` /
//! `-vv` for progress output.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use log::{error, info, warn};
use secrecy::SecretString;

use clicollect::config::seconds;
use clicollect::error::{ConfigError, SessionError};
use clicollect::{
    AuthMethod, Completion, Error, ErrorCategory, FileConfig, HostKeyVerification, Result,
    SessionBuilder, load_commands,
};

#[derive(Parser, Debug)]
#[command(
    name = "clicollect",
    version,
    about = "Run CLI commands on a network appliance over SSH and collect the outputs"
)]
struct Args {
    /// Appliance hostname or IP address
    #[arg(long)]
    host: String,

    /// SSH port [default: 22]
    #[arg(long)]
    port: Option<u16>,

    /// SSH username
    #[arg(short, long)]
    username: String,

    /// SSH password (prompted for when omitted)
    #[arg(short, long)]
    password: Option<String>,

    /// Private key to authenticate with instead of a password
    #[arg(short = 'i', long = "identity", conflicts_with = "password")]
    identity: Option<PathBuf>,

    /// File with CLI commands, one per line
    #[arg(short, long, default_value = "cli-commands.txt")]
    commands: PathBuf,

    /// Where to write the collected outputs
    #[arg(short, long, default_value = "output-file.txt")]
    output: PathBuf,

    /// Seconds of silence that end a command's output [default: 3]
    #[arg(short = 't', long = "timeout", value_name = "SECONDS")]
    idle_timeout: Option<f64>,

    /// Seconds to wait for the first prompt [default: 10]
    #[arg(long, value_name = "SECONDS")]
    startup_timeout: Option<f64>,

    /// Hard limit in seconds on one command's output [default: 120]
    #[arg(long, value_name = "SECONDS")]
    ceiling: Option<f64>,

    /// Seconds between reads [default: 0.1]
    #[arg(long, value_name = "SECONDS")]
    poll_interval: Option<f64>,

    /// How the end of output is detected: idle or prompt [default: idle]
    #[arg(long)]
    completion: Option<Completion>,

    /// Host key checking: strict, accept-new or disabled [default: accept-new]
    #[arg(long, value_name = "MODE")]
    host_key_verification: Option<HostKeyVerification>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(format!("warn,clicollect={level}")),
    )
    .format_timestamp_millis()
    .init();
}

fn exit_code(error: &Error) -> ExitCode {
    match error.category() {
        ErrorCategory::Connection | ErrorCategory::Command => ExitCode::from(1),
        ErrorCategory::Config => ExitCode::from(2),
        ErrorCategory::Write => ExitCode::from(3),
        ErrorCategory::Interrupted => ExitCode::from(130),
    }
}

/// Layer command-line flags over the builder. Flags win over the file.
fn apply_args(mut builder: SessionBuilder, args: &Args) -> Result<SessionBuilder> {
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    if let Some(v) = args.idle_timeout {
        builder = builder.idle_timeout(seconds("--timeout", v)?);
    }
    if let Some(v) = args.startup_timeout {
        builder = builder.startup_timeout(seconds("--startup-timeout", v)?);
    }
    if let Some(v) = args.ceiling {
        builder = builder.command_ceiling(seconds("--ceiling", v)?);
    }
    if let Some(v) = args.poll_interval {
        builder = builder.poll_interval(seconds("--poll-interval", v)?);
    }
    if let Some(completion) = args.completion {
        builder = builder.completion(completion);
    }
    if let Some(mode) = args.host_key_verification {
        builder = builder.host_key_verification(mode);
    }
    Ok(builder.auth(auth_method(args)?))
}

fn auth_method(args: &Args) -> Result<AuthMethod> {
    if let Some(path) = &args.identity {
        return Ok(AuthMethod::PrivateKey {
            path: path.clone(),
            passphrase: None,
        });
    }

    let password = match &args.password {
        Some(password) => password.clone(),
        None => dialoguer::Password::new()
            .with_prompt(format!("Password for {}@{}", args.username, args.host))
            .allow_empty_password(true)
            .interact()
            .map_err(|e| ConfigError::InvalidValue {
                key: "password".to_string(),
                message: e.to_string(),
            })?,
    };
    Ok(AuthMethod::Password(SecretString::from(password)))
}

/// Resolves when `signal` fires. Never resolves if it cannot be listened for.
async fn interrupted(signal: impl Future<Output = io::Result<()>>) {
    if let Err(e) = signal.await {
        warn!("cannot listen for Ctrl-C, run cannot be interrupted: {e}");
        std::future::pending::<()>().await;
    }
}

async fn run(args: Args) -> Result<()> {
    let commands = load_commands(&args.commands)?;
    if commands.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: "commands".to_string(),
            message: format!(
                "{} is empty or contains only comments",
                args.commands.display()
            ),
        }
        .into());
    }
    info!(
        "{} commands loaded from {}",
        commands.len(),
        args.commands.display()
    );

    let file_config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let builder = file_config.apply(SessionBuilder::new(&args.host).username(&args.username))?;
    let mut session = apply_args(builder, &args)?.build()?;

    let outcome = tokio::select! {
        result = session.run(&commands) => result,
        () = interrupted(tokio::signal::ctrl_c()) => {
            warn!("interrupted, closing session");
            Err(SessionError::Interrupted.into())
        }
    };

    // No-op when run() already closed the session
    if let Err(e) = session.close().await {
        warn!("close failed: {e}");
    }

    match outcome {
        Ok(transcript) => {
            transcript.save(&args.output)?;
            if transcript.timed_out() > 0 {
                warn!(
                    "{} of {} commands timed out, see [ERROR] lines in {}",
                    transcript.timed_out(),
                    transcript.len(),
                    args.output.display()
                );
            }
            println!(
                "Saved output of {} commands to {}",
                transcript.len(),
                args.output.display()
            );
            Ok(())
        }
        Err(e) => {
            let partial = session.take_transcript();
            if !partial.is_empty() {
                warn!(
                    "saving {} outputs collected before the failure",
                    partial.len()
                );
                if let Err(save_error) = partial.save(&args.output) {
                    error!("{save_error}");
                }
            }
            Err(e)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code(&e)
        }
    }
}
