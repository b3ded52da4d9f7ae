use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hybridcrypt::cli;
use hybridcrypt::cli::newkey::NewKeyOptions;
use hybridcrypt::cli::sign::SignatureSource;
use hybridcrypt::config::Settings;
use hybridcrypt::crypto::HashAlgorithm;
use hybridcrypt::Result;

/// Exit code for a signature that does not match
const EXIT_MISMATCH: u8 = 2;

#[derive(Parser)]
#[command(name = "hybridcrypt")]
#[command(author = "Oleg")]
#[command(version)]
#[command(about = "Hybrid RSA + AES-256-CBC file encryption and signing", long_about = None)]
struct Cli {
    /// Log what is being done to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to <config dir>/hybridcrypt/settings.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct KeyArg {
    /// Key file (PEM; password-protected keys prompt for the password)
    #[arg(short, long, value_name = "PEM")]
    key: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new RSA key pair
    #[command(alias = "newkey")]
    NewKey {
        /// Modulus size in bits (384..=16384, multiple of 8)
        #[arg(long = "keysize", value_name = "N")]
        key_size: Option<usize>,

        /// Base name of the key files (pub.NAME.pem, priv.NAME.pem)
        #[arg(long = "keyfilename", value_name = "NAME")]
        key_name: Option<String>,

        /// Directory for the key files
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Password-protect the private key (writes enc.NAME.pem)
        #[arg(long)]
        protect: bool,
    },

    /// Encrypt a file for the holder of a private key
    Encrypt {
        #[command(flatten)]
        key: KeyArg,

        /// File to encrypt
        input: PathBuf,

        /// Output file (defaults to INPUT.hyb)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Decrypt a file with a private key
    Decrypt {
        #[command(flatten)]
        key: KeyArg,

        /// File to decrypt
        input: PathBuf,

        /// Output file (defaults to INPUT without .hyb)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Sign a file with a private key
    Sign {
        #[command(flatten)]
        key: KeyArg,

        /// File to sign
        input: PathBuf,

        /// Hash algorithm: SHA256, SHA384 or SHA512
        #[arg(long, value_name = "HASH")]
        hash: Option<String>,

        /// Append the signature to the data instead of writing it separately
        #[arg(long)]
        merge: bool,

        /// Output file (defaults to INPUT.sig, or INPUT.signed with --merge)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Verify a signature with a public key
    Verify {
        #[command(flatten)]
        key: KeyArg,

        /// Signed file
        input: PathBuf,

        /// Hash algorithm: SHA256, SHA384 or SHA512
        #[arg(long, value_name = "HASH")]
        hash: Option<String>,

        /// Detached signature file
        #[arg(short, long, value_name = "PATH", conflicts_with = "merged", required_unless_present = "merged")]
        signature: Option<PathBuf>,

        /// The signature is appended to INPUT
        #[arg(long)]
        merged: bool,
    },

    /// Password-protect a plain private key file
    Protect {
        #[command(flatten)]
        key: KeyArg,

        /// Directory for the enc. file (defaults to the key's directory)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Write a plain copy of a password-protected private key
    Unprotect {
        #[command(flatten)]
        key: KeyArg,

        /// Directory for the priv. file (defaults to the key's directory)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Show the public key, its blob and fingerprint
    Pubkey {
        #[command(flatten)]
        key: KeyArg,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "hybridcrypt=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(kind = ?e.kind(), "command failed");
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn hash_or_default(hash: Option<String>, settings: &Settings) -> Result<HashAlgorithm> {
    match hash {
        Some(name) => name.parse(),
        None => Ok(settings.hash_algorithm),
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let settings = Settings::load(cli.config.as_deref())?;
    tracing::debug!(?settings, "loaded settings");

    match cli.command {
        Commands::NewKey {
            key_size,
            key_name,
            output,
            protect,
        } => {
            let options = NewKeyOptions {
                key_size: key_size.unwrap_or(settings.key_size),
                key_name: key_name.unwrap_or_else(|| settings.key_name.clone()),
                output_dir: output.unwrap_or_else(|| settings.output_dir()),
                protect,
                pbkdf2_iterations: settings.pbkdf2_iterations,
            };
            cli::newkey::run(&options)?;
        }
        Commands::Encrypt { key, input, output } => {
            cli::encrypt::encrypt(&key.key, &input, output)?;
        }
        Commands::Decrypt { key, input, output } => {
            cli::encrypt::decrypt(&key.key, &input, output)?;
        }
        Commands::Sign {
            key,
            input,
            hash,
            merge,
            output,
        } => {
            let hash = hash_or_default(hash, &settings)?;
            cli::sign::sign(&key.key, &input, hash, merge, output)?;
        }
        Commands::Verify {
            key,
            input,
            hash,
            signature,
            merged,
        } => {
            let hash = hash_or_default(hash, &settings)?;
            let source = match signature {
                Some(path) if !merged => SignatureSource::Detached(path),
                _ => SignatureSource::Merged,
            };
            if !cli::sign::verify(&key.key, &input, hash, &source)? {
                return Ok(ExitCode::from(EXIT_MISMATCH));
            }
        }
        Commands::Protect { key, output } => {
            cli::protect::protect(&key.key, output.as_deref(), settings.pbkdf2_iterations)?;
        }
        Commands::Unprotect { key, output } => {
            cli::protect::unprotect(&key.key, output.as_deref())?;
        }
        Commands::Pubkey { key } => cli::pubkey::run(&key.key)?,
    }

    Ok(ExitCode::SUCCESS)
}
