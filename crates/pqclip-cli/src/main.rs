//! pqclip: per-user clip encryption CLI
//!
//! Commands:
//!   register --user U                     - add a login to the user directory
//!   encrypt <file> --user U [--out-dir D] - seal a clip into <D>/<name>.encrypted
//!   decrypt <file> --user U [--out-dir D] - restore a clip
//!   keypair --user U                      - load or create the ML-KEM-1024 keypair
//!   kem seal --to <pub> --out <ct>        - derive a session key for a recipient
//!   kem open --user U <ct>                - recover that session key
//!   config show                           - display current configuration
//!
//! Passwords come from PQCLIP_PASSWORD or an interactive prompt.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use pqclip_core::config::PqclipConfig;
use pqclip_core::{PqclipError, UserId, AUTH_FAILURE_MESSAGE};
use pqclip_crypto::{KemCiphertext, KemPublicKey};
use pqclip_engine::{key_fingerprint, EncryptionWorkflow, KemSession};
use pqclip_secrets::{KeyStore, UserDirectory, UserProfile};

const CONTAINER_EXTENSION: &str = "encrypted";

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "pqclip",
    version,
    about = "Post-quantum video clip encryption",
    long_about = "pqclip: encrypt and decrypt video files under per-user, password-protected keys"
)]
struct Cli {
    /// Path to pqclip.toml configuration file
    #[arg(long, short = 'c', env = "PQCLIP_CONFIG", default_value = "pqclip.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a new user
    Register {
        #[arg(long, short = 'u')]
        user: String,
        #[arg(long, default_value = "")]
        contact: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        address: String,
    },

    /// Encrypt a file for a user
    ///
    /// The first encryption for a user creates their key store.
    Encrypt {
        input: PathBuf,
        #[arg(long, short = 'u')]
        user: String,
        /// Output directory (default: paths.encrypted_dir)
        #[arg(long, short = 'o')]
        out_dir: Option<PathBuf>,
    },

    /// Decrypt a .encrypted container
    Decrypt {
        input: PathBuf,
        #[arg(long, short = 'u')]
        user: String,
        /// Output directory (default: paths.decrypted_dir)
        #[arg(long, short = 'o')]
        out_dir: Option<PathBuf>,
    },

    /// Load or generate the user's KEM keypair and print the public key
    Keypair {
        #[arg(long, short = 'u')]
        user: String,
    },

    /// KEM session keys
    Kem {
        #[command(subcommand)]
        action: KemAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum KemAction {
    /// Encapsulate to a recipient's public key file
    Seal {
        /// Recipient's .pub file
        #[arg(long)]
        to: PathBuf,
        /// Where to write the KEM ciphertext
        #[arg(long)]
        out: PathBuf,
    },
    /// Decapsulate a ciphertext with the user's private key
    Open {
        #[arg(long, short = 'u')]
        user: String,
        ciphertext: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = PqclipConfig::load(&cli.config)
        .with_context(|| format!("loading config: {}", cli.config.display()))?;
    init_logging(&config.logging.level, &config.logging.format);

    let workflow = EncryptionWorkflow::from_config(&config);
    let users = UserDirectory::new(config.paths.users_file.clone(), workflow.context().clone());

    match cli.command {
        Commands::Register {
            user,
            contact,
            email,
            address,
        } => cmd_register(&users, &user, UserProfile { contact, email, address }),
        Commands::Encrypt { input, user, out_dir } => {
            let dir = out_dir.unwrap_or_else(|| config.paths.encrypted_dir.clone());
            cmd_encrypt(&workflow, &users, &input, &dir, &user)
        }
        Commands::Decrypt { input, user, out_dir } => {
            let dir = out_dir.unwrap_or_else(|| config.paths.decrypted_dir.clone());
            cmd_decrypt(&workflow, &users, &input, &dir, &user)
        }
        Commands::Keypair { user } => cmd_keypair(&workflow, &users, &user),
        Commands::Kem {
            action: KemAction::Seal { to, out },
        } => cmd_kem_seal(&workflow, &to, &out),
        Commands::Kem {
            action: KemAction::Open { user, ciphertext },
        } => cmd_kem_open(&workflow, &users, &user, &ciphertext),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &cli.config),
    }
}

fn init_logging(level: &str, format: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Credentials ───────────────────────────────────────────────────────────────

fn read_password(prompt: &str) -> Result<SecretString> {
    if let Ok(pw) = std::env::var("PQCLIP_PASSWORD") {
        return Ok(SecretString::from(pw));
    }
    let pw = rpassword::prompt_password(prompt).context("reading password")?;
    Ok(SecretString::from(pw))
}

/// Resolve a user and check their password against the user directory.
fn login(users: &UserDirectory, name: &str) -> Result<(UserId, SecretString)> {
    let user = UserId::new(name).map_err(user_error)?;
    let password = read_password(&format!("Password for {user}: "))?;
    if !users.authenticate(user.as_str(), &password).map_err(user_error)? {
        anyhow::bail!(AUTH_FAILURE_MESSAGE);
    }
    Ok((user, password))
}

/// Turn a library error into the text the user sees; details go to the log.
fn user_error(e: PqclipError) -> anyhow::Error {
    if e.is_security_relevant() {
        tracing::warn!(error = %e, "operation rejected");
    } else {
        tracing::debug!(error = %e, "operation failed");
    }
    anyhow::anyhow!(e.user_message())
}

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ── `pqclip register` ─────────────────────────────────────────────────────────

fn cmd_register(users: &UserDirectory, name: &str, profile: UserProfile) -> Result<()> {
    let user = UserId::new(name).map_err(user_error)?;
    if users.user_exists(user.as_str()).map_err(user_error)? {
        anyhow::bail!("user {user} already exists");
    }

    let password = read_password("New password: ")?;
    if std::env::var("PQCLIP_PASSWORD").is_err() {
        let confirm = rpassword::prompt_password("Confirm password: ").context("reading password")?;
        if confirm != password.expose_secret() {
            anyhow::bail!("passwords do not match");
        }
    }

    users.create_user(&user, &password, profile).map_err(user_error)?;
    println!("registered {user}");
    Ok(())
}

// ── `pqclip encrypt` / `pqclip decrypt` ───────────────────────────────────────

fn cmd_encrypt(
    workflow: &EncryptionWorkflow,
    users: &UserDirectory,
    input: &Path,
    out_dir: &Path,
    name: &str,
) -> Result<()> {
    let (user, password) = login(users, name)?;
    let file_name = input
        .file_name()
        .with_context(|| format!("{} has no file name", input.display()))?;
    let output = out_dir.join(format!("{}.{CONTAINER_EXTENSION}", file_name.to_string_lossy()));

    let pb = make_spinner("encrypt");
    pb.set_message(input.display().to_string());
    let result = workflow.encrypt_file(input, &output, &user, &password);
    pb.finish_and_clear();

    let report = result.map_err(user_error)?;
    println!(
        "encrypted {} ({} bytes) -> {} ({} bytes)",
        report.original_name,
        report.plaintext_bytes,
        output.display(),
        report.container_bytes
    );
    Ok(())
}

fn cmd_decrypt(
    workflow: &EncryptionWorkflow,
    users: &UserDirectory,
    input: &Path,
    out_dir: &Path,
    name: &str,
) -> Result<()> {
    let (user, password) = login(users, name)?;
    let output = out_dir.join(decrypted_name(input)?);

    let pb = make_spinner("decrypt");
    pb.set_message(input.display().to_string());
    let result = workflow.decrypt_file(input, &output, &user, &password);
    pb.finish_and_clear();

    let report = result.map_err(user_error)?;
    println!(
        "decrypted {} -> {} ({} bytes)",
        input.display(),
        output.display(),
        report.plaintext_bytes
    );
    Ok(())
}

/// `clip.mp4.encrypted` -> `clip.mp4`; anything else gets `.decrypted` appended.
fn decrypted_name(input: &Path) -> Result<String> {
    let name = input
        .file_name()
        .with_context(|| format!("{} has no file name", input.display()))?
        .to_string_lossy()
        .into_owned();
    let suffix = format!(".{CONTAINER_EXTENSION}");
    Ok(match name.strip_suffix(&suffix) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => format!("{name}.decrypted"),
    })
}

// ── `pqclip keypair` / `pqclip kem` ───────────────────────────────────────────

fn cmd_keypair(workflow: &EncryptionWorkflow, users: &UserDirectory, name: &str) -> Result<()> {
    let (user, password) = login(users, name)?;
    let store = workflow.store_path(&user);
    workflow
        .keystore()
        .ensure(&store, &password, &user)
        .map_err(user_error)?;
    let pair = workflow
        .keystore()
        .load_or_generate_keypair(&store, &password)
        .map_err(user_error)?;

    println!("public key:  {}", KeyStore::public_key_path(&store).display());
    println!("fingerprint: {}", pair.public.fingerprint());
    Ok(())
}

fn cmd_kem_seal(workflow: &EncryptionWorkflow, to: &Path, out: &Path) -> Result<()> {
    let bytes = std::fs::read(to).with_context(|| format!("reading public key: {}", to.display()))?;
    let recipient = KemPublicKey::from_bytes(&bytes).map_err(user_error)?;

    let session = KemSession::new(workflow.context().clone());
    let sealed = session.seal_session_key(&recipient).map_err(user_error)?;
    pqclip_secrets::write_atomic(out, sealed.ciphertext.as_bytes()).map_err(user_error)?;

    println!("recipient:   {}", recipient.fingerprint());
    println!("ciphertext:  {}", out.display());
    println!("session key: {}", key_fingerprint(&sealed.key));
    Ok(())
}

fn cmd_kem_open(workflow: &EncryptionWorkflow, users: &UserDirectory, name: &str, ciphertext: &Path) -> Result<()> {
    let (user, password) = login(users, name)?;
    let store = workflow.store_path(&user);
    let pair = workflow
        .keystore()
        .load_or_generate_keypair(&store, &password)
        .map_err(user_error)?;

    let bytes = std::fs::read(ciphertext)
        .with_context(|| format!("reading ciphertext: {}", ciphertext.display()))?;
    let session = KemSession::new(workflow.context().clone());
    let key = session
        .open_session_key(&pair.private, &KemCiphertext::from_bytes(bytes))
        .map_err(user_error)?;

    println!("session key: {}", key_fingerprint(&key));
    Ok(())
}

// ── `pqclip config show` ──────────────────────────────────────────────────────

fn cmd_config_show(config: &PqclipConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = config.to_toml().context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
