//! nigori: derive, persist and use Nigori keys from the shell
//!
//! Commands:
//!   derive              - derive keys from a passphrase and write the keys file
//!   permute <name>      - print the lookup tag for a name
//!   encrypt <value>     - encrypt a value under the stored keys
//!   decrypt <blob>      - decrypt a value produced by `encrypt`
//!   config show         - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use secrecy::SecretString;
use std::io::Write;
use std::path::{Path, PathBuf};

use nigori_core::config::NigoriConfig;
use nigori_core::NigoriType;
use nigori_crypto::{ExportedKeys, Nigori};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "nigori",
    version,
    about = "Nigori client-side key tool",
    long_about = "nigori: derive Nigori keys from a passphrase, permute names and protect values"
)]
struct Cli {
    /// Path to nigori.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "NIGORI_CONFIG",
        default_value = "~/.config/nigori/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "NIGORI_LOG")]
    log: Option<String>,

    /// Log format (json, text); overrides the config file
    #[arg(long, env = "NIGORI_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Derive keys from a passphrase and write them to the keys file
    Derive {
        /// Hostname mixed into the PBKDF2 salt (overrides derivation.hostname)
        #[arg(long)]
        hostname: Option<String>,

        /// Username mixed into the PBKDF2 salt (overrides derivation.username)
        #[arg(long)]
        username: Option<String>,

        /// Use scrypt on the passphrase alone instead of PBKDF2
        #[arg(long)]
        scrypt: bool,

        /// Passphrase; prompted for when unset
        #[arg(long, env = "NIGORI_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Output keys file (overrides keys.keys_file)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the lookup tag for a name
    Permute {
        name: String,

        /// Keys file (overrides keys.keys_file)
        #[arg(long)]
        keys: Option<PathBuf>,
    },

    /// Encrypt a value; prints base64
    Encrypt {
        value: String,

        #[arg(long)]
        keys: Option<PathBuf>,
    },

    /// Decrypt a base64 value produced by `encrypt`
    Decrypt {
        blob: String,

        #[arg(long)]
        keys: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = load_config(&config_path).await?;

    let level = cli.log.as_deref().unwrap_or(&config.logging.level);
    let format = match cli.log_format {
        Some(format) => format,
        None => parse_log_format(&config.logging.format)?,
    };
    init_logging(level, &format);

    if !config_path.exists() {
        tracing::warn!(
            "config file not found: {}  (using defaults)",
            config_path.display()
        );
    }

    match cli.command {
        Commands::Derive { hostname, username, scrypt, password, out } => {
            cmd_derive(&config, hostname, username, scrypt, password, out.as_deref()).await
        }
        Commands::Permute { name, keys } => cmd_permute(&config, &name, keys.as_deref()),
        Commands::Encrypt { value, keys } => cmd_encrypt(&config, &value, keys.as_deref()),
        Commands::Decrypt { blob, keys } => cmd_decrypt(&config, &blob, keys.as_deref()),
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &config_path),
    }
}

// ── Logging ───────────────────────────────────────────────────────────────────

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn parse_log_format(s: &str) -> Result<LogFormat> {
    LogFormat::from_str(s, true)
        .map_err(|e| anyhow::anyhow!("invalid logging.format '{s}': {e}"))
}

// ── Config loading ────────────────────────────────────────────────────────────

async fn load_config(path: &Path) -> Result<NigoriConfig> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config: {}", path.display()))?;
        NigoriConfig::from_toml(&content)
            .with_context(|| format!("parsing config: {}", path.display()))
    } else {
        Ok(NigoriConfig::default())
    }
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}

/// Resolve the keys file: CLI flag > config
fn resolve_keys_path(config: &NigoriConfig, override_path: Option<&Path>) -> PathBuf {
    match override_path {
        Some(p) => p.to_path_buf(),
        None => expand_tilde(&config.keys.keys_file),
    }
}

fn load_nigori(config: &NigoriConfig, keys_override: Option<&Path>) -> Result<Nigori> {
    let path = resolve_keys_path(config, keys_override);
    let exported = ExportedKeys::load(&path)
        .with_context(|| format!("loading keys file: {}", path.display()))?;
    exported
        .import()
        .with_context(|| format!("importing keys from {}", path.display()))
}

// ── `nigori derive` ───────────────────────────────────────────────────────────

async fn cmd_derive(
    config: &NigoriConfig,
    hostname: Option<String>,
    username: Option<String>,
    scrypt: bool,
    password: Option<String>,
    out: Option<&Path>,
) -> Result<()> {
    let password = match password {
        Some(p) => SecretString::from(p),
        None => SecretString::from(
            rpassword::prompt_password("Passphrase: ").context("reading passphrase")?,
        ),
    };

    let nigori = if scrypt {
        tokio::task::spawn_blocking(move || Nigori::init_by_derivation_scrypt(&password))
            .await
            .context("derivation task panicked")?
            .context("scrypt key derivation")?
    } else {
        let method = config.derivation.method;
        let hostname = hostname
            .or_else(|| config.derivation.hostname.clone())
            .context("no hostname provided; use --hostname or set derivation.hostname")?;
        let username = username
            .or_else(|| config.derivation.username.clone())
            .context("no username provided; use --username or set derivation.username")?;

        tokio::task::spawn_blocking(move || {
            Nigori::init_by_derivation(method, &hostname, &username, &password)
        })
        .await
        .context("derivation task panicked")?
        .context("PBKDF2 key derivation")?
    };

    let path = resolve_keys_path(config, out);
    nigori
        .export_keys()
        .save(&path)
        .with_context(|| format!("writing keys file: {}", path.display()))?;

    tracing::info!(path = %path.display(), scrypt, "keys derived");
    println!("keys written to {}", path.display());
    Ok(())
}

// ── `nigori permute` ──────────────────────────────────────────────────────────

fn cmd_permute(config: &NigoriConfig, name: &str, keys: Option<&Path>) -> Result<()> {
    let nigori = load_nigori(config, keys)?;
    let tag = nigori
        .permute(NigoriType::Password, name)
        .context("permuting name")?;
    println!("{tag}");
    Ok(())
}

// ── `nigori encrypt` / `nigori decrypt` ───────────────────────────────────────

fn cmd_encrypt(config: &NigoriConfig, value: &str, keys: Option<&Path>) -> Result<()> {
    let nigori = load_nigori(config, keys)?;
    let encrypted = nigori
        .encrypt(value.as_bytes())
        .context("encrypting value")?;
    println!("{encrypted}");
    Ok(())
}

fn cmd_decrypt(config: &NigoriConfig, blob: &str, keys: Option<&Path>) -> Result<()> {
    let nigori = load_nigori(config, keys)?;
    let plaintext = nigori.decrypt(blob.trim()).context("decrypting value")?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&plaintext).context("writing plaintext")?;
    stdout.write_all(b"\n").context("writing plaintext")?;
    Ok(())
}

// ── `nigori config show` ──────────────────────────────────────────────────────

fn cmd_config_show(config: &NigoriConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
