use crate::store::S3Settings;
use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, fmt};

/// Which object store backs the gallery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Any S3-compatible endpoint.
    S3,
    /// Process memory; contents vanish on exit.
    Memory,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub endpoint: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    pub force_path_style: bool,
    pub store: StoreKind,
}

/// Command-line configuration. Flags override the environment.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Media gallery over an S3-compatible object store")]
pub struct Args {
    /// Host to bind to (overrides GALLERY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GALLERY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Object store URL (overrides AWS_S3_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Object store region (overrides AWS_S3_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Bucket holding the gallery (overrides AWS_S3_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Storage backend (overrides GALLERY_STORE)
    #[arg(long, value_enum)]
    pub store: Option<StoreKind>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::resolve(Args::parse(), |name| env::var(name).ok())
    }

    /// Merge `args` over values looked up through `var`, then defaults.
    pub fn resolve(args: Args, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match args.port {
            Some(port) => port,
            None => match var("GALLERY_PORT") {
                Some(value) => value
                    .parse::<u16>()
                    .with_context(|| format!("parsing GALLERY_PORT value `{}`", value))?,
                None => 3000,
            },
        };

        let force_path_style = match var("AWS_S3_FORCE_PATH_STYLE") {
            Some(value) => parse_bool(&value)
                .with_context(|| format!("parsing AWS_S3_FORCE_PATH_STYLE value `{}`", value))?,
            None => true,
        };

        let store = match args.store {
            Some(store) => store,
            None => match var("GALLERY_STORE") {
                Some(value) => StoreKind::from_str(&value, true)
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("parsing GALLERY_STORE value `{}`", value))?,
                None => StoreKind::S3,
            },
        };

        Ok(Self {
            host: args
                .host
                .or_else(|| var("GALLERY_HOST"))
                .unwrap_or_else(|| "0.0.0.0".into()),
            port,
            endpoint: args
                .endpoint
                .or_else(|| var("AWS_S3_ENDPOINT"))
                .unwrap_or_else(|| "http://localhost:9000".into()),
            region: args
                .region
                .or_else(|| var("AWS_S3_REGION"))
                .unwrap_or_else(|| "us-east-1".into()),
            access_key_id: var("AWS_ACCESS_KEY_ID").unwrap_or_else(|| "minioadmin".into()),
            secret_access_key: var("AWS_SECRET_ACCESS_KEY")
                .unwrap_or_else(|| "minioadmin".into()),
            bucket: args
                .bucket
                .or_else(|| var("AWS_S3_BUCKET"))
                .unwrap_or_else(|| "my-gallery".into()),
            force_path_style,
            store,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn s3_settings(&self) -> S3Settings {
        S3Settings {
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            force_path_style: self.force_path_style,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("force_path_style", &self.force_path_style)
            .field("store", &self.store)
            .finish()
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => bail!("expected one of 1/0/true/false/yes/no"),
    }
}
