use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use url::Url;

const MIB: usize = 1024 * 1024;

#[derive(Parser, Debug)]
#[command(
    name = "corretoria",
    version,
    about = "Portrait and listing post generator backed by automation webhooks"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub config: Config,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP proxy server (default when no subcommand is given)
    Serve,
    /// Turn a photo into a professional portrait through a running server
    Generate(GenerateArgs),
    /// Compose a listing post (image + caption) through a running server
    Listing(ListingArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServerArg {
    /// Base URL of a running corretoria server
    #[arg(
        long = "server",
        env = "CORRETORIA_SERVER_URL",
        default_value = "http://127.0.0.1:3000"
    )]
    pub url: Url,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// JPEG or PNG photo to enhance
    #[arg(long)]
    pub photo: PathBuf,

    /// Optional feedback for a retry ("improve lighting", ...)
    #[arg(long)]
    pub feedback: Option<String>,

    /// Output path stem; the extension follows the returned image type
    #[arg(long, default_value = "portrait")]
    pub out: PathBuf,

    #[command(flatten)]
    pub server: ServerArg,
}

#[derive(Args, Debug, Clone)]
pub struct ListingArgs {
    /// Listing form as JSON (camelCase keys)
    #[arg(long)]
    pub form: PathBuf,

    /// Listing photo (JPEG or PNG)
    #[arg(long)]
    pub photo: PathBuf,

    /// Portrait to use: a file path, an http(s) URL or a data: URL
    #[arg(long)]
    pub portrait: String,

    /// Directory that receives post image, caption.txt and cta.txt
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    #[command(flatten)]
    pub server: ServerArg,
}

/// Corretoria server configuration
#[derive(Parser, Debug, Clone)]
pub struct Config {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease verbosity (-q, -qq, -qqq)
    #[arg(short = 'q', action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Address to bind the HTTP server to
    #[arg(long, env = "CORRETORIA_BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Optional log file path (logs are written to stdout + this file)
    #[arg(long, env = "CORRETORIA_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// CORS allowed origin. If not set, allows all origins.
    #[arg(long, env = "CORRETORIA_CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Webhook producing the professional portrait
    #[arg(
        long,
        env = "N8N_WEBHOOK_URL_PROD",
        default_value = "https://n8n.srv1092655.hstgr.cloud/webhook/pro-portrait"
    )]
    pub portrait_webhook_url: Url,

    /// Webhook producing the composite listing image
    #[arg(
        long,
        env = "N8N_WEBHOOK_URL_POST_IMAGES_PROD",
        default_value = "https://n8n.srv1092655.hstgr.cloud/webhook/post-image-gen"
    )]
    pub listing_images_webhook_url: Url,

    /// Webhook producing the listing caption
    #[arg(
        long,
        env = "N8N_WEBHOOK_URL_POST_CAPTION_PROD",
        default_value = "https://n8n.srv1092655.hstgr.cloud/webhook/post-caption"
    )]
    pub listing_caption_webhook_url: Url,

    /// Basic-auth user for the webhooks
    #[arg(long, env = "N8N_BASIC_USER")]
    pub webhook_user: Option<String>,

    /// Basic-auth password for the webhooks
    #[arg(long, env = "N8N_BASIC_PASS", hide_env_values = true)]
    pub webhook_pass: Option<String>,

    /// Timeout for a single webhook round trip, in seconds
    #[arg(long, env = "CORRETORIA_UPSTREAM_TIMEOUT_SECS", default_value_t = 300)]
    pub upstream_timeout_secs: u64,

    /// Largest accepted source photo for portrait generation
    #[arg(long, env = "CORRETORIA_MAX_PORTRAIT_BYTES", default_value_t = 10 * MIB)]
    pub max_portrait_bytes: usize,

    /// Largest accepted listing photo (and portrait attached to a listing)
    #[arg(long, env = "CORRETORIA_MAX_LISTING_PHOTO_BYTES", default_value_t = 20 * MIB)]
    pub max_listing_photo_bytes: usize,
}

impl Config {
    #[must_use]
    pub fn verbosity_delta(&self) -> i16 {
        i16::from(self.verbose) - i16::from(self.quiet)
    }

    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity_delta() {
            d if d <= -2 => "error",
            -1 => "warn",
            0 => "info,corretoria=info,axum=info,tower_http=info",
            1 => "debug,corretoria=debug,axum=info,tower_http=info,reqwest=info,hyper=warn",
            2 => "trace,corretoria=trace,axum=debug,tower_http=trace,reqwest=debug,hyper=info",
            _ => "trace,corretoria=trace,axum=trace,tower_http=trace,reqwest=trace,hyper=debug",
        }
    }

    /// `Authorization` header value for the webhooks, if both credentials are set.
    #[must_use]
    pub fn basic_auth(&self) -> Option<String> {
        basic_auth_header(self.webhook_user.as_deref()?, self.webhook_pass.as_deref()?)
    }

    #[must_use]
    pub const fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// Request body ceiling: the larger of two listing-sized images or one
    /// portrait source, plus multipart overhead.
    #[must_use]
    pub const fn body_limit(&self) -> usize {
        let listing = self.max_listing_photo_bytes.saturating_mul(2);
        let largest = if self.max_portrait_bytes > listing {
            self.max_portrait_bytes
        } else {
            listing
        };
        largest.saturating_add(MIB)
    }
}

#[must_use]
pub fn basic_auth_header(user: &str, pass: &str) -> Option<String> {
    if user.is_empty() || pass.is_empty() {
        return None;
    }
    Some(format!("Basic {}", B64.encode(format!("{user}:{pass}"))))
}
