#![deny(warnings, clippy::all, clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)]

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::net::TcpListener;

use corretoria::{
    build_app,
    client::StudioClient,
    config::{Cli, Commands, Config, GenerateArgs, ListingArgs},
    listing::ListingForm,
    logging::init_logging,
    models::AppState,
    normalize::GeneratedImage,
    validators::ImageUpload,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config;

    // Keep guard alive so file logger flushes correctly
    let _log_guards = init_logging(&config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Generate(args) => generate(args).await,
        Commands::Listing(args) => listing(args).await,
    }
}

fn log_config(config: &Config) {
    let set = |present: bool| if present { "<set>" } else { "<not set>" };

    tracing::info!("=== Configuration ===");
    tracing::info!("Bind address: {}", config.bind);
    tracing::info!(
        "Log file: {}",
        config
            .log_file
            .as_ref()
            .map_or_else(|| "<stdout only>".to_string(), |p| p.display().to_string())
    );
    tracing::info!(
        "CORS origin: {}",
        config.cors_origin.as_deref().unwrap_or("<allow all>")
    );
    tracing::info!("Portrait webhook: {}", config.portrait_webhook_url);
    tracing::info!("Listing images webhook: {}", config.listing_images_webhook_url);
    tracing::info!("Listing caption webhook: {}", config.listing_caption_webhook_url);
    tracing::info!("Webhook user: {}", set(config.webhook_user.is_some()));
    tracing::info!("Webhook password: {}", set(config.webhook_pass.is_some()));
    tracing::info!("Upstream timeout: {}s", config.upstream_timeout_secs);
    tracing::info!(
        "Upload limits: portrait {} bytes, listing photo {} bytes",
        config.max_portrait_bytes,
        config.max_listing_photo_bytes
    );
    tracing::info!("====================");

    if config.basic_auth().is_none() {
        tracing::warn!(
            "Webhook credentials not configured; /api/listing/images will refuse requests"
        );
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    log_config(&config);

    let bind = config.bind;
    let app = build_app(AppState::new(config));

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn generate(args: GenerateArgs) -> anyhow::Result<()> {
    let client = StudioClient::new(args.server.url);
    let photo = ImageUpload::from_path(&args.photo).await?;

    let image = client
        .generate_portrait(&photo, args.feedback.as_deref())
        .await?;
    if let GeneratedImage::Url(url) = &image {
        tracing::info!("portrait available at {url}");
    }

    let path = client.save_image(&image, &args.out).await?;
    println!("Portrait saved to {}", path.display());
    Ok(())
}

async fn listing(args: ListingArgs) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&args.form)
        .await
        .with_context(|| format!("reading {}", args.form.display()))?;
    let form: ListingForm = serde_json::from_str(&raw).context("parsing listing form")?;
    for name in form.unknown_amenities() {
        tracing::warn!(amenity = name, "unknown amenity, sending it anyway");
    }

    let client = StudioClient::new(args.server.url);
    let photo = ImageUpload::from_path(&args.photo).await?;
    let portrait = client.load_portrait(&args.portrait).await?;

    tracing::info!(
        title = %form.title,
        address = %form.full_address(),
        "composing listing post"
    );
    let mut rng = StdRng::from_entropy();
    let post = client
        .compose_listing(&form, &photo, &portrait, &mut rng)
        .await?;

    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    if let Some(image) = &post.image {
        let path = client.save_image(image, &args.out_dir.join("post")).await?;
        println!("Post image: {}", path.display());
    } else {
        println!("Post image: <none returned>");
    }
    tokio::fs::write(args.out_dir.join("caption.txt"), &post.caption).await?;
    tokio::fs::write(args.out_dir.join("cta.txt"), &post.cta).await?;

    println!("CTA: {}", post.cta);
    println!("\n{}", post.caption);
    Ok(())
}
