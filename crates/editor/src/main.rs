//! Command-line editor for the Valentine site.

use std::io;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use valentine_client::{ClientConfig, ClientError, LogFormat, ValentineClient, VersionStore};
use valentine_core::content::{
    BlobRef, ContentBundle, FinalDedication, FlipCard, GalleryItem, InteractiveSurpriseConfig,
    LoveMessage, QuizQuestion, TimelineMilestone,
};
use valentine_core::Version;
use valentine_gateway::{ContentGateway, HttpGateway, MemoryGateway};

mod cli;
mod commands;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = ClientConfig::from_env().context("invalid configuration")?;

    // --- Tracing ---
    // Logs go to stderr so command output stays pipeable.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "valentine_editor=info,valentine_client=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Plain => registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init(),
    }

    // --- Gateway ---
    let gateway: Arc<dyn ContentGateway> = if cli.offline {
        tracing::info!("Using in-process backend with sample content");
        let gw = MemoryGateway::default();
        gw.seed_draft(&Version::default(), sample_draft());
        Arc::new(gw)
    } else {
        let gw = HttpGateway::new(config.gateway_config())?;
        gw.connect()
            .await
            .with_context(|| format!("could not reach backend at {}", config.backend_url))?;
        tracing::info!(url = %config.backend_url, "Connected to backend");
        Arc::new(gw)
    };

    // --- Client ---
    let versions = if cli.offline {
        VersionStore::in_memory(Version::default())
    } else {
        VersionStore::load(&config.version_store_path)
    };
    let client = ValentineClient::new(
        gateway,
        versions,
        config.cache.clone(),
        config.share_base_url.clone(),
    );
    tracing::debug!(version = %client.active_version(), "Active version");

    match commands::execute(&client, cli.command, cli.json).await {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(err) => {
            tracing::debug!(error = ?err, "Command failed");
            let message = match err.downcast_ref::<ClientError>() {
                Some(client_err) => client_err.friendly_message(),
                None => format!("{err:#}"),
            };
            eprintln!("error: {message}");
            std::process::exit(1);
        }
    }
}

fn sample_draft() -> ContentBundle {
    let photo = |id: &str, caption: &str, order| GalleryItem {
        id: id.into(),
        image: BlobRef::new(format!("https://blobs.example/{id}.jpg")),
        caption: caption.into(),
        order,
    };
    ContentBundle {
        gallery_items: vec![
            photo("gallery-sample-1", "Our first trip", 0),
            photo("gallery-sample-2", "Sunday pancakes", 1),
        ],
        love_messages: vec![LoveMessage {
            id: "message-sample-1".into(),
            title: "Open when you miss me".into(),
            preview: "A little note".into(),
            full_text: "I am always one call away.".into(),
            order: 0,
        }],
        timeline_milestones: vec![TimelineMilestone {
            id: "milestone-sample-1".into(),
            // 2021-02-14
            date: 1_613_260_800_000_000_000,
            title: "First date".into(),
            description: "Coffee that turned into dinner.".into(),
            photo: None,
            order: 0,
        }],
        interactive_surprise_config: Some(InteractiveSurpriseConfig {
            quiz_questions: vec![QuizQuestion {
                question: "Where did we meet?".into(),
                correct_answer: "The library".into(),
                options: vec!["The library".into(), "A concert".into()],
            }],
            flip_cards: vec![FlipCard {
                front: "Favorite song".into(),
                back: "Ours".into(),
            }],
        }),
        final_dedication: Some(FinalDedication::new("Always", "Happy Valentine's Day")),
    }
}
