use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    download_link,
    format::{format_file_size, format_uploaded_at},
    load_settings, DocumentPanel, SelectedFile, StatusAction, ViewState,
};
use shared::domain::StatusKind;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Terminal render layer: mounts the document panel, optionally submits one
/// file, and prints every view change.
#[derive(Parser, Debug)]
#[command(name = "docdesk")]
struct Args {
    /// Store origin; overrides docdesk.toml and the environment.
    #[arg(long)]
    api_base_url: Option<String>,
    #[arg(long, requires = "file")]
    title: Option<String>,
    #[arg(long)]
    file: Option<PathBuf>,
    /// Print links that ask the store to serve files as attachments.
    #[arg(long)]
    force_download: bool,
    /// Dump the final view state as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(api_base_url) = args.api_base_url {
        settings.api_base_url = api_base_url;
    }

    let panel = DocumentPanel::connect(&settings).context("failed to build HTTP transport")?;
    let render = tokio::spawn(render_changes(panel.subscribe()));
    panel.initial_load().await;

    if let Some(path) = args.file {
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        let mime_type = mime_guess::from_path(&path).first_or_octet_stream();

        panel.uploads().set_title(args.title.unwrap_or_default());
        if panel
            .uploads()
            .set_file(SelectedFile::new(name, mime_type.essence_str(), bytes))
            .is_ok()
        {
            let outcome = panel.uploads().submit().await;
            match outcome.error_kind() {
                Some(kind) => warn!(?kind, "docdesk: upload did not complete"),
                None => info!(?outcome, "docdesk: submit settled"),
            }
        }
    }

    let state = panel.snapshot();
    print_documents(&state, args.force_download);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    }

    panel.unmount();
    render.abort();
    Ok(())
}

async fn render_changes(mut rx: watch::Receiver<ViewState>) {
    let mut seen_reset = 0;
    let mut seen_status = None;
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        if state.file_input_reset != seen_reset {
            seen_reset = state.file_input_reset;
            println!("  (file input cleared)");
        }

        let status_id = state.status.as_ref().map(|message| message.id);
        if status_id != seen_status {
            seen_status = status_id;
            if let Some(message) = &state.status {
                let label = match message.kind {
                    StatusKind::Info => "info",
                    StatusKind::Success => "ok",
                    StatusKind::Error => "error",
                };
                let hint = match message.action {
                    Some(StatusAction::RetryFetch) => " (retry available)",
                    None => "",
                };
                println!("[{label}] {}{hint}", message.text);
            }
        }

        if state.busy() {
            println!(
                "  working... upload={} list={}",
                state.upload_busy, state.list_busy
            );
        }
    }
}

fn print_documents(state: &ViewState, force_download: bool) {
    if state.documents.is_empty() {
        println!("No documents found");
        return;
    }

    println!("{:<28} {:<24} {:>10}  {:<28} Link", "Title", "File Name", "Size", "Uploaded At");
    for document in &state.documents {
        println!(
            "{:<28} {:<24} {:>10}  {:<28} {}",
            document.title,
            document.file_name,
            format_file_size(document.file_size),
            format_uploaded_at(&document.uploaded_at),
            download_link(document, force_download)
        );
    }
}
