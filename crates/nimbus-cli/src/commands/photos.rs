//! Photo gallery commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use nimbus_core::{CameraManager, FacingMode, TestPatternCamera, gallery};
use nimbus_store::Store;
use nimbus_types::Photo;
use time::OffsetDateTime;

use crate::cli::{OutputFormat, PhotoAction};
use crate::format::{FormatOptions, PhotoListing, format_json, format_photos_text};
use crate::util::write_output;

pub async fn cmd_photos(
    store: &Store,
    action: PhotoAction,
    output: Option<&PathBuf>,
    quiet: bool,
    opts: &FormatOptions,
) -> Result<()> {
    match action {
        PhotoAction::List { format } => {
            let photos = gallery::list_photos(store);
            let content = match format {
                OutputFormat::Json => {
                    let listing: Vec<PhotoListing<'_>> = photos.iter().map(Into::into).collect();
                    format_json(&listing)?
                }
                OutputFormat::Text => format_photos_text(&photos, opts),
            };
            write_output(output, &content)
        }
        PhotoAction::Capture {
            facing,
            width,
            height,
        } => {
            let photo = capture(store, facing, width, height).await?;
            if !quiet {
                println!("Saved photo {}", photo.id);
            }
            Ok(())
        }
        PhotoAction::Export { id, path } => {
            let photo = gallery::get_photo(store, &id)
                .ok_or_else(|| anyhow!("Photo not found: {}", id))?;
            export(&photo, &path)?;
            if !quiet {
                println!("Wrote {} to {}", photo.id, path.display());
            }
            Ok(())
        }
        PhotoAction::Delete { id } => {
            let removed = gallery::delete_photo(store, &id)?;
            if !quiet {
                println!("Deleted photo {}", removed.id);
            }
            Ok(())
        }
    }
}

/// Take a still from a synthetic camera and add it to the gallery.
async fn capture(store: &Store, facing: FacingMode, width: u32, height: u32) -> Result<Photo> {
    if width == 0 || height == 0 {
        bail!("Frame size must be non-zero, got {}x{}", width, height);
    }

    let camera = CameraManager::new(Arc::new(TestPatternCamera::new(width, height)))
        .with_settle_delay(Duration::ZERO);
    camera.start_capture(facing).await?;
    let still = camera.capture_still().await;
    camera.stop_capture().await;

    Ok(gallery::add_photo(store, still?, OffsetDateTime::now_utc())?)
}

/// Decode a `data:<mime>;base64,<payload>` URL.
fn decode_data_url(data_url: &str) -> Result<Vec<u8>> {
    let (header, payload) = data_url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| anyhow!("Not a data URL"))?;
    if !header.ends_with(";base64") {
        bail!("Only base64 data URLs are supported");
    }
    STANDARD
        .decode(payload)
        .context("Invalid base64 image data")
}

fn export(photo: &Photo, path: &Path) -> Result<()> {
    let bytes = decode_data_url(&photo.image_data)
        .with_context(|| format!("Photo {} has unreadable image data", photo.id))?;
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}
