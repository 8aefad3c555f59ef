//! Host bridge: the overlay's only way out
//!
//! The host implements [`HostPort`]. Calls are fire-and-forget from the overlay's point
//! of view; [`dispatch`] turns a session's outbound request into a future that performs
//! the call and the best-effort cleanup (a failed commit falls back to cancel so the
//! host's capture lock is always released).

use std::sync::Arc;

use crossbeam_channel::Sender;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Deserialize;

use crate::domain::CaptureRegion;
use crate::session::messages::Outbound;

/// Result of an asynchronous host call
pub type HostFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Runs bridge futures without the overlay waiting on them
pub type Spawner = Box<dyn Fn(BoxFuture<'static, ()>)>;

/// Calls the overlay makes on its host
pub trait HostPort: Send + Sync {
    /// Process the selected region, in native source pixels
    fn commit(&self, region: CaptureRegion) -> HostFuture;
    /// Abandon the capture and release the capture lock
    fn cancel(&self) -> HostFuture;
    /// Put a formatted color value on the clipboard
    fn copy_color(&self, text: String) -> HostFuture;
    /// Close the overlay window after a fatal error, showing the diagnostic
    fn request_close(&self, diagnostic: &str);
}

/// Payload of the host's initialization event
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitPayload {
    #[serde(rename = "imageDataUrl", alias = "image_data_url", default)]
    pub image_data_url: Option<String>,
}

impl InitPayload {
    /// Parse the raw event payload and return the image data URL
    pub fn image_data_url(payload: serde_json::Value) -> anyhow::Result<String> {
        let payload: InitPayload = serde_json::from_value(payload)
            .map_err(|err| anyhow::anyhow!("initialization payload is malformed: {}", err))?;
        match payload.image_data_url {
            Some(url) if !url.trim().is_empty() => Ok(url),
            Some(_) => anyhow::bail!("initialization payload has an empty imageDataUrl"),
            None => anyhow::bail!("initialization payload has no imageDataUrl"),
        }
    }
}

/// Outcome of a host call that changes what the overlay shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostReply {
    ColorCopied,
    ColorCopyFailed,
}

/// Build the future that delivers one outbound call to the host
///
/// Outcomes the session reacts to are posted on `replies`.
pub fn dispatch(
    port: Arc<dyn HostPort>,
    call: Outbound,
    replies: Sender<HostReply>,
) -> BoxFuture<'static, ()> {
    async move {
        match call {
            Outbound::Commit(region) => {
                if let Err(err) = port.commit(region).await {
                    log::error!("Host rejected the selection, cancelling instead: {:?}", err);
                    if let Err(err) = port.cancel().await {
                        log::error!("Host cancel failed: {:?}", err);
                    }
                }
            }
            Outbound::Cancel => {
                if let Err(err) = port.cancel().await {
                    log::error!("Host cancel failed: {:?}", err);
                }
            }
            Outbound::CopyColor(text) => {
                let reply = match port.copy_color(text.clone()).await {
                    Ok(()) => {
                        log::debug!("Color copied: {}", text);
                        HostReply::ColorCopied
                    }
                    Err(err) => {
                        log::error!("Failed to copy color {}: {:?}", text, err);
                        HostReply::ColorCopyFailed
                    }
                };
                if replies.send(reply).is_err() {
                    log::debug!("Overlay is gone, dropping {:?}", reply);
                }
            }
        }
    }
    .boxed()
}

/// Spawner that hands bridge calls to the current tokio runtime
pub fn tokio_spawner() -> Spawner {
    Box::new(|fut: BoxFuture<'static, ()>| {
        tokio::spawn(fut);
    })
}

/// Spawner that drives each call to completion before returning
pub fn inline_spawner() -> Spawner {
    Box::new(|fut: BoxFuture<'static, ()>| futures::executor::block_on(fut))
}
