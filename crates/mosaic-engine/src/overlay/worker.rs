use std::io::Cursor;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};

use crate::error::Result;
use crate::paint::{Color, FillStyle};
use crate::scene::{Mask, NodeId};

/// Browsable rendition of a node mask: a PNG tinted with the node's hue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayImage {
    pub width: u32,
    pub height: u32,
    pub png: Arc<[u8]>,
}

impl OverlayImage {
    /// Decodes the PNG back to RGBA8.
    pub fn decode(&self) -> Result<image::RgbaImage> {
        let img = image::load_from_memory_with_format(&self.png, image::ImageFormat::Png)?;
        Ok(img.to_rgba8())
    }
}

#[derive(Debug, Clone)]
pub struct DecodeRequest {
    pub node_id: NodeId,
    pub mask: Arc<Mask>,
    pub hue: u16,
    /// Saturation and lightness of the tint; its alpha is ignored.
    pub fill: FillStyle,
}

#[derive(Debug)]
pub struct DecodeResponse {
    pub node_id: NodeId,
    pub result: Result<OverlayImage>,
}

/// Tints `mask` with `hue` under `fill`, keeping the mask alpha, and encodes
/// it as PNG.
pub fn render_overlay(mask: &Mask, hue: u16, fill: FillStyle) -> Result<OverlayImage> {
    let tint = FillStyle { alpha: 1.0, ..fill }.color_for_hue(hue).to_rgba8();
    let mut img = image::RgbaImage::new(mask.width(), mask.height());
    for (x, y, px) in img.enumerate_pixels_mut() {
        let a = mask.alpha_at(x, y);
        if a != 0 {
            *px = image::Rgba([tint.r, tint.g, tint.b, a]);
        }
    }

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;
    Ok(OverlayImage { width: mask.width(), height: mask.height(), png: png.into() })
}

/// Dedicated thread turning masks into overlay images.
///
/// Requests are processed in submission order. There is no cancellation:
/// every submitted request produces exactly one response. Dropping the
/// worker closes the request channel and joins the thread.
pub struct OverlayWorker {
    requests: Option<Sender<DecodeRequest>>,
    responses: Receiver<DecodeResponse>,
    handle: Option<JoinHandle<()>>,
}

impl OverlayWorker {
    pub fn spawn() -> Result<Self> {
        let (request_tx, request_rx) = unbounded::<DecodeRequest>();
        let (response_tx, response_rx) = unbounded::<DecodeResponse>();

        let handle = std::thread::Builder::new()
            .name("mosaic_overlay".to_owned())
            .spawn(move || overlay_loop(request_rx, response_tx))?;

        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            handle: Some(handle),
        })
    }

    /// Queues a request. Returns `false` if the worker thread is gone.
    pub fn submit(&self, request: DecodeRequest) -> bool {
        match &self.requests {
            Some(tx) => tx.send(request).is_ok(),
            None => false,
        }
    }

    /// Next finished response, without blocking.
    pub fn try_recv(&self) -> Option<DecodeResponse> {
        match self.responses.try_recv() {
            Ok(response) => Some(response),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Waits up to `timeout` for the next response.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<DecodeResponse> {
        match self.responses.recv_timeout(timeout) {
            Ok(response) => Some(response),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for OverlayWorker {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("overlay worker panicked");
            }
        }
    }
}

fn overlay_loop(requests: Receiver<DecodeRequest>, responses: Sender<DecodeResponse>) {
    log::debug!("overlay worker started");
    for request in requests.iter() {
        let result = render_overlay(&request.mask, request.hue, request.fill);
        if let Err(err) = &result {
            log::warn!("overlay for {} failed: {err}", request.node_id);
        }
        if responses.send(DecodeResponse { node_id: request.node_id, result }).is_err() {
            break;
        }
    }
    log::debug!("overlay worker stopped");
}
