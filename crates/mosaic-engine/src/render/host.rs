use std::cell::RefCell;
use std::rc::Rc;

use glam::Mat4;

use crate::coords::{ViewTransform, Viewport};
use crate::device::GpuDriver;
use crate::error::Result;

/// Per-frame state shared with every drawable.
#[derive(Debug, Copy, Clone)]
pub struct FrameContext {
    /// Surface pixels to clip space.
    pub projection: Mat4,
    pub viewport: Viewport,
    pub transform: ViewTransform,
}

/// Something the host draws every frame.
///
/// `attach` creates GPU resources, `release` frees them. A drawable may be
/// attached again after a release.
pub trait Drawable {
    fn attach(&mut self, gpu: &mut dyn GpuDriver) -> Result<()>;
    fn release(&mut self, gpu: &mut dyn GpuDriver);
    fn draw(&mut self, gpu: &mut dyn GpuDriver, frame: &FrameContext) -> Result<()>;
}

/// Shared handle to a registered drawable.
pub type SharedDrawable = Rc<RefCell<dyn Drawable>>;

/// Owns the pan/zoom state and the drawables rendered with it.
///
/// Drawables are shared handles so the caller keeps direct access to them
/// (for example to forward scene events) while the host draws them.
pub struct RenderHost {
    viewport: Viewport,
    transform: ViewTransform,
    drawables: Vec<SharedDrawable>,
}

impl RenderHost {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            transform: ViewTransform::default(),
            drawables: Vec::new(),
        }
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    #[inline]
    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn set_transform(&mut self, transform: ViewTransform) {
        self.transform = transform;
    }

    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    /// Attaches `drawable` and appends it to the draw list.
    pub fn register(&mut self, gpu: &mut dyn GpuDriver, drawable: SharedDrawable) -> Result<()> {
        drawable.borrow_mut().attach(gpu)?;
        self.drawables.push(drawable);
        Ok(())
    }

    /// Releases and forgets `drawable`. Returns `false` if it was not registered.
    pub fn unregister(&mut self, gpu: &mut dyn GpuDriver, drawable: &SharedDrawable) -> bool {
        let Some(pos) = self.drawables.iter().position(|d| Rc::ptr_eq(d, drawable)) else {
            return false;
        };
        let removed = self.drawables.remove(pos);
        removed.borrow_mut().release(gpu);
        true
    }

    /// Releases every drawable.
    pub fn release_all(&mut self, gpu: &mut dyn GpuDriver) {
        for drawable in self.drawables.drain(..) {
            drawable.borrow_mut().release(gpu);
        }
    }

    /// Computes the projection once and draws every drawable in registration order.
    ///
    /// A zero-sized viewport skips the frame.
    pub fn draw(&mut self, gpu: &mut dyn GpuDriver) -> Result<()> {
        if !self.viewport.is_valid() {
            log::trace!("skipping frame for invalid viewport {:?}", self.viewport);
            return Ok(());
        }
        let frame = FrameContext {
            projection: self.transform.projection(self.viewport),
            viewport: self.viewport,
            transform: self.transform,
        };
        for drawable in &self.drawables {
            drawable.borrow_mut().draw(gpu, &frame)?;
        }
        Ok(())
    }
}
