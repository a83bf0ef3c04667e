// Render-target slot shared between the client (attach/detach) and the
// engine's render path (lock, draw, unlock) on arbitrary threads.

use crate::error::Result;
use log::{debug, warn};
use parking_lot::{Mutex, MutexGuard};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Native render target plus an opaque companion object the owner needs
/// alongside it (for a JVM client: a reference to its surface view)
#[derive(Clone)]
pub struct SurfaceHandle {
    native: usize,
    companion: Option<Arc<dyn Any + Send + Sync>>,
}

impl SurfaceHandle {
    pub fn new(native: usize) -> Self {
        Self {
            native,
            companion: None,
        }
    }

    pub fn with_companion(mut self, companion: Arc<dyn Any + Send + Sync>) -> Self {
        self.companion = Some(companion);
        self
    }

    /// Raw native window value; zero means none
    pub fn native(&self) -> usize {
        self.native
    }

    pub fn companion(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.companion.as_ref()
    }
}

impl fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceHandle")
            .field("native", &format_args!("{:#x}", self.native))
            .field("companion", &self.companion.is_some())
            .finish()
    }
}

/// Whoever attached the surface; told when the video size changes
pub trait SurfaceOwner: Send + Sync {
    fn set_surface_size(&self, width: i32, height: i32, sar_num: i32, sar_den: i32) -> Result<()>;
}

struct Binding {
    surface: SurfaceHandle,
    owner: Option<Arc<dyn SurfaceOwner>>,
    width: i32,
    height: i32,
}

pub struct SurfaceBinding {
    slot: Mutex<Option<Binding>>,
}

impl SurfaceBinding {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Bind a surface, replacing any previous binding in one step
    pub fn attach(
        &self,
        surface: SurfaceHandle,
        owner: Option<Arc<dyn SurfaceOwner>>,
        width: i32,
        height: i32,
    ) {
        debug!("Attaching surface {:?} ({}x{})", surface, width, height);
        let previous = self.slot.lock().replace(Binding {
            surface,
            owner,
            width,
            height,
        });
        // drop the old references outside the lock
        drop(previous);
    }

    /// Clear the binding; safe to call when nothing is attached
    pub fn detach(&self) {
        if self.slot.lock().take().is_some() {
            debug!("Surface detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Attached size, if any
    pub fn size(&self) -> Option<(i32, i32)> {
        self.slot.lock().as_ref().map(|b| (b.width, b.height))
    }

    /// Lock the slot for drawing; the lock is released when the guard drops
    pub fn lock_and_get(&self) -> SurfaceGuard<'_> {
        SurfaceGuard {
            slot: self.slot.lock(),
        }
    }

    /// Whether some thread currently holds the slot
    pub fn is_locked(&self) -> bool {
        self.slot.is_locked()
    }

    pub fn try_lock_and_get(&self) -> Option<SurfaceGuard<'_>> {
        self.slot.try_lock().map(|slot| SurfaceGuard { slot })
    }

    /// Lock the slot and leave it locked, returning the native handle (zero if
    /// none). Every call must be paired with `unlock_raw`.
    pub fn lock_and_get_raw(&self) -> usize {
        let guard = self.slot.lock();
        let native = guard.as_ref().map(|b| b.surface.native()).unwrap_or(0);
        std::mem::forget(guard);
        native
    }

    /// Lock the slot like `lock_and_get_raw`, returning the companion object
    pub fn lock_and_get_companion_raw(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        let guard = self.slot.lock();
        let companion = guard.as_ref().and_then(|b| b.surface.companion().cloned());
        std::mem::forget(guard);
        companion
    }

    /// Release a lock taken by one of the `_raw` lock calls.
    ///
    /// # Safety
    /// The slot must currently be locked by a `_raw` call whose lock has not
    /// been released yet.
    pub unsafe fn unlock_raw(&self) {
        self.slot.force_unlock();
    }

    /// Push a size change to the owner. No-op without an owner.
    pub fn set_surface_size(&self, width: i32, height: i32, sar_num: i32, sar_den: i32) {
        let owner = self.slot.lock().as_ref().and_then(|b| b.owner.clone());
        let Some(owner) = owner else {
            debug!("No surface owner, ignoring size {}x{}", width, height);
            return;
        };
        if let Err(e) = owner.set_surface_size(width, height, sar_num, sar_den) {
            warn!("Surface owner rejected size change: {}", e);
        }
    }
}

impl Default for SurfaceBinding {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped access to the attached surface
pub struct SurfaceGuard<'a> {
    slot: MutexGuard<'a, Option<Binding>>,
}

impl SurfaceGuard<'_> {
    pub fn surface(&self) -> Option<&SurfaceHandle> {
        self.slot.as_ref().map(|b| &b.surface)
    }

    /// Native handle, zero when detached
    pub fn native(&self) -> usize {
        self.surface().map(|s| s.native()).unwrap_or(0)
    }

    pub fn size(&self) -> Option<(i32, i32)> {
        self.slot.as_ref().map(|b| (b.width, b.height))
    }

    /// Tell the owner about a size change while the surface stays locked.
    /// The owner must not touch the binding from inside the call.
    pub fn notify_size(&self, width: i32, height: i32, sar_num: i32, sar_den: i32) -> Result<()> {
        match self.slot.as_ref().and_then(|b| b.owner.as_ref()) {
            Some(owner) => owner.set_surface_size(width, height, sar_num, sar_den),
            None => Ok(()),
        }
    }
}
