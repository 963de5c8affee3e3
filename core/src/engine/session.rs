//! Paired ownership of the engine's scratch memory and its live handle.

use crate::engine::abi::{ClusterResult, RadarCube, RadarParam, RadarPointClouds, TrackingResult};
use crate::engine::binding::{EngineHandle, RadarEngine};
use crate::prelude::{RadarError, RadarResult};
use log::{debug, warn};
use std::alloc::{alloc, dealloc, Layout};
use std::ptr::NonNull;

/// Alignment the engine requires for its scratch region.
pub const SCRATCH_ALIGNMENT: usize = 64;

/// Raw aligned allocation handed to the engine as working memory.
#[derive(Debug)]
pub struct ScratchBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl ScratchBuffer {
    pub fn allocate(size: usize, align: usize) -> RadarResult<Self> {
        if size == 0 {
            return Err(RadarError::Allocation(
                "cannot allocate a zero-size scratch region".into(),
            ));
        }
        let layout = Layout::from_size_align(size, align)
            .map_err(|err| RadarError::Allocation(format!("invalid scratch layout: {}", err)))?;
        let raw = unsafe { alloc(layout) };
        let ptr = NonNull::new(raw).ok_or_else(|| {
            RadarError::Allocation(format!(
                "allocator refused {} bytes at alignment {}",
                size, align
            ))
        })?;
        Ok(Self { ptr, layout })
    }

    pub fn len(&self) -> usize {
        self.layout.size()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for ScratchBuffer {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

/// One acquire/release lifecycle for an engine instance: queries the
/// required scratch size, allocates it, initializes the handle, and on
/// drop destroys the handle strictly before the scratch bytes are freed.
pub struct EngineSession {
    engine: Box<dyn RadarEngine>,
    handle: EngineHandle,
    // Declared after `handle`: the scratch region must outlive the handle
    // that references it, and `Drop::drop` runs before field drop glue.
    scratch: ScratchBuffer,
}

impl std::fmt::Debug for EngineSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSession").finish_non_exhaustive()
    }
}

impl EngineSession {
    pub fn open(mut engine: Box<dyn RadarEngine>, param: &RadarParam) -> RadarResult<Self> {
        let size = engine.query_mem_size(param)?;
        if size == 0 {
            return Err(RadarError::Allocation(
                "engine reported a zero scratch size".into(),
            ));
        }
        let mut scratch = ScratchBuffer::allocate(size, SCRATCH_ALIGNMENT)?;
        debug!("allocated {} byte engine scratch region", scratch.len());
        let handle = engine.init_handle(param, &mut scratch)?;
        Ok(Self {
            engine,
            handle,
            scratch,
        })
    }

    pub fn scratch_len(&self) -> usize {
        self.scratch.len()
    }

    pub fn detect(
        &mut self,
        cube: &mut RadarCube,
        points: &mut RadarPointClouds,
    ) -> RadarResult<()> {
        self.engine.detect(&self.handle, cube, points)
    }

    pub fn cluster(
        &mut self,
        points: &mut RadarPointClouds,
        clusters: &mut ClusterResult,
    ) -> RadarResult<()> {
        self.engine.cluster(&self.handle, points, clusters)
    }

    pub fn track(
        &mut self,
        clusters: &mut ClusterResult,
        tracks: &mut TrackingResult,
    ) -> RadarResult<()> {
        self.engine.track(&self.handle, clusters, tracks)
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        // Best effort: a failed destroy is logged, never escalated, and the
        // scratch region is still released afterwards.
        if let Err(err) = self.engine.destroy_handle(&self.handle) {
            warn!("engine handle teardown failed: {}", err);
        }
    }
}
