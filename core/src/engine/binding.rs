//! Capability interface over the compute engine and the dynamic binding to
//! the native `libradar` module.

use crate::engine::abi::{
    ClusterResult, RadarClusteringFn, RadarCube, RadarDestroyHandleFn, RadarDetectionFn,
    RadarGetMemSizeFn, RadarHandle, RadarInitHandleFn, RadarParam, RadarPointClouds,
    RadarTrackingFn, TrackingResult, RADAR_SUCCESS, SYM_CLUSTERING, SYM_DESTROY_HANDLE,
    SYM_DETECTION, SYM_GET_MEM_SIZE, SYM_INIT_HANDLE, SYM_TRACKING,
};
use crate::engine::session::ScratchBuffer;
use crate::prelude::{EngineStage, RadarError, RadarResult};
use libloading::{library_filename, Library};
use log::info;
use std::ffi::OsStr;
use std::os::raw::{c_ulong, c_void};
use std::path::Path;
use std::ptr;

/// Live engine handle, valid from a successful init until destroy.
///
/// Not reentrant: a handle serves one in-flight frame at a time.
pub struct EngineHandle {
    raw: *mut RadarHandle,
}

impl EngineHandle {
    pub(crate) fn new(raw: *mut RadarHandle) -> Self {
        Self { raw }
    }

    pub fn as_ptr(&self) -> *mut RadarHandle {
        self.raw
    }
}

/// Capability set every compute engine must provide.
///
/// Implementations produce the crate error taxonomy directly: start-time
/// calls map failures to `Allocation`/`EngineInit`, per-frame calls to
/// `EngineRuntime`, teardown to `Teardown`.
pub trait RadarEngine {
    fn query_mem_size(&self, param: &RadarParam) -> RadarResult<usize>;
    fn init_handle(
        &mut self,
        param: &RadarParam,
        scratch: &mut ScratchBuffer,
    ) -> RadarResult<EngineHandle>;
    fn detect(
        &mut self,
        handle: &EngineHandle,
        cube: &mut RadarCube,
        points: &mut RadarPointClouds,
    ) -> RadarResult<()>;
    fn cluster(
        &mut self,
        handle: &EngineHandle,
        points: &mut RadarPointClouds,
        clusters: &mut ClusterResult,
    ) -> RadarResult<()>;
    fn track(
        &mut self,
        handle: &EngineHandle,
        clusters: &mut ClusterResult,
        tracks: &mut TrackingResult,
    ) -> RadarResult<()>;
    fn destroy_handle(&mut self, handle: &EngineHandle) -> RadarResult<()>;
}

fn stage_status(stage: EngineStage, status: i32) -> RadarResult<()> {
    if status == RADAR_SUCCESS {
        Ok(())
    } else {
        Err(RadarError::EngineRuntime { stage, status })
    }
}

/// Adapter over the dynamically loaded native engine.
///
/// Binding is atomic: either all six entry points resolve, or the module
/// is unloaded and a bind failure is returned. There is no automatic
/// re-bind after a failure.
#[derive(Debug)]
pub struct LibRadarEngine {
    get_mem_size_fn: RadarGetMemSizeFn,
    init_handle_fn: RadarInitHandleFn,
    detection_fn: RadarDetectionFn,
    clustering_fn: RadarClusteringFn,
    tracking_fn: RadarTrackingFn,
    destroy_handle_fn: RadarDestroyHandleFn,
    // Keeps the module mapped for as long as the bound pointers are callable.
    _library: Library,
}

fn resolve<T: Copy>(library: &Library, symbol: &'static [u8]) -> RadarResult<T> {
    unsafe {
        library.get::<T>(symbol).map(|sym| *sym).map_err(|err| {
            RadarError::EngineBind(format!(
                "missing symbol {}: {}",
                String::from_utf8_lossy(symbol),
                err
            ))
        })
    }
}

impl LibRadarEngine {
    /// Binds the engine module by platform naming convention
    /// (`libradar.so` / `radar.dll`), searched on the loader path.
    pub fn load_default() -> RadarResult<Self> {
        Self::load(library_filename("radar"))
    }

    /// Binds the engine module at an explicit path or loader-resolved name.
    pub fn load<P: AsRef<OsStr>>(path: P) -> RadarResult<Self> {
        let path_ref = path.as_ref();
        let library = unsafe { Library::new(path_ref) }.map_err(|err| {
            RadarError::EngineBind(format!(
                "failed to load {}: {}",
                Path::new(path_ref).display(),
                err
            ))
        })?;

        // A missing symbol returns early and drops `library`, unloading the
        // module; a partially bound engine never escapes this function.
        let engine = Self {
            get_mem_size_fn: resolve(&library, SYM_GET_MEM_SIZE)?,
            init_handle_fn: resolve(&library, SYM_INIT_HANDLE)?,
            detection_fn: resolve(&library, SYM_DETECTION)?,
            clustering_fn: resolve(&library, SYM_CLUSTERING)?,
            tracking_fn: resolve(&library, SYM_TRACKING)?,
            destroy_handle_fn: resolve(&library, SYM_DESTROY_HANDLE)?,
            _library: library,
        };
        info!(
            "bound all libradar entry points from {}",
            Path::new(path_ref).display()
        );
        Ok(engine)
    }
}

impl RadarEngine for LibRadarEngine {
    fn query_mem_size(&self, param: &RadarParam) -> RadarResult<usize> {
        let mut param = *param;
        let mut size: c_ulong = 0;
        let status = unsafe { (self.get_mem_size_fn)(&mut param, &mut size) };
        if status != RADAR_SUCCESS {
            return Err(RadarError::Allocation(format!(
                "radarGetMemSize returned status {}",
                status
            )));
        }
        Ok(size as usize)
    }

    fn init_handle(
        &mut self,
        param: &RadarParam,
        scratch: &mut ScratchBuffer,
    ) -> RadarResult<EngineHandle> {
        let mut param = *param;
        let mut raw: *mut RadarHandle = ptr::null_mut();
        let status = unsafe {
            (self.init_handle_fn)(
                &mut raw,
                &mut param,
                scratch.as_mut_ptr() as *mut c_void,
                scratch.len() as c_ulong,
            )
        };
        if status != RADAR_SUCCESS || raw.is_null() {
            return Err(RadarError::EngineInit(status));
        }
        Ok(EngineHandle::new(raw))
    }

    fn detect(
        &mut self,
        handle: &EngineHandle,
        cube: &mut RadarCube,
        points: &mut RadarPointClouds,
    ) -> RadarResult<()> {
        let status = unsafe { (self.detection_fn)(handle.as_ptr(), cube, points) };
        stage_status(EngineStage::Detection, status)
    }

    fn cluster(
        &mut self,
        handle: &EngineHandle,
        points: &mut RadarPointClouds,
        clusters: &mut ClusterResult,
    ) -> RadarResult<()> {
        let status = unsafe { (self.clustering_fn)(handle.as_ptr(), points, clusters) };
        stage_status(EngineStage::Clustering, status)
    }

    fn track(
        &mut self,
        handle: &EngineHandle,
        clusters: &mut ClusterResult,
        tracks: &mut TrackingResult,
    ) -> RadarResult<()> {
        let status = unsafe { (self.tracking_fn)(handle.as_ptr(), clusters, tracks) };
        stage_status(EngineStage::Tracking, status)
    }

    fn destroy_handle(&mut self, handle: &EngineHandle) -> RadarResult<()> {
        let status = unsafe { (self.destroy_handle_fn)(handle.as_ptr()) };
        if status != RADAR_SUCCESS {
            return Err(RadarError::Teardown(status));
        }
        Ok(())
    }
}
