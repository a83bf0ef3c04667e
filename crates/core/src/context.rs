// Process-level collaborators shared by every controller operation

use crate::bridge::{EventBridge, ExecutionContext, InProcessContext};
use crate::config::ControllerConfig;
use crate::engine::{AudioSink, EngineFactory, EngineHandle, MediaEngine};
use crate::error::Result;
use crate::surface::SurfaceBinding;
use log::info;
use parking_lot::RwLock;
use std::sync::Arc;

/// Engine handle, event bridge and surface binding, created together and
/// handed to the controller
pub struct MediaContext {
    engine: EngineHandle,
    bridge: Arc<EventBridge>,
    surface: Arc<SurfaceBinding>,
    audio_sink: RwLock<Option<Arc<dyn AudioSink>>>,
    config: ControllerConfig,
}

impl MediaContext {
    /// Build the engine from `factory`; fails if the engine cannot start
    pub fn init(
        factory: &dyn EngineFactory,
        config: ControllerConfig,
        execution: Arc<dyn ExecutionContext>,
    ) -> Result<Self> {
        let bridge = Arc::new(EventBridge::new(execution, config.bridge));
        Self::init_shared(factory, config, bridge, Arc::new(SurfaceBinding::new()))
    }

    /// Like `init`, around a bridge and surface binding that outlive the
    /// context (the FFI layer keeps those process-wide)
    pub fn init_shared(
        factory: &dyn EngineFactory,
        config: ControllerConfig,
        bridge: Arc<EventBridge>,
        surface: Arc<SurfaceBinding>,
    ) -> Result<Self> {
        let engine = EngineHandle::init(factory, &config.engine)?;
        Ok(Self::from_parts(engine, config, bridge, surface))
    }

    /// Context around an already running engine
    pub fn with_engine(
        engine: Arc<dyn MediaEngine>,
        config: ControllerConfig,
        execution: Arc<dyn ExecutionContext>,
    ) -> Self {
        let bridge = Arc::new(EventBridge::new(execution, config.bridge));
        Self::from_parts(
            EngineHandle::from_engine(engine),
            config,
            bridge,
            Arc::new(SurfaceBinding::new()),
        )
    }

    /// In-process observers, default configuration
    pub fn in_process(engine: Arc<dyn MediaEngine>) -> Self {
        Self::with_engine(engine, ControllerConfig::default(), Arc::new(InProcessContext))
    }

    fn from_parts(
        engine: EngineHandle,
        config: ControllerConfig,
        bridge: Arc<EventBridge>,
        surface: Arc<SurfaceBinding>,
    ) -> Self {
        Self {
            engine,
            bridge,
            surface,
            audio_sink: RwLock::new(None),
            config,
        }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn bridge(&self) -> &Arc<EventBridge> {
        &self.bridge
    }

    pub fn surface(&self) -> &Arc<SurfaceBinding> {
        &self.surface
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Sink for software-mixed audio output; used by sessions created afterwards
    pub fn set_audio_sink(&self, sink: Option<Arc<dyn AudioSink>>) {
        *self.audio_sink.write() = sink;
    }

    pub fn audio_sink(&self) -> Option<Arc<dyn AudioSink>> {
        self.audio_sink.read().clone()
    }

    /// Release the engine; idempotent
    pub fn teardown(&self) {
        self.engine.teardown();
        info!("Media context torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::error::SessionError;
    use crate::testing::MockEngine;

    #[test]
    fn test_init_failure_is_fatal() {
        let factory = |_: &EngineConfig| -> Option<Arc<dyn MediaEngine>> { None };
        let result = MediaContext::init(
            &factory,
            ControllerConfig::default(),
            Arc::new(InProcessContext),
        );
        let err = result.err().unwrap();
        assert!(matches!(err, SessionError::EngineInit(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_init_passes_config_to_factory() {
        let mock = MockEngine::new();
        let factory = move |config: &EngineConfig| -> Option<Arc<dyn MediaEngine>> {
            assert!(config.verbose);
            Some(Arc::new(mock.clone()))
        };
        let config = ControllerConfig {
            engine: EngineConfig {
                verbose: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let context = MediaContext::init(&factory, config, Arc::new(InProcessContext)).unwrap();
        assert!(context.engine().is_alive());
    }

    #[test]
    fn test_shared_parts_are_reused() {
        let mock = MockEngine::new();
        let factory = move |_: &EngineConfig| -> Option<Arc<dyn MediaEngine>> {
            Some(Arc::new(mock.clone()))
        };
        let bridge = Arc::new(EventBridge::in_process());
        let surface = Arc::new(SurfaceBinding::new());
        let context = MediaContext::init_shared(
            &factory,
            ControllerConfig::default(),
            bridge.clone(),
            surface.clone(),
        )
        .unwrap();
        assert!(Arc::ptr_eq(context.bridge(), &bridge));
        assert!(Arc::ptr_eq(context.surface(), &surface));
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let mock = MockEngine::new();
        let context = MediaContext::in_process(Arc::new(mock.clone()));
        context.teardown();
        context.teardown();
        assert!(mock.engine_released());
        assert!(!context.engine().is_alive());
        assert!(context.engine().require().is_err());
    }
}
