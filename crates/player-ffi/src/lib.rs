// FFI bridge for the cadence media-session controller
// Provides the C ABI used by the engine's render path + JNI entrypoints matching
// the client's native method table.

// controller helpers are only reached through the JNI entrypoints
#![cfg_attr(not(any(feature = "android", feature = "desktop")), allow(dead_code))]

use cadence_core::{
    ControllerConfig, EngineFactory, EventBridge, ExecutionContext, MediaContext,
    MediaController, Result, SessionError, SurfaceBinding,
};
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use std::os::raw::{c_int, c_void};
use std::sync::{Arc, Once};

static ENGINE_FACTORY: Lazy<RwLock<Option<Arc<dyn EngineFactory>>>> =
    Lazy::new(|| RwLock::new(None));
static CONTROLLER: Lazy<RwLock<Option<Arc<MediaController>>>> = Lazy::new(|| RwLock::new(None));
/// Outlives controllers: the render path may still hold it during a destroy
static SURFACE: Lazy<Arc<SurfaceBinding>> = Lazy::new(|| Arc::new(SurfaceBinding::new()));
/// One bridge per process, created with the first execution context seen
static BRIDGE: OnceCell<Arc<EventBridge>> = OnceCell::new();
static INIT_LOGGER: Once = Once::new();

fn init_logging(verbose: bool) {
    INIT_LOGGER.call_once(|| {
        #[cfg(target_os = "android")]
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("CadenceJNI"),
        );

        #[cfg(not(target_os = "android"))]
        {
            let _ = env_logger::builder()
                .is_test(false)
                .filter_level(log::LevelFilter::Debug)
                .try_init();
        }
    });
    log::set_max_level(if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
}

/// Install the engine implementation the controller drives.
/// Must happen before the client initializes.
pub fn install_engine_factory(factory: Arc<dyn EngineFactory>) {
    *ENGINE_FACTORY.write() = Some(factory);
}

fn event_bridge(context: impl FnOnce() -> Arc<dyn ExecutionContext>) -> Arc<EventBridge> {
    BRIDGE
        .get_or_init(|| Arc::new(EventBridge::new(context(), Default::default())))
        .clone()
}

/// Build a controller and publish it, destroying any previous one first
fn init_controller(config: ControllerConfig, bridge: Arc<EventBridge>) -> Result<Arc<MediaController>> {
    let factory = ENGINE_FACTORY
        .read()
        .clone()
        .ok_or_else(|| SessionError::EngineInit("No engine factory installed".into()))?;

    let previous = CONTROLLER.write().take();
    if let Some(previous) = previous {
        log::warn!("Controller initialized twice, destroying the previous one");
        previous.destroy();
    }

    let context = MediaContext::init_shared(factory.as_ref(), config, bridge, SURFACE.clone())?;
    let controller = Arc::new(MediaController::new(Arc::new(context)));
    *CONTROLLER.write() = Some(controller.clone());
    Ok(controller)
}

fn controller() -> Result<Arc<MediaController>> {
    CONTROLLER
        .read()
        .clone()
        .ok_or_else(|| SessionError::EngineInit("Controller not initialized".into()))
}

/// Run `f` on the live controller, or return `default` without one
fn with_controller<R>(default: R, f: impl FnOnce(&MediaController) -> R) -> R {
    match controller() {
        Ok(controller) => f(&controller),
        Err(_) => default,
    }
}

fn destroy_controller() {
    let controller = CONTROLLER.write().take();
    match controller {
        Some(controller) => controller.destroy(),
        None => log::debug!("destroy: no controller"),
    }
}

fn to_code(result: Result<()>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => {
            log::error!("FFI error: {}", err);
            -1
        }
    }
}

// -----------------------------------------------------------------------------
// C ABI for the engine's video output
// -----------------------------------------------------------------------------

/// Lock the surface slot and return the native window, or null when detached.
/// Every call must be followed by `jni_UnlockAndroidSurface`.
#[no_mangle]
pub extern "C" fn jni_LockAndGetAndroidSurface() -> *mut c_void {
    SURFACE.lock_and_get_raw() as *mut c_void
}

/// Release the lock taken by `jni_LockAndGetAndroidSurface` or
/// `jni_LockAndGetAndroidJavaSurface`.
///
/// The unbalanced-unlock check is best effort only. The binding cannot tell
/// who holds its lock, so a call from a thread without it still releases a
/// lock held by a `SurfaceGuard` or by an attach/detach on another thread.
///
/// # Safety
/// The calling thread must hold the surface lock from one of those calls.
#[no_mangle]
pub unsafe extern "C" fn jni_UnlockAndroidSurface() {
    if !SURFACE.is_locked() {
        log::warn!("Surface unlock without a matching lock");
        return;
    }
    SURFACE.unlock_raw();
}

/// Forward a video size change to whoever attached the surface
#[no_mangle]
pub extern "C" fn jni_SetAndroidSurfaceSize(width: c_int, height: c_int, sar_num: c_int, sar_den: c_int) {
    SURFACE.set_surface_size(width, height, sar_num, sar_den);
}

// -------------------------------
// JNI bindings for Android/JVM
// -------------------------------
#[cfg(any(feature = "android", feature = "desktop"))]
mod jni_bridge {
    use super::*;
    use cadence_core::{
        AudioFormat, AudioOutput, AudioSink, EngineConfig, EventObserver, EventPayload, MediaInfo,
        PayloadValue, SurfaceHandle, SurfaceOwner, TrackDescription, TrackDetails,
    };
    use jni::objects::{GlobalRef, JObject, JObjectArray, JString, JValue};
    use jni::sys::{jboolean, jfloat, jint, jlong, jobject, jobjectArray, jstring, JNI_FALSE, JNI_TRUE};
    use jni::{JNIEnv, JavaVM};
    use std::any::Any;

    const CALLBACK_NAME: &str = "callback";
    const CALLBACK_SIG: &str = "(ILandroid/os/Bundle;)V";
    const INIT_EXCEPTION: &str = "org/videolan/libvlc/LibVlcException";
    const TRACK_INFO_CLASS: &str = "org/videolan/libvlc/TrackInfo";
    /// `TrackInfo.Type` of the trailing metadata record
    const TYPE_META: i32 = 3;

    static JAVA_VM: OnceCell<Arc<JavaVM>> = OnceCell::new();

    fn jni_error(err: jni::errors::Error) -> SessionError {
        SessionError::Engine(format!("JNI: {}", err))
    }

    fn java_vm(env: &JNIEnv) -> Result<Arc<JavaVM>> {
        JAVA_VM
            .get_or_try_init(|| env.get_java_vm().map(Arc::new))
            .cloned()
            .map_err(jni_error)
    }

    fn bridge(env: &JNIEnv) -> Result<Arc<EventBridge>> {
        let vm = java_vm(env)?;
        Ok(event_bridge(|| Arc::new(JniContext { vm })))
    }

    fn jstring_to_string(env: &mut JNIEnv, jstr: &JString) -> Result<String> {
        let java_str = env.get_string(jstr).map_err(jni_error)?;
        Ok(java_str.into())
    }

    fn string_to_jstring(env: &JNIEnv, s: &str) -> Result<jstring> {
        env.new_string(s).map(|j| j.into_raw()).map_err(jni_error)
    }

    fn position_arg(position: jint) -> usize {
        // negative positions fail the queue's bounds check
        usize::try_from(position).unwrap_or(usize::MAX)
    }

    /// Thread attachment to the JVM
    struct JniContext {
        vm: Arc<JavaVM>,
    }

    impl ExecutionContext for JniContext {
        fn is_attached(&self) -> bool {
            self.vm.get_env().is_ok()
        }

        fn attach(&self) -> Result<()> {
            self.vm
                .attach_current_thread_permanently()
                .map(|_| ())
                .map_err(|e| SessionError::ContextAttach(e.to_string()))
        }

        fn detach(&self) {
            // only called for threads this context attached itself
            unsafe { self.vm.detach_current_thread() };
        }
    }

    /// The client's event handler; receives `callback(int, Bundle)`
    struct JniObserver {
        handler: GlobalRef,
        vm: Arc<JavaVM>,
    }

    fn build_bundle<'local>(
        env: &mut JNIEnv<'local>,
        payload: &EventPayload,
    ) -> jni::errors::Result<JObject<'local>> {
        let bundle = env.new_object("android/os/Bundle", "()V", &[])?;
        for (key, value) in payload.iter() {
            let jkey = env.new_string(key)?;
            let jkey = env.auto_local(jkey);
            match value {
                PayloadValue::Int(v) => {
                    env.call_method(
                        &bundle,
                        "putInt",
                        "(Ljava/lang/String;I)V",
                        &[JValue::Object(&jkey), JValue::Int(*v)],
                    )?;
                }
                PayloadValue::Float(v) => {
                    env.call_method(
                        &bundle,
                        "putFloat",
                        "(Ljava/lang/String;F)V",
                        &[JValue::Object(&jkey), JValue::Float(*v)],
                    )?;
                }
                PayloadValue::Str(v) => {
                    let jvalue = env.new_string(v)?;
                    let jvalue = env.auto_local(jvalue);
                    env.call_method(
                        &bundle,
                        "putString",
                        "(Ljava/lang/String;Ljava/lang/String;)V",
                        &[JValue::Object(&jkey), JValue::Object(&jvalue)],
                    )?;
                }
            }
        }
        Ok(bundle)
    }

    impl EventObserver for JniObserver {
        fn notify(&self, event_type: i32, payload: &EventPayload) -> Result<()> {
            // the bridge has already attached this thread
            let mut env = self
                .vm
                .get_env()
                .map_err(|e| SessionError::ContextAttach(e.to_string()))?;
            let bundle = build_bundle(&mut env, payload).map_err(jni_error)?;
            let bundle = env.auto_local(bundle);

            let result = env.call_method(
                self.handler.as_obj(),
                CALLBACK_NAME,
                CALLBACK_SIG,
                &[JValue::Int(event_type), JValue::Object(&bundle)],
            );
            match result {
                Ok(_) => Ok(()),
                Err(err @ (jni::errors::Error::MethodNotFound { .. } | jni::errors::Error::JavaException)) => {
                    let _ = env.exception_clear();
                    Err(SessionError::MissingCallbackEntry(format!(
                        "{}{}: {}",
                        CALLBACK_NAME, CALLBACK_SIG, err
                    )))
                }
                Err(err) => Err(jni_error(err)),
            }
        }
    }

    /// The client's surface view, told about video size changes
    struct JniSurfaceOwner {
        gui: GlobalRef,
        vm: Arc<JavaVM>,
    }

    impl SurfaceOwner for JniSurfaceOwner {
        fn set_surface_size(&self, width: i32, height: i32, sar_num: i32, sar_den: i32) -> Result<()> {
            let mut env = self
                .vm
                .attach_current_thread()
                .map_err(|e| SessionError::ContextAttach(e.to_string()))?;
            env.call_method(
                self.gui.as_obj(),
                "setSurfaceSize",
                "(IIII)V",
                &[
                    JValue::Int(width),
                    JValue::Int(height),
                    JValue::Int(sar_num),
                    JValue::Int(sar_den),
                ],
            )
            .map(|_| ())
            .map_err(|e| {
                let _ = env.exception_clear();
                SessionError::MissingCallbackEntry(format!("setSurfaceSize: {}", e))
            })
        }
    }

    /// Software audio output through the client's AudioTrack wrapper
    struct JniAudioSink {
        owner: GlobalRef,
        vm: Arc<JavaVM>,
    }

    impl JniAudioSink {
        fn call(&self, name: &str, sig: &str, args: &[JValue]) -> Result<()> {
            let mut env = self
                .vm
                .attach_current_thread()
                .map_err(|e| SessionError::ContextAttach(e.to_string()))?;
            env.call_method(self.owner.as_obj(), name, sig, args)
                .map(|_| ())
                .map_err(jni_error)
        }

        fn write_samples(&self, samples: &[u8]) -> Result<()> {
            let mut env = self
                .vm
                .attach_current_thread()
                .map_err(|e| SessionError::ContextAttach(e.to_string()))?;
            let buffer = env.byte_array_from_slice(samples).map_err(jni_error)?;
            let buffer = env.auto_local(buffer);
            env.call_method(
                self.owner.as_obj(),
                "playAudio",
                "([BI)V",
                &[JValue::Object(&buffer), JValue::Int(samples.len() as jint)],
            )
            .map(|_| ())
            .map_err(jni_error)
        }
    }

    impl AudioSink for JniAudioSink {
        fn open(&self, format: &mut AudioFormat) -> Result<()> {
            // AudioTrack takes at most stereo
            format.channels = format.channels.clamp(1, 2);
            log::debug!("initAout: {} Hz, {} channels", format.sample_rate, format.channels);
            self.call(
                "initAout",
                "(III)V",
                &[
                    JValue::Int(format.sample_rate as jint),
                    JValue::Int(format.channels as jint),
                    JValue::Int(0),
                ],
            )
        }

        fn play(&self, samples: &[u8], _count: u32, _pts: i64) {
            if let Err(e) = self.write_samples(samples) {
                log::warn!("playAudio failed: {}", e);
            }
        }

        fn pause(&self, _pts: i64) {
            if let Err(e) = self.call("pauseAout", "()V", &[]) {
                log::warn!("pauseAout failed: {}", e);
            }
        }

        fn close(&self) {
            if let Err(e) = self.call("closeAout", "()V", &[]) {
                log::warn!("closeAout failed: {}", e);
            }
        }
    }

    fn call_int(env: &mut JNIEnv, obj: &JObject, name: &str) -> Result<i32> {
        env.call_method(obj, name, "()I", &[])
            .and_then(|v| v.i())
            .map_err(jni_error)
    }

    fn call_bool(env: &mut JNIEnv, obj: &JObject, name: &str) -> Result<bool> {
        env.call_method(obj, name, "()Z", &[])
            .and_then(|v| v.z())
            .map_err(jni_error)
    }

    fn call_string(env: &mut JNIEnv, obj: &JObject, name: &str) -> Result<String> {
        let value = env
            .call_method(obj, name, "()Ljava/lang/String;", &[])
            .and_then(|v| v.l())
            .map_err(jni_error)?;
        if value.is_null() {
            return Ok(String::new());
        }
        jstring_to_string(env, &JString::from(value))
    }

    fn read_engine_config(env: &mut JNIEnv, thiz: &JObject) -> Result<EngineConfig> {
        let aout = call_int(env, thiz, "getAout")?;
        let audio_output = AudioOutput::from_code(aout).unwrap_or_else(|| {
            log::warn!("Unknown audio output {}, using AudioTrack", aout);
            AudioOutput::AudioTrack
        });
        Ok(EngineConfig {
            audio_output,
            time_stretching: call_bool(env, thiz, "timeStretchingEnabled")?,
            deblocking: call_int(env, thiz, "getDeblocking")?,
            chroma: call_string(env, thiz, "getChroma")?,
            subtitles_encoding: call_string(env, thiz, "getSubtitlesEncoding")?,
            verbose: call_bool(env, thiz, "isVerboseMode")?,
            hardware_decoding: call_bool(env, thiz, "useIOMX")?,
        })
    }

    fn native_init(env: &mut JNIEnv, thiz: &JObject) -> Result<()> {
        let engine = read_engine_config(env, thiz)?;
        init_logging(engine.verbose);
        log::debug!(
            "Engine config: deblocking {}, chroma {}, subtitles encoding '{}'",
            engine.deblocking,
            engine.chroma_or_default(),
            engine.subtitles_encoding
        );

        let software_audio = engine.audio_output.is_software_mixed();
        let config = ControllerConfig {
            engine,
            ..Default::default()
        };
        let controller = init_controller(config, bridge(env)?)?;

        if software_audio {
            let owner = env.new_global_ref(thiz).map_err(jni_error)?;
            let sink = JniAudioSink {
                owner,
                vm: java_vm(env)?,
            };
            controller.context().set_audio_sink(Some(Arc::new(sink)));
        }
        log::info!("Controller initialized");
        Ok(())
    }

    fn set_event_handler(env: &mut JNIEnv, handler: &JObject) -> Result<()> {
        let bridge = bridge(env)?;
        bridge.clear_observer();

        let class = env.get_object_class(handler).map_err(jni_error)?;
        if env.get_method_id(&class, CALLBACK_NAME, CALLBACK_SIG).is_err() {
            let _ = env.exception_clear();
            return Err(SessionError::MissingCallbackEntry(format!(
                "{}{}",
                CALLBACK_NAME, CALLBACK_SIG
            )));
        }

        let observer = JniObserver {
            handler: env.new_global_ref(handler).map_err(jni_error)?,
            vm: java_vm(env)?,
        };
        bridge.set_observer(Arc::new(observer));
        Ok(())
    }

    fn attach_surface(
        env: &mut JNIEnv,
        surf: &JObject,
        gui: &JObject,
        width: jint,
        height: jint,
    ) -> Result<()> {
        let native = match env.get_field(surf, "mSurface", "I").and_then(|v| v.i()) {
            Ok(native) => native,
            Err(_) => {
                // field was renamed on newer platform versions
                env.exception_clear().map_err(jni_error)?;
                env.get_field(surf, "mNativeSurface", "I")
                    .and_then(|v| v.i())
                    .map_err(jni_error)?
            }
        };

        let view: Arc<dyn Any + Send + Sync> =
            Arc::new(env.new_global_ref(surf).map_err(jni_error)?);
        let owner: Option<Arc<dyn SurfaceOwner>> = if gui.is_null() {
            None
        } else {
            Some(Arc::new(JniSurfaceOwner {
                gui: env.new_global_ref(gui).map_err(jni_error)?,
                vm: java_vm(env)?,
            }))
        };

        SURFACE.attach(
            SurfaceHandle::new(native as u32 as usize).with_companion(view),
            owner,
            width,
            height,
        );
        Ok(())
    }

    fn set_int(env: &mut JNIEnv, obj: &JObject, name: &str, value: i32) -> jni::errors::Result<()> {
        env.set_field(obj, name, "I", JValue::Int(value))
    }

    fn set_string(
        env: &mut JNIEnv,
        obj: &JObject,
        name: &str,
        value: Option<&str>,
    ) -> jni::errors::Result<()> {
        let value = match value {
            Some(v) => JObject::from(env.new_string(v)?),
            None => JObject::null(),
        };
        let value = env.auto_local(value);
        env.set_field(obj, name, "Ljava/lang/String;", JValue::Object(&value))
    }

    fn track_info_array<'local>(
        env: &mut JNIEnv<'local>,
        info: &MediaInfo,
    ) -> jni::errors::Result<JObjectArray<'local>> {
        let class = env.find_class(TRACK_INFO_CLASS)?;
        let array = env.new_object_array((info.tracks.len() + 1) as jint, &class, JObject::null())?;

        for (i, track) in info.tracks.iter().enumerate() {
            let item = env.new_object(&class, "()V", &[])?;
            let item = env.auto_local(item);
            set_int(env, &item, "Id", track.id)?;
            set_int(env, &item, "Type", track.kind.code())?;
            set_string(env, &item, "Codec", Some(&track.codec))?;
            set_string(env, &item, "Language", track.language.as_deref())?;
            match track.details {
                TrackDetails::Video {
                    width,
                    height,
                    frame_rate,
                } => {
                    set_int(env, &item, "Height", height as i32)?;
                    set_int(env, &item, "Width", width as i32)?;
                    env.set_field(&*item, "Framerate", "F", JValue::Float(frame_rate))?;
                }
                TrackDetails::Audio {
                    channels,
                    sample_rate,
                } => {
                    set_int(env, &item, "Channels", channels as i32)?;
                    set_int(env, &item, "Samplerate", sample_rate as i32)?;
                }
                TrackDetails::None => {}
            }
            env.set_object_array_element(&array, i as jint, &*item)?;
        }

        let meta = &info.meta;
        let item = env.new_object(&class, "()V", &[])?;
        let item = env.auto_local(item);
        set_int(env, &item, "Type", TYPE_META)?;
        env.set_field(&*item, "Length", "J", JValue::Long(meta.length_ms))?;
        set_string(env, &item, "Title", meta.title.as_deref())?;
        set_string(env, &item, "Artist", meta.artist.as_deref())?;
        set_string(env, &item, "Album", meta.album.as_deref())?;
        set_string(env, &item, "Genre", meta.genre.as_deref())?;
        set_string(env, &item, "ArtworkURL", meta.artwork_url.as_deref())?;
        env.set_object_array_element(&array, info.tracks.len() as jint, &*item)?;

        Ok(array)
    }

    fn tracks_result(env: &mut JNIEnv, info: Result<MediaInfo>) -> jobjectArray {
        let info = match info {
            Ok(info) => info,
            Err(err) => {
                log::error!("readTracksInfo: {}", err);
                return std::ptr::null_mut();
            }
        };
        match track_info_array(env, &info) {
            Ok(array) => JObject::from(array).into_raw(),
            Err(err) => {
                log::error!("Failed to build TrackInfo array: {}", err);
                std::ptr::null_mut()
            }
        }
    }

    fn descriptions_map<'local>(
        env: &mut JNIEnv<'local>,
        tracks: &[TrackDescription],
    ) -> jni::errors::Result<JObject<'local>> {
        let map = env.new_object("java/util/HashMap", "()V", &[])?;
        for track in tracks {
            let id = env.new_object("java/lang/Integer", "(I)V", &[JValue::Int(track.id)])?;
            let id = env.auto_local(id);
            let name = env.new_string(&track.name)?;
            let name = env.auto_local(name);
            let previous = env
                .call_method(
                    &map,
                    "put",
                    "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
                    &[JValue::Object(&id), JValue::Object(&name)],
                )?
                .l()?;
            env.delete_local_ref(previous)?;
        }
        Ok(map)
    }

    fn descriptions_result(env: &mut JNIEnv, tracks: Option<Vec<TrackDescription>>) -> jobject {
        let Some(tracks) = tracks else {
            return std::ptr::null_mut();
        };
        match descriptions_map(env, &tracks) {
            Ok(map) => map.into_raw(),
            Err(err) => {
                log::error!("Failed to build track map: {}", err);
                std::ptr::null_mut()
            }
        }
    }

    fn engine_string(env: &JNIEnv, value: Result<String>) -> jstring {
        match value.and_then(|s| string_to_jstring(env, &s)) {
            Ok(s) => s,
            Err(err) => {
                log::error!("FFI error: {}", err);
                std::ptr::null_mut()
            }
        }
    }

    fn jbool(value: bool) -> jboolean {
        if value {
            JNI_TRUE
        } else {
            JNI_FALSE
        }
    }

    /// Raw client reference of the attached surface view. Locks like
    /// `jni_LockAndGetAndroidSurface`.
    #[no_mangle]
    pub extern "C" fn jni_LockAndGetAndroidJavaSurface() -> jobject {
        SURFACE
            .lock_and_get_companion_raw()
            .and_then(|view| view.downcast_ref::<GlobalRef>().map(|r| r.as_obj().as_raw()))
            .unwrap_or(std::ptr::null_mut())
    }

    // Lifecycle

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_nativeInit(mut env: JNIEnv, thiz: JObject) {
        init_logging(false);
        if let Err(err) = native_init(&mut env, &thiz) {
            log::error!("nativeInit: {}", err);
            let _ = env.throw_new(INIT_EXCEPTION, format!("Unable to instantiate engine: {}", err));
        }
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_nativeDestroy(_env: JNIEnv, _thiz: JObject) {
        destroy_controller();
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_setEventHandler(
        mut env: JNIEnv,
        _thiz: JObject,
        handler: JObject,
    ) {
        if let Err(err) = set_event_handler(&mut env, &handler) {
            log::error!("setEventHandler: {}", err);
        }
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_detachEventHandler(env: JNIEnv, _thiz: JObject) {
        match bridge(&env) {
            Ok(bridge) => bridge.clear_observer(),
            Err(err) => log::error!("detachEventHandler: {}", err),
        }
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_attachSurface(
        mut env: JNIEnv,
        _thiz: JObject,
        surf: JObject,
        gui: JObject,
        width: jint,
        height: jint,
    ) {
        if let Err(err) = attach_surface(&mut env, &surf, &gui, width, height) {
            log::error!("attachSurface: {}", err);
        }
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_detachSurface(_env: JNIEnv, _thiz: JObject) {
        SURFACE.detach();
    }

    // Queue

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_readMedia(
        mut env: JNIEnv,
        _thiz: JObject,
        _instance: jlong,
        mrl: JString,
        no_video: jboolean,
    ) -> jint {
        let result = jstring_to_string(&mut env, &mrl)
            .and_then(|mrl| controller()?.read_media(&mrl, no_video != JNI_FALSE));
        match result {
            Ok(index) => index as jint,
            Err(err) => {
                log::error!("readMedia: {}", err);
                -1
            }
        }
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_playIndex(
        _env: JNIEnv,
        _thiz: JObject,
        _instance: jlong,
        position: jint,
    ) {
        to_code(controller().and_then(|c| c.play_index(position_arg(position))));
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_expandMedia(_env: JNIEnv, _thiz: JObject) -> jint {
        match controller().and_then(|c| c.expand_media()) {
            Ok(Some(index)) => index as jint,
            Ok(None) => -1,
            Err(err) => {
                log::error!("expandMedia: {}", err);
                -1
            }
        }
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_getMediaListItems(
        mut env: JNIEnv,
        _thiz: JObject,
        array_list: JObject,
    ) {
        let items = with_controller(Vec::new(), |c| c.media_list_items());
        for mrl in items {
            let result = env.new_string(&mrl).and_then(|s| {
                let s = env.auto_local(s);
                env.call_method(&array_list, "add", "(Ljava/lang/Object;)Z", &[JValue::Object(&s)])
            });
            if let Err(err) = result {
                log::error!("getMediaListItems: {}", err);
                return;
            }
        }
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_removeIndex(
        _env: JNIEnv,
        _thiz: JObject,
        _instance: jlong,
        position: jint,
    ) {
        to_code(controller().and_then(|c| c.remove_index(position_arg(position))));
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_next(_env: JNIEnv, _thiz: JObject) {
        to_code(controller().and_then(|c| c.next()));
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_previous(_env: JNIEnv, _thiz: JObject) {
        to_code(controller().and_then(|c| c.previous()));
    }

    // Media inspection

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_hasVideoTrack(
        mut env: JNIEnv,
        _thiz: JObject,
        _instance: jlong,
        file_location: JString,
    ) -> jboolean {
        let result = jstring_to_string(&mut env, &file_location)
            .and_then(|location| controller()?.has_video_track(&location));
        match result {
            Ok(has_video) => jbool(has_video),
            Err(err @ SessionError::ProbeOpen(_)) => {
                let _ = env.throw_new("java/io/IOException", err.to_string());
                JNI_FALSE
            }
            Err(SessionError::ProbeTimeout) => {
                log::warn!("hasVideoTrack: engine reported nothing in time");
                JNI_FALSE
            }
            Err(err) => {
                log::error!("hasVideoTrack: {}", err);
                JNI_FALSE
            }
        }
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_readTracksInfo(
        mut env: JNIEnv,
        _thiz: JObject,
        _instance: jlong,
        mrl: JString,
    ) -> jobjectArray {
        let info = jstring_to_string(&mut env, &mrl)
            .and_then(|mrl| controller()?.read_tracks_info(&mrl));
        tracks_result(&mut env, info)
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_readTracksInfoPosition(
        mut env: JNIEnv,
        _thiz: JObject,
        position: jint,
    ) -> jobjectArray {
        let info = controller().and_then(|c| c.read_tracks_info_at(position_arg(position)));
        tracks_result(&mut env, info)
    }

    // Transport

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_play(_env: JNIEnv, _thiz: JObject) {
        with_controller((), |c| c.play());
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_pause(_env: JNIEnv, _thiz: JObject) {
        with_controller((), |c| c.pause());
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_stop(_env: JNIEnv, _thiz: JObject) {
        with_controller((), |c| c.stop());
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_isPlaying(_env: JNIEnv, _thiz: JObject) -> jboolean {
        jbool(with_controller(false, |c| c.is_playing()))
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_isSeekable(_env: JNIEnv, _thiz: JObject) -> jboolean {
        jbool(with_controller(false, |c| c.is_seekable()))
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_getTime(_env: JNIEnv, _thiz: JObject) -> jlong {
        with_controller(None, |c| c.time()).unwrap_or(-1)
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_setTime(_env: JNIEnv, _thiz: JObject, time: jlong) {
        with_controller((), |c| c.set_time(time));
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_getPosition(_env: JNIEnv, _thiz: JObject) -> jfloat {
        with_controller(None, |c| c.position()).unwrap_or(-1.0)
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_setPosition(
        _env: JNIEnv,
        _thiz: JObject,
        position: jfloat,
    ) {
        with_controller((), |c| c.set_position(position));
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_getLength(_env: JNIEnv, _thiz: JObject) -> jlong {
        with_controller(None, |c| c.length()).unwrap_or(-1)
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_getRate(_env: JNIEnv, _thiz: JObject) -> jfloat {
        with_controller(1.0, |c| c.rate())
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_setRate(_env: JNIEnv, _thiz: JObject, rate: jfloat) {
        with_controller((), |c| c.set_rate(rate));
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_getVolume(_env: JNIEnv, _thiz: JObject) -> jint {
        with_controller(None, |c| c.volume()).unwrap_or(-1)
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_setVolume(
        _env: JNIEnv,
        _thiz: JObject,
        volume: jint,
    ) -> jint {
        to_code(controller().and_then(|c| c.set_volume(volume)))
    }

    // Tracks

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_getAudioTracksCount(
        _env: JNIEnv,
        _thiz: JObject,
    ) -> jint {
        with_controller(None, |c| c.audio_track_count()).unwrap_or(-1)
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_getAudioTrackDescription(
        mut env: JNIEnv,
        _thiz: JObject,
    ) -> jobject {
        let tracks = with_controller(None, |c| c.audio_track_descriptions());
        descriptions_result(&mut env, tracks)
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_getAudioTrack(_env: JNIEnv, _thiz: JObject) -> jint {
        with_controller(None, |c| c.audio_track()).unwrap_or(-1)
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_setAudioTrack(
        _env: JNIEnv,
        _thiz: JObject,
        index: jint,
    ) -> jint {
        to_code(controller().and_then(|c| c.set_audio_track(index)))
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_getVideoTracksCount(
        _env: JNIEnv,
        _thiz: JObject,
    ) -> jint {
        with_controller(None, |c| c.video_track_count()).unwrap_or(-1)
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_addSubtitleTrack(
        mut env: JNIEnv,
        _thiz: JObject,
        path: JString,
    ) -> jint {
        let result = jstring_to_string(&mut env, &path)
            .and_then(|path| controller()?.add_subtitle_track(&path));
        to_code(result)
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_getSpuTrackDescription(
        mut env: JNIEnv,
        _thiz: JObject,
    ) -> jobject {
        let tracks = with_controller(None, |c| c.spu_track_descriptions());
        descriptions_result(&mut env, tracks)
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_getSpuTrack(_env: JNIEnv, _thiz: JObject) -> jint {
        with_controller(None, |c| c.spu_track()).unwrap_or(-1)
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_setSpuTrack(
        _env: JNIEnv,
        _thiz: JObject,
        index: jint,
    ) -> jint {
        to_code(controller().and_then(|c| c.set_spu_track(index)))
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_getSpuTracksCount(
        _env: JNIEnv,
        _thiz: JObject,
    ) -> jint {
        with_controller(None, |c| c.spu_track_count()).unwrap_or(-1)
    }

    // Engine info

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_version(env: JNIEnv, _thiz: JObject) -> jstring {
        engine_string(&env, controller().and_then(|c| c.version()))
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_compiler(env: JNIEnv, _thiz: JObject) -> jstring {
        engine_string(&env, controller().and_then(|c| c.compiler()))
    }

    #[no_mangle]
    pub extern "system" fn Java_org_videolan_libvlc_LibVLC_changeset(env: JNIEnv, _thiz: JObject) -> jstring {
        engine_string(&env, controller().and_then(|c| c.changeset()))
    }
}
