//! Process-wide bytecode cache for the compiler script.

use crate::error::{EngineError, EngineResult};
use once_cell::sync::OnceCell;
use rquickjs::{qjs, CaughtError, Context, Ctx, Runtime, Value};
use std::ffi::CString;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// The compiler script together with its lazily compiled bytecode.
///
/// Compilation happens at most once no matter how many engines ask for it
/// concurrently. A failure is cached as well: the script is part of the
/// build, so a compile error will not go away on retry.
#[derive(Debug)]
pub struct CompilerCache {
    name: String,
    source: Arc<str>,
    bytecode: OnceCell<EngineResult<Arc<[u8]>>>,
    compilations: AtomicUsize,
}

impl CompilerCache {
    /// Create a cache for a script held in memory.
    pub fn new(name: impl Into<String>, source: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            bytecode: OnceCell::new(),
            compilations: AtomicUsize::new(0),
        }
    }

    /// Create a cache for a script on disk.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, source))
    }

    /// Module name used when compiling the script.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether compilation has been attempted.
    pub fn is_compiled(&self) -> bool {
        self.bytecode.get().is_some()
    }

    /// How many times the script has been compiled.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::SeqCst)
    }

    /// The compiled bytecode, compiling on first use.
    pub fn bytecode(&self) -> EngineResult<Arc<[u8]>> {
        self.bytecode.get_or_init(|| self.compile()).clone()
    }

    fn compile(&self) -> EngineResult<Arc<[u8]>> {
        let started = Instant::now();
        self.compilations.fetch_add(1, Ordering::SeqCst);

        let fail = |message: String| EngineError::BytecodeCompile {
            name: self.name.clone(),
            message,
        };

        let runtime = Runtime::new().map_err(|e| fail(e.to_string()))?;
        let context = Context::full(&runtime).map_err(|e| fail(e.to_string()))?;
        let bytes = context
            .with(|ctx| {
                let function = compile_global(&ctx, &self.name, &self.source)
                    .map_err(|e| e.to_string())?;
                write_bytecode(&ctx, &function).map_err(|e| e.to_string())
            })
            .map_err(fail);

        match bytes {
            Ok(bytes) => {
                info!(
                    name = %self.name,
                    size = bytes.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "compiled script to bytecode"
                );
                Ok(Arc::from(bytes))
            }
            Err(err) => {
                error!(name = %self.name, "{}", err);
                Err(err)
            }
        }
    }

    /// Load and run the cached bytecode inside `ctx`.
    ///
    /// The script runs as global code, so top-level `var` declarations and
    /// assignments to `this` land on the global object.
    pub(crate) fn evaluate(&self, ctx: &Ctx<'_>) -> EngineResult<()> {
        let bytes = self.bytecode()?;
        run_bytecode(ctx, &bytes).map_err(|e| EngineError::Init(e.to_string()))
    }
}

/// Compile `source` as a global script without running it.
fn compile_global<'js>(
    ctx: &Ctx<'js>,
    name: &str,
    source: &str,
) -> Result<Value<'js>, CaughtError<'js>> {
    let source = CString::new(source).map_err(|e| CaughtError::Error(e.into()))?;
    let name = CString::new(name).map_err(|e| CaughtError::Error(e.into()))?;
    let flags = qjs::JS_EVAL_TYPE_GLOBAL | qjs::JS_EVAL_FLAG_COMPILE_ONLY;

    // SAFETY: both strings are NUL terminated and outlive the call. The
    // returned value is owned and handed to `Value`, which frees it on drop.
    let function = unsafe {
        let raw = qjs::JS_Eval(
            ctx.as_raw().as_ptr(),
            source.as_ptr(),
            source.as_bytes().len() as _,
            name.as_ptr(),
            flags as i32,
        );
        Value::from_raw(ctx.clone(), raw)
    };
    if function.is_exception() {
        return Err(pending_exception(ctx));
    }
    Ok(function)
}

fn write_bytecode<'js>(
    ctx: &Ctx<'js>,
    function: &Value<'js>,
) -> Result<Vec<u8>, CaughtError<'js>> {
    let raw_ctx = ctx.as_raw().as_ptr();
    let mut len: qjs::size_t = 0;

    // SAFETY: `function` belongs to `ctx`. The buffer is copied out before
    // being released with the context allocator that produced it.
    unsafe {
        let buf = qjs::JS_WriteObject(
            raw_ctx,
            &mut len,
            function.as_raw(),
            qjs::JS_WRITE_OBJ_BYTECODE as i32,
        );
        if buf.is_null() {
            return Err(pending_exception(ctx));
        }
        let bytes = std::slice::from_raw_parts(buf, len as usize).to_vec();
        qjs::js_free(raw_ctx, buf.cast());
        Ok(bytes)
    }
}

/// Take the exception QuickJS left on `ctx` after a failed raw call.
fn pending_exception<'js>(ctx: &Ctx<'js>) -> CaughtError<'js> {
    CaughtError::from_error(ctx, rquickjs::Error::Exception)
}

fn run_bytecode<'js>(ctx: &Ctx<'js>, bytes: &[u8]) -> Result<(), CaughtError<'js>> {
    let raw_ctx = ctx.as_raw().as_ptr();

    // SAFETY: the bytes were produced by `write_bytecode` in this process,
    // against the same QuickJS build that reads them. `JS_EvalFunction`
    // takes ownership of the function object.
    let result = unsafe {
        let function = qjs::JS_ReadObject(
            raw_ctx,
            bytes.as_ptr(),
            bytes.len() as _,
            qjs::JS_READ_OBJ_BYTECODE as i32,
        );
        if qjs::JS_IsException(function) {
            return Err(pending_exception(ctx));
        }
        Value::from_raw(ctx.clone(), qjs::JS_EvalFunction(raw_ctx, function))
    };
    if result.is_exception() {
        return Err(pending_exception(ctx));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FAKE_COMPILER;
    use pretty_assertions::assert_eq;
    use std::thread;

    #[test]
    fn test_compiles_once_under_contention() {
        let cache = Arc::new(CompilerCache::new("compiler.js", FAKE_COMPILER));
        assert!(!cache.is_compiled());

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.bytecode().unwrap())
            })
            .collect();
        let results: Vec<Arc<[u8]>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(cache.compilations(), 1);
        assert!(cache.is_compiled());
        for bytes in &results[1..] {
            assert_eq!(bytes.as_ref(), results[0].as_ref());
        }
    }

    #[test]
    fn test_compile_failure_is_fatal_and_cached() {
        let cache = CompilerCache::new("broken.js", "export const = ;");
        let err = cache.bytecode().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("broken.js"));

        assert!(cache.bytecode().is_err());
        assert_eq!(cache.compilations(), 1);
    }

    #[test]
    fn test_evaluate_defines_globals() {
        let cache = CompilerCache::new("compiler.js", FAKE_COMPILER);
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            cache.evaluate(&ctx).unwrap();
            let kind: String = ctx.eval("typeof globalThis.sfc.vue.compileSFC").unwrap();
            assert_eq!(kind, "function");
        });
    }

    #[test]
    fn test_script_bundle_conventions_reach_the_global_object() {
        let cache = CompilerCache::new(
            "bundle.js",
            "(function (root) { root.viaThis = 1; })(this);\nvar viaVar = 2;\nfunction viaDecl() { return 3; }",
        );
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            cache.evaluate(&ctx).unwrap();
            let sum: i32 = ctx
                .eval("globalThis.viaThis + globalThis.viaVar + globalThis.viaDecl()")
                .unwrap();
            assert_eq!(sum, 6);
        });
    }

    #[test]
    fn test_top_level_throw_is_not_fatal() {
        let cache = CompilerCache::new("boom.js", "var before = 1;\nthrow new Error(\"boom\");");
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            let err = cache.evaluate(&ctx).unwrap_err();
            assert!(matches!(err, EngineError::Init(_)));
            assert!(!err.is_fatal());
            assert!(err.to_string().contains("boom"));
        });
        assert!(cache.bytecode().is_ok());
        assert_eq!(cache.compilations(), 1);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compiler.js");
        std::fs::write(&path, FAKE_COMPILER).unwrap();

        let cache = CompilerCache::from_file(&path).unwrap();
        assert_eq!(cache.name(), "compiler.js");
        assert!(cache.bytecode().is_ok());
        assert!(CompilerCache::from_file(&dir.path().join("missing.js")).is_err());
    }
}
