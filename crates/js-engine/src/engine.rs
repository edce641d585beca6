//! A single QuickJS instance loaded with the compiler.

use crate::bridge;
use crate::cache::CompilerCache;
use crate::error::{EngineError, EngineResult};
use crate::protocol::{JsRequest, JsResponse};
use rquickjs::{CatchResultExt, CaughtError, Context, Ctx, Function, Runtime};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

const DISPATCH_GLOBAL: &str = "__sfcDispatch";
const DISPATCH_SHIM: &str = include_str!("dispatch.js");

/// Something that can serve guest requests. Instances are single-threaded.
pub trait JsEngine {
    /// Call the service named in `request` and wait for its result.
    fn execute(&mut self, request: &JsRequest) -> EngineResult<JsResponse>;
}

/// Builds engines on the thread that will own them.
pub trait EngineFactory: Send + Sync {
    /// Create a ready-to-use engine.
    fn create(&self) -> EngineResult<Box<dyn JsEngine>>;
}

/// Extra setup run against every new context, before the compiler loads.
pub type EngineInit = Arc<dyn for<'js> Fn(&Ctx<'js>) -> rquickjs::Result<()> + Send + Sync>;

/// Resource limits applied to each runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineLimits {
    /// Heap limit in bytes.
    pub memory_limit: Option<usize>,
    /// Stack limit in bytes.
    pub max_stack_size: Option<usize>,
}

/// An engine backed by its own QuickJS runtime.
pub struct QuickJsEngine {
    context: Context,
    #[allow(dead_code)]
    runtime: Runtime,
}

impl QuickJsEngine {
    /// Create a runtime, install host functions, and evaluate the compiler.
    pub fn new(
        cache: &CompilerCache,
        inits: &[EngineInit],
        limits: EngineLimits,
    ) -> EngineResult<Self> {
        let runtime = Runtime::new().map_err(|e| EngineError::Init(e.to_string()))?;
        if let Some(limit) = limits.memory_limit {
            runtime.set_memory_limit(limit);
        }
        if let Some(size) = limits.max_stack_size {
            runtime.set_max_stack_size(size);
        }
        let context = Context::full(&runtime).map_err(|e| EngineError::Init(e.to_string()))?;

        context.with(|ctx| -> EngineResult<()> {
            let init = |e: CaughtError<'_>| EngineError::Init(e.to_string());
            bridge::install(&ctx).catch(&ctx).map_err(init)?;
            for hook in inits {
                hook(&ctx).catch(&ctx).map_err(init)?;
            }
            ctx.eval::<(), _>(DISPATCH_SHIM).catch(&ctx).map_err(init)?;
            cache.evaluate(&ctx)
        })?;

        Ok(Self { context, runtime })
    }
}

impl fmt::Debug for QuickJsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuickJsEngine").finish_non_exhaustive()
    }
}

impl JsEngine for QuickJsEngine {
    fn execute(&mut self, request: &JsRequest) -> EngineResult<JsResponse> {
        let args_json = serde_json::to_string(&request.args)
            .map_err(|e| EngineError::Marshal(e.to_string()))?;

        let result = self.context.with(|ctx| -> EngineResult<Value> {
            let marshal = |e: CaughtError<'_>| EngineError::Marshal(e.to_string());

            let dispatch: Function = ctx.globals().get(DISPATCH_GLOBAL)?;
            let args = ctx.json_parse(args_json).catch(&ctx).map_err(marshal)?;

            let value: rquickjs::Value = dispatch
                .call((request.service.as_str(), args))
                .catch(&ctx)
                .map_err(guest_error)?;
            let value = match value.clone().into_promise() {
                Some(promise) => promise
                    .finish::<rquickjs::Value>()
                    .catch(&ctx)
                    .map_err(guest_error)?,
                None => value,
            };

            match ctx.json_stringify(value).catch(&ctx).map_err(marshal)? {
                Some(json) => {
                    let json = json.to_string()?;
                    serde_json::from_str(&json).map_err(|e| EngineError::Marshal(e.to_string()))
                }
                None => Ok(Value::Null),
            }
        })?;

        Ok(JsResponse {
            id: request.id.clone(),
            result,
        })
    }
}

fn guest_error(err: CaughtError<'_>) -> EngineError {
    match err {
        CaughtError::Exception(exception) => {
            EngineError::Exception(exception.message().unwrap_or_else(|| exception.to_string()))
        }
        CaughtError::Error(error) => EngineError::Runtime(error.to_string()),
        thrown @ CaughtError::Value(_) => EngineError::Exception(thrown.to_string()),
    }
}

/// Creates [`QuickJsEngine`]s that share one compiled script.
#[derive(Clone)]
pub struct QuickJsFactory {
    cache: Arc<CompilerCache>,
    inits: Vec<EngineInit>,
    limits: EngineLimits,
}

impl QuickJsFactory {
    pub fn new(cache: Arc<CompilerCache>) -> Self {
        Self {
            cache,
            inits: Vec::new(),
            limits: EngineLimits::default(),
        }
    }

    /// Run `init` against each new context.
    pub fn with_init(mut self, init: EngineInit) -> Self {
        self.inits.push(init);
        self
    }

    pub fn with_limits(mut self, limits: EngineLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn cache(&self) -> &Arc<CompilerCache> {
        &self.cache
    }
}

impl fmt::Debug for QuickJsFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuickJsFactory")
            .field("cache", &self.cache.name())
            .field("inits", &self.inits.len())
            .field("limits", &self.limits)
            .finish()
    }
}

impl EngineFactory for QuickJsFactory {
    fn create(&self) -> EngineResult<Box<dyn JsEngine>> {
        Ok(Box::new(QuickJsEngine::new(
            &self.cache,
            &self.inits,
            self.limits,
        )?))
    }
}
