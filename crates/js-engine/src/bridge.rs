//! Host functions exposed to guest code.
//!
//! The compiler's stylesheet importer checks the real filesystem while it
//! follows `@import` rules. The guest has no OS access of its own, so a
//! `compilerFs` object on the global scope offers three read-only
//! primitives:
//!
//! | function             | on failure                |
//! |----------------------|---------------------------|
//! | `fileExists(path)`   | returns `false`           |
//! | `readFile(path)`     | throws into the guest     |
//! | `realpath(path)`     | throws into the guest     |

use rquickjs::convert::Coerced;
use rquickjs::function::Opt;
use rquickjs::{Ctx, Exception, Function, Object};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Name of the global object holding the host functions.
pub const BRIDGE_GLOBAL: &str = "compilerFs";

/// Whether a path exists. Any stat failure, including an empty path, is `false`.
pub fn file_exists(path: &str) -> bool {
    !path.is_empty() && fs::metadata(path).is_ok()
}

/// Read a file as UTF-8 text.
pub fn read_file(path: &str) -> io::Result<String> {
    if path.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty path"));
    }
    fs::read_to_string(path)
}

/// Resolve symbolic links and return the absolute path.
pub fn realpath(path: &str) -> io::Result<PathBuf> {
    if path.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty path"));
    }
    fs::canonicalize(path)
}

/// Install `compilerFs` into the global scope of a context.
pub fn install<'js>(ctx: &Ctx<'js>) -> rquickjs::Result<()> {
    let compiler_fs = Object::new(ctx.clone())?;

    compiler_fs.set(
        "fileExists",
        Function::new(ctx.clone(), |path: Opt<Coerced<String>>| {
            path.0.map(|p| file_exists(&p.0)).unwrap_or(false)
        })?,
    )?;

    compiler_fs.set(
        "readFile",
        Function::new(
            ctx.clone(),
            |ctx: Ctx<'js>, path: Coerced<String>| -> rquickjs::Result<String> {
                read_file(&path.0).map_err(|e| {
                    Exception::throw_message(&ctx, &format!("readFile {:?}: {}", path.0, e))
                })
            },
        )?,
    )?;

    compiler_fs.set(
        "realpath",
        Function::new(
            ctx.clone(),
            |ctx: Ctx<'js>, path: Coerced<String>| -> rquickjs::Result<String> {
                realpath(&path.0)
                    .map(|p| p.to_string_lossy().into_owned())
                    .map_err(|e| {
                        Exception::throw_message(&ctx, &format!("realpath {:?}: {}", path.0, e))
                    })
            },
        )?,
    )?;

    ctx.globals().set(BRIDGE_GLOBAL, compiler_fs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rquickjs::{CatchResultExt, Context, Runtime};

    fn with_bridge<R>(f: impl FnOnce(Ctx<'_>) -> R) -> R {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            install(&ctx).unwrap();
            f(ctx)
        })
    }

    #[test]
    fn test_file_exists_never_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.scss");
        fs::write(&file, "$x: 1;").unwrap();

        assert!(file_exists(&file.to_string_lossy()));
        assert!(!file_exists(&dir.path().join("missing.scss").to_string_lossy()));
        assert!(!file_exists(""));
    }

    #[test]
    fn test_read_file_errors() {
        assert!(read_file("").is_err());
        assert!(read_file("/definitely/not/here.scss").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_realpath_resolves_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("real.scss");
        let link = dir.path().join("link.scss");
        fs::write(&target, "a{}").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let resolved = realpath(&link.to_string_lossy()).unwrap();
        assert_eq!(resolved, fs::canonicalize(&target).unwrap());
        assert!(resolved.is_absolute());
        assert!(realpath("").is_err());
        assert!(realpath(&dir.path().join("nope").to_string_lossy()).is_err());
    }

    #[test]
    fn test_guest_can_inspect_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("vars.scss");
        fs::write(&file, "$primary: red;").unwrap();
        let path = file.to_string_lossy().replace('\\', "/");

        with_bridge(|ctx| {
            let exists: bool = ctx
                .eval(format!("compilerFs.fileExists({:?})", path))
                .unwrap();
            assert!(exists);

            let missing: bool = ctx.eval("compilerFs.fileExists('')").unwrap();
            assert!(!missing);

            let no_arg: bool = ctx.eval("compilerFs.fileExists()").unwrap();
            assert!(!no_arg);

            let content: String = ctx
                .eval(format!("compilerFs.readFile({:?})", path))
                .unwrap();
            assert_eq!(content, "$primary: red;");
        });
    }

    #[test]
    fn test_guest_sees_exceptions() {
        with_bridge(|ctx| {
            let caught: String = ctx
                .eval(
                    r#"
                    (() => {
                      try { compilerFs.readFile(""); return "no error"; }
                      catch (e) { return "caught"; }
                    })()
                    "#,
                )
                .unwrap();
            assert_eq!(caught, "caught");

            let uncaught = ctx
                .eval::<String, _>("compilerFs.realpath('/definitely/not/here')")
                .catch(&ctx);
            assert!(uncaught.is_err());
        });
    }
}
