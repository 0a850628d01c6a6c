use http::{Method, StatusCode};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::dispatcher::Filter;
use crate::logging::Logger;
use crate::server::{Request, ResponseWriter};

use super::not_found::NOT_FOUND_BODY;

/// Knobs for [`serve_static_with`].
#[derive(Debug, Clone, Default)]
pub struct StaticOptions {
    /// Serve for every method, not only `GET` and `HEAD`
    pub any_method: bool,
    /// File served instead of a 404 when the requested one is missing, e.g.
    /// `/index.html` for a single-page app
    pub try_files_then: Option<String>,
    /// Paths (after the prefix) starting with one of these pass through untouched
    pub skip_prefixes: Vec<String>,
}

#[derive(Debug)]
struct StaticDir {
    prefix: String,
    root: PathBuf,
    options: StaticOptions,
}

enum Lookup {
    File(PathBuf),
    Redirect(String),
}

/// `""` stays empty; anything else gets a leading `/` and loses trailing ones.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

impl StaticDir {
    /// Request path with the prefix stripped, `None` when it is not ours.
    fn relative<'p>(&self, path: &'p str) -> Option<&'p str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        if self
            .options
            .skip_prefixes
            .iter()
            .any(|skip| rest.starts_with(skip.as_str()))
        {
            return None;
        }
        Some(rest)
    }

    /// File under the root for `rel`. Parent or absolute components are refused.
    fn map_path(&self, rel: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for component in Path::new(rel.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(path)
    }

    fn lookup(&self, req: &Request, rel: &str) -> io::Result<Lookup> {
        let path = self
            .map_path(rel)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "path escapes root"))?;
        let meta = fs::metadata(&path)?;
        if !meta.is_dir() {
            return Ok(Lookup::File(path));
        }

        if !req.path().ends_with('/') {
            let location = match req.query() {
                Some(query) => format!("{}/?{query}", req.path()),
                None => format!("{}/", req.path()),
            };
            return Ok(Lookup::Redirect(location));
        }
        let index = path.join("index.html");
        if fs::metadata(&index)?.is_file() {
            Ok(Lookup::File(index))
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "directory has no index.html"))
        }
    }

    fn fallback(&self) -> io::Result<PathBuf> {
        let Some(fallback) = &self.options.try_files_then else {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        };
        let path = self
            .map_path(fallback)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "path escapes root"))?;
        if fs::metadata(&path)?.is_file() {
            Ok(path)
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "fallback is not a file"))
        }
    }

    fn serve(&self, req: &Request, rw: &ResponseWriter, logger: Option<&dyn Logger>) {
        if !self.options.any_method && !matches!(*req.method(), Method::GET | Method::HEAD) {
            return;
        }
        let Some(rel) = self.relative(req.path()) else {
            return;
        };

        let file = match self.lookup(req, rel) {
            Ok(Lookup::Redirect(location)) => {
                rw.set_header_str("location", &location);
                rw.write_header(StatusCode::FOUND);
                return;
            }
            Ok(Lookup::File(path)) => Ok(path),
            Err(err) => self.fallback().map_err(|_| err),
        };

        let read = file.and_then(|path| fs::read(&path).map(|bytes| (path, bytes)));
        match read {
            Ok((path, bytes)) => {
                let mime = mime_guess::from_path(&path).first_or_octet_stream();
                debug!(file = %path.display(), bytes = bytes.len(), "Serving static file");
                rw.set_header_str("content-type", mime.as_ref());
                rw.write_header(StatusCode::OK);
                if *req.method() != Method::HEAD {
                    rw.write(&bytes);
                }
            }
            Err(err) => {
                let message = format!("[STATIC] {rel}, {err}");
                match logger {
                    Some(logger) => logger.info(&message),
                    None => debug!(file = rel, error = %err, "Static file not served"),
                }
                rw.set_header_str("content-type", "text/plain; charset=utf-8");
                rw.write_header(StatusCode::NOT_FOUND);
                rw.write(NOT_FOUND_BODY.as_bytes());
            }
        }
    }
}

/// Filter serving files from `directory` for request paths under `prefix`.
///
/// See [`serve_static_with`].
///
/// # Errors
///
/// `directory` cannot be resolved to an existing path.
pub fn serve_static(prefix: &str, directory: impl AsRef<Path>) -> io::Result<Filter> {
    serve_static_with(prefix, directory, StaticOptions::default())
}

/// Filter serving files from `directory` for request paths under `prefix`.
///
/// Only `GET` and `HEAD` are served unless [`StaticOptions::any_method`] is set.
/// Requests outside the prefix pass through. Under the prefix a found file is
/// written with a content type guessed from its extension, a directory is
/// redirected to its `/`-terminated form and then served by its `index.html`,
/// and anything missing is a `404` (or the [`StaticOptions::try_files_then`]
/// file). `..` components never leave the directory.
///
/// # Errors
///
/// `directory` cannot be resolved to an existing path.
pub fn serve_static_with(
    prefix: &str,
    directory: impl AsRef<Path>,
    options: StaticOptions,
) -> io::Result<Filter> {
    let dir = Arc::new(StaticDir {
        prefix: normalize_prefix(prefix),
        root: fs::canonicalize(directory)?,
        options,
    });
    Ok(Filter::new(
        move |req: Arc<Request>, rw: Arc<ResponseWriter>, logger: Option<Arc<dyn Logger>>| {
            dir.serve(&req, &rw, logger.as_deref());
        },
    )
    .named("serve_static"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(prefix: &str) -> StaticDir {
        StaticDir {
            prefix: normalize_prefix(prefix),
            root: PathBuf::from("/srv/www"),
            options: StaticOptions {
                skip_prefixes: vec!["/api".into()],
                ..StaticOptions::default()
            },
        }
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("assets"), "/assets");
        assert_eq!(normalize_prefix("/assets/"), "/assets");
    }

    #[test]
    fn test_relative_path() {
        let d = dir("/assets");
        assert_eq!(d.relative("/assets/app.js"), Some("/app.js"));
        assert_eq!(d.relative("/assets"), Some(""));
        assert_eq!(d.relative("/assetsx/app.js"), None);
        assert_eq!(d.relative("/other"), None);
        assert_eq!(dir("").relative("/api/users"), None);
    }

    #[test]
    fn test_map_path_refuses_traversal() {
        let d = dir("");
        assert_eq!(d.map_path("/css//site.css"), Some(PathBuf::from("/srv/www/css/site.css")));
        assert_eq!(d.map_path("/./a.txt"), Some(PathBuf::from("/srv/www/a.txt")));
        assert_eq!(d.map_path("/../etc/passwd"), None);
    }
}
