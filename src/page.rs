use std::path::{Path, PathBuf};

use html::Document;
use tracing::{debug, info, span, Level};
use url::Url;

use crate::error::{Error, Result};
use crate::hook::PostRenderHook;

pub struct Page {
    url: Url,
    dom: Document,
    ready: bool,
}

impl Page {
    /// Loads and parses a page from a local path, a `file://` URL or an `http(s)://` URL
    pub fn load(source: &str) -> Result<Self> {
        let url = resolve_source(source)?;
        let text = Page::get_text_resource(&url)?;
        Self::from_html(&text, url)
    }

    pub fn from_html(text: &str, url: Url) -> Result<Self> {
        let dom = html::parse_document(text).map_err(|error| Error::Parse {
            source_name: url.to_string(),
            error,
        })?;
        Ok(Self::from_dom(dom, url))
    }

    pub fn from_dom(dom: Document, url: Url) -> Self {
        Self {
            url,
            dom,
            ready: false,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn dom(&self) -> &Document {
        &self.dom
    }

    /// Runs each hook once, in order. Later calls do nothing.
    pub fn run_hooks(&mut self, hooks: &[&dyn PostRenderHook]) {
        if self.ready {
            debug!(url = %self.url, "Hooks already ran");
            return;
        }
        self.ready = true;
        for hook in hooks {
            let span = span!(Level::DEBUG, "Running hook", "{}", hook.name());
            let _enter = span.enter();
            hook.on_ready(&mut self.dom);
        }
    }

    pub fn render(&self) -> String {
        self.dom.render()
    }

    /// The file this page was read from, if it is local
    pub fn local_path(&self) -> Option<PathBuf> {
        if self.url.scheme() == "file" {
            self.url.to_file_path().ok()
        } else {
            None
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let span = span!(Level::DEBUG, "Saving result", "{}", path.display());
        let _enter = span.enter();
        std::fs::write(path, self.render()).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!("Wrote {}", path.display());
        Ok(())
    }

    fn get_text_resource(url: &Url) -> Result<String> {
        let span = span!(Level::DEBUG, "Loading resource", "{}", url);
        let _enter = span.enter();
        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|_| Error::Usage(format!("not a local file: {}", url)))?;
            std::fs::read_to_string(&path).map_err(|source| Error::Io {
                path: path.display().to_string(),
                source,
            })
        } else {
            Ok(reqwest::blocking::get(url.as_str())?
                .error_for_status()?
                .text()?)
        }
    }
}

/// Turns a command line input into a URL; anything without a known scheme is a path
pub fn resolve_source(source: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(source) {
        if matches!(url.scheme(), "file" | "http" | "https") {
            return Ok(url);
        }
    }
    let path = Path::new(source);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|source| Error::Io {
                path: ".".to_string(),
                source,
            })?
            .join(path)
    };
    Url::from_file_path(&path).map_err(|_| Error::Usage(format!("not a usable path: {}", source)))
}
