//! Path routing
//!
//! Decodes `/<action>/<title>` request paths into a [`Route`]. Titles are one or
//! more ASCII letters or digits. Percent-escapes in a request path are
//! resolved; beyond that nothing is trimmed or case-folded.

use percent_encoding::percent_decode_str;

use crate::errors::RouteMismatch;

/// A decoded wiki request: one variant per action, each carrying its title
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    View(String),
    Edit(String),
    Save(String),
    Search(String),
}

impl Route {
    /// Decode a request path, rejecting anything that is not exactly
    /// `/<action>/<title>`
    pub fn parse(path: &str) -> Result<Self, RouteMismatch> {
        let mismatch = || RouteMismatch(path.to_string());

        let rest = path.strip_prefix('/').ok_or_else(mismatch)?;
        let (action, token) = rest.split_once('/').ok_or_else(mismatch)?;
        if !is_valid_title(token) {
            return Err(mismatch());
        }

        let title = token.to_string();
        match action {
            "view" => Ok(Route::View(title)),
            "edit" => Ok(Route::Edit(title)),
            "save" => Ok(Route::Save(title)),
            "search" => Ok(Route::Search(title)),
            _ => Err(mismatch()),
        }
    }

    /// Decode a raw request path: percent-escapes are resolved first, then
    /// the result must satisfy [`Route::parse`]
    pub fn from_request_path(raw: &str) -> Result<Self, RouteMismatch> {
        let decoded = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| RouteMismatch(raw.to_string()))?;
        Self::parse(&decoded).map_err(|_| RouteMismatch(raw.to_string()))
    }

    pub fn action(&self) -> &'static str {
        match self {
            Route::View(_) => "view",
            Route::Edit(_) => "edit",
            Route::Save(_) => "save",
            Route::Search(_) => "search",
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Route::View(t) | Route::Edit(t) | Route::Save(t) | Route::Search(t) => t,
        }
    }

    /// Request path that decodes back to this route
    pub fn path(&self) -> String {
        format!("/{}/{}", self.action(), self.title())
    }
}

/// A title is a non-empty run of ASCII alphanumerics
pub fn is_valid_title(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_alphanumeric())
}
