//! Request DTOs.

use serde::Deserialize;

/// Query string carrying the page to return to after login.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackQuery {
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

impl CallbackQuery {
    /// The decoded callback, if one was given and is non-empty.
    pub fn callback(&self) -> Option<&str> {
        self.callback_url.as_deref().filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;

    fn parse(uri: &'static str) -> CallbackQuery {
        let Query(query) = Query::<CallbackQuery>::try_from_uri(&Uri::from_static(uri)).unwrap();
        query
    }

    #[test]
    fn callback_is_read_from_the_query() {
        assert_eq!(parse("/login?x=1&callbackUrl=%2Froles%2F7").callback(), Some("/roles/7"));
        assert_eq!(parse("/login?callbackUrl=%2Fsearch+all").callback(), Some("/search all"));
        assert_eq!(parse("/login?callbackUrl=").callback(), None);
        assert_eq!(parse("/login?other=1").callback(), None);
        assert_eq!(parse("/login").callback(), None);
    }
}
