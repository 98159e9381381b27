use url::Url;

/// Snapshot of the page location the viewer was opened with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Scheme, authority and path, without query or fragment.
    pub base: String,
    /// Decoded query pairs, in order of appearance.
    pub query: Vec<(String, String)>,
    /// Fragment without the leading `#`, still percent-escaped.
    pub fragment: String,
}

/// Source of the current page location.
pub trait LocationProvider {
    fn location(&self) -> Location;
}

impl LocationProvider for Location {
    fn location(&self) -> Location {
        self.clone()
    }
}

impl Location {
    pub fn parse(href: &str) -> Result<Self, url::ParseError> {
        let mut url = Url::parse(href)?;
        let query = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let fragment = url.fragment().unwrap_or_default().to_string();
        url.set_query(None);
        url.set_fragment(None);
        Ok(Self {
            base: url.to_string(),
            query,
            fragment,
        })
    }

    /// First value of `key`, if present.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
