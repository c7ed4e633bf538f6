//! Query parameter storage.
//!
//! Query parameters are ordered and multi-valued: a name may appear several
//! times, and insertion order is preserved both across names and among the
//! values of one name. Most URLs carry few parameters, so pairs are stored
//! inline in a small vector.

use smallvec::SmallVec;

/// Maximum number of parameters stored inline (stack allocated).
const INLINE_PARAMS: usize = 4;

/// Ordered, multi-valued query parameters.
///
/// # Example
///
/// ```rust
/// use mosaic_router::QueryParams;
///
/// let mut params = QueryParams::new();
/// params.add("tag", "rust");
/// params.add("tag", "web");
/// params.add("page", "2");
///
/// assert_eq!(params.get("tag"), Some("rust"));
/// assert_eq!(params.get_all("tag").collect::<Vec<_>>(), vec!["rust", "web"]);
/// assert_eq!(params.to_query_string(), "tag=rust&tag=web&page=2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryParams {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl QueryParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw query string (without the leading `?`).
    ///
    /// Names and values are percent-decoded and `+` is read as a space.
    /// Pairs that fail to decode are kept verbatim.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode(name), decode(value))
            })
            .collect()
    }

    /// Appends a value, keeping any existing values for `name`.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Sets `name` to a single value.
    ///
    /// The first existing occurrence is replaced in place; later occurrences
    /// are removed. Without an existing occurrence the pair is appended.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.inner.iter().position(|(n, _)| *n == name) {
            Some(idx) => {
                self.inner[idx].1 = value;
                let mut seen = 0usize;
                self.inner.retain(|(n, _)| {
                    if *n != name {
                        return true;
                    }
                    seen += 1;
                    seen == 1
                });
            }
            None => self.inner.push((name, value)),
        }
    }

    /// Removes every value for `name`, returning how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.inner.len();
        self.inner.retain(|(n, _)| n != name);
        before - self.inner.len()
    }

    /// Returns the first value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value for `name` in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.inner
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if at least one value exists for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|(n, _)| n == name)
    }

    /// Returns the distinct parameter names in first-seen order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (name, _) in &self.inner {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of (name, value) pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over the pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Clears all parameters, retaining allocated capacity.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Appends every pair of `other`.
    pub fn extend_from(&mut self, other: &Self) {
        self.inner.extend(other.inner.iter().cloned());
    }

    /// Renders the parameters as a percent-encoded query string without the
    /// leading `?`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.inner
            .iter()
            .map(|(n, v)| {
                if v.is_empty() {
                    urlencoding::encode(n).into_owned()
                } else {
                    format!("{}={}", urlencoding::encode(n), urlencoding::encode(v))
                }
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).map_or(spaced.clone(), |s| s.into_owned())
}

impl<'a> IntoIterator for &'a QueryParams {
    type Item = (&'a str, &'a str);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, String)>,
        fn(&'a (String, String)) -> (&'a str, &'a str),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }
}

impl Extend<(String, String)> for QueryParams {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        self.inner.extend(iter);
    }
}
