use std::fmt;
use std::str;

use crate::util::compare_lowercase_ascii;

/// Ordered multimap of header name/value pairs.
///
/// Names keep the casing they were given, lookups are case insensitive.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<u8>)>,
}

impl Headers {
    pub fn new() -> Self {
        Headers::default()
    }

    /// Append a header. Existing headers of the same name are kept.
    pub fn append(&mut self, name: impl Into<String>, value: impl AsRef<[u8]>) {
        self.entries.push((name.into(), value.as_ref().to_vec()));
    }

    /// First value for `name` as a string, if it is valid utf-8.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_raw(name).and_then(|v| str::from_utf8(v).ok())
    }

    /// First value for `name`.
    pub fn get_raw(&self, name: &str) -> Option<&[u8]> {
        self.get_all(name).next()
    }

    /// All values for `name` in insertion order.
    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a [u8]> + 'a {
        let name = name.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(move |(n, _)| compare_lowercase_ascii(n, &name))
            .map(|(_, v)| v.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_raw(name).is_some()
    }

    /// Iterate the headers in insertion order with the original name casing.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: Into<String>,
    V: AsRef<[u8]>,
{
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (n, v) in iter {
            headers.append(n, v);
        }
        headers
    }
}

impl<N, V, const L: usize> From<[(N, V); L]> for Headers
where
    N: Into<String>,
    V: AsRef<[u8]>,
{
    fn from(value: [(N, V); L]) -> Self {
        value.into_iter().collect()
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut m = f.debug_map();
        for (name, value) in self.iter() {
            match str::from_utf8(value) {
                Ok(v) => m.entry(&name, &v),
                Err(_) => m.entry(&name, &value),
            };
        }
        m.finish()
    }
}
