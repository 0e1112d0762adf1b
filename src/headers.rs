//! Ordered header lists as exchanged with the connection.
use std::{fmt, iter, slice, vec};

use ntex_bytes::ByteString;
use ntex_http::HeaderMap;

pub const SCHEME: &str = ":scheme";
pub const AUTHORITY: &str = ":authority";
pub const METHOD: &str = ":method";
pub const PATH: &str = ":path";
pub const PROTOCOL: &str = ":protocol";
pub const STATUS: &str = ":status";
pub const CONTENT_LENGTH: &str = "content-length";

/// Leading character of pseudo-header names.
pub const PSEUDO_SIGIL: char = ':';

/// Ordered sequence of `(name, value)` pairs.
///
/// Duplicates are allowed and insertion order is preserved, this is the form
/// header blocks take after decompression and before compression.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HeaderList(Vec<(ByteString, ByteString)>);

impl HeaderList {
    pub fn new() -> Self {
        HeaderList(Vec::new())
    }

    pub fn with_capacity(cap: usize) -> Self {
        HeaderList(Vec::with_capacity(cap))
    }

    /// Append a field, existing fields with the same name are kept.
    pub fn add<K, V>(&mut self, name: K, value: V)
    where
        ByteString: From<K> + From<V>,
    {
        self.0.push((ByteString::from(name), ByteString::from(value)));
    }

    /// Builder form of `add`
    pub fn field<K, V>(mut self, name: K, value: V) -> Self
    where
        ByteString: From<K> + From<V>,
    {
        self.add(name, value);
        self
    }

    /// First value for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| &**k == name)
            .map(|(_, v)| &**v)
    }

    /// All values for `name`, in insertion order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| &**k == name)
            .map(|(_, v)| &**v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, (ByteString, ByteString)> {
        self.0.iter()
    }

    /// Returns true if any name carries the pseudo-header sigil
    pub fn has_pseudo(&self) -> bool {
        self.0.iter().any(|(k, _)| k.starts_with(PSEUDO_SIGIL))
    }
}

impl fmt::Debug for HeaderList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|(k, v)| (&**k, &**v)))
            .finish()
    }
}

impl IntoIterator for HeaderList {
    type Item = (ByteString, ByteString);
    type IntoIter = vec::IntoIter<(ByteString, ByteString)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a HeaderList {
    type Item = &'a (ByteString, ByteString);
    type IntoIter = slice::Iter<'a, (ByteString, ByteString)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderList
where
    ByteString: From<K> + From<V>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        HeaderList(
            iter.into_iter()
                .map(|(k, v)| (ByteString::from(k), ByteString::from(v)))
                .collect(),
        )
    }
}

impl<'a> From<&'a [(&'a str, &'a str)]> for HeaderList {
    fn from(src: &'a [(&'a str, &'a str)]) -> Self {
        src.iter().copied().collect()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for HeaderList {
    fn from(src: [(&str, &str); N]) -> Self {
        src.into_iter().collect()
    }
}

impl From<&HeaderMap> for HeaderList {
    /// Fields are grouped by name, values keep their order within a name.
    fn from(map: &HeaderMap) -> Self {
        let mut list = HeaderList::with_capacity(map.len());
        for (name, value) in map.iter() {
            if let Ok(value) = value.to_str() {
                list.add(name.as_str(), value);
            } else {
                log::debug!("skipping non-utf8 header value for {:?}", name);
            }
        }
        list
    }
}

/// Protocol-reserved fields presented ahead of ordinary ones.
///
/// Neither list is deduplicated or reordered, the merged sequence is
/// `pseudo ++ fields`.
#[derive(Clone, Debug)]
pub struct Merged {
    pseudo: HeaderList,
    fields: HeaderList,
}

impl Merged {
    pub fn new(pseudo: HeaderList, fields: HeaderList) -> Self {
        Merged { pseudo, fields }
    }

    pub fn len(&self) -> usize {
        self.pseudo.len() + self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pseudo.is_empty() && self.fields.is_empty()
    }

    pub fn iter(
        &self,
    ) -> iter::Chain<slice::Iter<'_, (ByteString, ByteString)>, slice::Iter<'_, (ByteString, ByteString)>>
    {
        self.pseudo.iter().chain(self.fields.iter())
    }
}

impl From<Merged> for HeaderList {
    fn from(merged: Merged) -> Self {
        let Merged {
            pseudo: HeaderList(mut list),
            fields,
        } = merged;
        list.extend(fields);
        HeaderList(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_keep_order() {
        let mut list = HeaderList::new();
        list.add("accept", "text/html");
        list.add("x-trace", "a");
        list.add("accept", "image/png");

        assert_eq!(list.len(), 3);
        assert_eq!(list.get("accept"), Some("text/html"));
        assert_eq!(
            list.get_all("accept").collect::<Vec<_>>(),
            vec!["text/html", "image/png"]
        );
        assert_eq!(list.get("missing"), None);
    }

    #[test]
    fn merge_puts_pseudo_first() {
        let pseudo = HeaderList::from([(STATUS, "200"), (CONTENT_LENGTH, "5")]);
        let fields = HeaderList::from([("content-type", "text/plain"), (CONTENT_LENGTH, "5")]);

        let merged = Merged::new(pseudo, fields);
        assert_eq!(merged.len(), 4);

        let list = HeaderList::from(merged);
        let names: Vec<&str> = list.iter().map(|(k, _)| &**k).collect();
        assert_eq!(
            names,
            vec![STATUS, CONTENT_LENGTH, "content-type", CONTENT_LENGTH]
        );
    }

    #[test]
    fn merge_empty() {
        let merged = Merged::new(HeaderList::new(), HeaderList::new());
        assert!(merged.is_empty());
        assert!(HeaderList::from(merged).is_empty());
    }

    #[test]
    fn pseudo_detection() {
        assert!(HeaderList::from([(PATH, "/")]).has_pseudo());
        assert!(!HeaderList::from([("accept", "*/*")]).has_pseudo());
    }
}
