//! Archive entries and path lookup.

/// One named blob from the model archive.
///
/// Entries are produced by an external archive reader. Path separators may
/// be `/` or `\` depending on the tool that wrote the archive, so lookups
/// accept either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub data: Vec<u8>,
}

impl Entry {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Finds an entry by exact path or its backslash-separated equivalent.
pub(crate) fn find<'a>(entries: &'a [Entry], name: &str) -> Option<&'a Entry> {
    let backslashed = name.replace('/', "\\");
    entries
        .iter()
        .find(|entry| entry.name == name || entry.name == backslashed)
}

/// Finds an entry whose forward-slash-normalized name matches `name`.
pub(crate) fn find_normalized<'a>(entries: &'a [Entry], name: &str) -> Option<&'a Entry> {
    entries
        .iter()
        .find(|entry| entry.name.replace('\\', "/") == name)
}

/// Joins a directory prefix and a relative name with `/`.
pub(crate) fn join(directory: &str, name: &str) -> String {
    if directory.is_empty() {
        name.to_owned()
    } else {
        format!("{directory}/{name}")
    }
}
