//! The `Model.key` container header.
//!
//! Every directory node of the archive stores its payload behind a fixed
//! header: open magic, two format version pairs, an offset sextet locating
//! the model block and the UTF-16 string pool, the loader signatures that
//! select a decoder, and a closing magic at the tail offset. After header
//! decode the cursor sits at the model block, where the dispatched decoder
//! takes over.

use modelkey_buffers::Reader;

use crate::entry::{self, Entry};
use crate::record::Record;
use crate::registry;
use crate::ModelError;

const OPEN_MAGIC: &[u8] = b"ML\0MODEL";
const CLOSE_MAGIC: &[u8] = b"LEDOM\0LM";

/// One decoded container header plus the cursor over its model block.
///
/// Constructed once per directory node; header fields never change after
/// construction, only the cursor position advances as the node's decoder
/// consumes payload fields.
pub struct ModelHeader<'a> {
    entries: &'a [Entry],
    directory: String,
    pub version_written: u32,
    pub version_readable: u32,
    pub model_signature: String,
    pub model_version_written: u32,
    pub model_version_readable: u32,
    pub loader_signature: String,
    pub loader_signature_alt: String,
    pub assembly_name: Option<String>,
    pub strings: Vec<String>,
    pub reader: Reader<'a>,
}

fn ascii_trimmed(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    bytes[..end].iter().map(|b| *b as char).collect()
}

impl<'a> ModelHeader<'a> {
    /// Decodes the header of one directory node.
    pub fn parse(
        entries: &'a [Entry],
        directory: String,
        data: &'a [u8],
    ) -> Result<ModelHeader<'a>, ModelError> {
        let mut reader = Reader::new(data);
        reader.expect(OPEN_MAGIC)?;
        let version_written = reader.u32()?;
        let version_readable = reader.u32()?;

        let model_block_offset = reader.u64()?;
        let _model_block_size = reader.u64()?;
        let string_table_offset = reader.u64()?;
        let string_table_size = reader.u64()?;
        let string_chars_offset = reader.u64()?;
        let _string_chars_size = reader.u64()?;
        let model_signature = ascii_trimmed(reader.bytes(8)?);
        let model_version_written = reader.u32()?;
        let model_version_readable = reader.u32()?;
        let loader_signature = ascii_trimmed(reader.bytes(24)?);
        let loader_signature_alt = ascii_trimmed(reader.bytes(24)?);
        let tail_offset = reader.u64()?;
        let _tail_limit = reader.u64()?;
        let assembly_name_offset = reader.u64()?;
        let assembly_name_size = reader.u32()?;

        let mut strings = Vec::new();
        if string_table_offset != 0 && string_chars_offset != 0 {
            reader.set_position(string_table_offset as usize);
            let string_count = (string_table_size >> 3) as usize;
            // The declared table size is untrusted: cap the preallocation at
            // what the buffer can actually hold and let the reads hit EOF.
            let mut byte_sizes = Vec::with_capacity(string_count.min(reader.remaining() / 8));
            let mut previous_end = 0u64;
            for _ in 0..string_count {
                let end = reader.u64()?;
                let size = end.checked_sub(previous_end).ok_or_else(|| {
                    ModelError::Format("string table offsets are not cumulative".to_owned())
                })?;
                byte_sizes.push(size);
                previous_end = end;
            }
            reader.set_position(string_chars_offset as usize);
            for size in byte_sizes {
                let units = reader.u16s((size >> 1) as usize)?;
                let text = String::from_utf16(&units)
                    .map_err(|_| ModelError::Format("invalid UTF-16 string".to_owned()))?;
                strings.push(text);
            }
        }

        let assembly_name = if assembly_name_offset != 0 {
            reader.set_position(assembly_name_offset as usize);
            Some(ascii_trimmed(reader.bytes(assembly_name_size as usize)?))
        } else {
            None
        };

        reader.set_position(tail_offset as usize);
        reader.expect(CLOSE_MAGIC)?;

        reader.set_position(model_block_offset as usize);
        Ok(ModelHeader {
            entries,
            directory,
            version_written,
            version_readable,
            model_signature,
            model_version_written,
            model_version_readable,
            loader_signature,
            loader_signature_alt,
            assembly_name,
            strings,
            reader,
        })
    }

    /// Directory path of this node inside the archive.
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// Reads an i32 string-pool id and resolves it. Negative ids are a
    /// format error here; use [`ModelHeader::opt_string`] where the field
    /// is optional.
    pub fn string(&mut self) -> Result<String, ModelError> {
        let id = self.reader.i32()?;
        self.lookup_string(id)
    }

    /// Reads an i32 string-pool id, mapping negative ids to `None`.
    pub fn opt_string(&mut self) -> Result<Option<String>, ModelError> {
        let id = self.reader.i32()?;
        if id < 0 {
            return Ok(None);
        }
        self.lookup_string(id).map(Some)
    }

    pub(crate) fn lookup_string(&self, id: i32) -> Result<String, ModelError> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.strings.get(i))
            .cloned()
            .ok_or_else(|| ModelError::Format(format!("string id {id} out of range")))
    }

    /// Opens a child sub-model at `<dir>/<name>/Model.key` and dispatches it
    /// through the component catalog. A missing entry is `None`, not an
    /// error; callers treat absent optional children as absent.
    pub fn open(&self, name: &str) -> Result<Option<Record>, ModelError> {
        open_model(self.entries, &self.directory, name)
    }

    /// Opens a raw sibling blob at `<dir>/<name>` without dispatching.
    pub fn open_binary(&self, name: &str) -> Option<Reader<'a>> {
        let path = entry::join(&self.directory, name);
        entry::find(self.entries, &path).map(|entry| Reader::new(&entry.data))
    }

    /// Opens `<dir>/<name>` as UTF-8 text.
    pub fn open_text(&self, name: &str) -> Option<String> {
        open_text(self.entries, &self.directory, name)
    }
}

/// Opens and dispatches a directory node relative to `directory`.
pub(crate) fn open_model(
    entries: &[Entry],
    directory: &str,
    name: &str,
) -> Result<Option<Record>, ModelError> {
    let path = entry::join(directory, name);
    let key = format!("{path}/Model.key");
    let Some(found) = entry::find(entries, &key) else {
        return Ok(None);
    };
    let mut header = ModelHeader::parse(entries, path.clone(), &found.data)?;
    let signature = header.loader_signature.clone();
    let body = registry::create(&signature, &mut header)?;
    let kind = body
        .resolved_kind()
        .map(str::to_owned)
        .unwrap_or(signature);
    Ok(Some(Record {
        kind,
        name: path,
        body,
    }))
}

pub(crate) fn open_binary<'a>(
    entries: &'a [Entry],
    directory: &str,
    name: &str,
) -> Option<Reader<'a>> {
    let path = entry::join(directory, name);
    entry::find(entries, &path).map(|entry| Reader::new(&entry.data))
}

pub(crate) fn open_text(entries: &[Entry], directory: &str, name: &str) -> Option<String> {
    let path = entry::join(directory, name);
    let found = entry::find_normalized(entries, &path)?;
    String::from_utf8(found.data.clone()).ok()
}

/// Builds a syntactically valid `Model.key` byte image for unit tests.
/// Layout: 156-byte header, then model block, string table, chars, tail.
#[cfg(test)]
pub(crate) fn build_model_key(
    loader_signature: &str,
    model_version: u32,
    strings: &[&str],
    payload: &[u8],
) -> Vec<u8> {
    let header_len = 156u64;
    let model_offset = header_len;
    let table_offset = model_offset + payload.len() as u64;
    let table_size = 8 * strings.len() as u64;
    let chars_offset = table_offset + table_size;
    let chars_size: u64 = strings
        .iter()
        .map(|s| 2 * s.encode_utf16().count() as u64)
        .sum();
    let tail_offset = chars_offset + chars_size;

    let mut data = Vec::new();
    data.extend_from_slice(OPEN_MAGIC);
    data.extend_from_slice(&0x00010001u32.to_le_bytes()); // version written
    data.extend_from_slice(&0x00010001u32.to_le_bytes()); // version readable
    data.extend_from_slice(&model_offset.to_le_bytes());
    data.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    let (table, chars) = if strings.is_empty() {
        (0u64, 0u64)
    } else {
        (table_offset, chars_offset)
    };
    data.extend_from_slice(&table.to_le_bytes());
    data.extend_from_slice(&table_size.to_le_bytes());
    data.extend_from_slice(&chars.to_le_bytes());
    data.extend_from_slice(&chars_size.to_le_bytes());
    data.extend_from_slice(b"MODELSIG");
    data.extend_from_slice(&model_version.to_le_bytes()); // model version written
    data.extend_from_slice(&model_version.to_le_bytes()); // model version readable
    let mut sig = [0u8; 24];
    sig[..loader_signature.len()].copy_from_slice(loader_signature.as_bytes());
    data.extend_from_slice(&sig);
    data.extend_from_slice(&[0u8; 24]); // alternate signature
    data.extend_from_slice(&tail_offset.to_le_bytes());
    data.extend_from_slice(&0u64.to_le_bytes()); // tail limit
    data.extend_from_slice(&0u64.to_le_bytes()); // assembly name offset
    data.extend_from_slice(&0u32.to_le_bytes()); // assembly name size
    assert_eq!(data.len() as u64, header_len);

    data.extend_from_slice(payload);
    let mut end = 0u64;
    for s in strings {
        end += 2 * s.encode_utf16().count() as u64;
        data.extend_from_slice(&end.to_le_bytes());
    }
    for s in strings {
        for unit in s.encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
    }
    data.extend_from_slice(CLOSE_MAGIC);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields_and_cursor_position() {
        let data = build_model_key("Linear2CExec", 0x00010001, &["Features"], &[0xaa, 0xbb]);
        let entries: Vec<Entry> = Vec::new();
        let mut header = ModelHeader::parse(&entries, "Predictor".to_owned(), &data).unwrap();
        assert_eq!(header.loader_signature, "Linear2CExec");
        assert_eq!(header.loader_signature_alt, "");
        assert_eq!(header.model_signature, "MODELSIG");
        assert_eq!(header.model_version_written, 0x00010001);
        assert_eq!(header.strings, vec!["Features".to_owned()]);
        assert_eq!(header.assembly_name, None);
        assert_eq!(header.reader.u8().unwrap(), 0xaa);
        assert_eq!(header.reader.u8().unwrap(), 0xbb);
    }

    #[test]
    fn test_header_decode_is_deterministic() {
        let data = build_model_key("TermTransform", 0x00010003, &["a", "bc"], &[1, 2, 3]);
        let entries: Vec<Entry> = Vec::new();
        let first = ModelHeader::parse(&entries, String::new(), &data).unwrap();
        let second = ModelHeader::parse(&entries, String::new(), &data).unwrap();
        assert_eq!(first.loader_signature, second.loader_signature);
        assert_eq!(first.strings, second.strings);
        assert_eq!(first.reader.position(), second.reader.position());
    }

    #[test]
    fn test_missing_tail_magic() {
        let mut data = build_model_key("Linear2CExec", 1, &[], &[]);
        let len = data.len();
        data[len - 1] ^= 0xff;
        let entries: Vec<Entry> = Vec::new();
        assert!(ModelHeader::parse(&entries, String::new(), &data).is_err());
    }

    #[test]
    fn test_string_pool_delta_decoding() {
        // Cumulative end offsets [8, 20] give byte lengths 8 and 12, i.e.
        // 4 and 6 UTF-16 code units.
        let data = build_model_key("CopyTransform", 1, &["abcd", "efghij"], &[]);
        let entries: Vec<Entry> = Vec::new();
        let header = ModelHeader::parse(&entries, String::new(), &data).unwrap();
        assert_eq!(header.strings, vec!["abcd".to_owned(), "efghij".to_owned()]);
    }

    #[test]
    fn test_oversized_string_table_declaration() {
        // A declared table size far beyond the buffer must surface as a
        // decode error, not an allocation of the declared size.
        let mut data = build_model_key("CopyTransform", 1, &["Features"], &[]);
        data[40..48].copy_from_slice(&u64::MAX.to_le_bytes());
        let entries: Vec<Entry> = Vec::new();
        assert!(ModelHeader::parse(&entries, String::new(), &data).is_err());
    }

    #[test]
    fn test_string_lookup() {
        let data = build_model_key("CopyTransform", 1, &["out", "in"], &[]);
        let entries: Vec<Entry> = Vec::new();
        let header = ModelHeader::parse(&entries, String::new(), &data).unwrap();
        assert_eq!(header.lookup_string(1).unwrap(), "in");
        assert!(header.lookup_string(2).is_err());
        assert!(header.lookup_string(-1).is_err());
    }
}
