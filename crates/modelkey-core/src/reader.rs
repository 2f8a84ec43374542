//! Top-level archive reader.

use crate::entry::Entry;
use crate::header;
use crate::record::Record;
use crate::schema::Schema;
use crate::ModelError;

/// A fully decoded model archive.
///
/// Every top-level component is optional: archives written by different
/// trainer configurations persist different subsets of the root directories.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReader {
    /// Trainer version from `TrainingInfo/Version.txt`, if present.
    pub version: Option<String>,
    /// The root `Schema` IDV blob, if present.
    pub schema: Option<Schema>,
    pub transformer_chain: Option<Record>,
    pub data_loader_model: Option<Record>,
    pub predictor: Option<Record>,
}

impl ModelReader {
    /// Decodes an archive from its flattened entry list. Entry names use
    /// either separator; lookups accept both.
    pub fn new(entries: &[Entry]) -> Result<ModelReader, ModelError> {
        let version = header::open_text(entries, "", "TrainingInfo/Version.txt")
            .and_then(|text| parse_version(&text));
        let schema = match header::open_binary(entries, "", "Schema") {
            Some(mut reader) => Some(Schema::decode(&mut reader)?),
            None => None,
        };
        let transformer_chain = header::open_model(entries, "", "TransformerChain")?;
        let data_loader_model = header::open_model(entries, "", "DataLoaderModel")?;
        let predictor = header::open_model(entries, "", "Predictor")?;
        Ok(ModelReader {
            version,
            schema,
            transformer_chain,
            data_loader_model,
            predictor,
        })
    }
}

/// First whitespace-delimited token, stripped of any carriage return.
fn parse_version(text: &str) -> Option<String> {
    let token = text.split(' ').next()?.split('\r').next()?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_owned())
    }
}
