//! Work item codecs.
//!
//! A codec turns a [`WorkItem`] into the opaque bytes stored in the shared
//! store and back. Queues hold an `Arc<dyn Codec>` and never look at the
//! bytes themselves, so any implementor can be swapped in.

use crate::error::{Error, Result};
use crate::model::WorkItem;
use std::sync::Arc;

/// Converts work items to and from their stored byte form.
///
/// `loads(dumps(x))` must equal `x` for every item the codec accepts.
/// An item the codec cannot represent is an encode error, never a silent
/// field drop.
pub trait Codec: Send + Sync {
    fn dumps(&self, item: &WorkItem) -> Result<Vec<u8>>;
    fn loads(&self, data: &[u8]) -> Result<WorkItem>;
}

/// Default codec: JSON via serde.
///
/// Output is deterministic: maps are ordered, so equal items encode to equal
/// bytes (the priority queue relies on this for its tie-break).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn dumps(&self, item: &WorkItem) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(item)?)
    }

    fn loads(&self, data: &[u8]) -> Result<WorkItem> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// The codec used when none is configured.
pub fn default_codec() -> Arc<dyn Codec> {
    Arc::new(JsonCodec)
}

// ---------------------------------------------------------------------------
// Closure-backed codec
// ---------------------------------------------------------------------------

type DumpsFn = Box<dyn Fn(&WorkItem) -> Result<Vec<u8>> + Send + Sync>;
type LoadsFn = Box<dyn Fn(&[u8]) -> Result<WorkItem> + Send + Sync>;

/// A codec assembled at runtime from a pair of functions.
///
/// Built through [`FnCodec::builder`]; `build` refuses to produce a codec
/// unless both directions were supplied.
pub struct FnCodec {
    dumps: DumpsFn,
    loads: LoadsFn,
}

impl FnCodec {
    pub fn builder() -> FnCodecBuilder {
        FnCodecBuilder::default()
    }
}

impl Codec for FnCodec {
    fn dumps(&self, item: &WorkItem) -> Result<Vec<u8>> {
        (self.dumps)(item)
    }

    fn loads(&self, data: &[u8]) -> Result<WorkItem> {
        (self.loads)(data)
    }
}

impl std::fmt::Debug for FnCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCodec").finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct FnCodecBuilder {
    dumps: Option<DumpsFn>,
    loads: Option<LoadsFn>,
}

impl FnCodecBuilder {
    pub fn dumps<F>(mut self, f: F) -> Self
    where
        F: Fn(&WorkItem) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.dumps = Some(Box::new(f));
        self
    }

    pub fn loads<F>(mut self, f: F) -> Self
    where
        F: Fn(&[u8]) -> Result<WorkItem> + Send + Sync + 'static,
    {
        self.loads = Some(Box::new(f));
        self
    }

    /// Finish the codec. Fails with [`Error::Config`] if either direction
    /// is missing.
    pub fn build(self) -> Result<FnCodec> {
        let dumps = self
            .dumps
            .ok_or_else(|| Error::Config("codec does not implement 'dumps'".to_string()))?;
        let loads = self
            .loads
            .ok_or_else(|| Error::Config("codec does not implement 'loads'".to_string()))?;
        Ok(FnCodec { dumps, loads })
    }
}
