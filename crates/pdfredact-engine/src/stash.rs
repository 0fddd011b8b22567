//! Deferred document mutations collected during a content-stream walk.
//!
//! The walk borrows the document immutably, so anything that must change the
//! object graph — registering a patched image under a new resource key,
//! replacing a rewritten form's content — is recorded here and applied by
//! the caller once the walk is done. The rewritten operators already
//! reference the stash-chosen keys, so the deferral is not observable in the
//! output stream.

use lopdf::{ObjectId, Stream};

/// Which resource dictionary a stashed image key must be registered in.
///
/// A rewritten `Do` resolves its operand against the resources of the
/// nesting level it was emitted at, so a patch made inside a form that owns
/// its /Resources must land in the form's dictionary, not the page's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceOwner {
    /// The page's own (or inherited) resource dictionary.
    Page,
    /// The /Resources of the form stream the draw occurred in.
    Form(ObjectId),
}

/// A patched image awaiting registration in its owner's XObject resources.
#[derive(Debug, Clone)]
pub struct NewImage {
    /// Fresh resource key, unique within the target XObject dictionary.
    pub key: String,
    /// The re-encoded image stream.
    pub stream: Stream,
    /// Resource dictionary the key belongs to.
    pub owner: ResourceOwner,
}

/// Mutations to apply to the document after a page's walk completes.
#[derive(Debug, Clone, Default)]
pub struct ResourceStash {
    images: Vec<NewImage>,
    forms: Vec<(ObjectId, Vec<u8>)>,
}

impl ResourceStash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose a key for a patched copy of `original` that collides neither
    /// with existing resource keys (`taken`) nor with keys already stashed.
    pub fn unique_image_key(&self, original: &str, taken: &dyn Fn(&str) -> bool) -> String {
        let mut n = 1usize;
        loop {
            let candidate = format!("{original}R{n}");
            let stashed = self.images.iter().any(|img| img.key == candidate);
            if !stashed && !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn add_image(&mut self, key: String, stream: Stream, owner: ResourceOwner) {
        self.images.push(NewImage { key, stream, owner });
    }

    /// Record replacement content for a rewritten Form XObject. A form
    /// invoked more than once is recorded once per invocation; the last
    /// replacement wins when applied in order.
    pub fn replace_form_content(&mut self, id: ObjectId, content: Vec<u8>) {
        self.forms.push((id, content));
    }

    pub fn images(&self) -> &[NewImage] {
        &self.images
    }

    pub fn forms(&self) -> &[(ObjectId, Vec<u8>)] {
        &self.forms
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.forms.is_empty()
    }
}
