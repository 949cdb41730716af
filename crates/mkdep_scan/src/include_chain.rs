//! Arena of include frames for inline include processing.
//!
//! Every file entered through an include directive becomes a frame holding
//! the index of the frame that included it. The chain of a frame is found by
//! following parent indices to the root, which is how recursive inclusion is
//! detected without keeping references between frames.

use std::path::{Path, PathBuf};

/// Opaque index of a frame in an [`IncludeChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u32);

impl FrameId {
    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// One file being read, and who included it.
#[derive(Debug, Clone)]
pub struct IncludeFrame {
    /// The file.
    pub path: PathBuf,
    /// The including frame; `None` for the scanned source itself.
    pub parent: Option<FrameId>,
}

/// Append-only store of include frames for one source scan.
#[derive(Debug)]
pub struct IncludeChain {
    frames: Vec<IncludeFrame>,
}

impl IncludeChain {
    /// Creates a chain whose root frame is `source`.
    pub fn new(source: &Path) -> (Self, FrameId) {
        let chain = Self {
            frames: vec![IncludeFrame {
                path: source.to_path_buf(),
                parent: None,
            }],
        };
        (chain, FrameId(0))
    }

    /// Records that `parent` includes `path` and returns the new frame.
    pub fn push(&mut self, parent: FrameId, path: PathBuf) -> FrameId {
        let id = FrameId(self.frames.len() as u32);
        self.frames.push(IncludeFrame {
            path,
            parent: Some(parent),
        });
        id
    }

    /// Returns the frame with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID did not come from this chain.
    pub fn get(&self, id: FrameId) -> &IncludeFrame {
        &self.frames[id.0 as usize]
    }

    /// Iterates from `id` up to the root frame.
    pub fn ancestors(&self, id: FrameId) -> impl Iterator<Item = &IncludeFrame> {
        let mut next = Some(id);
        std::iter::from_fn(move || {
            let frame = self.get(next?);
            next = frame.parent;
            Some(frame)
        })
    }

    /// Returns `true` if `path` is `id` itself or one of its includers.
    pub fn is_active(&self, id: FrameId, path: &Path) -> bool {
        self.ancestors(id).any(|f| f.path == path)
    }

    /// Number of frames between `id` and the root.
    pub fn depth(&self, id: FrameId) -> usize {
        self.ancestors(id).count() - 1
    }

    /// Total number of frames recorded.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always `false`: a chain has at least its root.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
