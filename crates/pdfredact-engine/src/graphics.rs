//! Graphics state: the current transformation matrix and the q/Q stack.

use crate::text_state::{TextState, TextStateSnapshot};
use pdfredact_core::Ctm;

/// CTM plus the LIFO of states saved by `q`.
///
/// The text state parameters that belong to the graphics state are saved
/// alongside the CTM, so `Q` restores both in one step.
#[derive(Debug, Clone, Default)]
pub struct GraphicsStack {
    ctm: Ctm,
    stack: Vec<(Ctm, TextStateSnapshot)>,
}

impl GraphicsStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a nested scope with an explicit base CTM (form /Matrix applied
    /// to the invoking context's CTM).
    pub fn with_ctm(ctm: Ctm) -> Self {
        Self {
            ctm,
            stack: Vec::new(),
        }
    }

    pub fn ctm(&self) -> &Ctm {
        &self.ctm
    }

    /// `cm`: pre-multiply onto the current matrix.
    pub fn concat(&mut self, m: Ctm) {
        self.ctm = m.concat(&self.ctm);
    }

    /// `q`: push the CTM and the graphics-state portion of the text state.
    pub fn save(&mut self, text_state: &TextState) {
        self.stack.push((self.ctm, text_state.save_snapshot()));
    }

    /// `Q`: pop and restore. Returns false on an unbalanced `Q`, which is
    /// ignored rather than treated as fatal (the operator still passes
    /// through to the output).
    pub fn restore(&mut self, text_state: &mut TextState) -> bool {
        match self.stack.pop() {
            Some((ctm, snapshot)) => {
                self.ctm = ctm;
                text_state.restore_snapshot(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}
