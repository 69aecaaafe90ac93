use std::collections::HashMap;

use crate::token::Token;

/// How an entry came to exist: `pred` is the prior entry in the same
/// production, `cause` the completed entry that allowed the advance (absent
/// for scans).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Link {
    pub pred: usize,
    pub cause: Option<usize>,
}

#[derive(Debug)]
pub(crate) struct Entry {
    pub state: usize,
    pub parent: usize,
    pub pos: usize,
    pub links: Vec<Link>,
    /// The token whose scan created this entry, when it was created by one.
    pub token: Option<Token>,
}

/// The recognizer's state: one cell of entries per input position.
/// Entries are deduplicated per cell by `(state, parent)`; a second
/// derivation of an existing entry appends a link.
#[derive(Debug, Default)]
pub(crate) struct Chart {
    pub entries: Vec<Entry>,
    pub cells: Vec<Vec<usize>>,
    index: HashMap<(usize, usize, usize), usize>,
}

impl Chart {
    pub fn new() -> Self {
        Chart {
            entries: Vec::new(),
            cells: vec![Vec::new()],
            index: HashMap::new(),
        }
    }

    pub fn push_cell(&mut self) {
        self.cells.push(Vec::new());
    }

    pub fn last_cell(&self) -> &[usize] {
        self.cells.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Insert or extend the entry `(state, parent)` at `pos`.
    pub fn add(
        &mut self,
        pos: usize,
        state: usize,
        parent: usize,
        link: Option<Link>,
        token: Option<Token>,
    ) -> usize {
        let key = (pos, state, parent);
        if let Some(idx) = self.index.get(&key) {
            if let Some(link) = link {
                self.entries[*idx].links.push(link);
            }
            return *idx;
        }
        let idx = self.entries.len();
        self.entries.push(Entry {
            state,
            parent,
            pos,
            links: link.into_iter().collect(),
            token,
        });
        self.cells[pos].push(idx);
        self.index.insert(key, idx);
        idx
    }
}
