use std::collections::HashMap;
use std::sync::Arc;

/// Deduplicates repeated strings (author names, commit messages, tags) by
/// content. CVS logs repeat the same commit message once per touched file,
/// so a single log can carry thousands of duplicate allocations without
/// this.
#[derive(Debug, Default)]
pub struct Interner {
    table: HashMap<Arc<str>, Arc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> Arc<str> {
        if let Some(existing) = self.table.get(s) {
            return existing.clone();
        }
        let arc: Arc<str> = Arc::from(s);
        self.table.insert(arc.clone(), arc.clone());
        arc
    }
}
