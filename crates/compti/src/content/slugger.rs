use rustc_hash::FxHashSet;
use slug::slugify;

/// Slug used for headings without any text.
const EMPTY_SLUG: &str = "section";

/// Hands out heading ids that are unique within one document.
///
/// The first heading with a given text keeps the plain slug, later ones get the first free `-1`, `-2`, ...
/// suffix, in document order. Explicit ids are reserved up front, the first heading declaring one keeps it and
/// later headings declaring the same id are suffixed like generated ones.
pub struct Slugger {
    taken: FxHashSet<String>,
    reserved: FxHashSet<String>,
}

impl Slugger {
    pub fn new() -> Self {
        Self {
            taken: FxHashSet::default(),
            reserved: FxHashSet::default(),
        }
    }

    /// Keeps an explicit `{#id}` away from generated ids until a heading claims it.
    pub fn reserve(&mut self, id: &str) {
        self.reserved.insert(id.to_string());
    }

    /// Id for a heading with an explicit `{#id}` attribute.
    pub fn claim(&mut self, id: &str) -> String {
        if self.taken.insert(id.to_string()) {
            return id.to_string();
        }

        self.unique(id)
    }

    pub fn slugify(&mut self, text: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base = EMPTY_SLUG.to_string();
        }

        self.unique(&base)
    }

    fn is_free(&self, id: &str) -> bool {
        !self.taken.contains(id) && !self.reserved.contains(id)
    }

    fn unique(&mut self, base: &str) -> String {
        if self.is_free(base) {
            self.taken.insert(base.to_string());
            return base.to_string();
        }

        let mut counter = 1;
        loop {
            let candidate = format!("{}-{}", base, counter);
            if self.is_free(&candidate) {
                self.taken.insert(candidate.clone());
                return candidate;
            }
            counter += 1;
        }
    }
}
