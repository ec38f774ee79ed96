use stash_types::models::{Link, LinkId, distinct_tags};

/// Local copy of the user's links plus the active tag filter.
///
/// Positions passed to [`Board::move_link`] are positions in
/// [`Board::visible`], so reordering a filtered view only shuffles the
/// filtered links among the slots they already occupy.
#[derive(Debug, Default, Clone)]
pub struct Board {
    links: Vec<Link>,
    filter: Option<String>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn ids(&self) -> Vec<LinkId> {
        self.links.iter().map(|l| l.id).collect()
    }

    /// Replace everything with a server snapshot.
    pub fn replace(&mut self, mut links: Vec<Link>) {
        links.sort_by_key(|l| (l.order, l.id));
        self.links = links;
    }

    pub fn push(&mut self, link: Link) {
        self.links.push(link);
    }

    pub fn remove(&mut self, id: LinkId) -> Option<Link> {
        let index = self.links.iter().position(|l| l.id == id)?;
        Some(self.links.remove(index))
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// An empty tag clears the filter.
    pub fn set_filter(&mut self, tag: Option<&str>) {
        self.filter = tag
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
    }

    pub fn visible(&self) -> Vec<&Link> {
        match self.filter.as_deref() {
            Some(tag) => self.links.iter().filter(|l| l.has_tag(tag)).collect(),
            None => self.links.iter().collect(),
        }
    }

    pub fn all_tags(&self) -> Vec<String> {
        distinct_tags(&self.links)
    }

    /// Move the visible link at `from` to `to` and return the full id
    /// sequence to send to the server. `None` if either position is out of range.
    pub fn move_link(&mut self, from: usize, to: usize) -> Option<Vec<LinkId>> {
        let slots: Vec<usize> = match self.filter.as_deref() {
            Some(tag) => self
                .links
                .iter()
                .enumerate()
                .filter(|(_, l)| l.has_tag(tag))
                .map(|(i, _)| i)
                .collect(),
            None => (0..self.links.len()).collect(),
        };
        if from >= slots.len() || to >= slots.len() {
            return None;
        }

        let mut moved: Vec<Link> = slots.iter().map(|&i| self.links[i].clone()).collect();
        let item = moved.remove(from);
        moved.insert(to, item);
        for (slot, link) in slots.into_iter().zip(moved) {
            self.links[slot] = link;
        }
        for (position, link) in self.links.iter_mut().enumerate() {
            link.order = position as u32;
        }

        Some(self.ids())
    }
}
