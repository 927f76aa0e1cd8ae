use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A directed regulatory link. Equality and ordering use the `(src, trg)` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Link {
    pub src: String,
    pub trg: String,
}

impl Link {
    pub fn new(src: impl Into<String>, trg: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            trg: trg.into(),
        }
    }

    /// Key used for link entries in legacy color maps.
    pub fn id(&self) -> String {
        format!("{}->{}", self.src, self.trg)
    }

    pub fn is_self_loop(&self) -> bool {
        self.src == self.trg
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.trg)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Network {
    pub nodes: BTreeSet<String>,
    pub links: BTreeSet<Link>,
    pub names: BTreeMap<String, String>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_node(&mut self, id: &str, name: Option<String>) {
        self.nodes.insert(id.to_string());
        if let Some(name) = name {
            self.names.insert(id.to_string(), name);
        }
    }

    pub fn add_link(&mut self, src: &str, trg: &str) {
        self.ensure_node(src, None);
        self.ensure_node(trg, None);
        self.links.insert(Link::new(src, trg));
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Targets of `id`, in ID order.
    pub fn targets_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.links
            .iter()
            .filter(move |link| link.src == id)
            .map(|link| link.trg.as_str())
    }

    pub fn has_outbound(&self, id: &str) -> bool {
        self.links.iter().any(|link| link.src == id)
    }

    /// Nodes that source at least one link.
    pub fn sources(&self) -> BTreeSet<&str> {
        self.links.iter().map(|link| link.src.as_str()).collect()
    }

    /// Nodes that neither source nor receive a link.
    pub fn isolated_nodes(&self) -> Vec<&str> {
        let mut touched: BTreeSet<&str> = BTreeSet::new();
        for link in &self.links {
            touched.insert(link.src.as_str());
            touched.insert(link.trg.as_str());
        }
        self.nodes
            .iter()
            .map(String::as_str)
            .filter(|id| !touched.contains(id))
            .collect()
    }
}
