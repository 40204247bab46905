use std::collections::HashMap;
use std::sync::Arc;

use crate::middleware::Middleware;
use crate::store::entry::Entry;

/// A namespace node. The map key under the parent is the node's fragment,
/// which may span several `/`-separated tokens (`api/v1`). `path` is the
/// absolute normalized name, recomputed whenever a split reparents the
/// node, so no back-reference to the parent is needed.
pub(crate) struct Node {
    pub(crate) path: String,
    pub(crate) children: HashMap<String, Node>,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    pub(crate) entry_slash: Option<Entry>,
    pub(crate) entry_noslash: Option<Entry>,
}

impl Node {
    fn new(path: String) -> Self {
        Self {
            path,
            children: HashMap::new(),
            middlewares: Vec::new(),
            entry_slash: None,
            entry_noslash: None,
        }
    }

    fn rebase(&mut self, path: String) {
        self.path = path;
        for (fragment, child) in &mut self.children {
            child.rebase(format!("{}/{}", self.path, fragment));
        }
    }
}

/// The fragment key in `children` that `name` terminates at or descends
/// through. Fragments never share prefixes at token boundaries, so at
/// most one key qualifies.
fn prefix_key(children: &HashMap<String, Node>, name: &str) -> Option<String> {
    children
        .keys()
        .find(|k| {
            name == k.as_str()
                || (name.len() > k.len()
                    && name.starts_with(k.as_str())
                    && name.as_bytes()[k.len()] == b'/')
        })
        .cloned()
}

/// Locate or create the node for a normalized `name`, splitting any
/// sibling that `name` is a prefix of. Re-inserting an existing name
/// returns the same node. `base` is the absolute path of this level,
/// either empty or ending in `/`.
pub(crate) fn insert<'a>(
    children: &'a mut HashMap<String, Node>,
    base: &str,
    name: &str,
) -> &'a mut Node {
    if let Some(key) = prefix_key(children, name) {
        if key == name {
            return children.get_mut(&key).expect("existing node");
        }
        let rest = name[key.len() + 1..].to_string();
        let child_base = format!("{base}{key}/");
        let node = children.get_mut(&key).expect("existing node");
        return insert(&mut node.children, &child_base, &rest);
    }

    // No node owns a prefix of `name`: attach a fresh node here and pull
    // every sibling that extends it underneath, stripping the shared
    // fragment from their keys.
    let mut node = Node::new(format!("{base}{name}"));
    let displaced: Vec<String> = children
        .keys()
        .filter(|k| k.len() > name.len() && k.starts_with(name) && k.as_bytes()[name.len()] == b'/')
        .cloned()
        .collect();
    for key in displaced {
        let mut child = children.remove(&key).expect("displaced node");
        let fragment = key[name.len() + 1..].to_string();
        child.rebase(format!("{}/{}", node.path, fragment));
        node.children.insert(fragment, child);
    }
    children.insert(name.to_string(), node);
    children.get_mut(name).expect("inserted node")
}

/// Descend as deep as the tree allows for `name`, additionally letting a
/// `{}` token in a fragment stand for any single token of `name`. At
/// every position a literal token beats the sentinel. Returns the deepest
/// node reached and the unconsumed remainder of `name` (empty remainder
/// means the match is exact).
pub(crate) fn closer<'a>(
    children: &'a HashMap<String, Node>,
    name: &str,
) -> (Option<&'a Node>, String) {
    let tokens: Vec<&str> = name.split('/').collect();
    let mut map = children;
    let mut node = None;
    let mut index = 0;
    while index < tokens.len() {
        match best_child(map, &tokens[index..]) {
            Some((child, consumed)) => {
                node = Some(child);
                map = &child.children;
                index += consumed;
            }
            None => break,
        }
    }
    (node, tokens[index..].join("/"))
}

/// The child whose fragment matches the leading tokens, preferring
/// literal tokens over `{}` position by position.
fn best_child<'a>(
    children: &'a HashMap<String, Node>,
    tokens: &[&str],
) -> Option<(&'a Node, usize)> {
    let mut best: Option<(&Node, usize, Vec<bool>)> = None;
    for (key, child) in children {
        let fragment: Vec<&str> = key.split('/').collect();
        if fragment.len() > tokens.len() {
            continue;
        }
        let mut literals = Vec::with_capacity(fragment.len());
        let mut matched = true;
        for (k, t) in fragment.iter().zip(tokens) {
            if k == t {
                literals.push(true);
            } else if *k == "{}" {
                literals.push(false);
            } else {
                matched = false;
                break;
            }
        }
        if !matched {
            continue;
        }
        let replace = match &best {
            Some((_, _, current)) => literals > *current,
            None => true,
        };
        if replace {
            best = Some((child, fragment.len(), literals));
        }
    }
    best.map(|(child, consumed, _)| (child, consumed))
}

/// Middleware lists of every node visited while exactly descending
/// `name`, root to leaf. `name` comes from a registered pattern, so `{}`
/// tokens match their own fragments literally.
pub(crate) fn middlewares_along(
    children: &HashMap<String, Node>,
    name: &str,
) -> Vec<Arc<dyn Middleware>> {
    let mut collected = Vec::new();
    let mut map = children;
    let mut rest = name;
    while let Some(key) = prefix_key(map, rest) {
        let node = &map[&key];
        collected.extend(node.middlewares.iter().cloned());
        if key.len() == rest.len() {
            break;
        }
        rest = &rest[key.len() + 1..];
        map = &node.children;
    }
    collected
}
