//! # Radix Trie
//!
//! Per-method compressed radix tree holding registered routes. Each edge
//! carries a multi-byte path fragment; chains of single-child nodes are
//! collapsed so lookup cost tracks the shape of the registered route set,
//! not the raw path length.
//!
//! Wildcards come in two kinds: `:name` captures exactly one path segment,
//! `*name` captures the remainder of the path and must terminate the
//! pattern. A node may have at most one wildcard child, and a wildcard
//! child never coexists with static siblings.
//!
//! Children are kept ordered by hit-count priority with a parallel
//! first-byte index, so lookup probes the hottest branches first without
//! any wildcard ambiguity.

use crate::context::HandlerChain;
use crate::error::{Error, Result};

/// A single matched path parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name as registered (without the `:` / `*` marker)
    pub key: String,
    /// Value captured from the request path
    pub value: String,
}

/// Ordered sequence of matched path parameters
///
/// Entries appear in left-to-right match order along the path, one per
/// wildcard consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<Param>);

impl Params {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Value of the first parameter with the given name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|entry| entry.key == name)
            .map(|entry| entry.value.as_str())
    }

    /// Like [`get`](Self::get), with `""` standing in for a missing entry
    #[must_use]
    pub fn by_name(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    /// Number of captured parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no wildcard matched
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the captured parameters in match order
    pub fn iter(&self) -> std::slice::Iter<'_, Param> {
        self.0.iter()
    }

    pub(crate) fn push(&mut self, key: &str, value: &str) {
        self.0.push(Param {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Kind of a trie vertex
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum NodeKind {
    /// Plain fragment shared by several routes
    #[default]
    Static,
    /// The per-method entry node
    Root,
    /// `:name` segment, consumes up to the next `/`
    Param,
    /// `*name` segment, consumes the remainder of the path
    CatchAll,
}

/// Result of a single-tree lookup
pub(crate) struct NodeValue<'a> {
    pub handlers: Option<&'a HandlerChain>,
    pub tsr: bool,
    pub full_path: &'a str,
}

impl<'a> NodeValue<'a> {
    fn miss(tsr: bool) -> Self {
        Self {
            handlers: None,
            tsr,
            full_path: "",
        }
    }
}

/// One trie vertex
///
/// Ownership is strictly parent-owns-children; reordering swaps elements
/// of `children` and `indices` in lock-step and never holds a back
/// reference.
#[derive(Default)]
pub(crate) struct Node {
    pub(crate) path: String,
    pub(crate) indices: Vec<u8>,
    pub(crate) children: Vec<Node>,
    pub(crate) handlers: Option<HandlerChain>,
    pub(crate) priority: u32,
    pub(crate) kind: NodeKind,
    pub(crate) max_params: u8,
    pub(crate) wild_child: bool,
    pub(crate) full_path: String,
}

fn count_params(path: &str) -> u8 {
    let n = path.bytes().filter(|&b| b == b':' || b == b'*').count();
    u8::try_from(n.min(255)).unwrap_or(u8::MAX)
}

fn longest_common_prefix(a: &str, b: &str) -> usize {
    a.bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Reject syntactically invalid wildcard usage before any mutation
fn validate_wildcards(path: &str) -> Result<()> {
    let bytes = path.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c != b':' && c != b'*' {
            i += 1;
            continue;
        }
        let mut end = i + 1;
        while end < bytes.len() && bytes[end] != b'/' {
            if bytes[end] == b':' || bytes[end] == b'*' {
                return Err(Error::MalformedPath {
                    path: path.to_string(),
                    reason: "only one wildcard per path segment is allowed",
                });
            }
            end += 1;
        }
        if end - i < 2 {
            return Err(Error::MalformedPath {
                path: path.to_string(),
                reason: "wildcards must be named with a non-empty name",
            });
        }
        if c == b'*' {
            if end != bytes.len() {
                return Err(Error::MalformedPath {
                    path: path.to_string(),
                    reason: "catch-all routes are only allowed at the end of the path",
                });
            }
            if i == 0 || bytes[i - 1] != b'/' {
                return Err(Error::MalformedPath {
                    path: path.to_string(),
                    reason: "no / before catch-all",
                });
            }
        }
        i = end;
    }
    Ok(())
}

impl Node {
    /// Bump the priority of `children[pos]` and float it toward the front,
    /// keeping `indices` aligned. Returns the child's new position.
    fn increment_child_prio(&mut self, pos: usize) -> usize {
        self.children[pos].priority += 1;
        let prio = self.children[pos].priority;

        let mut new_pos = pos;
        while new_pos > 0 && self.children[new_pos - 1].priority < prio {
            self.children.swap(new_pos - 1, new_pos);
            self.indices.swap(new_pos - 1, new_pos);
            new_pos -= 1;
        }
        new_pos
    }

    /// Read-only probe: is this exact pattern already registered with
    /// handlers? Runs before the mutation walk so a duplicate registration
    /// leaves the tree untouched.
    fn has_registration(&self, path: &str) -> bool {
        let mut n = self;
        let mut remaining = path.as_bytes();
        loop {
            let node_path = n.path.as_bytes();
            if remaining.len() < node_path.len() || &remaining[..node_path.len()] != node_path {
                return false;
            }
            remaining = &remaining[node_path.len()..];
            if remaining.is_empty() {
                return n.handlers.is_some();
            }
            let c = remaining[0];
            let next = if n.kind == NodeKind::Param && c == b'/' && n.children.len() == 1 {
                n.children.first()
            } else if let Some(pos) = n.indices.iter().position(|&b| b == c) {
                Some(&n.children[pos])
            } else if n.wild_child {
                n.children.first()
            } else {
                None
            };
            match next {
                Some(child) => n = child,
                None => return false,
            }
        }
    }

    /// Register a handler chain under `path`
    ///
    /// The path must begin with `/` and the chain must be non-empty.
    /// Conflicting or malformed registrations fail without changing what
    /// any lookup would return.
    pub(crate) fn add_route(&mut self, path: &str, handlers: HandlerChain) -> Result<()> {
        if !path.starts_with('/') {
            return Err(Error::MalformedPath {
                path: path.to_string(),
                reason: "path must begin with '/'",
            });
        }
        if handlers.is_empty() {
            return Err(Error::EmptyChain {
                path: path.to_string(),
            });
        }
        validate_wildcards(path)?;
        if self.has_registration(path) {
            return Err(Error::Conflict {
                path: path.to_string(),
            });
        }

        let full_path = path;
        self.priority += 1;
        let mut num_params = count_params(path);

        // Empty tree: the whole path becomes the root
        if self.path.is_empty() && self.children.is_empty() {
            self.max_params = num_params;
            self.insert_child(num_params, path, full_path, handlers)?;
            self.kind = NodeKind::Root;
            return Ok(());
        }

        let mut n: &mut Self = self;
        let mut path = path;
        let mut parent_full_path_index = 0;

        'walk: loop {
            if num_params > n.max_params {
                n.max_params = num_params;
            }

            let i = longest_common_prefix(path, &n.path);

            // Split the edge: the old node keeps the shared prefix, a new
            // child inherits the remainder together with everything that
            // hung off the old node.
            if i < n.path.len() {
                let mut child = Self {
                    path: n.path[i..].to_string(),
                    wild_child: n.wild_child,
                    kind: NodeKind::Static,
                    indices: std::mem::take(&mut n.indices),
                    children: std::mem::take(&mut n.children),
                    handlers: n.handlers.take(),
                    priority: n.priority - 1,
                    max_params: 0,
                    full_path: std::mem::take(&mut n.full_path),
                };
                for grandchild in &child.children {
                    if grandchild.max_params > child.max_params {
                        child.max_params = grandchild.max_params;
                    }
                }

                let split_byte = n.path.as_bytes()[i];
                n.children = vec![child];
                n.indices = vec![split_byte];
                n.path.truncate(i);
                n.wild_child = false;
                n.full_path = full_path[..parent_full_path_index + i].to_string();
            }

            if i < path.len() {
                path = &path[i..];

                if n.wild_child {
                    parent_full_path_index += n.path.len();
                    n = &mut n.children[0];
                    n.priority += 1;
                    if num_params > n.max_params {
                        n.max_params = num_params;
                    }
                    num_params = num_params.wrapping_sub(1);

                    // The wildcard must be spelled identically and cover a
                    // whole segment; a catch-all can never gain children.
                    if path.len() >= n.path.len()
                        && n.path.as_bytes() == &path.as_bytes()[..n.path.len()]
                        && n.kind != NodeKind::CatchAll
                        && (n.path.len() >= path.len() || path.as_bytes()[n.path.len()] == b'/')
                    {
                        continue 'walk;
                    }

                    let segment = if n.kind == NodeKind::CatchAll {
                        path.to_string()
                    } else {
                        path.split('/').next().unwrap_or(path).to_string()
                    };
                    let prefix_end = full_path.find(segment.as_str()).unwrap_or(0);
                    return Err(Error::WildcardConflict {
                        segment,
                        path: full_path.to_string(),
                        existing: n.path.clone(),
                        prefix: format!("{}{}", &full_path[..prefix_end], n.path),
                    });
                }

                let c = path.as_bytes()[0];

                // Slash after a param: descend into the sole child
                if n.kind == NodeKind::Param && c == b'/' && n.children.len() == 1 {
                    parent_full_path_index += n.path.len();
                    n = &mut n.children[0];
                    n.priority += 1;
                    continue 'walk;
                }

                if let Some(pos) = n.indices.iter().position(|&b| b == c) {
                    parent_full_path_index += n.path.len();
                    let pos = n.increment_child_prio(pos);
                    n = &mut n.children[pos];
                    continue 'walk;
                }

                if c != b':' && c != b'*' {
                    n.indices.push(c);
                    n.children.push(Self {
                        max_params: num_params,
                        full_path: full_path.to_string(),
                        ..Self::default()
                    });
                    let pos = n.increment_child_prio(n.indices.len() - 1);
                    n = &mut n.children[pos];
                }
                return n.insert_child(num_params, path, full_path, handlers);
            }

            // Path fully consumed: this node becomes (or already is) a terminal
            if n.handlers.is_some() {
                return Err(Error::Conflict {
                    path: full_path.to_string(),
                });
            }
            n.handlers = Some(handlers);
            n.full_path = full_path.to_string();
            return Ok(());
        }
    }

    /// Attach the remaining path below this node, materializing wildcard
    /// nodes for each `:param` and a two-node tail for a `*catch_all`.
    fn insert_child(
        &mut self,
        mut num_params: u8,
        path: &str,
        full_path: &str,
        handlers: HandlerChain,
    ) -> Result<()> {
        let mut n: &mut Self = self;
        let bytes = path.as_bytes();
        let max = bytes.len();
        let mut offset = 0;
        let mut i = 0;

        while num_params > 0 && i < max {
            let c = bytes[i];
            if c != b':' && c != b'*' {
                i += 1;
                continue;
            }

            // Wildcard end: next '/' or end of path (syntax pre-validated)
            let mut end = i + 1;
            while end < max && bytes[end] != b'/' {
                end += 1;
            }

            if !n.children.is_empty() {
                return Err(Error::WildcardShadowsChildren {
                    segment: path[i..end].to_string(),
                    path: full_path.to_string(),
                });
            }

            if c == b':' {
                if i > 0 {
                    n.path = path[offset..i].to_string();
                    offset = i;
                }

                n.children = vec![Self {
                    kind: NodeKind::Param,
                    max_params: num_params,
                    full_path: full_path.to_string(),
                    ..Self::default()
                }];
                n.wild_child = true;
                n = &mut n.children[0];
                n.priority += 1;
                num_params -= 1;

                // More path after the param: hang a fresh node below it
                if end < max {
                    n.path = path[offset..end].to_string();
                    offset = end;

                    n.children = vec![Self {
                        priority: 1,
                        max_params: num_params,
                        full_path: full_path.to_string(),
                        ..Self::default()
                    }];
                    n = &mut n.children[0];
                }
                i = end;
            } else {
                // Catch-all: terminal by construction
                if !n.path.is_empty() && n.path.ends_with('/') {
                    return Err(Error::Conflict {
                        path: full_path.to_string(),
                    });
                }
                if i == 0 || bytes[i - 1] != b'/' {
                    return Err(Error::MalformedPath {
                        path: full_path.to_string(),
                        reason: "no / before catch-all",
                    });
                }
                let slash = i - 1;
                n.path = path[offset..slash].to_string();

                // First node: empty-path catch-all carrying the wild flag
                n.children = vec![Self {
                    wild_child: true,
                    kind: NodeKind::CatchAll,
                    max_params: 1,
                    full_path: full_path.to_string(),
                    ..Self::default()
                }];
                n.indices = vec![b'/'];
                n = &mut n.children[0];
                n.priority += 1;

                // Second node: holds the variable and the handlers
                n.children = vec![Self {
                    path: path[slash..].to_string(),
                    kind: NodeKind::CatchAll,
                    max_params: 1,
                    handlers: Some(handlers),
                    priority: 1,
                    full_path: full_path.to_string(),
                    ..Self::default()
                }];
                return Ok(());
            }
        }

        // No wildcard left: plain suffix plus the handlers
        n.path = path[offset..].to_string();
        n.handlers = Some(handlers);
        n.full_path = full_path.to_string();
        Ok(())
    }

    /// Walk the tree with a request path
    ///
    /// Static children are probed first via the `indices` scan in priority
    /// order; the node's single wildcard child is the fallback. Captured
    /// parameters are appended to `params` in match order. When the path
    /// misses but would hit with a trailing slash added or removed, `tsr`
    /// is set on the returned miss.
    pub(crate) fn get_value<'a>(&'a self, path: &str, params: &mut Params) -> NodeValue<'a> {
        let mut n = self;
        let mut path = path;

        'walk: loop {
            if path.len() > n.path.len() {
                if path.as_bytes()[..n.path.len()] == *n.path.as_bytes() {
                    path = &path[n.path.len()..];

                    if !n.wild_child {
                        let c = path.as_bytes()[0];
                        if let Some(pos) = n.indices.iter().position(|&b| b == c) {
                            n = &n.children[pos];
                            continue 'walk;
                        }

                        // Dead end; a leaf one slash up means tsr applies
                        let tsr = path == "/" && n.handlers.is_some();
                        return NodeValue::miss(tsr);
                    }

                    n = &n.children[0];
                    match n.kind {
                        NodeKind::Param => {
                            let end = path
                                .bytes()
                                .position(|b| b == b'/')
                                .unwrap_or(path.len());
                            params.push(&n.path[1..], &path[..end]);

                            if end < path.len() {
                                if !n.children.is_empty() {
                                    path = &path[end..];
                                    n = &n.children[0];
                                    continue 'walk;
                                }

                                let tsr = path.len() == end + 1;
                                return NodeValue::miss(tsr);
                            }

                            if let Some(handlers) = &n.handlers {
                                return NodeValue {
                                    handlers: Some(handlers),
                                    tsr: false,
                                    full_path: &n.full_path,
                                };
                            }
                            if n.children.len() == 1 {
                                let child = &n.children[0];
                                let tsr = child.path == "/" && child.handlers.is_some();
                                return NodeValue::miss(tsr);
                            }
                            return NodeValue::miss(false);
                        }
                        NodeKind::CatchAll => {
                            let value = path.strip_prefix('/').unwrap_or(path);
                            params.push(&n.path[2..], value);
                            return NodeValue {
                                handlers: n.handlers.as_ref(),
                                tsr: false,
                                full_path: &n.full_path,
                            };
                        }
                        NodeKind::Static | NodeKind::Root => {
                            unreachable!("wildcard child with non-wildcard kind")
                        }
                    }
                }
            } else if path == n.path {
                if let Some(handlers) = &n.handlers {
                    return NodeValue {
                        handlers: Some(handlers),
                        tsr: false,
                        full_path: &n.full_path,
                    };
                }

                if path == "/" && n.wild_child && n.kind != NodeKind::Root {
                    return NodeValue::miss(true);
                }

                // No handlers here; a '/'-child leaf makes tsr applicable
                if let Some(pos) = n.indices.iter().position(|&b| b == b'/') {
                    let child = &n.children[pos];
                    let tsr = (child.path.len() == 1 && child.handlers.is_some())
                        || (child.kind == NodeKind::CatchAll
                            && child.children[0].handlers.is_some());
                    return NodeValue::miss(tsr);
                }
                return NodeValue::miss(false);
            }

            let tsr = path == "/"
                || (n.path.len() == path.len() + 1
                    && n.path.as_bytes()[path.len()] == b'/'
                    && path.as_bytes() == &n.path.as_bytes()[..path.len()]
                    && n.handlers.is_some());
            return NodeValue::miss(tsr);
        }
    }

    /// Collect `(full_path, handler_count)` for every terminal in this subtree
    pub(crate) fn collect_routes(&self, out: &mut Vec<(String, usize)>) {
        if let Some(handlers) = &self.handlers {
            out.push((self.full_path.clone(), handlers.len()));
        }
        for child in &self.children {
            child.collect_routes(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{handler, Context};

    fn chain(len: usize) -> HandlerChain {
        (0..len).map(|_| handler(|_c: &mut Context| {})).collect()
    }

    fn lookup<'a>(node: &'a Node, path: &str) -> (NodeValue<'a>, Params) {
        let mut params = Params::default();
        let value = node.get_value(path, &mut params);
        (value, params)
    }

    #[test]
    fn static_routes_round_trip() {
        let mut root = Node::default();
        root.add_route("/", chain(1)).unwrap();
        root.add_route("/ping", chain(2)).unwrap();
        root.add_route("/pong", chain(3)).unwrap();
        root.add_route("/contact", chain(4)).unwrap();

        for (path, len) in [("/", 1), ("/ping", 2), ("/pong", 3), ("/contact", 4)] {
            let (value, params) = lookup(&root, path);
            assert_eq!(value.handlers.map(Vec::len), Some(len), "path {path}");
            assert_eq!(value.full_path, path);
            assert!(params.is_empty());
        }
    }

    #[test]
    fn unknown_path_misses() {
        let mut root = Node::default();
        root.add_route("/ping", chain(1)).unwrap();

        let (value, _) = lookup(&root, "/pong");
        assert!(value.handlers.is_none());
        assert!(!value.tsr);
    }

    #[test]
    fn param_capture_single_and_nested() {
        let mut root = Node::default();
        root.add_route("/user/:id", chain(1)).unwrap();
        root.add_route("/user/:id/posts/:post", chain(2)).unwrap();

        let (value, params) = lookup(&root, "/user/42");
        assert_eq!(value.handlers.map(Vec::len), Some(1));
        assert_eq!(value.full_path, "/user/:id");
        assert_eq!(params.get("id"), Some("42"));

        let (value, params) = lookup(&root, "/user/42/posts/7");
        assert_eq!(value.handlers.map(Vec::len), Some(2));
        assert_eq!(params.len(), 2);
        assert_eq!(params.by_name("id"), "42");
        assert_eq!(params.by_name("post"), "7");
        // left-to-right match order
        let keys: Vec<&str> = params.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["id", "post"]);
    }

    #[test]
    fn param_does_not_cross_segments() {
        let mut root = Node::default();
        root.add_route("/user/:id", chain(1)).unwrap();

        let (value, _) = lookup(&root, "/user/42/profile");
        assert!(value.handlers.is_none());
    }

    #[test]
    fn static_beats_param() {
        let mut root = Node::default();
        root.add_route("/user/:id", chain(1)).unwrap();
        root.add_route("/user/profile", chain(2)).unwrap();

        let (value, params) = lookup(&root, "/user/profile");
        assert_eq!(value.handlers.map(Vec::len), Some(2));
        assert!(params.is_empty());

        let (value, params) = lookup(&root, "/user/99");
        assert_eq!(value.handlers.map(Vec::len), Some(1));
        assert_eq!(params.by_name("id"), "99");
    }

    #[test]
    fn catch_all_tail() {
        let mut root = Node::default();
        root.add_route("/files/*path", chain(1)).unwrap();

        let (value, params) = lookup(&root, "/files/a/b/c");
        assert_eq!(value.handlers.map(Vec::len), Some(1));
        assert_eq!(value.full_path, "/files/*path");
        assert_eq!(params.by_name("path"), "a/b/c");

        let (value, params) = lookup(&root, "/files/");
        assert!(value.handlers.is_some());
        assert_eq!(params.by_name("path"), "");
    }

    #[test]
    fn duplicate_registration_conflicts_and_leaves_tree_intact() {
        let mut root = Node::default();
        root.add_route("/user/list", chain(2)).unwrap();

        let err = root.add_route("/user/list", chain(1)).unwrap_err();
        assert!(matches!(err, Error::Conflict { ref path } if path == "/user/list"));

        // Earlier registration still resolves to its own chain
        let (value, _) = lookup(&root, "/user/list");
        assert_eq!(value.handlers.map(Vec::len), Some(2));

        // And the tree still accepts new, non-conflicting routes
        root.add_route("/user/list/all", chain(1)).unwrap();
        let (value, _) = lookup(&root, "/user/list/all");
        assert_eq!(value.handlers.map(Vec::len), Some(1));
    }

    #[test]
    fn duplicate_catch_all_conflicts() {
        let mut root = Node::default();
        root.add_route("/files/*path", chain(1)).unwrap();
        let err = root.add_route("/files/*path", chain(1)).unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[test]
    fn wildcard_name_mismatch_conflicts() {
        let mut root = Node::default();
        root.add_route("/user/:id", chain(1)).unwrap();

        let err = root.add_route("/user/:name", chain(1)).unwrap_err();
        assert!(matches!(err, Error::WildcardConflict { .. }));
    }

    #[test]
    fn wildcard_under_static_siblings_conflicts() {
        let mut root = Node::default();
        root.add_route("/cmd/tool", chain(1)).unwrap();

        let err = root.add_route("/cmd/:tool", chain(1)).unwrap_err();
        assert!(matches!(err, Error::WildcardShadowsChildren { .. }));
    }

    #[test]
    fn static_under_wildcard_conflicts() {
        let mut root = Node::default();
        root.add_route("/cmd/:tool", chain(1)).unwrap();

        let err = root.add_route("/cmd/tool", chain(1)).unwrap_err();
        assert!(matches!(err, Error::WildcardConflict { .. }));
    }

    #[test]
    fn malformed_paths_rejected() {
        let mut root = Node::default();

        let err = root.add_route("ping", chain(1)).unwrap_err();
        assert!(matches!(err, Error::MalformedPath { .. }));

        let err = root.add_route("/src/*files/more", chain(1)).unwrap_err();
        assert!(matches!(err, Error::MalformedPath { .. }));

        let err = root.add_route("/user/:", chain(1)).unwrap_err();
        assert!(matches!(err, Error::MalformedPath { .. }));

        let err = root.add_route("/src*files", chain(1)).unwrap_err();
        assert!(matches!(err, Error::MalformedPath { .. }));

        let err = root.add_route("/user/:id:name", chain(1)).unwrap_err();
        assert!(matches!(err, Error::MalformedPath { .. }));

        let err = root.add_route("/ping", Vec::new()).unwrap_err();
        assert!(matches!(err, Error::EmptyChain { .. }));
    }

    #[test]
    fn trailing_slash_hint_both_directions() {
        let mut root = Node::default();
        root.add_route("/dir/", chain(1)).unwrap();
        root.add_route("/file", chain(1)).unwrap();

        let (value, _) = lookup(&root, "/dir");
        assert!(value.handlers.is_none());
        assert!(value.tsr, "missing trailing slash should hint a redirect");

        let (value, _) = lookup(&root, "/file/");
        assert!(value.handlers.is_none());
        assert!(value.tsr, "extra trailing slash should hint a redirect");

        let (value, _) = lookup(&root, "/nothing");
        assert!(!value.tsr);
    }

    #[test]
    fn mixed_static_and_param_tree() {
        let mut root = Node::default();
        root.add_route("/", chain(1)).unwrap();
        root.add_route("/search", chain(1)).unwrap();
        root.add_route("/support", chain(1)).unwrap();
        root.add_route("/blog/:post", chain(1)).unwrap();
        root.add_route("/blog/:post/comments", chain(2)).unwrap();
        root.add_route("/about-us", chain(1)).unwrap();

        let (value, params) = lookup(&root, "/blog/hello-world/comments");
        assert_eq!(value.handlers.map(Vec::len), Some(2));
        assert_eq!(params.by_name("post"), "hello-world");

        let (value, _) = lookup(&root, "/search");
        assert_eq!(value.full_path, "/search");

        let (value, _) = lookup(&root, "/supp");
        assert!(value.handlers.is_none());
    }

    #[test]
    fn priority_floats_hot_branches_forward() {
        let mut root = Node::default();
        root.add_route("/a", chain(1)).unwrap();
        root.add_route("/bb/one", chain(1)).unwrap();
        root.add_route("/bb/two", chain(1)).unwrap();
        root.add_route("/bb/three", chain(1)).unwrap();

        // The /bb subtree carries three routes against /a's one, so its
        // edge must be probed first.
        assert_eq!(root.indices.first(), Some(&b'b'));
        let first = &root.children[0];
        assert!(first.priority >= root.children[1].priority);
    }

    #[test]
    fn max_params_tracks_subtree_maximum() {
        let mut root = Node::default();
        root.add_route("/a/:one/:two/:three", chain(1)).unwrap();
        root.add_route("/a/static", chain(1)).unwrap();

        assert_eq!(root.max_params, 3);
    }

    #[test]
    fn collect_routes_lists_terminals() {
        let mut root = Node::default();
        root.add_route("/ping", chain(2)).unwrap();
        root.add_route("/user/:id", chain(1)).unwrap();

        let mut routes = Vec::new();
        root.collect_routes(&mut routes);
        routes.sort();
        assert_eq!(
            routes,
            vec![("/ping".to_string(), 2), ("/user/:id".to_string(), 1)]
        );
    }
}
