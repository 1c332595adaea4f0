//! Surrogate key definitions.
//!
//! A surrogate key is an opaque dependency tag attached to a cached
//! response. Purging a key invalidates every cached entry carrying it.

use std::collections::HashSet;
use std::fmt;

use uuid::Uuid;

/// One dependency tag in the edge cache.
///
/// A key names a data dependency, not a URL: one key may correspond to many
/// physical representations (HTML page plus REST JSON). The rendered
/// namespaces (`post-`, `term-`, `post-term-`, `user-`, `home`, `front`)
/// are the wire contract with the edge and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SurrogateKey {
    /// A content item's own representations.
    Post(Uuid),
    /// A term's landing page and listings.
    Term(Uuid),
    /// The set of items associated with a term.
    PostTerm(Uuid),
    /// An author's archive and REST representations.
    User(Uuid),
    /// The main homepage query.
    Home,
    /// The static front page. Kept distinct from [`SurrogateKey::Home`]:
    /// a deployment may serve a separate static front page.
    Front,
}

impl fmt::Display for SurrogateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurrogateKey::Post(id) => write!(f, "post-{id}"),
            SurrogateKey::Term(id) => write!(f, "term-{id}"),
            SurrogateKey::PostTerm(id) => write!(f, "post-term-{id}"),
            SurrogateKey::User(id) => write!(f, "user-{id}"),
            SurrogateKey::Home => f.write_str("home"),
            SurrogateKey::Front => f.write_str("front"),
        }
    }
}

/// Unordered, deduplicated key collection.
pub type KeySet = HashSet<SurrogateKey>;

/// Render a key set as a space-separated header value.
///
/// Keys are sorted lexicographically so identical sets always render
/// identically, independent of hash iteration order.
pub fn render_keys(keys: &KeySet) -> String {
    let mut rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
    rendered.sort();
    rendered.join(" ")
}
