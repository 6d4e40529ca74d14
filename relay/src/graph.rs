//! # Runtime Type Graph
//!
//! Rust has no ambient inheritance reflection, so the type system that
//! dispatch operates over is reified here as an explicit graph. Each type
//! is interned under a stable [`TypeToken`] and carries:
//!
//! - a **true ancestor chain**: the type itself first, [`TypeGraph::ROOT`]
//!   last, fixed at definition time by C3-linearizing the declared bases;
//! - a list of declared **virtual supertypes**: structural "is considered a
//!   subtype of" facts independent of true ancestry, append-only.
//!
//! Declaring a virtual relation bumps a monotonic version counter. Dispatch
//! caches tag their entries with this version and discard them when it has
//! advanced, so a resolved order is never reused across ancestry changes.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::debug;

/// Stable identity of a type within one [`TypeGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeToken(u32);

impl TypeToken {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Values that participate in dispatch: they report their runtime type.
pub trait Typed {
    /// The token of this value's type in the dispatch graph.
    fn type_token(&self) -> TypeToken;
}

/// Graph construction errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A base or relation endpoint refers to a token the graph never issued.
    #[error("unknown type token {0:?}")]
    UnknownType(TypeToken),

    /// The same base was declared twice for one type.
    #[error("duplicate base `{0}`")]
    DuplicateBase(String),

    /// The declared bases admit no consistent linearization.
    #[error("cannot linearize bases of `{0}`: inconsistent ancestry")]
    InconsistentBases(String),
}

/// Graph result type.
pub type GraphResult<T> = Result<T, GraphError>;

struct TypeInfo {
    name: String,
    /// True ancestor chain: the type itself first, `ROOT` last.
    chain: Vec<TypeToken>,
    /// Declared structural supertypes. Append-only, no retraction.
    virtual_supers: Vec<TypeToken>,
}

/// The shared, append-only type system that dispatchers resolve against.
pub struct TypeGraph {
    types: RwLock<Vec<TypeInfo>>,
    /// Bumped on every virtual-relation declaration.
    version: AtomicU64,
}

impl TypeGraph {
    /// The universal root type (`Any`); every chain ends here.
    pub const ROOT: TypeToken = TypeToken(0);

    /// Creates a graph containing only the root type.
    pub fn new() -> Self {
        let root = TypeInfo {
            name: "Any".to_string(),
            chain: vec![Self::ROOT],
            virtual_supers: Vec::new(),
        };
        Self {
            types: RwLock::new(vec![root]),
            version: AtomicU64::new(0),
        }
    }

    /// Interns a new type with the given true bases.
    ///
    /// An empty base list means the type derives directly from the root.
    /// The true ancestor chain is fixed here, once, by a C3 merge of the
    /// bases' chains plus the local base order; a base set that admits no
    /// consistent order is a configuration error.
    pub fn define(&self, name: &str, bases: &[TypeToken]) -> GraphResult<TypeToken> {
        let mut types = self.types.write();
        let token = TypeToken(types.len() as u32);

        let mut seen = FxHashSet::default();
        for &base in bases {
            if base.index() >= types.len() {
                return Err(GraphError::UnknownType(base));
            }
            if !seen.insert(base) {
                return Err(GraphError::DuplicateBase(types[base.index()].name.clone()));
            }
        }

        let effective: Vec<TypeToken> = if bases.is_empty() {
            vec![Self::ROOT]
        } else {
            bases.to_vec()
        };

        let mut sequences: Vec<Vec<TypeToken>> = effective
            .iter()
            .map(|base| types[base.index()].chain.clone())
            .collect();
        sequences.push(effective);

        let mut chain = vec![token];
        chain.extend(
            c3_merge(sequences).ok_or_else(|| GraphError::InconsistentBases(name.to_string()))?,
        );

        types.push(TypeInfo {
            name: name.to_string(),
            chain,
            virtual_supers: Vec::new(),
        });
        Ok(token)
    }

    /// Declares `ancestor` as a structural (virtual) supertype of `subject`.
    ///
    /// Append-only; declaring a relation already implied by true ancestry is
    /// accepted and harmless. Bumps the graph version, invalidating every
    /// dispatch cache entry computed under the old ancestry.
    pub fn declare_virtual(&self, ancestor: TypeToken, subject: TypeToken) -> GraphResult<()> {
        let mut types = self.types.write();
        if ancestor.index() >= types.len() {
            return Err(GraphError::UnknownType(ancestor));
        }
        if subject.index() >= types.len() {
            return Err(GraphError::UnknownType(subject));
        }
        let info = &mut types[subject.index()];
        if !info.virtual_supers.contains(&ancestor) {
            info.virtual_supers.push(ancestor);
        }
        drop(types);
        let version = self.version.fetch_add(1, Ordering::Release) + 1;
        debug!(?ancestor, ?subject, version, "declared virtual ancestor");
        Ok(())
    }

    /// Current graph version. Monotonically increasing.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Whether the graph has issued this token.
    pub fn contains(&self, token: TypeToken) -> bool {
        token.index() < self.types.read().len()
    }

    /// The name a type was defined under.
    pub fn name(&self, token: TypeToken) -> GraphResult<String> {
        let types = self.types.read();
        types
            .get(token.index())
            .map(|info| info.name.clone())
            .ok_or(GraphError::UnknownType(token))
    }

    /// Name for diagnostics; falls back to the raw token for unknown types.
    pub(crate) fn display_name(&self, token: TypeToken) -> String {
        self.name(token).unwrap_or_else(|_| format!("{token:?}"))
    }

    /// The true ancestor chain of a type, itself first, root last.
    pub fn true_chain(&self, token: TypeToken) -> GraphResult<Vec<TypeToken>> {
        let types = self.types.read();
        types
            .get(token.index())
            .map(|info| info.chain.clone())
            .ok_or(GraphError::UnknownType(token))
    }

    /// Whether `ancestor` appears in `of`'s true ancestor chain.
    ///
    /// Every type is a true ancestor of itself. Unknown tokens are never
    /// related.
    pub fn is_true_ancestor(&self, ancestor: TypeToken, of: TypeToken) -> bool {
        let types = self.types.read();
        types
            .get(of.index())
            .map(|info| info.chain.contains(&ancestor))
            .unwrap_or(false)
    }

    /// All ancestors of a type: the transitive closure over true chains and
    /// declared virtual relations. Includes the type itself.
    pub fn ancestors(&self, token: TypeToken) -> GraphResult<FxHashSet<TypeToken>> {
        let types = self.types.read();
        if token.index() >= types.len() {
            return Err(GraphError::UnknownType(token));
        }
        let mut seen = FxHashSet::default();
        let mut work = vec![token];
        while let Some(current) = work.pop() {
            for &member in &types[current.index()].chain {
                if seen.insert(member) {
                    work.push(member);
                }
                for &sup in &types[member.index()].virtual_supers {
                    if !seen.contains(&sup) {
                        work.push(sup);
                    }
                }
            }
        }
        Ok(seen)
    }

    /// Whether `sub` is a subtype of `sup`, through true or virtual edges.
    pub fn is_subtype(&self, sub: TypeToken, sup: TypeToken) -> bool {
        self.ancestors(sub)
            .map(|set| set.contains(&sup))
            .unwrap_or(false)
    }

    /// Whether `ancestor` is reachable from `of` only via some virtual
    /// relation, i.e. it is a subtype ancestor but not a true one.
    pub fn is_virtual_ancestor(&self, ancestor: TypeToken, of: TypeToken) -> bool {
        !self.is_true_ancestor(ancestor, of) && self.is_subtype(of, ancestor)
    }
}

impl Default for TypeGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Standard C3 merge: repeatedly take the first head that appears in no
/// other sequence's tail. `None` when the sequences are contradictory.
fn c3_merge(mut sequences: Vec<Vec<TypeToken>>) -> Option<Vec<TypeToken>> {
    let mut merged = Vec::new();
    loop {
        sequences.retain(|seq| !seq.is_empty());
        if sequences.is_empty() {
            return Some(merged);
        }
        let head = sequences
            .iter()
            .map(|seq| seq[0])
            .find(|&candidate| {
                !sequences.iter().any(|seq| seq[1..].contains(&candidate))
            })?;
        merged.push(head);
        for seq in &mut sequences {
            if seq[0] == head {
                seq.remove(0);
            }
        }
    }
}
