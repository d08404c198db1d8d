//! Sharded string interner for identifier storage.
//!
//! Provides O(1) interning and lookup with thread-safe concurrent access via
//! per-shard locking. The interner is append-only: entries are never removed
//! or rewritten, so readers may hold `&'static str` references freely.
//!
//! Besides plain interning, the interner mints *fresh* (hygienic) names for
//! the desugaring pass. Fresh names are formatted `<purpose$base$seq>`; a
//! user-written Ruby identifier can never contain `<`, so the fresh
//! namespace is disjoint from every user name by construction.

use crate::Name;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Per-shard storage for interned strings.
struct InternShard {
    /// Map from string content to local index.
    map: FxHashMap<&'static str, u32>,
    /// Storage for string contents.
    strings: Vec<&'static str>,
}

/// Error when interning a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternError {
    /// Shard exceeded capacity (over 256 million strings).
    ShardOverflow { shard_idx: usize, count: usize },
}

impl std::fmt::Display for InternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InternError::ShardOverflow { shard_idx, count } => write!(
                f,
                "interner shard {} exceeded capacity: {} strings, max is {}",
                shard_idx,
                count,
                Name::MAX_LOCAL
            ),
        }
    }
}

impl std::error::Error for InternError {}

impl InternShard {
    fn new() -> Self {
        Self {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(256),
        }
    }

    fn with_empty() -> Self {
        let mut shard = Self::new();
        // Pre-intern empty string at index 0
        let empty: &'static str = "";
        shard.map.insert(empty, 0);
        shard.strings.push(empty);
        shard
    }
}

/// Sharded string interner for concurrent access.
///
/// # Thread Safety
/// Uses `RwLock` per shard for concurrent read/write access. Distinct
/// threads interning the same text concurrently observe the same `Name`.
/// Can be wrapped in [`SharedInterner`] for sharing across threads.
pub struct StringInterner {
    shards: [RwLock<InternShard>; Name::NUM_SHARDS],
    /// Total count of interned strings across all shards (O(1) `len()`).
    total_count: AtomicUsize,
}

impl StringInterner {
    /// Create a new interner with pre-interned keywords and selectors.
    pub fn new() -> Self {
        let shards = std::array::from_fn(|i| {
            if i == 0 {
                RwLock::new(InternShard::with_empty())
            } else {
                RwLock::new(InternShard::new())
            }
        });

        // Start with 1 for the empty string pre-interned in shard 0
        let interner = Self {
            shards,
            total_count: AtomicUsize::new(1),
        };
        interner.pre_intern_keywords();
        interner
    }

    /// Compute shard for a string based on its hash.
    #[inline]
    fn shard_for(s: &str) -> usize {
        let mut hash = 0u32;
        for byte in s.bytes().take(8) {
            hash = hash.wrapping_mul(31).wrapping_add(u32::from(byte));
        }
        (hash as usize) % Name::NUM_SHARDS
    }

    /// Try to intern a string, returning its Name or an error on overflow.
    #[inline]
    pub fn try_intern(&self, s: &str) -> Result<Name, InternError> {
        let shard_idx = Self::shard_for(s);
        // shard_idx is always < NUM_SHARDS (16) due to modulo
        #[expect(
            clippy::cast_possible_truncation,
            reason = "shard_idx is bounded by NUM_SHARDS (16)"
        )]
        let shard_idx_u32 = shard_idx as u32;
        let shard = &self.shards[shard_idx];

        // Fast path: check if already interned
        {
            let guard = shard.read();
            if let Some(&local) = guard.map.get(s) {
                return Ok(Name::new(shard_idx_u32, local));
            }
        }

        // Slow path: need to insert
        let mut guard = shard.write();

        // Double-check after acquiring write lock
        if let Some(&local) = guard.map.get(s) {
            return Ok(Name::new(shard_idx_u32, local));
        }

        // Leak the string to get 'static lifetime
        let owned: String = s.to_owned();
        let leaked: &'static str = Box::leak(owned.into_boxed_str());

        let count = guard.strings.len();
        if count > Name::MAX_LOCAL as usize {
            return Err(InternError::ShardOverflow { shard_idx, count });
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "bounded by MAX_LOCAL check above"
        )]
        let local = count as u32;
        guard.strings.push(leaked);
        guard.map.insert(leaked, local);

        // Relaxed is fine - no ordering requirement on the counter
        self.total_count.fetch_add(1, Ordering::Relaxed);

        Ok(Name::new(shard_idx_u32, local))
    }

    /// Intern a string, returning its Name.
    ///
    /// # Panics
    /// Panics if the interner exceeds capacity. Use `try_intern` for
    /// fallible interning.
    #[inline]
    pub fn intern(&self, s: &str) -> Name {
        self.try_intern(s).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Intern an owned String, avoiding the extra allocation `intern` would
    /// perform for a not-yet-seen string.
    ///
    /// # Panics
    /// Panics if the interner exceeds capacity.
    pub fn intern_owned(&self, s: String) -> Name {
        // The fast path hits the borrowed lookup; only a genuinely new
        // string pays for the leak.
        if let Ok(name) = self.try_intern(&s) {
            return name;
        }
        panic!("interner capacity exceeded")
    }

    /// Mint a fresh hygienic name from (purpose tag, base name, sequence).
    ///
    /// The result is `<purpose$base$seq>`, drawn from a namespace no user
    /// identifier can occupy. Deterministic: the same triple always yields
    /// the same `Name`.
    pub fn fresh(&self, purpose: &str, base: Name, seq: u32) -> Name {
        let base_str = self.lookup(base);
        self.intern_owned(format!("<{purpose}${base_str}${seq}>"))
    }

    /// Look up the string for a Name.
    pub fn lookup(&self, name: Name) -> &'static str {
        let shard = &self.shards[name.shard()];
        let guard = shard.read();
        // Interned strings are leaked, so 'static outlives the guard.
        guard.strings[name.local()]
    }

    /// Pre-intern Ruby keywords and the selectors the desugarer emits.
    fn pre_intern_keywords(&self) {
        const KEYWORDS: &[&str] = &[
            // Reserved keywords
            "alias", "and", "begin", "break", "case", "class", "def", "do", "else", "elsif",
            "end", "ensure", "false", "for", "if", "in", "module", "next", "nil", "not", "or",
            "redo", "rescue", "retry", "return", "self", "super", "then", "true", "undef",
            "unless", "until", "when", "while", "yield",
            // Selectors emitted during lowering
            "==", "!", "!=", "===", "=~", "[]", "[]=", "+", "-", "*", "/", "<<", "call",
            "each", "concat", "dup", "new", "nil?", "to_a", "to_s", "to_proc", "alias_method",
            "block_given?", "raise", "StandardError",
        ];

        for kw in KEYWORDS {
            self.intern(kw);
        }
    }

    /// Get the number of interned strings (O(1)).
    pub fn len(&self) -> usize {
        self.total_count.load(Ordering::Relaxed)
    }

    /// Check if the interner is empty (only has the empty string).
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StringInterner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringInterner")
            .field("len", &self.len())
            .finish()
    }
}

/// Shared interner for thread-safe interning across compilation units.
///
/// Multiple units may be lowered concurrently by an outer driver; they all
/// hold clones of one `SharedInterner`. The newtype keeps `Arc` usage in one
/// place instead of scattering `Arc<StringInterner>` through signatures.
#[derive(Clone, Debug)]
pub struct SharedInterner(Arc<StringInterner>);

impl SharedInterner {
    /// Create a new shared interner.
    pub fn new() -> Self {
        SharedInterner(Arc::new(StringInterner::new()))
    }
}

impl Default for SharedInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for SharedInterner {
    type Target = StringInterner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_and_lookup() {
        let interner = StringInterner::new();

        let hello = interner.intern("hello");
        let world = interner.intern("world");
        let hello2 = interner.intern("hello");

        assert_eq!(hello, hello2);
        assert_ne!(hello, world);

        assert_eq!(interner.lookup(hello), "hello");
        assert_eq!(interner.lookup(world), "world");
    }

    #[test]
    fn empty_string() {
        let interner = StringInterner::new();
        let empty = interner.intern("");
        assert_eq!(empty, Name::EMPTY);
        assert_eq!(interner.lookup(Name::EMPTY), "");
    }

    #[test]
    fn keywords_pre_interned() {
        let interner = StringInterner::new();

        let if_name = interner.intern("if");
        let call = interner.intern("call");

        assert_eq!(interner.lookup(if_name), "if");
        assert_eq!(interner.lookup(call), "call");
    }

    #[test]
    fn fresh_names_disjoint_from_user_names() {
        let interner = StringInterner::new();
        let base = interner.intern("x");

        let fresh = interner.fresh("opAsgnTemp", base, 1);
        assert_eq!(interner.lookup(fresh), "<opAsgnTemp$x$1>");

        // Same triple is deterministic, different seq is distinct.
        assert_eq!(interner.fresh("opAsgnTemp", base, 1), fresh);
        assert_ne!(interner.fresh("opAsgnTemp", base, 2), fresh);
    }

    #[test]
    fn shared_interner_observes_same_handles() {
        let interner = SharedInterner::new();
        let interner2 = interner.clone();

        let name1 = interner.intern("shared");
        let name2 = interner2.intern("shared");

        assert_eq!(name1, name2);
    }

    #[test]
    fn concurrent_interning_agrees() {
        let interner = SharedInterner::new();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let interner = interner.clone();
            handles.push(std::thread::spawn(move || interner.intern("racy")));
        }
        let names: Vec<Name> = handles.into_iter().map(|h| match h.join() {
            Ok(n) => n,
            Err(_) => panic!("worker panicked"),
        }).collect();
        assert!(names.windows(2).all(|w| w[0] == w[1]));
    }
}
