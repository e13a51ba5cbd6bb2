//! Inline-first hash maps and sets for small, copy-friendly working sets.
//!
//! Two open-addressing engines share one external contract:
//!
//! - [`InlineMap`] / [`InlineSet`] probe quadratically over a single flat
//!   bucket array and mark empty and erased slots with user-chosen sentinel
//!   keys (configured through [`InlineOptions`]).
//! - [`HopMap`] / [`HopSet`] use hopscotch hashing: each home bucket keeps a
//!   27-bit bitmap of its residents and every occupied bucket remembers the
//!   offset back to its home, so lookups touch a bounded neighborhood and no
//!   sentinel keys are needed.
//!
//! Both embed their first `N` buckets directly in the container value, which
//! makes small, short-lived tables allocation-free. Capacity is always a
//! power of two and doubles when the load factor (inline engine) or a
//! placement failure (hopscotch engine) demands it.
//!
//! None of the containers are thread-safe; each instance belongs to a single
//! owner.
//!
//! # Example
//!
//! ```
//! use tinytable::{HopMap, InlineMap, InlineOptions};
//!
//! let mut hop: HopMap<String, u32, 8> = HopMap::new();
//! hop.insert("hello".to_string(), 1);
//! assert_eq!(hop.get("hello"), Some(&1));
//!
//! let options = InlineOptions::new(i64::MIN).deleted_key(i64::MIN + 1);
//! let mut inline: InlineMap<i64, u32, 8> = InlineMap::new(options);
//! inline.insert(7, 70);
//! assert_eq!(inline.remove(&7), Some(70));
//! ```

pub mod entry;
pub mod iter;
pub mod map;
pub mod set;

mod hopscotch;
mod inline;
mod meta;
mod storage;

pub use entry::{
    HopEntry, HopOccupiedEntry, HopVacantEntry, InlineEntry, InlineOccupiedEntry,
    InlineVacantEntry,
};
pub use inline::InlineOptions;
pub use map::{HopMap, InlineMap};
pub use set::{HopSet, InlineSet};
