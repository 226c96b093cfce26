//! Clear-and-append replacement for collections exposed only through a
//! mutable getter. The collection object is kept; only its contents
//! change.

use crate::null::check_present;
use std::collections::{BTreeSet, HashSet, LinkedList, VecDeque};
use std::hash::{BuildHasher, Hash};

/// A collection that can be emptied and extended in place.
pub trait Collection<T>: Extend<T> {
    fn clear_all(&mut self);
}

impl<T> Collection<T> for Vec<T> {
    fn clear_all(&mut self) {
        self.clear();
    }
}

impl<T> Collection<T> for VecDeque<T> {
    fn clear_all(&mut self) {
        self.clear();
    }
}

impl<T> Collection<T> for LinkedList<T> {
    fn clear_all(&mut self) {
        self.clear();
    }
}

impl<T: Ord> Collection<T> for BTreeSet<T> {
    fn clear_all(&mut self) {
        self.clear();
    }
}

impl<T: Eq + Hash, S: BuildHasher> Collection<T> for HashSet<T, S> {
    fn clear_all(&mut self) {
        self.clear();
    }
}

/// Replace the contents of `target` with `items`, in iteration order.
pub fn replace_contents<C, T, I>(target: &mut C, items: I)
where
    C: Collection<T>,
    I: IntoIterator<Item = T>,
{
    target.clear_all();
    target.extend(items);
}

/// Like [`replace_contents`], but every element must be present. The
/// elements are checked before the collection is touched, so a rejected
/// call leaves the old contents in place.
pub fn replace_contents_present<C, T, I>(target: &mut C, items: I, name: &str)
where
    C: Collection<Option<T>>,
    I: IntoIterator<Item = Option<T>>,
{
    let items: Vec<Option<T>> = items.into_iter().collect();
    for item in &items {
        check_present(name, item);
    }
    replace_contents(target, items);
}
