//! Linear lookup helpers over lists of named records.

/// A record identified by a name.
pub trait Named {
    /// The record's name.
    fn name(&self) -> &str;
}

/// First record called `name`.
pub fn find_by_name<'a, T: Named>(items: &'a [T], name: &str) -> Option<&'a T> {
    items.iter().find(|item| item.name() == name)
}

/// Replace the first record called `name` with `replacement`.
/// Returns whether anything was replaced.
pub fn update_by_name<T: Named>(items: &mut [T], name: &str, replacement: T) -> bool {
    match items.iter_mut().find(|item| item.name() == name) {
        Some(slot) => {
            *slot = replacement;
            true
        }
        None => false,
    }
}

/// Remove the first record called `name`, returning it.
pub fn delete_by_name<T: Named>(items: &mut Vec<T>, name: &str) -> Option<T> {
    let idx = items.iter().position(|item| item.name() == name)?;
    Some(items.remove(idx))
}
