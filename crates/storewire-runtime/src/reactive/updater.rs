#![forbid(unsafe_code)]

//! Immutable updates through mutable recipes.
//!
//! [`produce`] hands a recipe a *draft*: a clone of the current snapshot.
//! For states built from persistent containers (such as
//! [`Value`](storewire_core::Value)) that clone is O(1) and every mutation
//! copies only the path it touches, so the next snapshot shares all
//! untouched substructure with the current one. The current snapshot is
//! never reachable mutably.
//!
//! If the recipe leaves the draft equal to the current snapshot, the current
//! `Rc` is returned unchanged, so callers can detect no-ops with
//! [`Rc::ptr_eq`]. The equality check is `PartialEq`; for `Value` it is
//! cheap when containers are still shared and linear in the changed part
//! otherwise.

use std::rc::Rc;

use storewire_core::{FieldPath, PathError, Record, Value};

/// Apply an infallible recipe to a draft of `current`.
pub fn produce<S>(current: &Rc<S>, recipe: impl FnOnce(&mut S)) -> Rc<S>
where
    S: Clone + PartialEq,
{
    let mut draft = S::clone(current);
    recipe(&mut draft);
    finish(current, draft)
}

/// Apply a fallible recipe. On `Err` the draft is discarded and nothing
/// about `current` changes.
pub fn try_produce<S, E>(
    current: &Rc<S>,
    recipe: impl FnOnce(&mut S) -> Result<(), E>,
) -> Result<Rc<S>, E>
where
    S: Clone + PartialEq,
{
    let mut draft = S::clone(current);
    recipe(&mut draft)?;
    Ok(finish(current, draft))
}

fn finish<S: PartialEq>(current: &Rc<S>, draft: S) -> Rc<S> {
    if draft == **current {
        Rc::clone(current)
    } else {
        Rc::new(draft)
    }
}

/// Partial-assignment form of a recipe: top-level keys assigned in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    entries: Vec<(FieldPath, Value)>,
}

impl Patch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an assignment of a top-level key.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((FieldPath::key(key), value.into()));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Apply every assignment to `target`, stopping at the first failure.
    pub fn apply_to<R: Record>(&self, target: &mut R) -> Result<(), PathError> {
        for (key, value) in &self.entries {
            target.write(key, value.clone())?;
        }
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for Patch
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |patch, (k, v)| patch.set(k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn form() -> Rc<Value> {
        Rc::new(Value::from_pairs([
            ("email", Value::from("a@b.c")),
            ("password", Value::from("")),
            (
                "profile",
                Value::from_pairs([("name", "Ada"), ("city", "London")]),
            ),
            ("prefs", Value::from_pairs([("theme", "dark")])),
        ]))
    }

    fn path(raw: &str) -> FieldPath {
        raw.parse().unwrap()
    }

    #[test]
    fn scalar_reassignment_leaves_current_untouched() {
        let current = form();
        let before = (*current).clone();
        let next = produce(&current, |draft| {
            draft.insert("email", "x@y.z").unwrap();
        });
        assert_eq!(*current, before);
        assert_eq!(next.get("email"), Some(&Value::from("x@y.z")));
    }

    #[test]
    fn nested_reassignment_shares_siblings() {
        let current = form();
        let next = produce(&current, |draft| {
            draft.set_path(&path("profile.city"), "Paris").unwrap();
        });
        assert!(current.get("prefs").unwrap().ptr_eq(next.get("prefs").unwrap()));
        assert!(!current.get("profile").unwrap().ptr_eq(next.get("profile").unwrap()));
        assert_eq!(
            current.get_path(&path("profile.city")),
            Some(&Value::from("London"))
        );
    }

    #[test]
    fn array_push_at_depth() {
        let current = Rc::new(Value::from_pairs([(
            "lists",
            Value::from_pairs([("todo", Value::array())]),
        )]));
        let next = produce(&current, |draft| {
            draft
                .get_path_mut(&path("lists.todo"))
                .unwrap()
                .push("write tests")
                .unwrap();
        });
        assert_eq!(current.get_path(&path("lists.todo")).unwrap().len(), 0);
        assert_eq!(
            next.get_path(&path("lists.todo.0")),
            Some(&Value::from("write tests"))
        );
    }

    #[test]
    fn no_op_returns_same_snapshot() {
        let current = form();
        let next = produce(&current, |draft| {
            draft.insert("email", "a@b.c").unwrap();
        });
        assert!(Rc::ptr_eq(&current, &next));
    }

    #[test]
    fn failed_recipe_discards_draft() {
        let current = form();
        let result: Result<Rc<Value>, PathError> = try_produce(&current, |draft| {
            draft.insert("email", "changed")?;
            draft.set_path(&path("email.local"), "x")
        });
        assert!(result.is_err());
        assert_eq!(current.get("email"), Some(&Value::from("a@b.c")));
    }

    #[test]
    fn patch_assigns_top_level_keys() {
        let current = form();
        let patch = Patch::new().set("email", "p@q.r").set("password", "hunter2");
        let next = try_produce(&current, |draft| patch.apply_to(draft)).unwrap();
        assert_eq!(next.get("email"), Some(&Value::from("p@q.r")));
        assert_eq!(next.get("password"), Some(&Value::from("hunter2")));
        assert!(current.get("profile").unwrap().ptr_eq(next.get("profile").unwrap()));
    }

    #[test]
    fn patch_from_iter_keeps_order() {
        let patch: Patch = [("a", 1), ("b", 2), ("a", 3)].into_iter().collect();
        let keys: Vec<String> = patch.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, ["a", "b", "a"]);
        let mut target = Value::object();
        patch.apply_to(&mut target).unwrap();
        assert_eq!(target.get("a"), Some(&Value::from(3)));
    }

    proptest! {
        #[test]
        fn prop_current_never_mutated(
            keys in prop::collection::vec("[a-d]", 1..8),
            values in prop::collection::vec(-100i32..100, 1..8),
        ) {
            let current = form();
            let before = (*current).clone();
            let next = produce(&current, |draft| {
                for (k, v) in keys.iter().zip(&values) {
                    draft.set_path(&FieldPath::key("scratch").child(k.clone()), *v).unwrap();
                }
            });
            prop_assert_eq!(&*current, &before);
            prop_assert!(current.get("profile").unwrap().ptr_eq(next.get("profile").unwrap()));
            let expected = Rc::new(before);
            let replay = produce(&expected, |draft| {
                for (k, v) in keys.iter().zip(&values) {
                    draft.set_path(&FieldPath::key("scratch").child(k.clone()), *v).unwrap();
                }
            });
            prop_assert_eq!(&*replay, &*next);
        }
    }
}
