//! Copy-on-write tree edits.
//!
//! Elements are addressed by an index path from the submodel roots
//! (`[2, 0]` is the first child of the third root). Every operation
//! leaves its input untouched and returns a new root vector.

use crate::model::SubmodelElement;

/// Errors raised by tree edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// The path does not address an element
    #[error("no element at path {0:?}")]
    NoSuchPath(Vec<usize>),
    /// The addressed element cannot hold children
    #[error("element at path {0:?} is not a collection or list")]
    NotAContainer(Vec<usize>),
    /// The element's cardinality forbids removal
    #[error("element \"{0}\" is required and cannot be removed")]
    NotDeletable(String),
    /// An index is outside the sibling range
    #[error("index {index} out of range for {len} siblings")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of siblings
        len: usize,
    },
}

/// Look up the element at `path`.
#[must_use]
pub fn get<'a>(roots: &'a [SubmodelElement], path: &[usize]) -> Option<&'a SubmodelElement> {
    let (first, rest) = path.split_first()?;
    let mut current = roots.get(*first)?;
    for index in rest {
        current = current.children()?.get(*index)?;
    }
    Some(current)
}

/// Apply `f` to the element at `path`.
///
/// # Errors
///
/// Returns [`EditError::NoSuchPath`] if `path` is empty or dangling.
pub fn update_at<F>(
    roots: &[SubmodelElement],
    path: &[usize],
    f: F,
) -> Result<Vec<SubmodelElement>, EditError>
where
    F: FnOnce(&mut SubmodelElement),
{
    let mut out = roots.to_vec();
    let target = get_mut(&mut out, path).ok_or_else(|| EditError::NoSuchPath(path.to_vec()))?;
    f(target);
    Ok(out)
}

/// Replace the element at `path`.
///
/// # Errors
///
/// Returns [`EditError::NoSuchPath`] if `path` is empty or dangling.
pub fn replace_at(
    roots: &[SubmodelElement],
    path: &[usize],
    element: SubmodelElement,
) -> Result<Vec<SubmodelElement>, EditError> {
    update_at(roots, path, |slot| *slot = element)
}

/// Insert `element` as child `index` of the container at `parent_path`.
///
/// An empty `parent_path` inserts among the roots; `index` equal to the
/// sibling count appends.
///
/// # Errors
///
/// Fails if the parent does not exist, cannot hold children, or `index`
/// is past the end.
pub fn insert_child(
    roots: &[SubmodelElement],
    parent_path: &[usize],
    index: usize,
    element: SubmodelElement,
) -> Result<Vec<SubmodelElement>, EditError> {
    let mut out = roots.to_vec();
    let siblings = siblings_mut(&mut out, parent_path)?;
    if index > siblings.len() {
        return Err(EditError::IndexOutOfRange {
            index,
            len: siblings.len(),
        });
    }
    siblings.insert(index, element);
    Ok(out)
}

/// Remove the element at `path`.
///
/// # Errors
///
/// Fails with [`EditError::NotDeletable`] unless the element's cardinality
/// is `ZeroToOne` or `ZeroToMany`.
pub fn remove_at(
    roots: &[SubmodelElement],
    path: &[usize],
) -> Result<Vec<SubmodelElement>, EditError> {
    let (index, parent_path) = path
        .split_last()
        .ok_or_else(|| EditError::NoSuchPath(path.to_vec()))?;
    let target = get(roots, path).ok_or_else(|| EditError::NoSuchPath(path.to_vec()))?;
    if !target.cardinality.is_deletable() {
        return Err(EditError::NotDeletable(target.id_short.clone()));
    }

    let mut out = roots.to_vec();
    siblings_mut(&mut out, parent_path)?.remove(*index);
    Ok(out)
}

/// Move child `from` of the container at `parent_path` to position `to`.
///
/// # Errors
///
/// Fails if the parent does not exist or either index is out of range.
pub fn move_child(
    roots: &[SubmodelElement],
    parent_path: &[usize],
    from: usize,
    to: usize,
) -> Result<Vec<SubmodelElement>, EditError> {
    let mut out = roots.to_vec();
    let siblings = siblings_mut(&mut out, parent_path)?;
    let len = siblings.len();
    for index in [from, to] {
        if index >= len {
            return Err(EditError::IndexOutOfRange { index, len });
        }
    }
    let element = siblings.remove(from);
    siblings.insert(to, element);
    Ok(out)
}

/// Resolve a dotted idShort path (`Outer.Inner`) to an index path.
#[must_use]
pub fn find_path(roots: &[SubmodelElement], id_short_path: &str) -> Option<Vec<usize>> {
    let mut path = Vec::new();
    let mut level = roots;
    for segment in id_short_path.split('.') {
        let index = level.iter().position(|e| e.id_short == segment)?;
        path.push(index);
        level = level[index].children().unwrap_or(&[]);
    }
    Some(path)
}

/// Render an index path as a dotted idShort path.
#[must_use]
pub fn id_short_path(roots: &[SubmodelElement], path: &[usize]) -> Option<String> {
    let mut segments = Vec::with_capacity(path.len());
    for depth in 1..=path.len() {
        segments.push(get(roots, &path[..depth])?.id_short.as_str());
    }
    Some(segments.join("."))
}

fn get_mut<'a>(
    roots: &'a mut [SubmodelElement],
    path: &[usize],
) -> Option<&'a mut SubmodelElement> {
    let (first, rest) = path.split_first()?;
    let mut current = roots.get_mut(*first)?;
    for index in rest {
        current = current.children_mut()?.get_mut(*index)?;
    }
    Some(current)
}

fn siblings_mut<'a>(
    roots: &'a mut Vec<SubmodelElement>,
    parent_path: &[usize],
) -> Result<&'a mut Vec<SubmodelElement>, EditError> {
    if parent_path.is_empty() {
        return Ok(roots);
    }
    let parent =
        get_mut(roots, parent_path).ok_or_else(|| EditError::NoSuchPath(parent_path.to_vec()))?;
    parent
        .children_mut()
        .ok_or_else(|| EditError::NotAContainer(parent_path.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cardinality, ElementContent};
    use crate::types::XsdType;

    fn tree() -> Vec<SubmodelElement> {
        vec![
            SubmodelElement::property("Serial", Some(XsdType::String), "SN-1"),
            SubmodelElement::collection(
                "Address",
                vec![
                    SubmodelElement::property("Street", Some(XsdType::String), "Main St")
                        .with_cardinality(Cardinality::ZeroToOne),
                    SubmodelElement::property("City", Some(XsdType::String), "Berlin"),
                ],
            ),
        ]
    }

    #[test]
    fn update_leaves_input_untouched() {
        let before = tree();
        let after = update_at(&before, &[1, 1], |e| {
            e.content = ElementContent::Property {
                value_type: Some(XsdType::String),
                value: "Munich".to_string(),
            };
        })
        .unwrap();
        assert_ne!(before, after);
        assert_eq!(get(&before, &[1, 1]), tree()[1].children().unwrap().get(1));
        assert!(matches!(
            &get(&after, &[1, 1]).unwrap().content,
            ElementContent::Property { value, .. } if value == "Munich"
        ));
    }

    #[test]
    fn remove_respects_cardinality() {
        let roots = tree();
        let removed = remove_at(&roots, &[1, 0]).unwrap();
        assert_eq!(removed[1].children().unwrap().len(), 1);

        let err = remove_at(&roots, &[0]).unwrap_err();
        assert_eq!(err, EditError::NotDeletable("Serial".to_string()));
    }

    #[test]
    fn insert_into_leaf_fails() {
        let roots = tree();
        let child = SubmodelElement::property("X", None, "");
        assert_eq!(
            insert_child(&roots, &[0], 0, child.clone()).unwrap_err(),
            EditError::NotAContainer(vec![0])
        );
        let inserted = insert_child(&roots, &[1], 2, child).unwrap();
        assert_eq!(inserted[1].children().unwrap()[2].id_short, "X");
    }

    #[test]
    fn move_reorders_siblings() {
        let moved = move_child(&tree(), &[], 1, 0).unwrap();
        assert_eq!(moved[0].id_short, "Address");
        assert!(matches!(
            move_child(&tree(), &[1], 0, 5),
            Err(EditError::IndexOutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn dotted_paths_resolve_both_ways() {
        let roots = tree();
        assert_eq!(find_path(&roots, "Address.City"), Some(vec![1, 1]));
        assert_eq!(find_path(&roots, "Address.Zip"), None);
        assert_eq!(id_short_path(&roots, &[1, 0]).as_deref(), Some("Address.Street"));
    }
}
