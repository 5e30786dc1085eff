pub trait DependencyHint {
    fn dependency_name(&self) -> Option<&str>;

    fn dependencies(&self) -> &[String];
}

/// Orders siblings so that declared dependents run after what they depend on.
///
/// Siblings that take part in no dependency relation keep their declaration
/// slot. The others are reordered among their own slots: each slot takes the
/// earliest-declared sibling whose dependencies have all been placed. Unknown
/// names are ignored and cycles are not rejected; when only cyclic siblings
/// remain, the earliest-declared one is placed next.
pub fn sort_by_dependencies<T: DependencyHint>(items: Vec<T>) -> Vec<T> {
    let count = items.len();
    let prerequisites: Vec<Vec<usize>> = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            items
                .iter()
                .enumerate()
                .filter(|(other_index, other)| *other_index != index && depends_on(item, *other))
                .map(|(other_index, _)| other_index)
                .collect()
        })
        .collect();
    let related: Vec<usize> = (0..count)
        .filter(|index| {
            !prerequisites[*index].is_empty()
                || prerequisites.iter().any(|required| required.contains(index))
        })
        .collect();

    let mut placed = vec![false; count];
    let mut scheduled = Vec::with_capacity(related.len());
    while scheduled.len() < related.len() {
        let ready = related
            .iter()
            .copied()
            .find(|&index| !placed[index] && prerequisites[index].iter().all(|&p| placed[p]));
        let Some(next) = ready.or_else(|| related.iter().copied().find(|&index| !placed[index]))
        else {
            break;
        };
        placed[next] = true;
        scheduled.push(next);
    }

    let mut order: Vec<usize> = (0..count).collect();
    for (slot, index) in related.iter().zip(scheduled) {
        order[*slot] = index;
    }
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect()
}

fn depends_on<T: DependencyHint>(item: &T, other: &T) -> bool {
    other
        .dependency_name()
        .is_some_and(|name| item.dependencies().iter().any(|dependency| dependency == name))
}
