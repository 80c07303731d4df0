//! Helpers that turn names into dense integer ids.

use fnv::FnvHashMap as HashMap;
use fnv::FnvHashSet as HashSet;

/// Factorize names into levels (in order of first occurrence) and the
/// level index of each element
pub fn factorize(xs: &[Box<str>]) -> (Vec<Box<str>>, Vec<usize>) {
    let mut levels: Vec<Box<str>> = vec![];
    let mut level_index: HashMap<Box<str>, usize> = HashMap::default();
    let ids = xs
        .iter()
        .map(|x| {
            *level_index.entry(x.clone()).or_insert_with(|| {
                levels.push(x.clone());
                levels.len() - 1
            })
        })
        .collect();
    (levels, ids)
}

/// Union of several name lists, in order of first occurrence
pub fn stable_union(lists: &[&[Box<str>]]) -> Vec<Box<str>> {
    let mut seen: HashSet<&str> = HashSet::default();
    let mut out = vec![];
    for x in lists.iter().flat_map(|l| l.iter()) {
        if seen.insert(x.as_ref()) {
            out.push(x.clone());
        }
    }
    out
}

/// Names present in every list, in the order of the first list,
/// without duplicates
pub fn stable_intersect(lists: &[&[Box<str>]]) -> Vec<Box<str>> {
    let Some((first, rest)) = lists.split_first() else {
        return vec![];
    };
    let others: Vec<HashSet<&str>> = rest
        .iter()
        .map(|l| l.iter().map(|x| x.as_ref()).collect())
        .collect();

    let mut seen: HashSet<&str> = HashSet::default();
    let mut out = vec![];
    for x in first.iter() {
        if others.iter().all(|s| s.contains(&**x)) && seen.insert(&**x) {
            out.push(x.clone());
        }
    }
    out
}

/// Position of each of `xs` within `levels` (first occurrence wins)
pub fn match_names(xs: &[Box<str>], levels: &[Box<str>]) -> Vec<Option<usize>> {
    let index = crate::markers::first_occurrence(levels);
    xs.iter().map(|x| index.get(x.as_ref()).copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(xs: &[&str]) -> Vec<Box<str>> {
        xs.iter().map(|&x| Box::from(x)).collect()
    }

    #[test]
    fn factorize_by_first_occurrence() {
        let (levels, ids) = factorize(&names(&["T", "B", "T", "NK", "B"]));
        assert_eq!(levels, names(&["T", "B", "NK"]));
        assert_eq!(ids, vec![0, 1, 0, 2, 1]);
    }

    #[test]
    fn union_and_intersection() {
        let a = names(&["g1", "g2", "g3", "g2"]);
        let b = names(&["g3", "g4", "g2"]);
        assert_eq!(stable_union(&[&a[..], &b[..]]), names(&["g1", "g2", "g3", "g4"]));
        assert_eq!(stable_intersect(&[&a[..], &b[..]]), names(&["g2", "g3"]));
        assert_eq!(
            match_names(&names(&["g4", "g9"]), &b),
            vec![Some(1), None]
        );
    }

    #[test]
    fn intersection_of_three_lists_with_repeats() {
        let a = names(&["g5", "g1", "g5", "g2", "g1"]);
        let b = names(&["g1", "g2", "g5", "g5"]);
        let c = names(&["g2", "g5", "g9"]);
        assert_eq!(
            stable_intersect(&[&a[..], &b[..], &c[..]]),
            names(&["g5", "g2"])
        );
        assert_eq!(stable_intersect(&[&a[..]]), names(&["g5", "g1", "g2"]));
        assert!(stable_intersect(&[]).is_empty());
    }
}
