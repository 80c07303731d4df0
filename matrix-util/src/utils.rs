use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// partition dense membership ids into groups of indexes
/// # Arguments
/// * `membership` - a vector of membership (E.g., cell type id); ids at
///   or above `ngroups` are ignored
/// * `ngroups` - number of groups
/// # Returns
/// `ngroups` vectors of element indexes, each in increasing order
pub fn partition_by_membership(membership: &[usize], ngroups: usize) -> Vec<Vec<usize>> {
    let mut groups = vec![vec![]; ngroups];
    for (elem, &k) in membership.iter().enumerate() {
        if k < ngroups {
            groups[k].push(elem);
        }
    }
    groups
}

/// A local pool with `num_threads` workers (at least one), so that
/// each call controls its own parallelism without touching the global
/// pool
pub fn local_thread_pool(num_threads: usize) -> Result<ThreadPool, ThreadPoolBuildError> {
    ThreadPoolBuilder::new()
        .num_threads(num_threads.max(1))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_keeps_order() {
        let groups = partition_by_membership(&[1, 0, 1, 2, 0], 4);
        assert_eq!(groups, vec![vec![1, 4], vec![0, 2], vec![3], vec![]]);
    }
}
