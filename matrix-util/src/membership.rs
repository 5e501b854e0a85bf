use fnv::FnvHashMap as HashMap;
use std::hash::Hash;

/// partition membership vector into groups of indexes
/// # Arguments
/// * `membership` - a vector of membership (E.g., pseudobulk assignment)
/// # Returns
/// A hashmap: group name -> indexes of the elements in ascending order
pub fn partition_by_membership<T>(membership: &[T]) -> HashMap<T, Vec<usize>>
where
    T: Eq + Hash + Clone,
{
    let mut groups: HashMap<T, Vec<usize>> = HashMap::default();
    for (j, k) in membership.iter().enumerate() {
        groups.entry(k.clone()).or_default().push(j);
    }
    groups
}

/// Distinct values in the order they first appear
pub fn unique_in_order<T>(membership: &[T]) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut seen = fnv::FnvHashSet::default();
    membership
        .iter()
        .filter(|x| seen.insert((*x).clone()))
        .cloned()
        .collect()
}
