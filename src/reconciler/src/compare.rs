/// Order-independent, element-exact comparison of two collections.
///
/// Both sides are sorted and compared element-wise, so repeated values must
/// appear equally often on both sides. Callers deduplicate beforehand when
/// set semantics are wanted.
pub fn same_members<T: Ord + Clone>(left: &[T], right: &[T]) -> bool {
    if left.len() != right.len() {
        return false;
    }

    let mut left = left.to_vec();
    let mut right = right.to_vec();
    left.sort_unstable();
    right.sort_unstable();
    left == right
}
