/// Splits `items` into `n` round-robin shards: shard `k` receives the items
/// at indices `k, k + n, k + 2n, ...`.
///
/// Striding rather than contiguous blocks keeps shards balanced when the
/// input order correlates with file size. Returns no shards when `n` is zero
/// or `items` is empty; otherwise exactly `n` shards, some of which may be
/// empty when there are fewer items than shards.
pub fn partition<T>(items: &[T], n: usize) -> Vec<Vec<&T>> {
    if n == 0 || items.is_empty() {
        return Vec::new();
    }

    let per_shard = items.len().div_ceil(n);
    let mut shards: Vec<Vec<&T>> = (0..n).map(|_| Vec::with_capacity(per_shard)).collect();
    for (index, item) in items.iter().enumerate() {
        shards[index % n].push(item);
    }
    shards
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin_assignment() {
        let items: Vec<i32> = (0..10).collect();
        let shards = partition(&items, 3);

        assert_eq!(shards.len(), 3);
        assert_eq!(shards[0], vec![&0, &3, &6, &9]);
        assert_eq!(shards[1], vec![&1, &4, &7]);
        assert_eq!(shards[2], vec![&2, &5, &8]);
    }

    #[test]
    fn test_degenerate_inputs() {
        let items = vec!["a", "b"];
        assert!(partition(&items, 0).is_empty());

        let empty: Vec<&str> = Vec::new();
        assert!(partition(&empty, 4).is_empty());

        let single = partition(&items, 1);
        assert_eq!(single, vec![vec![&"a", &"b"]]);
    }

    #[test]
    fn test_more_shards_than_items() {
        let items = vec!["only"];
        let shards = partition(&items, 4);
        assert_eq!(shards.len(), 4);
        assert_eq!(shards[0], vec![&"only"]);
        assert!(shards[1..].iter().all(Vec::is_empty));
    }

    #[test]
    fn test_completeness_with_duplicates() {
        let items = vec!["a", "b", "a", "c", "a", "d", "e"];
        for n in 1..=9 {
            let shards = partition(&items, n);
            let mut union: Vec<&str> = shards.into_iter().flatten().copied().collect();
            let mut expected = items.clone();
            union.sort_unstable();
            expected.sort_unstable();
            assert_eq!(union, expected, "n = {}", n);
        }
    }

    #[test]
    fn test_shard_sizes_differ_by_at_most_one() {
        let items: Vec<usize> = (0..101).collect();
        for n in 1..=16 {
            let sizes: Vec<usize> = partition(&items, n).iter().map(Vec::len).collect();
            let max = *sizes.iter().max().unwrap();
            let min = *sizes.iter().min().unwrap();
            assert!(max - min <= 1, "n = {}: {:?}", n, sizes);
        }
    }

    #[test]
    fn test_deterministic() {
        let items: Vec<String> = (0..50).map(|i| format!("file_{}.txt", i)).collect();
        assert_eq!(partition(&items, 7), partition(&items, 7));
    }
}
