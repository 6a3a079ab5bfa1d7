// k-combinations of a slice, in lexicographic index order.

/// Every `k`-element subset of `items`, preserving input order inside each.
///
/// `k == 0` yields one empty combination; `k > items.len()` yields none.
pub fn k_combinations<T: Clone>(items: &[T], k: usize) -> Vec<Vec<T>> {
    let n = items.len();
    if k > n {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut indices: Vec<usize> = (0..k).collect();
    loop {
        out.push(indices.iter().map(|&i| items[i].clone()).collect());

        // rightmost index that can still move forward
        let Some(pos) = (0..k).rev().find(|&i| indices[i] != i + n - k) else {
            return out;
        };
        indices[pos] += 1;
        for j in (pos + 1)..k {
            indices[j] = indices[j - 1] + 1;
        }
    }
}

/// `C(n, k)` without overflow for the small sizes used here.
pub fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    (0..k).fold(1usize, |acc, i| acc * (n - i) / (i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_combinations_in_order() {
        let combos = k_combinations(&[1, 2, 3, 4], 2);
        assert_eq!(
            combos,
            vec![
                vec![1, 2],
                vec![1, 3],
                vec![1, 4],
                vec![2, 3],
                vec![2, 4],
                vec![3, 4]
            ]
        );
    }

    #[test]
    fn counts_match_binomial() {
        let items: Vec<u8> = (1..=10).collect();
        for k in 0..=10 {
            assert_eq!(k_combinations(&items, k).len(), binomial(10, k));
        }
        assert_eq!(binomial(10, 6), 210);
        assert_eq!(binomial(7, 6), 7);
    }

    #[test]
    fn edge_sizes() {
        assert_eq!(k_combinations(&[1, 2, 3], 0), vec![Vec::<i32>::new()]);
        assert_eq!(k_combinations(&[1, 2, 3], 3), vec![vec![1, 2, 3]]);
        assert!(k_combinations(&[1, 2], 3).is_empty());
        assert_eq!(binomial(2, 3), 0);
    }
}
