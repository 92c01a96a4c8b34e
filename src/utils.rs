/// Lexicographic k-combinations of a slice.
///
/// Combinations are produced in the order of their index tuples
/// `(i1 < i2 < ... < ik)`, so for a sorted input the output is sorted
/// lexicographically as well:
///
/// ```text
/// [0, 1, 2, 3], k = 2 -> [0,1] [0,2] [0,3] [1,2] [1,3] [2,3]
/// ```
///
/// `k = 0` yields exactly one (empty) combination; `k > n` yields none.
pub struct Combinations<'a, T> {
    items: &'a [T],
    indices: Vec<usize>,
    first: bool,
    done: bool,
}

pub fn combinations<T>(items: &[T], k: usize) -> Combinations<'_, T> {
    Combinations {
        items,
        indices: (0..k).collect(),
        first: true,
        done: k > items.len(),
    }
}

impl<T: Clone> Iterator for Combinations<'_, T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if self.first {
            self.first = false;
        } else {
            let n = self.items.len();
            let k = self.indices.len();

            // Find the rightmost index that can still be advanced.
            let mut i = k;
            loop {
                if i == 0 {
                    self.done = true;
                    return None;
                }
                i -= 1;
                if self.indices[i] != i + n - k {
                    break;
                }
            }

            self.indices[i] += 1;
            for j in i + 1..k {
                self.indices[j] = self.indices[j - 1] + 1;
            }
        }

        Some(self.indices.iter().map(|&i| self.items[i].clone()).collect())
    }
}

/// Binomial coefficient `n choose k`, saturating on overflow.
pub fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: usize = 1;
    for i in 0..k {
        result = result.saturating_mul(n - i) / (i + 1);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combinations_lexicographic() {
        let items = [0, 1, 2, 3];
        let combos: Vec<Vec<i32>> = combinations(&items, 2).collect();
        assert_eq!(
            combos,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
    }

    #[test]
    fn test_combinations_edge_sizes() {
        let items = [5, 6, 7];
        assert_eq!(combinations(&items, 0).collect::<Vec<_>>(), vec![Vec::<i32>::new()]);
        assert_eq!(combinations(&items, 3).collect::<Vec<_>>(), vec![vec![5, 6, 7]]);
        assert_eq!(combinations(&items, 4).count(), 0);

        let empty: [i32; 0] = [];
        assert_eq!(combinations(&empty, 0).count(), 1);
        assert_eq!(combinations(&empty, 1).count(), 0);
    }

    #[test]
    fn test_combinations_count_matches_binomial() {
        let items: Vec<usize> = (0..7).collect();
        for k in 0..=8 {
            assert_eq!(combinations(&items, k).count(), binomial(7, k));
        }
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(5, 0), 1);
        assert_eq!(binomial(5, 2), 10);
        assert_eq!(binomial(5, 5), 1);
        assert_eq!(binomial(3, 4), 0);
        assert_eq!(binomial(20, 10), 184756);
    }
}
