//! Network segmentation: splits ways at nodes shared between ways so every
//! segment owns its endpoints.

/// One topology segment. `row` references the identifier row of the way the
/// segment came from; `source` and `target` are its first and last node ids.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub row: usize,
    pub source: i64,
    pub target: i64,
    pub points: Vec<[f32; 2]>,
}

/// Splits each way's node list at shared nodes.
///
/// A segment begins at a way's start node or at any node that appears in
/// more than one place across the input; interior shared nodes are repeated
/// so that adjacent segments both carry the junction.
pub(crate) fn split_at_shared(ways: &[(usize, Vec<i64>)]) -> Vec<(usize, Vec<i64>)> {
    let mut occurrences: std::collections::HashMap<i64, u32> = std::collections::HashMap::new();
    for (_, nodes) in ways {
        for &n in nodes {
            *occurrences.entry(n).or_insert(0) += 1;
        }
    }

    let mut segments = Vec::new();
    for &(row, ref nodes) in ways {
        if nodes.is_empty() {
            continue;
        }
        let mut current = vec![nodes[0]];
        for (i, &n) in nodes.iter().enumerate().skip(1) {
            current.push(n);
            let interior = i + 1 < nodes.len();
            if interior && occurrences[&n] > 1 {
                segments.push((row, std::mem::replace(&mut current, vec![n])));
            }
        }
        if current.len() > 1 {
            segments.push((row, current));
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ways_split_at_a_shared_interior_node() {
        // A-B-N-C-D and E-F-N-G-H share the interior node N.
        let n = 100;
        let ways = vec![(0, vec![1, 2, n, 3, 4]), (1, vec![5, 6, n, 7, 8])];
        let segments = split_at_shared(&ways);
        assert_eq!(
            segments,
            vec![
                (0, vec![1, 2, n]),
                (0, vec![n, 3, 4]),
                (1, vec![5, 6, n]),
                (1, vec![n, 7, 8]),
            ]
        );
    }

    #[test]
    fn shared_end_nodes_do_not_split() {
        let ways = vec![(0, vec![1, 2, 9]), (1, vec![9, 3])];
        let segments = split_at_shared(&ways);
        assert_eq!(segments, vec![(0, vec![1, 2, 9]), (1, vec![9, 3])]);
    }

    #[test]
    fn unshared_ways_stay_whole() {
        let ways = vec![(0, vec![1, 2, 3])];
        let segments = split_at_shared(&ways);
        assert_eq!(segments, vec![(0, vec![1, 2, 3])]);
    }
}
