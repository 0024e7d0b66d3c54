use derive_new::new;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Edit<T> {
    Delete { value: T },
    Insert { value: T },
    Equal { value: T },
}

impl<T> Edit<T> {
    pub fn value(&self) -> &T {
        match self {
            Edit::Delete { value } | Edit::Insert { value } | Edit::Equal { value } => value,
        }
    }

    pub fn is_equal(&self) -> bool {
        matches!(self, Edit::Equal { .. })
    }

    /// Unified-diff prefix for this edit
    pub fn symbol(&self) -> char {
        match self {
            Edit::Delete { .. } => '-',
            Edit::Insert { .. } => '+',
            Edit::Equal { .. } => ' ',
        }
    }
}

pub trait DiffAlgorithm<T> {
    type Trace;
    type EditPath;

    fn compute_shortest_edit(&self) -> Self::Trace;
    fn backtrack(&self) -> Self::EditPath;
    fn diff(&self) -> Vec<Edit<T>>;
}

/// Largest trace, in cells, kept for a single greedy pass. Bigger inputs
/// are first split at middle snakes.
const MAX_TRACE_CELLS: usize = 1 << 22;

/// Myers' O(N·D) diff: a greedy forward pass recording the furthest reaching
/// x per diagonal, followed by a backtrack through the recorded trace.
///
/// Round `d` of the trace only keeps diagonals `-d..=d`, so a trace costs
/// O(D²) cells. Inputs whose trace could exceed [`MAX_TRACE_CELLS`] are cut
/// in two at a middle snake (Myers' linear-space refinement) until the
/// pieces are small enough.
///
/// Where a deletion and an insertion are equally cheap, the deletion comes
/// first in the output and earlier common lines are matched first.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct MyersDiff<'d, T> {
    a: &'d [T],
    b: &'d [T],
}

impl<T: Eq + Clone> DiffAlgorithm<T> for MyersDiff<'_, T> {
    /// `trace[d][k + d]` is the furthest x reached on diagonal `k` after `d` edits
    type Trace = Vec<Vec<isize>>;
    type EditPath = Vec<(isize, isize, isize, isize)>;

    fn compute_shortest_edit(&self) -> Self::Trace {
        let (n, m) = (self.a.len() as isize, self.b.len() as isize);
        let mut trace: Vec<Vec<isize>> = Vec::new();

        for d in 0..=(n + m) {
            let mut v = vec![0; (2 * d + 1) as usize];

            for k in (-d..=d).step_by(2) {
                let mut x = match trace.last() {
                    None => 0,
                    Some(prev) => {
                        // diagonal k of the previous round lives at k + d - 1
                        let prev_x = |k: isize| prev[(k + d - 1) as usize];
                        if k == -d {
                            // only reachable from k+1, an insertion
                            prev_x(k + 1)
                        } else if k == d {
                            // only reachable from k-1, a deletion
                            prev_x(k - 1) + 1
                        } else {
                            let x_del = prev_x(k - 1) + 1;
                            let x_ins = prev_x(k + 1);
                            if x_del > x_ins { x_del } else { x_ins }
                        }
                    }
                };

                let mut y = x - k;
                while x < n && y < m && self.a[x as usize] == self.b[y as usize] {
                    // snake
                    x += 1;
                    y += 1;
                }

                v[(k + d) as usize] = x;

                if x >= n && y >= m {
                    trace.push(v);
                    return trace;
                }
            }

            trace.push(v);
        }

        trace
    }

    fn backtrack(&self) -> Self::EditPath {
        let (mut x, mut y) = (self.a.len() as isize, self.b.len() as isize);
        let mut edit_path = Vec::new();

        let trace = self.compute_shortest_edit();

        for d in (1..trace.len() as isize).rev() {
            let prev = &trace[(d - 1) as usize];
            let prev_x = |k: isize| prev[(k + d - 1) as usize];
            let k = x - y;

            let prev_k = if k == -d {
                k + 1
            } else if k == d {
                k - 1
            } else if prev_x(k - 1) + 1 > prev_x(k + 1) {
                k - 1
            } else {
                k + 1
            };

            let start_x = prev_x(prev_k);
            let start_y = start_x - prev_k;

            while x > start_x && y > start_y {
                edit_path.push((x - 1, y - 1, x, y));
                x -= 1;
                y -= 1;
            }

            edit_path.push((start_x, start_y, x, y));
            (x, y) = (start_x, start_y);
        }

        // the first round is a single snake from the origin
        while x > 0 && y > 0 {
            edit_path.push((x - 1, y - 1, x, y));
            x -= 1;
            y -= 1;
        }

        edit_path
    }

    fn diff(&self) -> Vec<Edit<T>> {
        let mut diff = Vec::new();
        diff_range(self.a, self.b, &mut diff);
        diff
    }
}

impl<T: Eq + Clone> MyersDiff<'_, T> {
    /// Single greedy pass over the whole input.
    fn greedy_diff(&self) -> Vec<Edit<T>> {
        let mut diff = Vec::new();

        for (prev_x, prev_y, x, y) in self.backtrack() {
            if x == prev_x {
                // only y advanced
                if let Some(value) = self.b.get(prev_y as usize) {
                    diff.push(Edit::Insert {
                        value: value.clone(),
                    });
                }
            } else if y == prev_y {
                // only x advanced
                if let Some(value) = self.a.get(prev_x as usize) {
                    diff.push(Edit::Delete {
                        value: value.clone(),
                    });
                }
            } else if let Some(value) = self.a.get(prev_x as usize) {
                diff.push(Edit::Equal {
                    value: value.clone(),
                });
            }
        }

        diff.reverse();
        diff
    }
}

fn diff_range<T: Eq + Clone>(a: &[T], b: &[T], out: &mut Vec<Edit<T>>) {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];

    out.extend(a[..prefix].iter().map(|value| Edit::Equal {
        value: value.clone(),
    }));

    if a_mid.is_empty() {
        out.extend(b_mid.iter().map(|value| Edit::Insert {
            value: value.clone(),
        }));
    } else if b_mid.is_empty() {
        out.extend(a_mid.iter().map(|value| Edit::Delete {
            value: value.clone(),
        }));
    } else if trace_fits(a_mid.len() + b_mid.len()) {
        out.extend(MyersDiff::new(a_mid, b_mid).greedy_diff());
    } else {
        match middle_snake(a_mid, b_mid) {
            Some((x, y)) => {
                diff_range(&a_mid[..x], &b_mid[..y], out);
                diff_range(&a_mid[x..], &b_mid[y..], out);
            }
            None => out.extend(MyersDiff::new(a_mid, b_mid).greedy_diff()),
        }
    }

    out.extend(a[a.len() - suffix..].iter().map(|value| Edit::Equal {
        value: value.clone(),
    }));
}

/// Whether a trace for inputs of combined length `len` stays within
/// [`MAX_TRACE_CELLS`] in the worst case.
fn trace_fits(len: usize) -> bool {
    (len + 1)
        .checked_mul(len + 1)
        .is_some_and(|cells| cells <= MAX_TRACE_CELLS)
}

/// Find a point on a shortest edit path roughly halfway through it by running
/// the greedy search from both ends until the two frontiers overlap.
///
/// Returns the start of the overlapping snake, or `None` if it would not
/// split the input into two smaller parts.
fn middle_snake<T: Eq>(a: &[T], b: &[T]) -> Option<(usize, usize)> {
    let (n, m) = (a.len() as isize, b.len() as isize);
    let delta = n - m;
    let odd = delta % 2 != 0;
    let max_d = (n + m + 1) / 2;
    let offset = max_d + 1;

    let mut forward = vec![0isize; (2 * offset + 1) as usize];
    let mut backward = vec![0isize; (2 * offset + 1) as usize];
    let at = |k: isize| (offset + k) as usize;

    let split = |x: isize, y: isize| {
        let inside = (0..=n).contains(&x) && (0..=m).contains(&y);
        let progress = (x, y) != (0, 0) && (x, y) != (n, m);
        (inside && progress).then_some((x as usize, y as usize))
    };

    for d in 0..=max_d {
        for k in (-d..=d).step_by(2) {
            let mut x = if k == -d || (k != d && forward[at(k - 1)] < forward[at(k + 1)]) {
                forward[at(k + 1)]
            } else {
                forward[at(k - 1)] + 1
            };
            let mut y = x - k;
            let (start_x, start_y) = (x, y);
            while x < n && y >= 0 && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            forward[at(k)] = x;

            let back_k = delta - k;
            if odd && back_k.abs() < d && x + backward[at(back_k)] >= n {
                return split(start_x, start_y);
            }
        }

        for k in (-d..=d).step_by(2) {
            let mut x = if k == -d || (k != d && backward[at(k - 1)] < backward[at(k + 1)]) {
                backward[at(k + 1)]
            } else {
                backward[at(k - 1)] + 1
            };
            let mut y = x - k;
            while x < n && y >= 0 && y < m && a[(n - x - 1) as usize] == b[(m - y - 1) as usize] {
                x += 1;
                y += 1;
            }
            backward[at(k)] = x;

            let fwd_k = delta - k;
            if !odd && fwd_k.abs() <= d && x + forward[at(fwd_k)] >= n {
                return split(n - x, m - y);
            }
        }
    }

    None
}
