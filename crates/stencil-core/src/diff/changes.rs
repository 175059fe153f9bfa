//! Line-level diffing between two texts.
//!
//! Every file version is represented as a sequence of one-line [`Change`]
//! records anchored in the baseline text. Common and removed lines consume
//! baseline line numbers; inserted lines anchor at the last consumed one,
//! so an insertion before the first line anchors at `-1`.

/// Which group of a conflict fence a change belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictSide {
    /// The first overlay to touch the anchor.
    Former,
    /// Any later overlay.
    #[default]
    Current,
}

/// One line of a file version, relative to the baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Line content, terminating newline included when the source had one.
    pub value: String,
    pub added: bool,
    pub removed: bool,
    /// Baseline anchor: for `added` the baseline line after which the
    /// insertion occurs (`-1` before the first line), otherwise the
    /// baseline line the change refers to.
    pub line_number: i64,
    pub conflicted: bool,
    pub side: ConflictSide,
}

impl Change {
    pub fn common(value: String, line_number: i64) -> Self {
        Self {
            value,
            added: false,
            removed: false,
            line_number,
            conflicted: false,
            side: ConflictSide::default(),
        }
    }

    pub fn added(value: String, line_number: i64) -> Self {
        Self {
            added: true,
            ..Self::common(value, line_number)
        }
    }

    pub fn removed(value: String, line_number: i64) -> Self {
        Self {
            removed: true,
            ..Self::common(value, line_number)
        }
    }
}

/// A file version as an ordered run of changes.
pub type ChangeList = Vec<Change>;

/// Diff `current` against `baseline` line by line.
///
/// With no `current`, returns the self-diff of `baseline`: every line a
/// common change numbered in order. The source's final-line newline (or its
/// absence) is preserved; no terminator is ever invented.
pub fn diff(baseline: &str, current: Option<&str>) -> ChangeList {
    let base_lines = split_lines(baseline);

    let Some(current) = current else {
        return base_lines
            .into_iter()
            .enumerate()
            .map(|(index, value)| Change::common(value, index as i64))
            .collect();
    };

    let current_lines = split_lines(current);
    let mut changes = Vec::with_capacity(current_lines.len());
    let mut counter: i64 = 0;

    for op in myers(&base_lines, &current_lines) {
        match op {
            Op::Common(j) => {
                changes.push(Change::common(current_lines[j].clone(), counter));
                counter += 1;
            }
            Op::Remove(i) => {
                changes.push(Change::removed(base_lines[i].clone(), counter));
                counter += 1;
            }
            Op::Add(j) => {
                changes.push(Change::added(current_lines[j].clone(), counter - 1));
            }
        }
    }

    changes
}

/// Split into lines that keep their `\n`. The final line keeps none when the
/// source had no terminator; empty input yields no lines at all.
fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let terminated = text.ends_with('\n');
    let body = if terminated {
        &text[..text.len() - 1]
    } else {
        text
    };
    let mut lines: Vec<String> = body.split('\n').map(|line| format!("{line}\n")).collect();
    if !terminated {
        if let Some(last) = lines.last_mut() {
            last.pop();
        }
    }
    lines
}

/// One step of the edit script from baseline to current.
enum Op {
    /// Line present in both; carries the index into `current`.
    Common(usize),
    /// Line only in the baseline; carries the index into `baseline`.
    Remove(usize),
    /// Line only in `current`; carries the index into `current`.
    Add(usize),
}

/// Myers' O(ND) shortest edit script over the two line vectors.
fn myers(a: &[String], b: &[String]) -> Vec<Op> {
    let n = a.len();
    let m = b.len();
    let max = n + m;
    if max == 0 {
        return Vec::new();
    }

    let offset = max as isize;
    let mut v = vec![0usize; 2 * max + 1];
    let mut trace: Vec<Vec<usize>> = Vec::new();

    'search: for d in 0..=(max as isize) {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = (x as isize - k) as usize;
            while x < n && y < m && a[x] == b[y] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    // Walk the trace back from (n, m) to (0, 0), emitting ops in reverse.
    let mut ops = Vec::new();
    let mut x = n as isize;
    let mut y = m as isize;
    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let prev_k = if k == -d
            || (k != d && v[(k - 1 + offset) as usize] < v[(k + 1 + offset) as usize])
        {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[(prev_k + offset) as usize] as isize;
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            x -= 1;
            y -= 1;
            ops.push(Op::Common(y as usize));
        }
        if d > 0 {
            if x == prev_x {
                ops.push(Op::Add((y - 1) as usize));
            } else {
                ops.push(Op::Remove((x - 1) as usize));
            }
        }
        x = prev_x;
        y = prev_y;
    }
    ops.reverse();
    ops
}
