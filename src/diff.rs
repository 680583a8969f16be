//! Edit script between two sequences, in the shape of `equal`/`replace`/`delete`/`insert`
//! opcodes over index ranges of both sides.

/// Above this many table cells the unmatched middle is reported as one replacement.
const MAX_TABLE_CELLS: usize = 25_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpTag {
    Equal,
    Replace,
    Delete,
    Insert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub tag: OpTag,
    pub a_start: usize,
    pub a_end: usize,
    pub b_start: usize,
    pub b_end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Keep,
    Remove,
    Add,
}

/// Longest-common-subsequence script turning `a` into `b`.
pub fn opcodes<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Opcode> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];

    let mut edits = vec![Edit::Keep; prefix];
    edits.extend(middle_edits(a_mid, b_mid));
    edits.extend(std::iter::repeat(Edit::Keep).take(suffix));
    group(&edits)
}

fn middle_edits<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Edit> {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 || (n + 1) * (m + 1) > MAX_TABLE_CELLS {
        let mut edits = vec![Edit::Remove; n];
        edits.extend(std::iter::repeat(Edit::Add).take(m));
        return edits;
    }

    let width = m + 1;
    let mut table = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if a[i] == b[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut edits = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            edits.push(Edit::Keep);
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            edits.push(Edit::Remove);
            i += 1;
        } else {
            edits.push(Edit::Add);
            j += 1;
        }
    }
    edits.extend(std::iter::repeat(Edit::Remove).take(n - i));
    edits.extend(std::iter::repeat(Edit::Add).take(m - j));
    edits
}

fn group(edits: &[Edit]) -> Vec<Opcode> {
    let mut ops = Vec::new();
    let (mut a_pos, mut b_pos) = (0, 0);
    let mut idx = 0;

    while idx < edits.len() {
        let (a_start, b_start) = (a_pos, b_pos);
        if edits[idx] == Edit::Keep {
            while idx < edits.len() && edits[idx] == Edit::Keep {
                a_pos += 1;
                b_pos += 1;
                idx += 1;
            }
            ops.push(Opcode {
                tag: OpTag::Equal,
                a_start,
                a_end: a_pos,
                b_start,
                b_end: b_pos,
            });
            continue;
        }

        while idx < edits.len() && edits[idx] != Edit::Keep {
            match edits[idx] {
                Edit::Remove => a_pos += 1,
                _ => b_pos += 1,
            }
            idx += 1;
        }
        let tag = match (a_pos > a_start, b_pos > b_start) {
            (true, true) => OpTag::Replace,
            (true, false) => OpTag::Delete,
            _ => OpTag::Insert,
        };
        ops.push(Opcode {
            tag,
            a_start,
            a_end: a_pos,
            b_start,
            b_end: b_pos,
        });
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn identical_inputs_are_one_equal_run() {
        let ops = opcodes(&chars("abc"), &chars("abc"));
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].tag, OpTag::Equal);
    }

    #[test]
    fn reports_replacement_in_the_middle() {
        let ops = opcodes(&chars("the cat"), &chars("the bat"));
        let tags: Vec<OpTag> = ops.iter().map(|o| o.tag).collect();
        assert_eq!(tags, vec![OpTag::Equal, OpTag::Replace, OpTag::Equal]);
        assert_eq!((ops[1].a_start, ops[1].a_end), (4, 5));
    }

    #[test]
    fn reports_insertions_and_deletions() {
        let ops = opcodes(&chars("abcd"), &chars("abxcd"));
        assert!(ops.iter().any(|o| o.tag == OpTag::Insert && o.b_start == 2 && o.b_end == 3));
        let ops = opcodes(&chars("abxcd"), &chars("abcd"));
        assert!(ops.iter().any(|o| o.tag == OpTag::Delete && o.a_start == 2 && o.a_end == 3));
    }
}
