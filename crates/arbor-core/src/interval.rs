//! Mark range arithmetic.
//!
//! Every text mutation on a node rewrites its marks through one of these
//! functions. They are pure: they take the current marks and the edit, and
//! return the marks for the new text. Whole-text marks (no range) are
//! carried through untouched by all edits except [`split_marks`] and
//! [`rebase_marks`], which have to materialize them.

use crate::mark::Mark;

/// Marks after deleting `[start, end)`.
///
/// | mark vs. deleted span          | result                              |
/// |--------------------------------|-------------------------------------|
/// | ends at/before `start`         | unchanged                           |
/// | starts at/after `end`          | shifted left                        |
/// | inside                         | dropped                             |
/// | overlaps the head              | truncated to `[ms, start)`          |
/// | overlaps the tail              | `[start, me - len)`                 |
/// | spans the whole deleted span   | split into `[ms, start)` and `[start, me - len)` |
///
/// Zero-length ranges are dropped whatever their position.
pub fn delete_marks(marks: &[Mark], start: usize, end: usize) -> Vec<Mark> {
    if end <= start {
        return drop_empty(marks);
    }
    let len = end - start;
    let mut out = Vec::with_capacity(marks.len());
    for mark in marks {
        let Some((ms, me)) = mark.range else {
            out.push(mark.clone());
            continue;
        };
        if me <= ms {
            continue;
        }
        if me <= start {
            out.push(mark.clone());
        } else if ms >= end {
            out.push(mark.with_range(ms - len, me - len));
        } else if ms >= start && me <= end {
            // fully deleted
        } else if ms < start && me <= end {
            out.push(mark.with_range(ms, start));
        } else if ms >= start {
            out.push(mark.with_range(start, me - len));
        } else {
            out.push(mark.with_range(ms, start));
            out.push(mark.with_range(start, me - len));
        }
    }
    out
}

/// Marks after inserting `len` chars at `pos`.
///
/// Marks straddling `pos` grow; typing inside a styled run extends the style.
pub fn insert_marks(marks: &[Mark], pos: usize, len: usize) -> Vec<Mark> {
    if len == 0 {
        return drop_empty(marks);
    }
    marks
        .iter()
        .filter_map(|mark| match mark.range {
            None => Some(mark.clone()),
            Some((ms, me)) if me <= ms => None,
            Some((_, me)) if me <= pos => Some(mark.clone()),
            Some((ms, me)) if ms >= pos => Some(mark.with_range(ms + len, me + len)),
            Some((ms, me)) => Some(mark.with_range(ms, me + len)),
        })
        .collect()
}

fn drop_empty(marks: &[Mark]) -> Vec<Mark> {
    marks
        .iter()
        .filter(|mark| !matches!(mark.range, Some((ms, me)) if me <= ms))
        .cloned()
        .collect()
}

/// Marks after replacing `[start, end)` with `new_len` chars.
///
/// Behaves as delete followed by insert, except for marks spanning the whole
/// replaced span: those are extended over the new text when the edit shrinks
/// the text by at most one char, and split around it otherwise. The
/// threshold is kept for behavioral compatibility.
pub fn replace_marks(marks: &[Mark], start: usize, end: usize, new_len: usize) -> Vec<Mark> {
    if end <= start {
        return insert_marks(marks, start, new_len);
    }
    let removed = end - start;
    let delta = new_len as isize - removed as isize;
    let mut out = Vec::with_capacity(marks.len());
    for mark in marks {
        let Some((ms, me)) = mark.range else {
            out.push(mark.clone());
            continue;
        };
        if me <= ms {
            continue;
        }
        if me <= start {
            out.push(mark.clone());
        } else if ms >= end {
            out.push(mark.with_range(ms - removed + new_len, me - removed + new_len));
        } else if ms <= start && me >= end {
            let new_end = me - removed + new_len;
            if delta >= -1 {
                if ms < new_end {
                    out.push(mark.with_range(ms, new_end));
                }
            } else {
                if ms < start {
                    out.push(mark.with_range(ms, start));
                }
                if start + new_len < new_end {
                    out.push(mark.with_range(start + new_len, new_end));
                }
            }
        } else {
            let trimmed = delete_marks(std::slice::from_ref(mark), start, end);
            out.extend(insert_marks(&trimmed, start, new_len));
        }
    }
    out
}

/// Split marks at `pos` into the marks of the left and right halves.
///
/// Right-half ranges are re-based to start at zero.
pub fn split_marks(marks: &[Mark], pos: usize) -> (Vec<Mark>, Vec<Mark>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for mark in marks {
        match mark.range {
            None => {
                left.push(mark.clone());
                right.push(mark.clone());
            }
            Some((ms, me)) => {
                if ms < me.min(pos) {
                    left.push(mark.with_range(ms, me.min(pos)));
                }
                if ms.max(pos) < me {
                    right.push(mark.with_range(ms.max(pos) - pos, me - pos));
                }
            }
        }
    }
    (left, right)
}

/// Shift marks of a `len`-char text by `offset`, materializing whole-text
/// marks as `[offset, offset + len)`.
pub fn rebase_marks(marks: &[Mark], offset: usize, len: usize) -> Vec<Mark> {
    marks
        .iter()
        .map(|mark| {
            let (s, e) = mark.bounds(len);
            mark.with_range(s + offset, e + offset)
        })
        .collect()
}

/// Replace whole-text marks with explicit `[0, len)` ranges.
pub fn materialize_marks(marks: &[Mark], len: usize) -> Vec<Mark> {
    rebase_marks(marks, 0, len)
}

/// Clip ranges to `len`, dropping marks left covering no text.
///
/// Whole-text marks pass through.
pub fn clamp_marks(marks: &[Mark], len: usize) -> Vec<Mark> {
    marks
        .iter()
        .filter_map(|mark| match mark.range {
            None => Some(mark.clone()),
            Some((ms, me)) if ms >= len || me.min(len) <= ms => None,
            Some((ms, me)) => Some(mark.with_range(ms, me.min(len))),
        })
        .collect()
}

/// Restrict marks to `[start, end)` and re-base them to start at zero.
pub fn slice_marks(marks: &[Mark], start: usize, end: usize, len: usize) -> Vec<Mark> {
    marks
        .iter()
        .filter_map(|mark| {
            let (ms, me) = mark.bounds(len);
            let s = ms.max(start);
            let e = me.min(end);
            (s < e).then(|| mark.with_range(s - start, e - start))
        })
        .collect()
}

/// Canonical form of a mark list.
///
/// Ranges are clipped to `len`, zero-length ranges dropped, and overlapping
/// or adjacent ranges of the same type and attributes merged. A whole-text
/// mark absorbs ranged marks of its kind. Kinds keep their first-occurrence
/// order.
pub fn normalize_marks(marks: &[Mark], len: usize) -> Vec<Mark> {
    let mut groups: Vec<(Mark, bool, Vec<(usize, usize)>)> = Vec::new();
    for mark in clamp_marks(marks, len) {
        let idx = match groups.iter().position(|(kind, _, _)| kind.same_kind(&mark)) {
            Some(idx) => idx,
            None => {
                groups.push((mark.clone(), false, Vec::new()));
                groups.len() - 1
            }
        };
        match mark.range {
            None => groups[idx].1 = true,
            Some((s, e)) if s < e => groups[idx].2.push((s, e)),
            Some(_) => {}
        }
    }

    let mut out = Vec::new();
    for (kind, whole, mut ranges) in groups {
        if whole {
            out.push(Mark {
                stype: kind.stype,
                range: None,
                attrs: kind.attrs,
            });
            continue;
        }
        ranges.sort_unstable();
        let mut merged: Vec<(usize, usize)> = Vec::new();
        for (s, e) in ranges {
            match merged.last_mut() {
                Some(last) if s <= last.1 => last.1 = last.1.max(e),
                _ => merged.push((s, e)),
            }
        }
        out.extend(merged.into_iter().map(|(s, e)| kind.with_range(s, e)));
    }
    out
}

/// Remove coverage of type `stype` from `[start, end)`.
///
/// Matching marks keep only the parts outside the span; whole-text marks are
/// materialized first so they can be cut.
pub fn cut_marks(marks: &[Mark], stype: &str, start: usize, end: usize, len: usize) -> Vec<Mark> {
    let mut out = Vec::with_capacity(marks.len());
    for mark in marks {
        if mark.stype != stype {
            out.push(mark.clone());
            continue;
        }
        let (ms, me) = mark.bounds(len);
        if me <= start || ms >= end {
            out.push(mark.clone());
            continue;
        }
        if ms < start {
            out.push(mark.with_range(ms, start));
        }
        if me > end {
            out.push(mark.with_range(end, me));
        }
    }
    out
}

/// Whether marks of the same kind as `kind` cover every char of `[start, end)`.
pub fn covers(marks: &[Mark], kind: &Mark, start: usize, end: usize, len: usize) -> bool {
    if end <= start {
        return false;
    }
    let mut spans: Vec<(usize, usize)> = marks
        .iter()
        .filter(|m| m.same_kind(kind))
        .map(|m| m.bounds(len))
        .collect();
    spans.sort_unstable();
    let mut reached = start;
    for (s, e) in spans {
        if s > reached {
            break;
        }
        reached = reached.max(e);
        if reached >= end {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(marks: &[Mark]) -> Vec<(usize, usize)> {
        marks.iter().filter_map(|m| m.range).collect()
    }

    #[test]
    fn test_delete_table() {
        let marks = vec![
            Mark::ranged("before", 0, 2),
            Mark::ranged("after", 8, 10),
            Mark::ranged("inside", 4, 6),
            Mark::ranged("head", 1, 5),
            Mark::ranged("tail", 5, 9),
            Mark::ranged("span", 1, 9),
        ];
        let out = delete_marks(&marks, 3, 7);
        let by_type = |t: &str| -> Vec<(usize, usize)> {
            out.iter().filter(|m| m.stype == t).filter_map(|m| m.range).collect()
        };
        assert_eq!(by_type("before"), vec![(0, 2)]);
        assert_eq!(by_type("after"), vec![(4, 6)]);
        assert!(by_type("inside").is_empty());
        assert_eq!(by_type("head"), vec![(1, 3)]);
        assert_eq!(by_type("tail"), vec![(3, 5)]);
        assert_eq!(by_type("span"), vec![(1, 3), (3, 5)]);
    }

    #[test]
    fn test_clamp_drops_marks_past_new_end() {
        let marks = vec![
            Mark::ranged("bold", 2, 5),
            Mark::ranged("em", 0, 9),
            Mark::new("code"),
        ];
        let out = clamp_marks(&marks, 2);
        assert_eq!(out, vec![Mark::ranged("em", 0, 2), Mark::new("code")]);
        assert!(clamp_marks(&[Mark::ranged("em", 2, 9)], 2).is_empty());
        assert!(clamp_marks(&[Mark::ranged("em", 1, 1)], 4).is_empty());
    }

    #[test]
    fn test_edits_drop_zero_length_marks() {
        let marks = vec![Mark::ranged("caret", 5, 5), Mark::ranged("bold", 6, 8)];
        assert_eq!(delete_marks(&marks, 0, 1), vec![Mark::ranged("bold", 5, 7)]);
        assert_eq!(insert_marks(&marks, 0, 1), vec![Mark::ranged("bold", 7, 9)]);
        assert_eq!(replace_marks(&marks, 0, 2, 1), vec![Mark::ranged("bold", 5, 7)]);
        assert!(replace_marks(&[Mark::ranged("bold", 2, 3)], 2, 3, 0).is_empty());
        let (left, right) = split_marks(&marks, 5);
        assert!(left.is_empty());
        assert_eq!(right, vec![Mark::ranged("bold", 1, 3)]);
    }

    #[test]
    fn test_insert_extends_straddling_mark() {
        let marks = vec![
            Mark::ranged("a", 0, 3),
            Mark::ranged("b", 3, 6),
            Mark::ranged("c", 1, 5),
        ];
        let out = insert_marks(&marks, 3, 2);
        assert_eq!(ranges(&out), vec![(0, 3), (5, 8), (1, 7)]);
    }

    #[test]
    fn test_replace_small_edit_extends() {
        // "Hello World", bold over all, replace "World" (6..11) with "Earth!"
        let marks = vec![Mark::ranged("bold", 0, 11)];
        assert_eq!(ranges(&replace_marks(&marks, 6, 11, 6)), vec![(0, 12)]);
        // shrink by exactly one still extends
        assert_eq!(ranges(&replace_marks(&marks, 6, 11, 4)), vec![(0, 10)]);
    }

    #[test]
    fn test_replace_large_deletion_splits() {
        let marks = vec![Mark::ranged("bold", 0, 11)];
        // replace 6..11 with "W": delta = -4
        let out = replace_marks(&marks, 6, 11, 1);
        assert_eq!(ranges(&out), vec![(0, 6)]);

        let out = replace_marks(&marks, 2, 8, 1);
        assert_eq!(ranges(&out), vec![(0, 2), (3, 6)]);
    }

    #[test]
    fn test_replace_insert_only_extends() {
        let marks = vec![Mark::ranged("bold", 0, 4)];
        assert_eq!(ranges(&replace_marks(&marks, 2, 2, 3)), vec![(0, 7)]);
    }

    #[test]
    fn test_split_marks() {
        let marks = vec![Mark::ranged("bold", 0, 11), Mark::new("code")];
        let (left, right) = split_marks(&marks, 5);
        assert_eq!(left[0].range, Some((0, 5)));
        assert_eq!(right[0].range, Some((0, 6)));
        assert!(left[1].is_whole_text() && right[1].is_whole_text());
    }

    #[test]
    fn test_normalize_merges_and_drops() {
        let marks = vec![
            Mark::ranged("bold", 4, 6),
            Mark::ranged("italic", 0, 1),
            Mark::ranged("bold", 0, 2),
            Mark::ranged("bold", 2, 4),
            Mark::ranged("italic", 3, 3),
            Mark::ranged("bold", 8, 20),
        ];
        let out = normalize_marks(&marks, 10);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], Mark::ranged("bold", 0, 6));
        assert_eq!(out[1], Mark::ranged("bold", 8, 10));
        assert_eq!(out[2], Mark::ranged("italic", 0, 1));
    }

    #[test]
    fn test_normalize_keeps_distinct_attrs_apart() {
        let marks = vec![
            Mark::ranged("link", 0, 2).with_attr("href", "a"),
            Mark::ranged("link", 2, 4).with_attr("href", "b"),
        ];
        assert_eq!(normalize_marks(&marks, 4).len(), 2);
    }

    #[test]
    fn test_cut_and_covers() {
        let marks = vec![Mark::ranged("bold", 0, 10)];
        let cut = cut_marks(&marks, "bold", 3, 5, 10);
        assert_eq!(ranges(&cut), vec![(0, 3), (5, 10)]);

        let bold = Mark::new("bold");
        assert!(covers(&marks, &bold, 2, 8, 10));
        assert!(!covers(&cut, &bold, 2, 8, 10));
        assert!(covers(&cut, &bold, 5, 10, 10));
    }

    #[test]
    fn test_slice_and_rebase() {
        let marks = vec![Mark::ranged("bold", 2, 8)];
        assert_eq!(ranges(&slice_marks(&marks, 5, 10, 10)), vec![(0, 3)]);
        assert_eq!(ranges(&rebase_marks(&marks, 5, 10)), vec![(7, 13)]);
        assert_eq!(ranges(&materialize_marks(&[Mark::new("i")], 4)), vec![(0, 4)]);
    }
}
