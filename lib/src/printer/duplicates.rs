/// Block of `size` frames starting at `start`, repeated `count` times back to back
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DuplicateItem {
    pub start: usize,
    pub size: usize,
    pub count: usize,
}

impl DuplicateItem {
    /// Index just past the last repetition
    pub fn end(&self) -> usize {
        self.start + self.size * self.count
    }
}

/// Find runs of repeated blocks in a sequence of `len` elements
///
/// Scans left to right. At each position the smallest block size (up to `max_size`) that repeats
/// at least once wins, the run is extended greedily, and scanning resumes after it. `eq(a, b)`
/// compares elements `a` and `b`.
pub fn find_duplicates(
    len: usize,
    max_size: usize,
    eq: impl Fn(usize, usize) -> bool,
) -> Vec<DuplicateItem> {
    let blocks_eq =
        |a: usize, b: usize, size: usize| (0..size).all(|offset| eq(a + offset, b + offset));

    let mut items = vec![];
    let mut start = 0;
    while start < len {
        let found = (1..=max_size)
            .take_while(|size| start + 2 * size <= len)
            .find(|size| blocks_eq(start, start + size, *size));

        match found {
            Some(size) => {
                let mut count = 2;
                while start + (count + 1) * size <= len
                    && blocks_eq(start, start + count * size, size)
                {
                    count += 1;
                }
                let item = DuplicateItem { start, size, count };
                start = item.end();
                items.push(item);
            }
            None => start += 1,
        }
    }
    items
}

#[cfg(test)]
mod test {
    use super::*;

    fn duplicates_of(frames: &str, max_size: usize) -> Vec<(usize, usize, usize)> {
        let frames: Vec<char> = frames.chars().collect();
        find_duplicates(frames.len(), max_size, |a, b| frames[a] == frames[b])
            .into_iter()
            .map(|item| (item.start, item.size, item.count))
            .collect()
    }

    #[test]
    fn single_frame_recursion() {
        let frames = "x".repeat(50);
        assert_eq!(duplicates_of(&frames, 8), vec![(0, 1, 50)]);
    }

    #[test]
    fn smallest_size_first_position_greedy() {
        assert_eq!(duplicates_of("AABAAB", 8), vec![(0, 1, 2), (3, 1, 2)]);
        assert_eq!(duplicates_of("ABABABC", 8), vec![(0, 2, 3)]);
        assert_eq!(duplicates_of("DABCABCABC", 8), vec![(1, 3, 3)]);
    }

    #[test]
    fn respects_max_size() {
        assert_eq!(duplicates_of("ABCABC", 2), vec![]);
        assert_eq!(duplicates_of("ABCABC", 3), vec![(0, 3, 2)]);
    }

    #[test]
    fn nothing_repeats() {
        assert_eq!(duplicates_of("ABCDEF", 8), vec![]);
        assert_eq!(duplicates_of("", 8), vec![]);
    }
}
