//! Request Sorter
//!
//! Orders requests tallest first, widest first among equal heights, so the
//! packer places the hardest shapes while the free list is still coarse.
//! Non-recursive quicksort with an explicit range stack; not stable.

use crate::collector::PackRequest;

/// Range stack growth step
const STACK_GROWTH: usize = 32;

/// `a` must be packed before `b`
#[inline]
fn precedes(a: (u32, u32), b: (u32, u32)) -> bool {
    a > b
}

/// Sort requests by descending height, then descending width, in place
pub fn sort_requests(requests: &mut [PackRequest]) {
    quicksort(requests);
}

/// Returns the deepest the range stack got
fn quicksort(requests: &mut [PackRequest]) -> usize {
    if requests.len() < 2 {
        return 0;
    }
    let mut peak = 1;

    let mut stack: Vec<(usize, usize)> = Vec::with_capacity(STACK_GROWTH);
    stack.push((0, requests.len() - 1));

    while let Some((left, right)) = stack.pop() {
        let pivot = requests[left + (right - left) / 2].sort_key();

        // Hoare partition; `j` may step one below `left`
        let mut i = left as isize;
        let mut j = right as isize;
        while i <= j {
            while precedes(requests[i as usize].sort_key(), pivot) {
                i += 1;
            }
            while precedes(pivot, requests[j as usize].sort_key()) {
                j -= 1;
            }
            if i <= j {
                requests.swap(i as usize, j as usize);
                i += 1;
                j -= 1;
            }
        }

        if stack.len() + 2 > stack.capacity() {
            stack.reserve_exact(STACK_GROWTH);
        }
        // Larger range first so the smaller one is popped next; keeps the stack O(log n)
        let lower = ((left as isize) < j).then(|| (left, j as usize));
        let upper = (i < right as isize).then(|| (i as usize, right));
        let span = |range: Option<(usize, usize)>| range.map_or(0, |(lo, hi)| hi - lo);
        let (first, second) = if span(lower) >= span(upper) { (lower, upper) } else { (upper, lower) };
        stack.extend(first);
        stack.extend(second);
        peak = peak.max(stack.len());
    }

    peak
}
