//! Region Packer
//!
//! First-fit bin packing over a singly linked list of free regions. The
//! list starts as one region covering the whole hardware ceiling; every
//! placement rewrites the chosen region in place and appends at most one
//! new region, so the arena never needs more than twice the request count.
//! Regions are never freed individually; the arena drops with the context.

use crate::collector::PackRequest;
use crate::context::PackerContext;
use crate::{try_reserve, AtlasError, Result};

/// Free rectangle of atlas space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Next region in the free list
    next: Option<usize>,
}

impl Region {
    fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height, next: None }
    }

    pub fn can_fit(&self, width: u32, height: u32) -> bool {
        self.width >= width && self.height >= height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Same row and height, directly to the right of `self`
    fn abuts(&self, other: &Region) -> bool {
        other.x == self.x + self.width && other.y == self.y && other.height == self.height
    }
}

/// Where the second child of a split is linked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    /// Straight after the split region
    After,
    /// At the end of the free list
    Tail,
}

/// Index-linked arena of free regions
#[derive(Debug, Default)]
pub struct RegionArena {
    slots: Vec<Region>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl RegionArena {
    /// Arena for `requests` placements seeded with one `size`x`size` region
    pub fn new(size: u32, requests: usize) -> Result<Self> {
        let mut slots = Vec::new();
        try_reserve(&mut slots, 2 * requests.max(1), "region arena")?;
        slots.push(Region::new(0, 0, size, size));

        Ok(Self {
            slots,
            head: Some(0),
            tail: Some(0),
        })
    }

    /// Slots ever allocated, including merged-away ones
    pub fn allocated(&self) -> usize {
        self.slots.len()
    }

    /// Free regions in list order
    pub fn iter(&self) -> impl Iterator<Item = &Region> + '_ {
        std::iter::successors(self.head.map(|i| &self.slots[i]), |r| r.next.map(|i| &self.slots[i]))
    }

    /// Total free area
    pub fn free_area(&self) -> u64 {
        self.iter().map(Region::area).sum()
    }

    /// First region that fits, merging row neighbours along the way.
    /// Returns `(predecessor, index)`.
    fn find_fit(&mut self, width: u32, height: u32) -> Option<(Option<usize>, usize)> {
        let mut prev = None;
        let mut cursor = self.head;

        while let Some(index) = cursor {
            self.merge_successors(index);

            let region = self.slots[index];
            if region.can_fit(width, height) {
                return Some((prev, index));
            }
            prev = Some(index);
            cursor = region.next;
        }

        None
    }

    /// Absorb list successors lying directly to the right in the same row
    fn merge_successors(&mut self, index: usize) {
        while let Some(next) = self.slots[index].next {
            let successor = self.slots[next];
            if !self.slots[index].abuts(&successor) {
                break;
            }

            let region = &mut self.slots[index];
            region.width += successor.width;
            region.next = successor.next;
            if self.tail == Some(next) {
                self.tail = Some(index);
            }
        }
    }

    /// Replace the region at `index` with what's left after placing `width`x`height` at its corner
    fn split(&mut self, prev: Option<usize>, index: usize, width: u32, height: u32) {
        let region = self.slots[index];
        let (x, y) = (region.x, region.y);

        let (first, second, link) = if region.x == 0 {
            // New row: continue the row in place, the space below goes to the back
            (
                Region::new(x + width, y, region.width - width, height),
                Region::new(x, y + height, region.width, region.height - height),
                Link::Tail,
            )
        } else {
            // Inside a row: the strip under the image in place, the rest of the row after it
            (
                Region::new(x, y + height, width, region.height - height),
                Region::new(x + width, y, region.width - width, region.height),
                Link::After,
            )
        };

        match (first.is_empty(), second.is_empty()) {
            (true, true) => self.unlink(prev, index),
            (false, true) => self.overwrite(index, first),
            (true, false) => self.overwrite(index, second),
            (false, false) => {
                self.overwrite(index, first);
                self.insert(index, second, link);
            }
        }
    }

    fn overwrite(&mut self, index: usize, region: Region) {
        let next = self.slots[index].next;
        self.slots[index] = Region { next, ..region };
    }

    fn insert(&mut self, index: usize, region: Region, link: Link) {
        let new = self.slots.len();

        match link {
            Link::After => {
                let next = self.slots[index].next;
                self.slots.push(Region { next, ..region });
                self.slots[index].next = Some(new);
                if self.tail == Some(index) {
                    self.tail = Some(new);
                }
            }
            Link::Tail => {
                self.slots.push(region);
                match self.tail {
                    Some(tail) => self.slots[tail].next = Some(new),
                    None => self.head = Some(new),
                }
                self.tail = Some(new);
            }
        }
    }

    fn unlink(&mut self, prev: Option<usize>, index: usize) {
        let next = self.slots[index].next;
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        if self.tail == Some(index) {
            self.tail = prev;
        }
    }
}

/// Assigns every request a position inside the hardware ceiling
#[derive(Debug, Default)]
pub struct RegionPacker;

impl RegionPacker {
    pub fn new() -> Self {
        Self
    }

    /// Place sorted, padded requests; on success every request holds its
    /// unpadded position and size.
    pub fn pack(&self, ctx: &mut PackerContext, requests: &mut [PackRequest]) -> Result<()> {
        ctx.regions = RegionArena::new(ctx.max_dimension(), requests.len())?;

        for request in requests.iter_mut() {
            self.place(ctx, request)?;
            ctx.stats_mut().used_area += request.area();
            request.unpad();
        }

        let allocated = ctx.regions.allocated();
        ctx.stats_mut().regions_allocated = allocated;

        let (width, height) = ctx.tracked_size();
        tracing::debug!(
            "Packed {} requests into {}x{} using {} region slots",
            requests.len(),
            width,
            height,
            allocated
        );

        Ok(())
    }

    fn place(&self, ctx: &mut PackerContext, request: &mut PackRequest) -> Result<()> {
        let Some((prev, index)) = ctx.regions.find_fit(request.width, request.height) else {
            let (tracked_width, tracked_height) = ctx.tracked_size();
            return Err(AtlasError::PackingExhausted {
                asset: request.asset,
                width: request.width,
                height: request.height,
                tracked_width,
                tracked_height,
                max_dimension: ctx.max_dimension(),
            });
        };

        let region = ctx.regions.slots[index];
        request.x = region.x;
        request.y = region.y;

        if region.x == 0 {
            tracing::debug!("New atlas row at y={} for {}", region.y, request.asset);
        }

        ctx.grow_to(request.x + request.width, request.y + request.height);
        ctx.regions.split(prev, index, request.width, request.height);

        Ok(())
    }
}
