//! [`crate::boot::BootInputs`] backed by a real flattened device tree.
//!
//! The FDT walk itself is out of scope (see `spec.md` §1's external
//! collaborators list); this is the thin adapter that turns `fdt`'s typed
//! accessors into the fixed-size slices `seed_from_memory_nodes` and
//! `seed_from_bootargs` want, so the entry point can hand a real boot blob
//! to the same code the `boot` module's tests exercise with `FakeInputs`.

use crate::boot::BootInputs;

const MAX_MEMORY_REGIONS: usize = 16;
const MAX_MEMRESERVES: usize = 16;

/// Owns the parsed FDT plus the region tables copied out of it at
/// construction time, since [`BootInputs`] hands back slices and there is no
/// allocator to build them lazily.
pub struct FdtInputs<'dt> {
    fdt: fdt::Fdt<'dt>,
    memory: [(u64, u64); MAX_MEMORY_REGIONS],
    memory_count: usize,
    memreserves: [(u64, u64); MAX_MEMRESERVES],
    memreserves_count: usize,
    fdt_base: u64,
    fdt_size: u64,
    image_base: u64,
    image_size: u64,
}

impl<'dt> FdtInputs<'dt> {
    /// Parses `blob` and records `(image_base, image_size)` as this loader's
    /// own self-reservation extent.
    pub fn new(blob: &'dt [u8], image_base: u64, image_size: u64) -> Result<Self, fdt::FdtError> {
        let fdt = fdt::Fdt::new(blob)?;

        let mut memory = [(0u64, 0u64); MAX_MEMORY_REGIONS];
        let mut memory_count = 0;
        for region in fdt.memory().regions() {
            if memory_count == MAX_MEMORY_REGIONS {
                break;
            }
            memory[memory_count] = (region.starting_address as u64, region.size.unwrap_or(0) as u64);
            memory_count += 1;
        }

        let mut memreserves = [(0u64, 0u64); MAX_MEMRESERVES];
        let mut memreserves_count = 0;
        for entry in fdt.memory_reservations() {
            if memreserves_count == MAX_MEMRESERVES {
                break;
            }
            memreserves[memreserves_count] = (entry.address() as u64, entry.size() as u64);
            memreserves_count += 1;
        }

        Ok(Self {
            fdt,
            memory,
            memory_count,
            memreserves,
            memreserves_count,
            fdt_base: blob.as_ptr() as u64,
            fdt_size: blob.len() as u64,
            image_base,
            image_size,
        })
    }
}

impl<'dt> BootInputs for FdtInputs<'dt> {
    fn memory_regions(&self) -> &[(u64, u64)] { &self.memory[..self.memory_count] }

    fn bootargs(&self) -> Option<&str> { self.fdt.chosen().bootargs() }

    fn fdt_extent(&self) -> (u64, u64) { (self.fdt_base, self.fdt_size) }

    fn image_extent(&self) -> (u64, u64) { (self.image_base, self.image_size) }

    fn memreserves(&self) -> &[(u64, u64)] { &self.memreserves[..self.memreserves_count] }
}
