//! Stratified grid indexing.
//!
//! A `G x G` grid partitions the unit square into equal cells. Sample
//! `i` lands in column `i mod G`, row `i div G`.

/// Lower corner of cell `index` in a `grid_size x grid_size` grid over `[0,1)^2`.
#[inline]
pub fn grid_cell(index: u32, grid_size: u32) -> (f64, f64) {
    let g = grid_size as f64;
    ((index % grid_size) as f64 / g, (index / grid_size) as f64 / g)
}

/// Lower corners of every cell, in index order.
pub fn grid_cells(grid_size: u32) -> impl Iterator<Item = (f64, f64)> {
    (0..grid_size * grid_size).map(move |i| grid_cell(i, grid_size))
}
