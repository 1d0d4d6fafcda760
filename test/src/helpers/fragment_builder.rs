use canopy_shared::{Allocator, LocalTable, Rank, Shared, SubTable, SubTableId};

/// A one-dimensional fragment of `count` points starting at `origin`, spaced 1 apart
pub fn fragment(
    allocator: &Allocator<SubTable>,
    rank: Rank,
    begin: u32,
    count: u32,
    origin: f64,
) -> Shared<SubTable> {
    let points = (0..count).map(|i| origin + i as f64).collect();
    let subtable = SubTable::new(SubTableId::new(rank, begin, count), 1, points)
        .expect("point buffer matches count");
    allocator.allocate(subtable)
}

/// The local table of `rank`: `fragments` consecutive fragments of
/// `points_per_fragment` points, placed on a line far from other ranks
pub fn line_table(
    allocator: &Allocator<SubTable>,
    rank: Rank,
    fragments: u32,
    points_per_fragment: u32,
) -> LocalTable {
    let fragments = (0..fragments)
        .map(|i| {
            let begin = i * points_per_fragment;
            fragment(
                allocator,
                rank,
                begin,
                points_per_fragment,
                rank as f64 * 1000.0 + begin as f64,
            )
        })
        .collect();
    LocalTable::new(rank, fragments)
}
