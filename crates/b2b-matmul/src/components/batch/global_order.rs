use serde::{Deserialize, Serialize};

/// Order in which the output tiles of one problem are numbered.
///
/// The swizzled orders walk bands of `w` tiles in a serpentine: `SwizzleColMajor(w)` goes
/// down bands of `w` columns then back up the next band, alternating the direction of each
/// row of `w` tiles along the way. `SwizzleRowMajor(w)` is the same walk with rows and
/// columns exchanged. Neighbouring tiles share operand rows or columns, which keeps them warm
/// in the cache.
#[derive(Default, Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlobalOrder {
    #[default]
    RowMajor,
    ColMajor,
    SwizzleRowMajor(u32),
    SwizzleColMajor(u32),
}

impl GlobalOrder {
    /// Replaces bands of a single tile, which visit the grid like the plain orders, by the
    /// plain order of the same axis.
    pub fn simplify(self) -> Self {
        match self {
            GlobalOrder::SwizzleRowMajor(1) => GlobalOrder::RowMajor,
            GlobalOrder::SwizzleColMajor(1) => GlobalOrder::ColMajor,
            order => order,
        }
    }

    /// The order used for a grid of `m_tiles × n_tiles`.
    ///
    /// Bands must tile the grid exactly, otherwise the plain order of the same axis is used.
    pub fn effective(self, m_tiles: u32, n_tiles: u32) -> Self {
        match self.simplify() {
            GlobalOrder::SwizzleRowMajor(w) if w == 0 || m_tiles % w != 0 => {
                log::debug!("Bands of {w} rows don't tile {m_tiles} row tiles, using row major");
                GlobalOrder::RowMajor
            }
            GlobalOrder::SwizzleColMajor(w) if w == 0 || n_tiles % w != 0 => {
                log::debug!(
                    "Bands of {w} columns don't tile {n_tiles} column tiles, using col major"
                );
                GlobalOrder::ColMajor
            }
            order => order,
        }
    }

    /// Position `(row, col)` of the `index`-th tile.
    ///
    /// The order must be [effective](GlobalOrder::effective) for the grid.
    pub fn to_row_col(&self, index: u32, m_tiles: u32, n_tiles: u32) -> (u32, u32) {
        match *self {
            GlobalOrder::RowMajor => (index / n_tiles, index % n_tiles),
            GlobalOrder::ColMajor => (index % m_tiles, index / m_tiles),
            GlobalOrder::SwizzleColMajor(w) => serpentine(index, m_tiles, w),
            GlobalOrder::SwizzleRowMajor(w) => {
                let (col, row) = serpentine(index, n_tiles, w);
                (row, col)
            }
        }
    }
}

/// Position `(along, across)` of the `index`-th step of a serpentine over bands `width` wide
/// and `length` long.
///
/// Even bands run forward along their length, odd bands backward. Within a band, even steps
/// cross it forward and odd steps backward.
fn serpentine(index: u32, length: u32, width: u32) -> (u32, u32) {
    let band = index / (length * width);
    let step = index % (length * width) / width;
    let lane = index % width;

    let along = match band % 2 {
        0 => step,
        _ => length - 1 - step,
    };
    let lane = match step % 2 {
        0 => lane,
        _ => width - 1 - lane,
    };

    (along, band * width + lane)
}
