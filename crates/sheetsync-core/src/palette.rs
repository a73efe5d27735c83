//! Presentation palette and per-run color cycling
//!
//! Sheet formats reference colors by their index in the remote service's
//! fixed palette. The first four entries have special meaning and are never
//! handed out to events.

/// Index into [`COLORS`]
pub type ColorIndex = u8;

/// The remote service's palette, in index order
pub const COLORS: [&str; 42] = [
    "none",
    "#000000",
    "#FFFFFF",
    "transparent",
    "#FFEBEE",
    "#FFF3DF",
    "#FFFEE6",
    "#E7F5E9",
    "#E2F2FE",
    "#F4E4F5",
    "#F2E8DE",
    "#FFCCD2",
    "#FFE1AF",
    "#FEFF85",
    "#C6E7C8",
    "#B9DDFC",
    "#EBC7EF",
    "#EEDCCA",
    "#E5E5E5",
    "#F87E7D",
    "#FFCD7A",
    "#FEFF00",
    "#7ED085",
    "#5FB3F9",
    "#D190DA",
    "#D0AF8F",
    "#BDBDBD",
    "#EA352E",
    "#FF8D00",
    "#FFED00",
    "#40B14B",
    "#1061C3",
    "#9210AD",
    "#974C00",
    "#757575",
    "#991310",
    "#EA5000",
    "#EBC700",
    "#237F2E",
    "#0B347D",
    "#61058B",
    "#592C00",
];

pub const NONE: ColorIndex = 0;
pub const BLACK: ColorIndex = 1;
pub const WHITE: ColorIndex = 2;
pub const TRANSPARENT: ColorIndex = 3;

/// First index handed out to events
pub const FIRST_ASSIGNABLE: ColorIndex = 4;

/// Hex value (or keyword) for a palette index
pub fn hex(index: ColorIndex) -> Option<&'static str> {
    COLORS.get(usize::from(index)).copied()
}

/// Whether `index` may be assigned to an event
pub fn is_assignable(index: ColorIndex) -> bool {
    index >= FIRST_ASSIGNABLE && usize::from(index) < COLORS.len()
}

/// Round-robin cursor over the assignable palette subset.
///
/// Create one per processing run; cursors are never shared between sheets.
#[derive(Clone, Debug, Default)]
pub struct ColorCycle {
    position: usize,
}

impl ColorCycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next color, wrapping to the first assignable entry after the last
    pub fn next_color(&mut self) -> ColorIndex {
        let span = COLORS.len() - usize::from(FIRST_ASSIGNABLE);
        let color = FIRST_ASSIGNABLE + (self.position % span) as ColorIndex;
        self.position += 1;
        color
    }
}
