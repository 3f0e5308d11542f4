/// Level pixel colors and what they spawn.
/// The table is closed and matched by exact RGBA equality; anything else
/// in a level bitmap is scenery and spawns nothing.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TileColor {
    SawBlade,     // yellow
    ElectricBox,  // blue
    FallingBlock, // cyan
    Wall,         // white
    Button,       // magenta
    BorderBack,   // red: level - 1
    BorderAhead,  // green: level + 1
}

impl TileColor {
    pub const ALL: [TileColor; 7] = [
        TileColor::SawBlade,
        TileColor::ElectricBox,
        TileColor::FallingBlock,
        TileColor::Wall,
        TileColor::Button,
        TileColor::BorderBack,
        TileColor::BorderAhead,
    ];

    pub fn rgba(self) -> [u8; 4] {
        match self {
            TileColor::SawBlade => [255, 255, 0, 255],
            TileColor::ElectricBox => [0, 0, 255, 255],
            TileColor::FallingBlock => [0, 255, 255, 255],
            TileColor::Wall => [255, 255, 255, 255],
            TileColor::Button => [255, 0, 255, 255],
            TileColor::BorderBack => [255, 0, 0, 255],
            TileColor::BorderAhead => [0, 255, 0, 255],
        }
    }

    pub fn from_rgba(px: [u8; 4]) -> Option<TileColor> {
        Self::ALL.into_iter().find(|t| t.rgba() == px)
    }
}
