//! Named placement patterns as relative (dx, dy) offsets.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    pub name: String,
    pub offsets: Vec<(i32, i32)>,
}

impl Pattern {
    pub fn new(name: impl Into<String>, offsets: Vec<(i32, i32)>) -> Self {
        Self {
            name: name.into(),
            offsets,
        }
    }

    /// Parse rows of `O`/`#`/`*` (alive) and `.`/space (dead). Row 0 is the
    /// top; the anchor is the top-left corner.
    pub fn from_ascii(name: impl Into<String>, art: &str) -> Result<Self, String> {
        let mut offsets = Vec::new();
        for (dy, line) in art.lines().map(str::trim_end).filter(|l| !l.is_empty()).enumerate() {
            for (dx, ch) in line.chars().enumerate() {
                match ch {
                    'O' | 'o' | '#' | '*' => offsets.push((dx as i32, dy as i32)),
                    '.' | ' ' => {}
                    other => return Err(format!("unexpected '{}' at row {}, col {}", other, dy, dx)),
                }
            }
        }
        if offsets.is_empty() {
            return Err("pattern has no live cells".to_string());
        }
        Ok(Self::new(name, offsets))
    }

    /// Rotate 90 degrees clockwise about the anchor.
    pub fn rotate(&self) -> Self {
        Self::new(
            self.name.clone(),
            self.offsets.iter().map(|&(dx, dy)| (-dy, dx)).collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

// ============================================================================
// CATALOGUE
// ============================================================================

pub fn block() -> Pattern {
    Pattern::new("block", vec![(0, 0), (1, 0), (0, 1), (1, 1)])
}

/// Horizontal period-2 oscillator
pub fn blinker() -> Pattern {
    Pattern::new("blinker", vec![(0, 0), (1, 0), (2, 0)])
}

pub fn glider() -> Pattern {
    Pattern::new("glider", vec![(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)])
}

pub fn lwss() -> Pattern {
    Pattern::new(
        "lwss",
        vec![(1, 0), (4, 0), (0, 1), (0, 2), (4, 2), (0, 3), (1, 3), (2, 3), (3, 3)],
    )
}

pub fn r_pentomino() -> Pattern {
    Pattern::new("r-pentomino", vec![(1, 0), (2, 0), (0, 1), (1, 1), (1, 2)])
}

pub fn acorn() -> Pattern {
    Pattern::new(
        "acorn",
        vec![(1, 0), (3, 1), (0, 2), (1, 2), (4, 2), (5, 2), (6, 2)],
    )
}

pub fn catalogue() -> Vec<Pattern> {
    vec![block(), blinker(), glider(), lwss(), r_pentomino(), acorn()]
}

pub fn by_name(name: &str) -> Option<Pattern> {
    catalogue().into_iter().find(|p| p.name.eq_ignore_ascii_case(name))
}
