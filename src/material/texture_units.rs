//! Texture unit assignment for sampler slots.

use std::fmt;

/// First texture unit enum value (`GL_TEXTURE0`).
pub const GL_TEXTURE0: u32 = 0x84C0;

/// A texture unit index, exclusive to one sampler slot of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureUnit(u32);

impl TextureUnit {
    /// 0-based unit index, also the value written to the sampler uniform.
    pub fn index(&self) -> u32 {
        self.0
    }

    /// The `GL_TEXTUREi` enum for this unit.
    pub fn gl_enum(&self) -> u32 {
        GL_TEXTURE0 + self.0
    }
}

impl fmt::Display for TextureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TEXTURE{}", self.0)
    }
}

/// Hands out texture units to the sampler slots of one material.
///
/// Units start at 0 and increase by one per call; a unit is never handed
/// out twice. Each material owns its own allocator, so two materials both
/// start at unit 0. That is safe because binding an instance re-activates
/// every unit it uses.
#[derive(Debug, Clone)]
pub struct TextureUnitAllocator {
    next: u32,
    limit: u32,
}

impl TextureUnitAllocator {
    /// Create an allocator handing out at most `limit` units.
    pub fn new(limit: u32) -> Self {
        Self { next: 0, limit }
    }

    /// Allocate the next unit, or `None` once the limit is reached.
    pub fn allocate(&mut self) -> Option<TextureUnit> {
        if self.next >= self.limit {
            return None;
        }
        let unit = TextureUnit(self.next);
        self.next += 1;
        Some(unit)
    }

    /// Number of units handed out so far.
    pub fn allocated(&self) -> u32 {
        self.next
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_are_sequential_from_zero() {
        let mut allocator = TextureUnitAllocator::new(16);
        let units: Vec<u32> = (0..4)
            .map(|_| allocator.allocate().unwrap().index())
            .collect();
        assert_eq!(units, [0, 1, 2, 3]);
        assert_eq!(allocator.allocated(), 4);
    }

    #[test]
    fn test_limit_is_enforced() {
        let mut allocator = TextureUnitAllocator::new(2);
        assert!(allocator.allocate().is_some());
        assert!(allocator.allocate().is_some());
        assert_eq!(allocator.allocate(), None);
        assert_eq!(allocator.allocated(), 2);
    }

    #[test]
    fn test_gl_enum() {
        let mut allocator = TextureUnitAllocator::new(4);
        allocator.allocate();
        let unit = allocator.allocate().unwrap();
        assert_eq!(unit.gl_enum(), GL_TEXTURE0 + 1);
        assert_eq!(unit.to_string(), "TEXTURE1");
    }
}
