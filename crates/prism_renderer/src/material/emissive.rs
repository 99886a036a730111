use super::{Color, MaterialProperty};

/// Light-emitting surface. Never scatters.
#[derive(Debug, Clone)]
pub struct Emissive {
    pub emission: MaterialProperty,
}

impl Emissive {
    pub fn new(color: Color, strength: f32) -> Self {
        Self {
            emission: MaterialProperty::new(color).with_intensity(strength),
        }
    }

    pub fn from_property(emission: MaterialProperty) -> Self {
        Self { emission }
    }
}
