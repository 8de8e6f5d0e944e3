//! Typed property values shared by node attributes and keyframes.

use serde::{Deserialize, Serialize};

use crate::math::{self, Color, Vec2};

/// The kind of a [`PropertyValue`], used to reject mismatched writes
/// before any mutation happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Vec2,
    Color,
    Str,
}

/// A typed value carried by node attributes and animation keyframes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Color(Color),
    Str(String),
}

impl PropertyValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::Bool(_) => ValueKind::Bool,
            PropertyValue::Int(_) => ValueKind::Int,
            PropertyValue::Float(_) => ValueKind::Float,
            PropertyValue::Vec2(_) => ValueKind::Vec2,
            PropertyValue::Color(_) => ValueKind::Color,
            PropertyValue::Str(_) => ValueKind::Str,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<Vec2> {
        match self {
            PropertyValue::Vec2(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            PropertyValue::Color(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Interpolates between two values of the same kind by `t` in `[0, 1]`.
    ///
    /// Continuous kinds (`Float`, `Vec2`, `Color`) interpolate linearly;
    /// discrete kinds (`Bool`, `Int`, `Str`) hold the left value until `t`
    /// reaches 1. Mismatched kinds return the left value unchanged.
    pub fn interpolate(&self, other: &PropertyValue, t: f32) -> PropertyValue {
        match (self, other) {
            (PropertyValue::Float(a), PropertyValue::Float(b)) => {
                PropertyValue::Float(math::lerp(*a, *b, t))
            }
            (PropertyValue::Vec2(a), PropertyValue::Vec2(b)) => {
                PropertyValue::Vec2(math::lerp_vec2(*a, *b, t))
            }
            (PropertyValue::Color(a), PropertyValue::Color(b)) => {
                PropertyValue::Color(math::lerp_color(*a, *b, t))
            }
            _ => {
                if t >= 1.0 {
                    other.clone()
                } else {
                    self.clone()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(PropertyValue::Bool(true).kind(), ValueKind::Bool);
        assert_eq!(PropertyValue::Int(3).kind(), ValueKind::Int);
        assert_eq!(PropertyValue::Float(1.0).kind(), ValueKind::Float);
        assert_eq!(PropertyValue::Vec2(Vec2::zeros()).kind(), ValueKind::Vec2);
        assert_eq!(PropertyValue::Color([0.0; 4]).kind(), ValueKind::Color);
        assert_eq!(PropertyValue::Str("id".into()).kind(), ValueKind::Str);
    }

    #[test]
    fn typed_getters() {
        assert_eq!(PropertyValue::Float(2.5).as_float(), Some(2.5));
        assert_eq!(PropertyValue::Float(2.5).as_bool(), None);
        assert_eq!(PropertyValue::Str("walk".into()).as_str(), Some("walk"));
    }

    #[test]
    fn continuous_values_interpolate() {
        let a = PropertyValue::Float(0.0);
        let b = PropertyValue::Float(10.0);
        assert_eq!(a.interpolate(&b, 0.25), PropertyValue::Float(2.5));

        let a = PropertyValue::Vec2(Vec2::new(0.0, 0.0));
        let b = PropertyValue::Vec2(Vec2::new(2.0, 4.0));
        assert_eq!(
            a.interpolate(&b, 0.5),
            PropertyValue::Vec2(Vec2::new(1.0, 2.0))
        );
    }

    #[test]
    fn discrete_values_step() {
        let a = PropertyValue::Bool(false);
        let b = PropertyValue::Bool(true);
        assert_eq!(a.interpolate(&b, 0.99), PropertyValue::Bool(false));
        assert_eq!(a.interpolate(&b, 1.0), PropertyValue::Bool(true));
    }
}
