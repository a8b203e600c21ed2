use crate::errors::Error;
use std::fmt;
use std::str::FromStr;

/// Electron-neutral collision frequency profile of the lower ionosphere.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CollisionModel {
    /// Aggarwal et al. (1979)
    #[default]
    Aggarwal,
    /// Nicolet (1953)
    Nicolet,
    /// Setty et al. (1968)
    Setty,
    /// Same frequency (Hz) at every height
    Constant(f64),
}

impl CollisionModel {
    /// Collision frequency (Hz) at `height` km
    pub fn frequency(&self, height: f64) -> f64 {
        match self {
            CollisionModel::Aggarwal => 1.816e11 * (-0.15 * height).exp(),
            CollisionModel::Nicolet => (-0.16184565 * height + 28.02068763).exp(),
            CollisionModel::Setty => (-0.16018850 * height + 26.14003024).exp(),
            CollisionModel::Constant(freq) => *freq,
        }
    }
}

impl FromStr for CollisionModel {
    type Err = Error;

    /// Accepts a model name or a constant frequency in Hz
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" | "aggarwal" | "aggrawal" => Ok(CollisionModel::Aggarwal),
            "nicolet" => Ok(CollisionModel::Nicolet),
            "setty" => Ok(CollisionModel::Setty),
            other => match other.parse::<f64>() {
                Ok(freq) if freq.is_finite() && freq >= 0.0 => Ok(CollisionModel::Constant(freq)),
                _ => Err(Error::Validation(format!(
                    "unknown collision frequency model '{s}', expected one of \
                     'default', 'aggarwal', 'nicolet', 'setty' or a frequency in Hz"
                ))),
            },
        }
    }
}

impl fmt::Display for CollisionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionModel::Aggarwal => write!(f, "aggarwal"),
            CollisionModel::Nicolet => write!(f, "nicolet"),
            CollisionModel::Setty => write!(f, "setty"),
            CollisionModel::Constant(freq) => write!(f, "{freq}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_case::test_case;

    #[test_case("default", CollisionModel::Aggarwal)]
    #[test_case("aggrawal", CollisionModel::Aggarwal)]
    #[test_case("Nicolet", CollisionModel::Nicolet)]
    #[test_case("setty", CollisionModel::Setty)]
    #[test_case("2.5e6", CollisionModel::Constant(2.5e6))]
    fn parse(name: &str, expected: CollisionModel) {
        assert_eq!(name.parse::<CollisionModel>().unwrap(), expected);
    }

    #[test_case("banana")]
    #[test_case("")]
    #[test_case("-5")]
    #[test_case("inf")]
    fn unknown_names_are_rejected(name: &str) {
        assert!(matches!(name.parse::<CollisionModel>(), Err(Error::Validation(_))));
    }

    #[test]
    fn display_parses_back() {
        for model in [
            CollisionModel::Aggarwal,
            CollisionModel::Nicolet,
            CollisionModel::Setty,
            CollisionModel::Constant(1e7),
        ] {
            assert_eq!(model.to_string().parse::<CollisionModel>().unwrap(), model);
        }
    }

    #[test]
    fn profiles_decrease_with_height() {
        for model in [CollisionModel::Aggarwal, CollisionModel::Nicolet, CollisionModel::Setty] {
            assert!(model.frequency(60.0) > model.frequency(90.0));
        }
        assert_eq!(CollisionModel::Constant(3.0).frequency(60.0), 3.0);
    }

    #[test]
    fn aggarwal_at_70_km() {
        assert_relative_eq!(
            CollisionModel::Aggarwal.frequency(70.0),
            1.816e11 * (-10.5f64).exp(),
            max_relative = 1e-12
        );
    }
}
