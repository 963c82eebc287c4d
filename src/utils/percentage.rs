use std::{fmt::Display, ops::Deref};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// A coordinate inside the garden canvas, expressed as a percentage of its
/// width or height. Values outside `0..=100` never construct.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percent(f64);

impl Display for Percent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Percent {
    pub fn new_opt(value: f64) -> Option<Percent> {
        // NaN fails both comparisons and is rejected with everything else.
        if (0. ..=100.).contains(&value) {
            Some(Percent(value))
        } else {
            None
        }
    }
}

impl Deref for Percent {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Percent::new_opt(value)
            .ok_or_else(|| de::Error::custom(format!("{value} is not a percentage in 0..=100")))
    }
}
