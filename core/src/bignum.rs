//! Arbitrary-precision numeric types used throughout the simulator.
//!
//! `difficulty`, `cumDifficulty` and `nxtDifficulty` are modeled as
//! [`Difficulty`], an unbounded non-negative integer (a thin wrapper over
//! [`BigUint`]). A pool's `diffScore`/`cumDiffScore` are modeled as
//! [`ScoreValue`], an unbounded signed integer (over [`BigInt`]) because
//! scoring-function adjustments (§4.4.2) may subtract from the base
//! difficulty. Neither type is ever down-cast to a fixed-width integer;
//! ceiling division, the one place the difficulty engine needs it, is
//! exposed explicitly rather than hidden behind `/`.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;

use num_bigint::{BigInt, BigUint, ParseBigIntError};
use num_traits::{One, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Difficulty(BigUint);

impl Difficulty {
    pub fn one() -> Self {
        Difficulty(BigUint::one())
    }

    pub fn from_u64(v: u64) -> Self {
        Difficulty(BigUint::from(v))
    }

    /// Clamp to the protocol minimum of 1: difficulty must never reach zero.
    pub fn clamped(self) -> Self {
        if self.0.is_zero() {
            Difficulty::one()
        } else {
            self
        }
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// `ceil(self * numerator / denominator)`, used by the difficulty engine
    /// to scale accumulated work by the block-time target.
    pub fn mul_div_ceil(&self, numerator: u64, denominator: &BigUint) -> Difficulty {
        let denom = if denominator.is_zero() {
            BigUint::one()
        } else {
            denominator.clone()
        };
        let num = &self.0 * numerator;
        let (q, r) = (&num / &denom, &num % &denom);
        let result = if r.is_zero() { q } else { q + BigUint::one() };
        Difficulty(result).clamped()
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::one()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Add for Difficulty {
    type Output = Difficulty;
    fn add(self, rhs: Difficulty) -> Difficulty {
        Difficulty(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Difficulty> for &'a Difficulty {
    type Output = Difficulty;
    fn add(self, rhs: &'a Difficulty) -> Difficulty {
        Difficulty(&self.0 + &rhs.0)
    }
}

impl Sub for Difficulty {
    type Output = Difficulty;
    fn sub(self, rhs: Difficulty) -> Difficulty {
        Difficulty(self.0 - rhs.0)
    }
}

impl<'a> Sub<&'a Difficulty> for &'a Difficulty {
    type Output = Difficulty;
    fn sub(self, rhs: &'a Difficulty) -> Difficulty {
        Difficulty(&self.0 - &rhs.0)
    }
}

impl FromStr for Difficulty {
    type Err = ParseBigIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Difficulty(BigUint::from_str(s)?))
    }
}

impl Serialize for Difficulty {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Difficulty::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A pool's subjective, signed notion of accumulated difficulty, after
/// scoring-function adjustments (§4.4.2) have been folded in.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ScoreValue(BigInt);

impl ScoreValue {
    pub fn zero() -> Self {
        ScoreValue(BigInt::zero())
    }

    pub fn from_difficulty(d: &Difficulty) -> Self {
        ScoreValue(BigInt::from(d.as_biguint().clone()))
    }

    pub fn from_i64(v: i64) -> Self {
        ScoreValue(BigInt::from(v))
    }

    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }
}

impl fmt::Display for ScoreValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Add for ScoreValue {
    type Output = ScoreValue;
    fn add(self, rhs: ScoreValue) -> ScoreValue {
        ScoreValue(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a ScoreValue> for &'a ScoreValue {
    type Output = ScoreValue;
    fn add(self, rhs: &'a ScoreValue) -> ScoreValue {
        ScoreValue(&self.0 + &rhs.0)
    }
}

impl Sub for ScoreValue {
    type Output = ScoreValue;
    fn sub(self, rhs: ScoreValue) -> ScoreValue {
        ScoreValue(self.0 - rhs.0)
    }
}

impl<'a> Sub<&'a ScoreValue> for &'a ScoreValue {
    type Output = ScoreValue;
    fn sub(self, rhs: &'a ScoreValue) -> ScoreValue {
        ScoreValue(&self.0 - &rhs.0)
    }
}

impl Sum for ScoreValue {
    fn sum<I: Iterator<Item = ScoreValue>>(iter: I) -> Self {
        iter.fold(ScoreValue::zero(), |a, b| a + b)
    }
}

impl Serialize for ScoreValue {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for ScoreValue {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        BigInt::from_str(&s)
            .map(ScoreValue)
            .map_err(serde::de::Error::custom)
    }
}
