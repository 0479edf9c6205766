//! Brazilian postal codes (CEP) and the state they belong to.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing a [`PostalCode`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PostalCodeError {
    /// No digits in the input.
    #[error("postal code is required")]
    Empty,
    /// More digits than a CEP can hold.
    #[error("postal code must be at most {max} digits")]
    TooLong {
        /// Maximum allowed digit count.
        max: usize,
    },
}

/// A destination postal code, reduced to its digits.
///
/// Formatting characters (`-`, `.`, spaces) are stripped on parse, so
/// `"01310-100"` and `"01310100"` are the same code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostalCode(String);

impl PostalCode {
    /// Number of digits in a full CEP.
    pub const LEN: usize = 8;

    /// Parse a postal code, keeping only ASCII digits.
    ///
    /// # Errors
    ///
    /// Returns [`PostalCodeError::Empty`] when no digits remain and
    /// [`PostalCodeError::TooLong`] for more than eight digits.
    pub fn parse(input: &str) -> Result<Self, PostalCodeError> {
        let digits: String = input.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(PostalCodeError::Empty);
        }
        if digits.len() > Self::LEN {
            return Err(PostalCodeError::TooLong { max: Self::LEN });
        }
        Ok(Self(digits))
    }

    /// The digits as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the first five digits (the CEP "region + sector").
    #[must_use]
    pub fn prefix(&self) -> u32 {
        self.0
            .chars()
            .take(5)
            .filter_map(|c| c.to_digit(10))
            .fold(0, |acc, d| acc * 10 + d)
    }

    /// State the postal code is allocated to, if it falls in a known range.
    #[must_use]
    pub fn state(&self) -> Option<StateCode> {
        StateCode::from_cep_prefix(self.prefix())
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PostalCode {
    type Err = PostalCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PostalCode {
    type Error = PostalCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PostalCode> for String {
    fn from(code: PostalCode) -> Self {
        code.0
    }
}

/// Brazilian federative units (26 states plus the Federal District).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StateCode {
    Ac,
    Al,
    Ap,
    Am,
    Ba,
    Ce,
    Df,
    Es,
    Go,
    Ma,
    Mt,
    Ms,
    Mg,
    Pa,
    Pb,
    Pr,
    Pe,
    Pi,
    Rj,
    Rn,
    Rs,
    Ro,
    Rr,
    Sc,
    Sp,
    Se,
    To,
}

/// Inclusive CEP prefix ranges per state. Amazonas owns two ranges split by
/// Roraima.
const CEP_RANGES: &[(u32, u32, StateCode)] = &[
    (1_000, 19_999, StateCode::Sp),
    (20_000, 28_999, StateCode::Rj),
    (29_000, 29_999, StateCode::Es),
    (30_000, 39_999, StateCode::Mg),
    (40_000, 48_999, StateCode::Ba),
    (49_000, 49_999, StateCode::Se),
    (50_000, 56_999, StateCode::Pe),
    (57_000, 57_999, StateCode::Al),
    (58_000, 58_999, StateCode::Pb),
    (59_000, 59_999, StateCode::Rn),
    (60_000, 63_999, StateCode::Ce),
    (64_000, 64_999, StateCode::Pi),
    (65_000, 65_999, StateCode::Ma),
    (66_000, 68_899, StateCode::Pa),
    (68_900, 68_999, StateCode::Ap),
    (69_000, 69_299, StateCode::Am),
    (69_300, 69_399, StateCode::Rr),
    (69_400, 69_899, StateCode::Am),
    (69_900, 69_999, StateCode::Ac),
    (70_000, 73_699, StateCode::Df),
    (73_700, 76_799, StateCode::Go),
    (76_800, 76_999, StateCode::Ro),
    (77_000, 77_999, StateCode::To),
    (78_000, 78_899, StateCode::Mt),
    (79_000, 79_999, StateCode::Ms),
    (80_000, 87_999, StateCode::Pr),
    (88_000, 89_999, StateCode::Sc),
    (90_000, 99_999, StateCode::Rs),
];

impl StateCode {
    /// All 27 units in alphabetical order of their codes.
    pub const ALL: [Self; 27] = [
        Self::Ac,
        Self::Al,
        Self::Am,
        Self::Ap,
        Self::Ba,
        Self::Ce,
        Self::Df,
        Self::Es,
        Self::Go,
        Self::Ma,
        Self::Mg,
        Self::Ms,
        Self::Mt,
        Self::Pa,
        Self::Pb,
        Self::Pe,
        Self::Pi,
        Self::Pr,
        Self::Rj,
        Self::Rn,
        Self::Ro,
        Self::Rr,
        Self::Rs,
        Self::Sc,
        Self::Se,
        Self::Sp,
        Self::To,
    ];

    /// Look up the state for the numeric value of a CEP's first five digits.
    #[must_use]
    pub fn from_cep_prefix(prefix: u32) -> Option<Self> {
        CEP_RANGES
            .iter()
            .find(|(lo, hi, _)| (*lo..=*hi).contains(&prefix))
            .map(|(_, _, uf)| *uf)
    }

    /// Two-letter code, e.g. `"SP"`.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Ac => "AC",
            Self::Al => "AL",
            Self::Ap => "AP",
            Self::Am => "AM",
            Self::Ba => "BA",
            Self::Ce => "CE",
            Self::Df => "DF",
            Self::Es => "ES",
            Self::Go => "GO",
            Self::Ma => "MA",
            Self::Mt => "MT",
            Self::Ms => "MS",
            Self::Mg => "MG",
            Self::Pa => "PA",
            Self::Pb => "PB",
            Self::Pr => "PR",
            Self::Pe => "PE",
            Self::Pi => "PI",
            Self::Rj => "RJ",
            Self::Rn => "RN",
            Self::Rs => "RS",
            Self::Ro => "RO",
            Self::Rr => "RR",
            Self::Sc => "SC",
            Self::Sp => "SP",
            Self::Se => "SE",
            Self::To => "TO",
        }
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
