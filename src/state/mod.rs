//! Closed state enumerations and the per-market state vector.
//!
//! Every indicator family has a fixed set of named readings plus an explicit
//! `unknown` member for missing or ambiguous data. Strings only appear at the
//! wire boundary (`FromStr` / `as_str`); inside the crate everything is typed.

pub mod mapper;
pub mod series;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::InvalidStateError;

const UNKNOWN: &str = "unknown";

/// Declares a family enum with string conversion, serde and an `Unknown` default.
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $name:ident => $family:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum $name {
            $($variant,)+
            #[default]
            Unknown,
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+ $name::Unknown];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                    $name::Unknown => UNKNOWN,
                }
            }

            pub fn is_unknown(self) -> bool {
                self == $name::Unknown
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = InvalidStateError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    UNKNOWN => Ok($name::Unknown),
                    other => Err(InvalidStateError::UnknownValue {
                        family: $family.to_string(),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

state_enum! {
    /// Inflation reading from CPI YoY level and its first difference.
    InflationState => "inflation" {
        Low => "low",
        Moderate => "moderate",
        HighSticky => "high_sticky",
        Reaccelerating => "reaccelerating",
    }
}

state_enum! {
    PolicyRateState => "policy_rate" {
        Easing => "easing",
        Hold => "hold",
        Tightening => "tightening",
    }
}

state_enum! {
    EmploymentState => "employment" {
        Weak => "weak",
        Stable => "stable",
        Strong => "strong",
    }
}

state_enum! {
    GrowthState => "growth" {
        Slowdown => "slowdown",
        Stable => "stable",
        Recovery => "recovery",
    }
}

state_enum! {
    LongRateState => "long_rate" {
        LowLevel => "low_level",
        MidLevel => "mid_level",
        HighLevel => "high_level",
    }
}

state_enum! {
    /// Valuation proxy: PER when available, otherwise price vs. moving average.
    EquityValuationState => "equity_valuation" {
        Cheap => "cheap",
        Fair => "fair",
        HighZone => "high_zone",
    }
}

state_enum! {
    VolatilityState => "volatility" {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

state_enum! {
    SectorConcentrationState => "sector_concentration" {
        None => "none",
        AiHeavy => "ai_heavy",
        SingleThemeHeavy => "single_theme_heavy",
    }
}

state_enum! {
    LiquidityState => "liquidity" {
        Tight => "tight",
        Neutral => "neutral",
        Loose => "loose",
    }
}

state_enum! {
    ExternalRiskState => "external_risk" {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

/// Indicator families, in the canonical order used for display and audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateFamily {
    Inflation,
    PolicyRate,
    Employment,
    Growth,
    LongRate,
    EquityValuation,
    Volatility,
    SectorConcentration,
    Liquidity,
    ExternalRisk,
}

impl StateFamily {
    pub const ALL: [StateFamily; 10] = [
        StateFamily::Inflation,
        StateFamily::PolicyRate,
        StateFamily::Employment,
        StateFamily::Growth,
        StateFamily::LongRate,
        StateFamily::EquityValuation,
        StateFamily::Volatility,
        StateFamily::SectorConcentration,
        StateFamily::Liquidity,
        StateFamily::ExternalRisk,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Inflation => "inflation",
            Self::PolicyRate => "policy_rate",
            Self::Employment => "employment",
            Self::Growth => "growth",
            Self::LongRate => "long_rate",
            Self::EquityValuation => "equity_valuation",
            Self::Volatility => "volatility",
            Self::SectorConcentration => "sector_concentration",
            Self::Liquidity => "liquidity",
            Self::ExternalRisk => "external_risk",
        }
    }

    /// The family's default reading when no usable fact exists.
    pub fn default_value(self) -> StateValue {
        StateVector::default().get(self)
    }

    /// Every member of the family's enumeration, `unknown` last.
    pub fn all_values(self) -> Vec<StateValue> {
        fn wrap<T: Copy>(all: &[T], tag: fn(T) -> StateValue) -> Vec<StateValue> {
            all.iter().copied().map(tag).collect()
        }

        match self {
            Self::Inflation => wrap(InflationState::ALL, StateValue::Inflation),
            Self::PolicyRate => wrap(PolicyRateState::ALL, StateValue::PolicyRate),
            Self::Employment => wrap(EmploymentState::ALL, StateValue::Employment),
            Self::Growth => wrap(GrowthState::ALL, StateValue::Growth),
            Self::LongRate => wrap(LongRateState::ALL, StateValue::LongRate),
            Self::EquityValuation => wrap(EquityValuationState::ALL, StateValue::EquityValuation),
            Self::Volatility => wrap(VolatilityState::ALL, StateValue::Volatility),
            Self::SectorConcentration => {
                wrap(SectorConcentrationState::ALL, StateValue::SectorConcentration)
            }
            Self::Liquidity => wrap(LiquidityState::ALL, StateValue::Liquidity),
            Self::ExternalRisk => wrap(ExternalRiskState::ALL, StateValue::ExternalRisk),
        }
    }
}

impl fmt::Display for StateFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StateFamily {
    type Err = InvalidStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateFamily::ALL
            .into_iter()
            .find(|family| family.key() == s)
            .ok_or_else(|| InvalidStateError::UnknownFamily(s.to_string()))
    }
}

/// One family's reading, tagged with its family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateValue {
    Inflation(InflationState),
    PolicyRate(PolicyRateState),
    Employment(EmploymentState),
    Growth(GrowthState),
    LongRate(LongRateState),
    EquityValuation(EquityValuationState),
    Volatility(VolatilityState),
    SectorConcentration(SectorConcentrationState),
    Liquidity(LiquidityState),
    ExternalRisk(ExternalRiskState),
}

impl StateValue {
    /// Parse a wire string for the given family.
    pub fn parse(family: StateFamily, value: &str) -> Result<Self, InvalidStateError> {
        Ok(match family {
            StateFamily::Inflation => Self::Inflation(value.parse()?),
            StateFamily::PolicyRate => Self::PolicyRate(value.parse()?),
            StateFamily::Employment => Self::Employment(value.parse()?),
            StateFamily::Growth => Self::Growth(value.parse()?),
            StateFamily::LongRate => Self::LongRate(value.parse()?),
            StateFamily::EquityValuation => Self::EquityValuation(value.parse()?),
            StateFamily::Volatility => Self::Volatility(value.parse()?),
            StateFamily::SectorConcentration => Self::SectorConcentration(value.parse()?),
            StateFamily::Liquidity => Self::Liquidity(value.parse()?),
            StateFamily::ExternalRisk => Self::ExternalRisk(value.parse()?),
        })
    }

    pub fn family(self) -> StateFamily {
        match self {
            Self::Inflation(_) => StateFamily::Inflation,
            Self::PolicyRate(_) => StateFamily::PolicyRate,
            Self::Employment(_) => StateFamily::Employment,
            Self::Growth(_) => StateFamily::Growth,
            Self::LongRate(_) => StateFamily::LongRate,
            Self::EquityValuation(_) => StateFamily::EquityValuation,
            Self::Volatility(_) => StateFamily::Volatility,
            Self::SectorConcentration(_) => StateFamily::SectorConcentration,
            Self::Liquidity(_) => StateFamily::Liquidity,
            Self::ExternalRisk(_) => StateFamily::ExternalRisk,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inflation(s) => s.as_str(),
            Self::PolicyRate(s) => s.as_str(),
            Self::Employment(s) => s.as_str(),
            Self::Growth(s) => s.as_str(),
            Self::LongRate(s) => s.as_str(),
            Self::EquityValuation(s) => s.as_str(),
            Self::Volatility(s) => s.as_str(),
            Self::SectorConcentration(s) => s.as_str(),
            Self::Liquidity(s) => s.as_str(),
            Self::ExternalRisk(s) => s.as_str(),
        }
    }

    pub fn is_unknown(self) -> bool {
        self.as_str() == UNKNOWN
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family(), self.as_str())
    }
}

/// The complete set of readings for one market at one evaluation instant.
///
/// Every family is always present; absent data reads as `unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct StateVector {
    pub inflation: InflationState,
    pub policy_rate: PolicyRateState,
    pub employment: EmploymentState,
    pub growth: GrowthState,
    pub long_rate: LongRateState,
    pub equity_valuation: EquityValuationState,
    pub volatility: VolatilityState,
    pub sector_concentration: SectorConcentrationState,
    pub liquidity: LiquidityState,
    pub external_risk: ExternalRiskState,
}

impl StateVector {
    pub fn get(&self, family: StateFamily) -> StateValue {
        match family {
            StateFamily::Inflation => StateValue::Inflation(self.inflation),
            StateFamily::PolicyRate => StateValue::PolicyRate(self.policy_rate),
            StateFamily::Employment => StateValue::Employment(self.employment),
            StateFamily::Growth => StateValue::Growth(self.growth),
            StateFamily::LongRate => StateValue::LongRate(self.long_rate),
            StateFamily::EquityValuation => StateValue::EquityValuation(self.equity_valuation),
            StateFamily::Volatility => StateValue::Volatility(self.volatility),
            StateFamily::SectorConcentration => {
                StateValue::SectorConcentration(self.sector_concentration)
            }
            StateFamily::Liquidity => StateValue::Liquidity(self.liquidity),
            StateFamily::ExternalRisk => StateValue::ExternalRisk(self.external_risk),
        }
    }

    pub fn set(&mut self, value: StateValue) {
        match value {
            StateValue::Inflation(s) => self.inflation = s,
            StateValue::PolicyRate(s) => self.policy_rate = s,
            StateValue::Employment(s) => self.employment = s,
            StateValue::Growth(s) => self.growth = s,
            StateValue::LongRate(s) => self.long_rate = s,
            StateValue::EquityValuation(s) => self.equity_valuation = s,
            StateValue::Volatility(s) => self.volatility = s,
            StateValue::SectorConcentration(s) => self.sector_concentration = s,
            StateValue::Liquidity(s) => self.liquidity = s,
            StateValue::ExternalRisk(s) => self.external_risk = s,
        }
    }

    /// Builder-style `set`.
    pub fn with(mut self, value: StateValue) -> Self {
        self.set(value);
        self
    }

    pub fn matches(&self, value: StateValue) -> bool {
        self.get(value.family()) == value
    }

    /// All readings in canonical family order.
    pub fn values(&self) -> impl Iterator<Item = StateValue> + '_ {
        StateFamily::ALL.into_iter().map(move |family| self.get(family))
    }

    /// Parse a string-keyed vector.
    ///
    /// Missing families stay `unknown`. Unrecognized family keys are skipped
    /// with a warning; an unrecognized value for a known family is an error.
    pub fn from_wire<I, K, V>(entries: I) -> Result<Self, InvalidStateError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut vector = StateVector::default();
        for (key, value) in entries {
            let key = key.as_ref();
            let family = match key.parse::<StateFamily>() {
                Ok(family) => family,
                Err(_) => {
                    tracing::warn!(family = key, "Ignoring unrecognized state family");
                    continue;
                }
            };
            vector.set(StateValue::parse(family, value.as_ref())?);
        }
        Ok(vector)
    }

    /// Serialize to string keys and values.
    pub fn to_wire(&self) -> BTreeMap<String, String> {
        self.values()
            .map(|value| (value.family().key().to_string(), value.as_str().to_string()))
            .collect()
    }

    /// `family:value` strings in canonical order, for display and audit only.
    pub fn key_states(&self) -> Vec<String> {
        self.values().map(|value| value.to_string()).collect()
    }

    pub fn unknown_families(&self) -> Vec<StateFamily> {
        self.values()
            .filter(|value| value.is_unknown())
            .map(StateValue::family)
            .collect()
    }
}
