// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Glucose reading types.
//!
//! A [`Reading`] is one blood-glucose measurement. Readings are created
//! locally (manual entry) or pulled from the backend; a reading without a
//! remote identifier is local-only and stays in the mutation queue until
//! the backend acknowledges it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Conversion factor between mg/dL and mmol/L (molar mass of glucose).
pub const MGDL_PER_MMOL: f64 = 18.0182;

/// Measurement unit for glucose values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlucoseUnit {
    /// Milligrams per deciliter (common in the US and Spain).
    #[serde(rename = "mg/dL")]
    MgDl,
    /// Millimoles per liter (common in the UK and most of Europe).
    #[serde(rename = "mmol/L")]
    MmolL,
}

impl GlucoseUnit {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            GlucoseUnit::MgDl => "mg/dL",
            GlucoseUnit::MmolL => "mmol/L",
        }
    }

    /// Converts a value expressed in this unit into the target unit.
    pub fn convert(&self, value: f64, target: GlucoseUnit) -> f64 {
        match (self, target) {
            (GlucoseUnit::MgDl, GlucoseUnit::MmolL) => value / MGDL_PER_MMOL,
            (GlucoseUnit::MmolL, GlucoseUnit::MgDl) => value * MGDL_PER_MMOL,
            _ => value,
        }
    }
}

impl fmt::Display for GlucoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GlucoseUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mg/dl" | "mg_dl" | "mgdl" => Ok(GlucoseUnit::MgDl),
            "mmol/l" | "mmol_l" | "mmoll" => Ok(GlucoseUnit::MmolL),
            _ => Err(Error::InvalidUnit(s.to_string())),
        }
    }
}

/// Meal context attached to a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealTag {
    /// Measured after an overnight fast.
    Fasting,
    /// Measured shortly before a meal.
    BeforeMeal,
    /// Measured within two hours after a meal.
    AfterMeal,
    /// Measured before going to sleep.
    Bedtime,
    /// Measured around physical activity.
    Exercise,
    /// Anything else.
    Other,
}

impl MealTag {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            MealTag::Fasting => "fasting",
            MealTag::BeforeMeal => "before_meal",
            MealTag::AfterMeal => "after_meal",
            MealTag::Bedtime => "bedtime",
            MealTag::Exercise => "exercise",
            MealTag::Other => "other",
        }
    }
}

impl fmt::Display for MealTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MealTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fasting" => Ok(MealTag::Fasting),
            "before_meal" => Ok(MealTag::BeforeMeal),
            "after_meal" => Ok(MealTag::AfterMeal),
            "bedtime" => Ok(MealTag::Bedtime),
            "exercise" => Ok(MealTag::Exercise),
            "other" => Ok(MealTag::Other),
            _ => Err(Error::InvalidMealTag(s.to_string())),
        }
    }
}

/// One blood-glucose measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Client-generated identifier, stable across the reading's lifetime.
    pub local_id: String,
    /// Backend-assigned identifier, present once the reading has synced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<i64>,
    /// Measured glucose value, expressed in `unit`.
    pub value: f64,
    /// Unit the value is expressed in.
    pub unit: GlucoseUnit,
    /// When the measurement was taken.
    pub measured_at: DateTime<Utc>,
    /// Free-text note attached by the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Meal context, if the user tagged one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<MealTag>,
    /// True once the backend has acknowledged this version.
    pub synced: bool,
    /// When the reading was last modified (local edit or remote overwrite).
    pub updated_at: DateTime<Utc>,
}

impl Reading {
    /// Creates a new local-only reading with a fresh local identifier.
    pub fn new(value: f64, unit: GlucoseUnit, measured_at: DateTime<Utc>) -> Self {
        Reading {
            local_id: Uuid::new_v4().to_string(),
            remote_id: None,
            value,
            unit,
            measured_at,
            note: None,
            tag: None,
            synced: false,
            updated_at: measured_at,
        }
    }

    /// Sets the free-text note (builder pattern).
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Sets the meal tag (builder pattern).
    pub fn with_tag(mut self, tag: MealTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Returns the value converted into the given unit.
    pub fn value_in(&self, unit: GlucoseUnit) -> f64 {
        self.unit.convert(self.value, unit)
    }

    /// Returns true if this reading exists only locally.
    pub fn is_local_only(&self) -> bool {
        self.remote_id.is_none()
    }
}

#[cfg(test)]
#[path = "reading_tests.rs"]
mod tests;
