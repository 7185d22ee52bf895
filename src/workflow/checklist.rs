// Per-section completion flags for the review and publication checklists

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::WorkflowError;

/// Borehole sub-sections tracked by a checklist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tab {
    General,
    Section,
    Geometry,
    Lithology,
    Chronostratigraphy,
    Lithostratigraphy,
    Casing,
    Instrumentation,
    Backfill,
    WaterIngress,
    Groundwater,
    FieldMeasurement,
    Hydrotest,
    Profile,
    Photo,
}

impl Tab {
    pub const ALL: [Tab; 15] = [
        Tab::General,
        Tab::Section,
        Tab::Geometry,
        Tab::Lithology,
        Tab::Chronostratigraphy,
        Tab::Lithostratigraphy,
        Tab::Casing,
        Tab::Instrumentation,
        Tab::Backfill,
        Tab::WaterIngress,
        Tab::Groundwater,
        Tab::FieldMeasurement,
        Tab::Hydrotest,
        Tab::Profile,
        Tab::Photo,
    ];

    /// Canonical name as used on the wire
    pub fn name(self) -> &'static str {
        match self {
            Tab::General => "general",
            Tab::Section => "section",
            Tab::Geometry => "geometry",
            Tab::Lithology => "lithology",
            Tab::Chronostratigraphy => "chronostratigraphy",
            Tab::Lithostratigraphy => "lithostratigraphy",
            Tab::Casing => "casing",
            Tab::Instrumentation => "instrumentation",
            Tab::Backfill => "backfill",
            Tab::WaterIngress => "waterIngress",
            Tab::Groundwater => "groundwater",
            Tab::FieldMeasurement => "fieldMeasurement",
            Tab::Hydrotest => "hydrotest",
            Tab::Profile => "profile",
            Tab::Photo => "photo",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tab {
    type Err = WorkflowError;

    /// Accepts camelCase and snake_case, case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('_', "").to_ascii_lowercase();
        Tab::ALL
            .into_iter()
            .find(|tab| tab.name().to_ascii_lowercase() == normalized)
            .ok_or_else(|| WorkflowError::UnknownTab(s.to_string()))
    }
}

/// Fixed set of independent boolean flags, one per [`Tab`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TabChecklist {
    pub general: bool,
    pub section: bool,
    pub geometry: bool,
    pub lithology: bool,
    pub chronostratigraphy: bool,
    pub lithostratigraphy: bool,
    pub casing: bool,
    pub instrumentation: bool,
    pub backfill: bool,
    pub water_ingress: bool,
    pub groundwater: bool,
    pub field_measurement: bool,
    pub hydrotest: bool,
    pub profile: bool,
    pub photo: bool,
}

impl TabChecklist {
    /// Checklist with every flag set to `true`
    pub fn all_complete() -> Self {
        let mut checklist = Self::default();
        for tab in Tab::ALL {
            checklist.set_tab(tab, true);
        }
        checklist
    }

    fn flag_mut(&mut self, tab: Tab) -> &mut bool {
        match tab {
            Tab::General => &mut self.general,
            Tab::Section => &mut self.section,
            Tab::Geometry => &mut self.geometry,
            Tab::Lithology => &mut self.lithology,
            Tab::Chronostratigraphy => &mut self.chronostratigraphy,
            Tab::Lithostratigraphy => &mut self.lithostratigraphy,
            Tab::Casing => &mut self.casing,
            Tab::Instrumentation => &mut self.instrumentation,
            Tab::Backfill => &mut self.backfill,
            Tab::WaterIngress => &mut self.water_ingress,
            Tab::Groundwater => &mut self.groundwater,
            Tab::FieldMeasurement => &mut self.field_measurement,
            Tab::Hydrotest => &mut self.hydrotest,
            Tab::Profile => &mut self.profile,
            Tab::Photo => &mut self.photo,
        }
    }

    pub fn get(&self, tab: Tab) -> bool {
        match tab {
            Tab::General => self.general,
            Tab::Section => self.section,
            Tab::Geometry => self.geometry,
            Tab::Lithology => self.lithology,
            Tab::Chronostratigraphy => self.chronostratigraphy,
            Tab::Lithostratigraphy => self.lithostratigraphy,
            Tab::Casing => self.casing,
            Tab::Instrumentation => self.instrumentation,
            Tab::Backfill => self.backfill,
            Tab::WaterIngress => self.water_ingress,
            Tab::Groundwater => self.groundwater,
            Tab::FieldMeasurement => self.field_measurement,
            Tab::Hydrotest => self.hydrotest,
            Tab::Profile => self.profile,
            Tab::Photo => self.photo,
        }
    }

    /// Returns whether the flag actually changed
    pub fn set_tab(&mut self, tab: Tab, value: bool) -> bool {
        let flag = self.flag_mut(tab);
        let changed = *flag != value;
        *flag = value;
        changed
    }

    /// Set a flag by name. Setting a flag to its current value is a no-op.
    pub fn set(&mut self, name: &str, value: bool) -> Result<bool, WorkflowError> {
        let tab = name.parse::<Tab>()?;
        Ok(self.set_tab(tab, value))
    }

    /// Apply several named changes; all names are validated before any flag
    /// is touched. Returns the number of flags whose final value differs from
    /// the starting one, so a later entry undoing an earlier one counts as zero.
    pub fn apply<'a>(
        &mut self,
        changes: impl IntoIterator<Item = (&'a str, bool)>,
    ) -> Result<usize, WorkflowError> {
        let parsed = changes
            .into_iter()
            .map(|(name, value)| name.parse::<Tab>().map(|tab| (tab, value)))
            .collect::<Result<Vec<_>, _>>()?;

        let before = *self;
        for (tab, value) in parsed {
            self.set_tab(tab, value);
        }

        Ok(Tab::ALL
            .into_iter()
            .filter(|tab| before.get(*tab) != self.get(*tab))
            .count())
    }

    pub fn is_complete(&self) -> bool {
        Tab::ALL.iter().all(|tab| self.get(*tab))
    }

    pub fn completed_count(&self) -> usize {
        Tab::ALL.iter().filter(|tab| self.get(**tab)).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tab, bool)> + '_ {
        Tab::ALL.into_iter().map(move |tab| (tab, self.get(tab)))
    }
}
