use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Charging circuits reported by the model, in output column order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargingCircuit {
    HomeL1,
    HomeL2,
    WorkL1,
    WorkL2,
    PublicL2,
    PublicL3,
}

impl ChargingCircuit {
    pub const ALL: [ChargingCircuit; 6] = [
        ChargingCircuit::HomeL1,
        ChargingCircuit::HomeL2,
        ChargingCircuit::WorkL1,
        ChargingCircuit::WorkL2,
        ChargingCircuit::PublicL2,
        ChargingCircuit::PublicL3,
    ];

    pub fn column(self) -> &'static str {
        match self {
            ChargingCircuit::HomeL1 => "home_l1",
            ChargingCircuit::HomeL2 => "home_l2",
            ChargingCircuit::WorkL1 => "work_l1",
            ChargingCircuit::WorkL2 => "work_l2",
            ChargingCircuit::PublicL2 => "public_l2",
            ChargingCircuit::PublicL3 => "public_l3",
        }
    }
}

/// Time-indexed charging power (kW) for one scenario.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadProfile {
    pub time: Vec<NaiveDateTime>,
    pub home_l1: Vec<f64>,
    pub home_l2: Vec<f64>,
    pub work_l1: Vec<f64>,
    pub work_l2: Vec<f64>,
    pub public_l2: Vec<f64>,
    pub public_l3: Vec<f64>,
}

/// One CSV row of a load profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadRow {
    pub time: NaiveDateTime,
    pub home_l1: f64,
    pub home_l2: f64,
    pub work_l1: f64,
    pub work_l2: f64,
    pub public_l2: f64,
    pub public_l3: f64,
}

impl LoadProfile {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn column(&self, circuit: ChargingCircuit) -> &[f64] {
        match circuit {
            ChargingCircuit::HomeL1 => &self.home_l1,
            ChargingCircuit::HomeL2 => &self.home_l2,
            ChargingCircuit::WorkL1 => &self.work_l1,
            ChargingCircuit::WorkL2 => &self.work_l2,
            ChargingCircuit::PublicL2 => &self.public_l2,
            ChargingCircuit::PublicL3 => &self.public_l3,
        }
    }

    pub fn column_mut(&mut self, circuit: ChargingCircuit) -> &mut Vec<f64> {
        match circuit {
            ChargingCircuit::HomeL1 => &mut self.home_l1,
            ChargingCircuit::HomeL2 => &mut self.home_l2,
            ChargingCircuit::WorkL1 => &mut self.work_l1,
            ChargingCircuit::WorkL2 => &mut self.work_l2,
            ChargingCircuit::PublicL2 => &mut self.public_l2,
            ChargingCircuit::PublicL3 => &mut self.public_l3,
        }
    }

    pub fn push(&mut self, row: LoadRow) {
        self.time.push(row.time);
        self.home_l1.push(row.home_l1);
        self.home_l2.push(row.home_l2);
        self.work_l1.push(row.work_l1);
        self.work_l2.push(row.work_l2);
        self.public_l2.push(row.public_l2);
        self.public_l3.push(row.public_l3);
    }

    /// Multiplies every power column element-wise; the time index is left alone.
    pub fn scale(&mut self, factor: f64) {
        for circuit in ChargingCircuit::ALL {
            for v in self.column_mut(circuit).iter_mut() {
                *v *= factor;
            }
        }
    }

    /// Sum over circuits at each time step.
    pub fn total(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| ChargingCircuit::ALL.iter().map(|c| self.column(*c)[i]).sum())
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = LoadRow> + '_ {
        (0..self.len()).map(move |i| LoadRow {
            time: self.time[i],
            home_l1: self.home_l1[i],
            home_l2: self.home_l2[i],
            work_l1: self.work_l1[i],
            work_l2: self.work_l2[i],
            public_l2: self.public_l2[i],
            public_l3: self.public_l3[i],
        })
    }
}

/// Output of one charging model call: one profile per scenario index of the work item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub scenarios: BTreeMap<usize, LoadProfile>,
}

impl ModelResult {
    pub fn get(&self, scenario: usize) -> Option<&LoadProfile> {
        self.scenarios.get(&scenario)
    }

    pub fn insert(&mut self, scenario: usize, profile: LoadProfile) {
        self.scenarios.insert(scenario, profile);
    }
}
