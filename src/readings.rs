use crate::interpreter::{self, reading, scaled32};
use crate::prelude::*;

use chrono::{DateTime, Local};
use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_with::skip_serializing_none;

/// Inclusive register ranges polled when an inverter does not configure its own.
pub const DEFAULT_RANGES: [(u16, u16); 9] = [
    (0x0400, 0x0432), // status, temperatures, faults
    (0x0445, 0x0465), // serial number, versions
    (0x0480, 0x04BC), // grid
    (0x0504, 0x051F), // off-grid
    (0x0580, 0x0589), // pv inputs
    (0x0600, 0x0611), // batteries
    (0x0684, 0x069B), // energy counters
    (0x104D, 0x104E), // DOD, EOD
    (0x1052, 0x1052), // EPS buffer
];

pub const BATTERY_BASE: u16 = 0x0604;
pub const BATTERY_STRIDE: u16 = 7;
pub const BATTERY_BANKS: u16 = 2;

fn value(table: &RegisterTable, address: u16, scale: f64, signed: bool, places: i32) -> Option<f64> {
    reading(table, address, scale, signed).rounded(places)
}

// daily counters are 0.01 kWh, totals 0.1 kWh; both span two registers
fn daily(table: &RegisterTable, high: u16) -> Option<f64> {
    scaled32(table, high, high + 1, 0.01).map(|v| interpreter::round(v, 2))
}

fn total(table: &RegisterTable, high: u16) -> Option<f64> {
    scaled32(table, high, high + 1, 0.1).map(|v| interpreter::round(v, 1))
}

/// Everything the monitor knows about the inverter after one poll.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Readings {
    pub timestamp: DateTime<Local>,
    pub status: Status,
    pub faults: Vec<FaultEntry>,
    pub pv1: Pv,
    pub pv2: Pv,
    pub grid: Grid,
    pub off_grid: OffGrid,
    pub generation: Generation,
    pub batteries: Batteries,
}

impl Readings {
    pub fn decode(table: &RegisterTable) -> Self {
        Self::decode_at(table, Local::now())
    }

    pub fn decode_at(table: &RegisterTable, timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            status: Status::decode(table),
            faults: interpreter::faults(table),
            pv1: Pv::decode(table, 0x0584),
            pv2: Pv::decode(table, 0x0587),
            grid: Grid::decode(table),
            off_grid: OffGrid::decode(table),
            generation: Generation::decode(table),
            batteries: Batteries::decode(table),
        }
    }
}

// Status {{{
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Status {
    pub state: Option<StatusCode>,
    pub state_decimal: Option<u16>,
    pub generation_time_minutes: Option<u16>,
    pub ambient_temp: Option<f64>,
    pub module_temp: Option<f64>,
    pub heatsink_temp: Option<f64>,
}

impl Status {
    fn decode(table: &RegisterTable) -> Self {
        let state = interpreter::status(table);
        Self {
            state,
            state_decimal: state.map(|s| s.raw()),
            generation_time_minutes: table.get(0x0426),
            ambient_temp: value(table, 0x0418, 1.0, false, 1),
            module_temp: value(table, 0x0420, 1.0, false, 1),
            heatsink_temp: value(table, 0x041A, 1.0, false, 1),
        }
    }
} // }}}

// Pv {{{
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Pv {
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    /// kW
    pub power: Option<f64>,
}

impl Pv {
    fn decode(table: &RegisterTable, base: u16) -> Self {
        Self {
            voltage: value(table, base, 0.1, false, 1),
            current: value(table, base + 1, 0.01, false, 2),
            power: value(table, base + 2, 0.01, false, 2),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.voltage.is_none() && self.current.is_none() && self.power.is_none()
    }
} // }}}

// Grid {{{
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PowerTotals {
    pub active: Option<f64>,
    pub reactive: Option<f64>,
    pub apparent: Option<f64>,
}

impl PowerTotals {
    fn decode(table: &RegisterTable, base: u16) -> Self {
        Self {
            active: value(table, base, 0.01, true, 2),
            reactive: value(table, base + 1, 0.01, true, 2),
            apparent: value(table, base + 2, 0.01, true, 2),
        }
    }
}

#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PhaseFlow {
    pub current: Option<f64>,
    pub active_power: Option<f64>,
    pub reactive_power: Option<f64>,
    pub power_factor: Option<f64>,
}

impl PhaseFlow {
    fn decode(table: &RegisterTable, base: u16) -> Self {
        Self {
            current: value(table, base, 0.01, false, 2),
            active_power: value(table, base + 1, 0.01, true, 2),
            reactive_power: value(table, base + 2, 0.01, true, 2),
            power_factor: value(table, base + 3, 0.001, true, 3),
        }
    }
}

/// Power flowing through one measuring point, in kW.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PowerFlow {
    pub total: PowerTotals,
    pub phase_r: PhaseFlow,
    pub phase_s: PhaseFlow,
    pub phase_t: PhaseFlow,
}

impl PowerFlow {
    fn decode(table: &RegisterTable, totals: u16, phases: [u16; 3]) -> Self {
        Self {
            total: PowerTotals::decode(table, totals),
            phase_r: PhaseFlow::decode(table, phases[0]),
            phase_s: PhaseFlow::decode(table, phases[1]),
            phase_t: PhaseFlow::decode(table, phases[2]),
        }
    }

    pub fn phases(&self) -> [(char, &PhaseFlow); 3] {
        [('R', &self.phase_r), ('S', &self.phase_s), ('T', &self.phase_t)]
    }
}

#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PhaseVoltages {
    pub phase_r: Option<f64>,
    pub phase_s: Option<f64>,
    pub phase_t: Option<f64>,
}

impl PhaseVoltages {
    pub fn by_phase(&self, phase: char) -> Option<f64> {
        match phase {
            'R' => self.phase_r,
            'S' => self.phase_s,
            'T' => self.phase_t,
            _ => None,
        }
    }
}

#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Grid {
    pub frequency: Option<f64>,
    pub voltage: PhaseVoltages,
    /// What the inverter itself puts out.
    pub generation: PowerFlow,
    /// Exchange with the grid at the point of common coupling.
    pub pcc: PowerFlow,
}

impl Grid {
    fn decode(table: &RegisterTable) -> Self {
        Self {
            frequency: value(table, 0x0484, 0.01, false, 2),
            voltage: PhaseVoltages {
                phase_r: value(table, 0x048D, 0.1, false, 1),
                phase_s: value(table, 0x0498, 0.1, false, 1),
                phase_t: value(table, 0x04A3, 0.1, false, 1),
            },
            generation: PowerFlow::decode(table, 0x0485, [0x048E, 0x0499, 0x04A4]),
            pcc: PowerFlow::decode(table, 0x0488, [0x0492, 0x049D, 0x04A8]),
        }
    }
} // }}}

// OffGrid {{{
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct OffGridPhase {
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub active_power: Option<f64>,
    pub reactive_power: Option<f64>,
    pub apparent_power: Option<f64>,
}

impl OffGridPhase {
    fn decode(table: &RegisterTable, base: u16) -> Self {
        Self {
            voltage: value(table, base, 0.1, false, 1),
            current: value(table, base + 1, 0.01, false, 2),
            active_power: value(table, base + 2, 0.01, true, 2),
            reactive_power: value(table, base + 3, 0.01, true, 2),
            apparent_power: value(table, base + 4, 0.01, true, 2),
        }
    }
}

#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct OffGrid {
    pub frequency: Option<f64>,
    pub total: PowerTotals,
    pub phase_r: OffGridPhase,
    pub phase_s: OffGridPhase,
    pub phase_t: OffGridPhase,
}

impl OffGrid {
    fn decode(table: &RegisterTable) -> Self {
        Self {
            frequency: value(table, 0x0507, 0.01, false, 2),
            total: PowerTotals::decode(table, 0x0504),
            phase_r: OffGridPhase::decode(table, 0x050A),
            phase_s: OffGridPhase::decode(table, 0x0512),
            phase_t: OffGridPhase::decode(table, 0x051A),
        }
    }

    pub fn phases(&self) -> [(char, &OffGridPhase); 3] {
        [('R', &self.phase_r), ('S', &self.phase_s), ('T', &self.phase_t)]
    }
} // }}}

// Generation {{{
/// Energy counters in kWh.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Generation {
    pub daily: Option<f64>,
    pub total: Option<f64>,
    pub load_daily: Option<f64>,
    pub load_total: Option<f64>,
    pub bought_daily: Option<f64>,
    pub bought_total: Option<f64>,
    pub sold_daily: Option<f64>,
    pub sold_total: Option<f64>,
    pub battery_charge_daily: Option<f64>,
    pub battery_charge_total: Option<f64>,
    pub battery_discharge_daily: Option<f64>,
    pub battery_discharge_total: Option<f64>,
}

impl Generation {
    fn decode(table: &RegisterTable) -> Self {
        Self {
            daily: daily(table, 0x0684),
            total: total(table, 0x0686),
            load_daily: daily(table, 0x0688),
            load_total: total(table, 0x068A),
            bought_daily: daily(table, 0x068C),
            bought_total: total(table, 0x068E),
            sold_daily: daily(table, 0x0690),
            sold_total: total(table, 0x0692),
            battery_charge_daily: daily(table, 0x0694),
            battery_charge_total: total(table, 0x0696),
            battery_discharge_daily: daily(table, 0x0698),
            battery_discharge_total: total(table, 0x069A),
        }
    }
} // }}}

// Batteries {{{
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Battery {
    /// 1-based bank number. Carried by the `battery_N` key in JSON.
    #[serde(skip)]
    pub number: u16,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    /// W
    pub power: Option<f64>,
    pub temperature: Option<f64>,
    pub soc: Option<f64>,
    pub soh: Option<f64>,
    pub cycles: Option<f64>,
}

impl Battery {
    /// Decodes the bank whose first register is `base`.
    pub fn decode(table: &RegisterTable, number: u16, base: u16) -> Self {
        Self {
            number,
            voltage: value(table, base, 0.1, false, 1),
            current: value(table, base + 1, 0.01, true, 2),
            power: value(table, base + 2, 10.0, true, 0),
            temperature: value(table, base + 3, 1.0, true, 0),
            soc: value(table, base + 4, 1.0, false, 0),
            soh: value(table, base + 5, 1.0, false, 0),
            cycles: value(table, base + 6, 1.0, false, 0),
        }
    }

    pub fn is_empty(&self) -> bool {
        [
            self.voltage,
            self.current,
            self.power,
            self.temperature,
            self.soc,
            self.soh,
            self.cycles,
        ]
        .iter()
        .all(Option::is_none)
    }
}

#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatterySettings {
    /// Depth of discharge, %
    pub dod: Option<u16>,
    /// End of discharge, %
    pub eod: Option<u16>,
    pub eps_buffer: Option<u16>,
}

impl BatterySettings {
    pub fn is_empty(&self) -> bool {
        self.dod.is_none() && self.eod.is_none() && self.eps_buffer.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batteries {
    /// Only banks with at least one register present.
    pub banks: Vec<Battery>,
    pub settings: BatterySettings,
}

impl Batteries {
    fn decode(table: &RegisterTable) -> Self {
        let base = RegisterAddress(BATTERY_BASE);
        let banks = (0..BATTERY_BANKS)
            .filter_map(|n| {
                base.offset(n * BATTERY_STRIDE)
                    .map(|addr| Battery::decode(table, n + 1, addr.value()))
            })
            .filter(|b| !b.is_empty())
            .collect();

        Self {
            banks,
            settings: BatterySettings {
                dod: table.get(0x104D),
                eod: table.get(0x104E),
                eps_buffer: table.get(0x1052),
            },
        }
    }
}

// {"battery_1": {..}, "battery_2": {..}, "settings": {..}}
impl Serialize for Batteries {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.banks.len() + 1))?;
        for bank in &self.banks {
            map.serialize_entry(&format!("battery_{}", bank.number), bank)?;
        }
        map.serialize_entry("settings", &self.settings)?;
        map.end()
    }
} // }}}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(u16, u16)]) -> RegisterTable {
        pairs.iter().copied().collect()
    }

    #[test]
    fn empty_table_decodes_to_all_absent() {
        let r = Readings::decode(&RegisterTable::new());
        assert_eq!(r.status, Status::default());
        assert!(r.faults.is_empty());
        assert!(r.pv1.is_empty());
        assert_eq!(r.grid, Grid::default());
        assert_eq!(r.off_grid, OffGrid::default());
        assert_eq!(r.generation, Generation::default());
        assert!(r.batteries.banks.is_empty());
        assert!(r.batteries.settings.is_empty());
    }

    #[test]
    fn second_bank_is_first_bank_shifted_by_stride() {
        let raw = [523, 0xfe0c, 0xffce, 25, 87, 99, 312];

        let mut t = RegisterTable::new();
        for (i, v) in raw.iter().enumerate() {
            t.insert(BATTERY_BASE + BATTERY_STRIDE + i as u16, *v);
        }
        let second = Battery::decode(&t, 2, BATTERY_BASE + BATTERY_STRIDE);

        let mut t = RegisterTable::new();
        for (i, v) in raw.iter().enumerate() {
            t.insert(BATTERY_BASE + i as u16, *v);
        }
        let first = Battery::decode(&t, 2, BATTERY_BASE);

        assert_eq!(first, second);
        assert_eq!(second.voltage, Some(52.3));
        assert_eq!(second.current, Some(-5.0));
        assert_eq!(second.power, Some(-500.0));
        assert_eq!(second.soc, Some(87.0));
    }

    #[test]
    fn empty_banks_are_omitted() {
        let t = table(&[(0x060B + 4, 55)]);
        let b = Batteries::decode(&t);
        assert_eq!(b.banks.len(), 1);
        assert_eq!(b.banks[0].number, 2);
        assert_eq!(b.banks[0].soc, Some(55.0));
        assert_eq!(b.banks[0].voltage, None);
    }

    #[test]
    fn grid_signed_power() {
        let t = table(&[(0x0488, 0xff38), (0x0493, 0x0064), (0x0495, 0xfc18)]);
        let g = Grid::decode(&t);
        assert_eq!(g.pcc.total.active, Some(-2.0));
        assert_eq!(g.pcc.phase_r.active_power, Some(1.0));
        assert_eq!(g.pcc.phase_r.power_factor, Some(-1.0));
        assert_eq!(g.generation.total.active, None);
    }

    #[test]
    fn energy_pairs() {
        let t = table(&[(0x0684, 0), (0x0685, 1234), (0x0686, 2), (0x0687, 1)]);
        let g = Generation::decode(&t);
        assert_eq!(g.daily, Some(12.34));
        assert_eq!(g.total, Some(13107.3));
        assert_eq!(g.load_daily, None);
    }

    #[test]
    fn json_omits_absent_leaves() {
        let t = table(&[(0x0404, 2), (0x0584, 3001)]);
        let r = Readings::decode(&t);
        let json = serde_json::to_value(&r).unwrap();

        assert_eq!(json["status"]["state"], "Normal");
        assert_eq!(json["status"]["state_decimal"], 2);
        assert!(json["status"].get("ambient_temp").is_none());
        assert_eq!(json["pv1"]["voltage"], 300.1);
        assert!(json["pv1"].get("current").is_none());
        assert_eq!(json["grid"]["generation"]["phase_r"], serde_json::json!({}));
    }
}
