use crate::prelude::*;
use crate::readings::{PhaseVoltages, PowerFlow};

use std::fmt;

/// Human readable rendering of a [`Readings`], as printed by `monitor`.
pub struct Report<'a>(pub &'a Readings);

fn or_na(value: Option<f64>, precision: usize, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.*}{}", precision, v, unit),
        None => "NA".to_string(),
    }
}

fn write_flow(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    flow: &PowerFlow,
    voltage: &PhaseVoltages,
) -> fmt::Result {
    writeln!(f, "\n{}:", title)?;
    match (flow.total.active, flow.total.reactive) {
        (Some(active), Some(_)) => writeln!(f, "Total: {:.2}kW", active)?,
        _ => writeln!(f, "Total: No data")?,
    }

    for (phase, p) in flow.phases() {
        match (
            voltage.by_phase(phase),
            p.current,
            p.active_power,
            p.power_factor,
        ) {
            (Some(v), Some(a), Some(kw), Some(pf)) => writeln!(
                f,
                "Phase {}: {:.1}V, {:.2}A, {:.2}kW, PF: {:.3}",
                phase, v, a, kw, pf
            )?,
            _ => writeln!(f, "Phase {}: No data", phase)?,
        }
    }

    Ok(())
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;

        writeln!(f, "=== Inverter Status ===")?;
        match r.status.state {
            Some(state) => writeln!(f, "Status: {}", state)?,
            None => writeln!(f, "Status: NA")?,
        }
        if let Some(minutes) = r.status.generation_time_minutes.filter(|m| *m > 0) {
            writeln!(f, "Generation Time Today: {}h {}m", minutes / 60, minutes % 60)?;
        }
        writeln!(f, "Ambient Temp: {}", or_na(r.status.ambient_temp, 1, "°C"))?;
        writeln!(f, "Module Temp: {}", or_na(r.status.module_temp, 1, "°C"))?;
        writeln!(f, "Heatsink Temp: {}", or_na(r.status.heatsink_temp, 1, "°C"))?;

        writeln!(f, "\n=== Fault Status ===")?;
        if r.faults.is_empty() {
            writeln!(f, "No active faults")?;
        } else {
            writeln!(f, "Active Faults:")?;
            for fault in &r.faults {
                writeln!(f, "  - {}", fault)?;
            }
        }

        writeln!(f, "\n=== PV Input Values ===")?;
        for (name, pv) in [("PV1", &r.pv1), ("PV2", &r.pv2)] {
            if pv.is_empty() {
                continue;
            }
            let parts: Vec<String> = [
                pv.voltage.map(|v| format!("{:.1}V", v)),
                pv.current.map(|v| format!("{:.2}A", v)),
                pv.power.map(|v| format!("{:.2}kW", v)),
            ]
            .into_iter()
            .flatten()
            .collect();
            writeln!(f, "{}: {}", name, parts.join(", "))?;
        }

        writeln!(f, "\n=== Grid Values ===")?;
        if let Some(freq) = r.grid.frequency {
            writeln!(f, "Grid Frequency: {:.2}Hz", freq)?;
        }
        write_flow(f, "Generated Power", &r.grid.generation, &r.grid.voltage)?;
        write_flow(f, "Grid Exchange (PCC)", &r.grid.pcc, &r.grid.voltage)?;

        writeln!(f, "\n=== Off-grid Values ===")?;
        if let Some(freq) = r.off_grid.frequency {
            writeln!(f, "Frequency: {:.2}Hz", freq)?;
        }
        match (r.off_grid.total.active, r.off_grid.total.reactive) {
            (Some(active), Some(_)) => writeln!(f, "Total: {:.2}kW", active)?,
            _ => writeln!(f, "Total: No data")?,
        }
        for (phase, p) in r.off_grid.phases() {
            match (p.voltage, p.current, p.active_power) {
                (Some(v), Some(a), Some(kw)) => {
                    writeln!(f, "Phase {}: {:.1}V, {:.2}A, {:.2}kW", phase, v, a, kw)?
                }
                _ => writeln!(f, "Phase {}: No data", phase)?,
            }
        }

        writeln!(f, "\n=== Generation Statistics ===")?;
        let g = &r.generation;
        let counters = [
            ("Daily Generation", g.daily, 2),
            ("Total Generation", g.total, 1),
            ("Daily Load", g.load_daily, 2),
            ("Total Load", g.load_total, 1),
            ("Daily Energy Bought", g.bought_daily, 2),
            ("Total Energy Bought", g.bought_total, 1),
            ("Daily Energy Sold", g.sold_daily, 2),
            ("Total Energy Sold", g.sold_total, 1),
            ("Daily Battery Charge", g.battery_charge_daily, 2),
            ("Total Battery Charge", g.battery_charge_total, 1),
            ("Daily Battery Discharge", g.battery_discharge_daily, 2),
            ("Total Battery Discharge", g.battery_discharge_total, 1),
        ];
        for (label, value, precision) in counters {
            if let Some(v) = value {
                writeln!(f, "{}: {:.*}kWh", label, precision, v)?;
            }
        }

        writeln!(f, "\n=== Battery Status ===")?;
        for b in &r.batteries.banks {
            writeln!(
                f,
                "Battery{}: {}, {}, {}, {}, {}, {}, {}",
                b.number,
                or_na(b.voltage, 1, "V"),
                or_na(b.current, 2, "A"),
                or_na(b.power, 0, "W"),
                or_na(b.temperature, 1, "°C"),
                or_na(b.soc, 1, "%"),
                or_na(b.soh, 1, "%"),
                or_na(b.cycles, 0, ""),
            )?;
        }

        let s = &r.batteries.settings;
        if !s.is_empty() {
            writeln!(f, "\nBattery Settings:")?;
            if let Some(dod) = s.dod {
                writeln!(f, "  Depth of Discharge: {}%", dod)?;
            }
            if let Some(eod) = s.eod {
                writeln!(f, "  End of Discharge: {}%", eod)?;
            }
            if let Some(eps) = s.eps_buffer {
                writeln!(f, "  EPS Buffer: {}%", eps)?;
            }
        }

        Ok(())
    }
}
