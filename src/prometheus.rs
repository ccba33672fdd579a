use crate::prelude::*;

use std::fmt::Display;

const PHASES: [(char, &str); 3] = [('R', "A"), ('S', "B"), ('T', "C")];

struct Metrics<'a> {
    prefix: &'a str,
    lines: Vec<String>,
}

impl<'a> Metrics<'a> {
    fn new(prefix: &'a str) -> Self {
        Self {
            prefix,
            lines: Vec::new(),
        }
    }

    fn push<V: Display>(&mut self, labels: &[(&str, &str)], value: V) {
        let labels: Vec<String> = labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, v))
            .collect();
        self.lines
            .push(format!("{}{{{}}} {}", self.prefix, labels.join(","), value));
    }
}

fn or_zero(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0)
}

// kW to whole watts
fn watts(kw: Option<f64>) -> f64 {
    (or_zero(kw) * 1000.0).round()
}

// sign flipped without producing -0
fn drawn(kw: Option<f64>) -> f64 {
    0.0 - watts(kw)
}

/// Prometheus text exposition of a [`Readings`]. Absent values are reported as 0.
pub fn render(prefix: &str, r: &Readings) -> String {
    let mut m = Metrics::new(prefix);

    m.push(&[("stats", "state")], r.status.state_decimal.unwrap_or(0));
    m.push(
        &[("stats", "generation_time")],
        r.status.generation_time_minutes.unwrap_or(0),
    );
    m.push(&[("stats", "temp"), ("sensor", "ambient")], or_zero(r.status.ambient_temp));
    m.push(&[("stats", "temp"), ("sensor", "module")], or_zero(r.status.module_temp));
    m.push(&[("stats", "temp"), ("sensor", "heatsink")], or_zero(r.status.heatsink_temp));

    m.push(&[("stats", "fault_count")], r.faults.len());
    for fault in &r.faults {
        let register = fault.register.to_string();
        let code = fault.code.to_string();
        m.push(
            &[("stats", "fault"), ("register", register.as_str()), ("code", code.as_str())],
            1,
        );
    }

    m.push(&[("ac", "frequency")], or_zero(r.grid.frequency));

    let generation = &r.grid.generation;
    let pcc = &r.grid.pcc;
    for ((phase, label), (generated, exchange)) in PHASES.iter().zip([
        (&generation.phase_r, &pcc.phase_r),
        (&generation.phase_s, &pcc.phase_s),
        (&generation.phase_t, &pcc.phase_t),
    ]) {
        m.push(
            &[("ac", "voltage"), ("phase", *label)],
            or_zero(r.grid.voltage.by_phase(*phase)),
        );
        m.push(&[("ac", "generated_power"), ("phase", *label)], watts(generated.active_power));
        // pcc is positive when exporting; grid_power is what we draw
        m.push(&[("ac", "grid_power"), ("phase", *label)], drawn(exchange.active_power));
    }

    m.push(&[("ac", "total_grid_power")], drawn(pcc.total.active));
    m.push(&[("ac", "total_generated_power")], watts(generation.total.active));

    for (n, pv) in [(1, &r.pv1), (2, &r.pv2)] {
        let string = format!("mppt{}", n);
        m.push(&[("dc", "pv_voltage"), ("string", string.as_str())], or_zero(pv.voltage));
        m.push(&[("dc", "pv_current"), ("string", string.as_str())], or_zero(pv.current));
        m.push(&[("dc", "pv_power"), ("string", string.as_str())], watts(pv.power));
    }

    for b in &r.batteries.banks {
        let num = b.number.to_string();
        let labels = |name| [("batt", name), ("battery_num", num.as_str())];
        m.push(&labels("voltage"), or_zero(b.voltage));
        m.push(&labels("out_current"), or_zero(b.current));
        // already in W
        m.push(&labels("out_power"), or_zero(b.power));
        m.push(&labels("batt_temp"), or_zero(b.temperature));
        m.push(&labels("batt_soc"), or_zero(b.soc));
        m.push(&labels("health"), or_zero(b.soh));
        m.push(&labels("cycles"), or_zero(b.cycles));
    }

    let g = &r.generation;
    let energy = [
        ("total_from_pv", g.total),
        ("total_from_grid", g.bought_total),
        ("total_to_load", g.load_total),
        ("total_to_grid", g.sold_total),
        ("total_battery_charge", g.battery_charge_total),
        ("total_battery_discharge", g.battery_discharge_total),
        ("daily_from_pv", g.daily),
        ("daily_from_grid", g.bought_daily),
        ("daily_to_load", g.load_daily),
        ("daily_to_grid", g.sold_daily),
        ("daily_battery_charge", g.battery_charge_daily),
        ("daily_battery_discharge", g.battery_discharge_daily),
    ];
    for (name, value) in energy {
        m.push(&[("energy", name)], or_zero(value));
    }

    // load = what we generate plus what crosses the meter, either direction
    let load = |generated: Option<f64>, exchange: Option<f64>| {
        ((or_zero(generated) + or_zero(exchange).abs()) * 1000.0).round()
    };
    m.push(
        &[("ac", "total_load_power")],
        load(generation.total.active, pcc.total.active),
    );
    for ((_, label), (generated, exchange)) in PHASES.iter().zip([
        (&generation.phase_r, &pcc.phase_r),
        (&generation.phase_s, &pcc.phase_s),
        (&generation.phase_t, &pcc.phase_t),
    ]) {
        m.push(
            &[("ac", "load_power"), ("phase", *label)],
            load(generated.active_power, exchange.active_power),
        );
    }

    m.lines.join("\n")
}
