mod common;
use common::*;
use sofar_bridge::interpreter::{faults, scaled, scaled32};
use sofar_bridge::prelude::*;
use sofar_bridge::readings::{Battery, BATTERY_BASE, BATTERY_STRIDE};
use sofar_bridge::sofar::response::parse_read_response;

fn table(pairs: &[(u16, u16)]) -> RegisterTable {
    pairs.iter().copied().collect()
}

#[test]
fn sign_extension() {
    let t = table(&[(0x0485, 0xffff), (0x0486, 0x0001)]);
    assert_eq!(scaled(&t, 0x0485, 0.01, true), Some(-0.01));
    assert_eq!(scaled(&t, 0x0486, 0.01, true), Some(0.01));
}

#[test]
fn thirty_two_bit_energy() {
    let t = table(&[(0x0686, 0x0002), (0x0687, 0x0001)]);
    let v = scaled32(&t, 0x0686, 0x0687, 0.1).unwrap();
    assert!((v - 13107.3).abs() < 1e-9);
    assert_eq!(Readings::decode(&t).generation.total, Some(13107.3));
}

#[test]
fn fault_register_bits() {
    let f = faults(&table(&[(0x0405, 0x0003)]));
    let descriptions: Vec<&str> = f.iter().map(|f| f.description).collect();
    assert_eq!(
        descriptions,
        vec![
            "ID01 Grid Over Voltage Protection",
            "ID02 Grid Under Voltage Protection"
        ]
    );
}

#[test]
fn absent_registers_stay_absent() {
    // only the status block answered
    let t = table(&[(0x0404, 2), (0x0418, 28)]);
    let r = Readings::decode(&t);

    assert_eq!(r.status.state, Some(StatusCode::Normal));
    assert_eq!(r.status.ambient_temp, Some(28.0));
    assert_eq!(r.status.module_temp, None);
    assert_eq!(r.status.generation_time_minutes, None);
    assert_eq!(r.grid.frequency, None);
    assert_eq!(r.grid.pcc.phase_t.power_factor, None);
    assert_eq!(r.off_grid.phase_s.voltage, None);
    assert_eq!(r.generation.sold_daily, None);
    assert!(r.batteries.banks.is_empty());
    assert_eq!(r.batteries.settings.dod, None);
}

#[test]
fn battery_banks_share_one_layout() {
    let raw = [512, 0x0190, 0xffec, 0xfffb, 64, 98, 1200];

    let mut t = RegisterTable::new();
    for bank in 0..2u16 {
        for (i, v) in raw.iter().enumerate() {
            t.insert(BATTERY_BASE + bank * BATTERY_STRIDE + i as u16, *v);
        }
    }

    let r = Readings::decode(&t);
    assert_eq!(r.batteries.banks.len(), 2);

    let (one, two) = (&r.batteries.banks[0], &r.batteries.banks[1]);
    assert_eq!((one.number, two.number), (1, 2));
    assert_eq!(one.voltage, two.voltage);
    assert_eq!(one.current, two.current);
    assert_eq!(one.power, two.power);
    assert_eq!(one.temperature, two.temperature);
    assert_eq!(one.soc, two.soc);
    assert_eq!(one.soh, two.soh);
    assert_eq!(one.cycles, two.cycles);

    assert_eq!(
        *two,
        Battery {
            number: 2,
            voltage: Some(51.2),
            current: Some(4.0),
            power: Some(-200.0),
            temperature: Some(-5.0),
            soc: Some(64.0),
            soh: Some(98.0),
            cycles: Some(1200.0),
        }
    );
}

#[test]
fn decode_from_wire_response() {
    // pv block 0x0580..=0x0589
    let values = [0, 0, 0, 0, 3550, 412, 146, 3400, 0, 0];
    let data = Factory::read_response(&values);
    let t = parse_read_response(&data, 0x0580, 10, SlotBound::Requested);
    let r = Readings::decode(&t);

    assert_eq!(r.pv1.voltage, Some(355.0));
    assert_eq!(r.pv1.current, Some(4.12));
    assert_eq!(r.pv1.power, Some(1.46));
    assert_eq!(r.pv2.voltage, Some(340.0));
    assert_eq!(r.pv2.power, Some(0.0));
}

#[test]
fn json_batteries_keyed_by_bank() {
    let t = table(&[(0x0608, 87), (0x060B, 523), (0x1052, 20)]);
    let json = serde_json::to_value(Readings::decode(&t).batteries).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "battery_1": { "soc": 87.0 },
            "battery_2": { "voltage": 52.3 },
            "settings": { "eps_buffer": 20 },
        })
    );
}

#[test]
fn json_output() {
    let t = table(&[(0x0404, 7), (0x0405, 0x0001), (0x104D, 80)]);
    let json = serde_json::to_value(Readings::decode(&t)).unwrap();

    assert_eq!(json["status"]["state"], "EPS Mode");
    assert_eq!(json["faults"][0]["register"], "0x0405");
    assert_eq!(json["faults"][0]["code"], 1);
    assert_eq!(json["batteries"]["settings"]["dod"], 80);
    assert!(json["batteries"]["settings"].get("eod").is_none());
    assert!(json["batteries"].get("battery_1").is_none());
    assert!(json["batteries"].get("banks").is_none());
    assert!(json["timestamp"].is_string());
}
