use crate::prelude::*;
use std::collections::BTreeMap;

/// A holding register address. Displays as `0x0404`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegisterAddress(pub u16);

impl RegisterAddress {
    pub fn value(&self) -> u16 {
        self.0
    }

    /// The address `n` registers further on, if still inside the map.
    pub fn offset(&self, n: u16) -> Option<Self> {
        self.0.checked_add(n).map(Self)
    }
}

impl From<u16> for RegisterAddress {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

impl std::fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

impl std::str::FromStr for RegisterAddress {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_u16(s).map(Self)
    }
}

/// Parses `0x`-prefixed hex or plain decimal, the way registers and values
/// are given on the command line and in the config file.
pub fn parse_u16(s: &str) -> Result<u16> {
    let s = s.trim();
    let r = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    r.map_err(|err| anyhow!("invalid 16-bit value {:?}: {}", s, err))
}

/// Raw register values gathered during one poll, keyed by address.
///
/// Tables only grow: merging a later query overwrites addresses it shares
/// with an earlier one and never removes anything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterTable {
    values: BTreeMap<RegisterAddress, u16>,
}

impl RegisterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: u16, value: u16) {
        self.values.insert(RegisterAddress(address), value);
    }

    pub fn get(&self, address: u16) -> Option<u16> {
        self.values.get(&RegisterAddress(address)).copied()
    }

    pub fn contains(&self, address: u16) -> bool {
        self.values.contains_key(&RegisterAddress(address))
    }

    /// Last write wins.
    pub fn merge(&mut self, other: RegisterTable) {
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RegisterAddress, u16)> + '_ {
        self.values.iter().map(|(a, v)| (*a, *v))
    }
}

impl FromIterator<(u16, u16)> for RegisterTable {
    fn from_iter<I: IntoIterator<Item = (u16, u16)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (address, value) in iter {
            table.insert(address, value);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_display() {
        assert_eq!(RegisterAddress(0x48d).to_string(), "0x048D");
        assert_eq!(RegisterAddress(0).to_string(), "0x0000");
        assert_eq!(RegisterAddress(0xffff).to_string(), "0xFFFF");
    }

    #[test]
    fn address_parse() {
        assert_eq!(RegisterAddress::from_str("0x1062").unwrap(), RegisterAddress(0x1062));
        assert_eq!(RegisterAddress::from_str("4194").unwrap(), RegisterAddress(0x1062));
        assert!(RegisterAddress::from_str("0x10000").is_err());
        assert!(RegisterAddress::from_str("bogus").is_err());
    }

    #[test]
    fn address_offset() {
        assert_eq!(RegisterAddress(0x0604).offset(7), Some(RegisterAddress(0x060b)));
        assert_eq!(RegisterAddress(0xfffe).offset(2), None);
    }

    #[test]
    fn merge_is_last_write_wins() {
        let mut table: RegisterTable = [(0x400, 1), (0x401, 2)].into_iter().collect();
        table.merge([(0x401, 20), (0x402, 30)].into_iter().collect());

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0x400), Some(1));
        assert_eq!(table.get(0x401), Some(20));
        assert_eq!(table.get(0x402), Some(30));
    }

    #[test]
    fn iterates_in_address_order() {
        let table: RegisterTable = [(0x1052, 1), (0x0400, 2), (0x0604, 3)].into_iter().collect();
        let addresses: Vec<u16> = table.iter().map(|(a, _)| a.value()).collect();
        assert_eq!(addresses, vec![0x0400, 0x0604, 0x1052]);
    }
}
