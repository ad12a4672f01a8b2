//! Schematic netlist model
//!
//! A [`Netlist`] maps net names to [`Net`]s, a net maps designators to the
//! [`Connection`] holding the pins of that component on the net. Appending
//! never creates duplicates: nets are unique by name, connections by
//! designator and pins are kept as a sorted set.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use indexmap::IndexMap;
use serde::{ser::SerializeStruct, Serialize, Serializer};

use crate::error::Error;

/// Sorted set of pin names of one connection
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Pins(Vec<String>);

impl Pins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pin keeping the set sorted. Returns false if it was already present.
    pub fn insert(&mut self, pin: &str) -> bool {
        match self.0.binary_search_by(|p| p.as_str().cmp(pin)) {
            Ok(_) => false,
            Err(pos) => {
                self.0.insert(pos, pin.to_owned());
                true
            }
        }
    }

    pub fn merge(&mut self, other: &Pins) {
        for pin in other.iter() {
            self.insert(pin);
        }
    }

    pub fn contains(&self, pin: &str) -> bool {
        self.0.binary_search_by(|p| p.as_str().cmp(pin)).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Pins {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut pins = Pins::new();
        for pin in iter {
            pins.insert(pin.as_ref());
        }
        pins
    }
}

impl Display for Pins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(","))
    }
}

/// The pins of one component on one net
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Connection {
    designator: String,
    pins: Pins,
}

impl Connection {
    pub fn new(designator: &str, pins: Pins) -> Self {
        Self {
            designator: designator.to_owned(),
            pins,
        }
    }

    pub fn designator(&self) -> &str {
        &self.designator
    }

    pub fn pins(&self) -> &Pins {
        &self.pins
    }

    pub fn append_pin(&mut self, pin: &str) -> bool {
        self.pins.insert(pin)
    }
}

/// A named net and the components connected to it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Net {
    name: String,
    connections: IndexMap<String, Connection>,
}

impl Net {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            connections: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a connection, joining its pins with an existing connection of the same designator
    pub fn append(&mut self, connection: Connection) {
        match self.connections.get_mut(connection.designator()) {
            Some(existing) => existing.pins.merge(&connection.pins),
            None => {
                self.connections
                    .insert(connection.designator.clone(), connection);
            }
        }
    }

    pub fn append_pin(&mut self, designator: &str, pin: &str) {
        match self.connections.get_mut(designator) {
            Some(connection) => {
                connection.append_pin(pin);
            }
            None => {
                let connection = Connection::new(designator, [pin].into_iter().collect());
                self.connections.insert(designator.to_owned(), connection);
            }
        }
    }

    pub fn connection(&self, designator: &str) -> Option<&Connection> {
        self.connections.get(designator)
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn designators(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn to_dict(&self) -> IndexMap<String, Vec<String>> {
        self.connections
            .values()
            .map(|c| (c.designator.clone(), c.pins.to_vec()))
            .collect()
    }
}

impl Serialize for Net {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Connections<'a>(&'a IndexMap<String, Connection>);

        impl Serialize for Connections<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_seq(self.0.values())
            }
        }

        let mut s = serializer.serialize_struct("Net", 2)?;
        s.serialize_field("net", &self.name)?;
        s.serialize_field("connections", &Connections(&self.connections))?;
        s.end()
    }
}

impl Display for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {{", self.name)?;
        for (i, connection) in self.connections().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", connection.designator, connection.pins)?;
        }
        write!(f, "}}")
    }
}

/// The full netlist
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Netlist {
    nets: IndexMap<String, Net>,
}

impl Netlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a net, merging it into an existing net of the same name
    pub fn append(&mut self, net: Net) {
        match self.nets.get_mut(net.name()) {
            Some(existing) => {
                for connection in net.connections.into_values() {
                    existing.append(connection);
                }
            }
            None => {
                self.nets.insert(net.name.clone(), net);
            }
        }
    }

    /// Connect `pin` of `designator` to `net`, creating whatever is missing.
    ///
    /// Appending the same triple again has no effect.
    pub fn append_pin(&mut self, net: &str, designator: &str, pin: &str) {
        match self.nets.get_mut(net) {
            Some(existing) => existing.append_pin(designator, pin),
            None => {
                let mut new = Net::new(net);
                new.append_pin(designator, pin);
                self.nets.insert(net.to_owned(), new);
            }
        }
    }

    pub fn append_pins<I, S>(&mut self, net: &str, designator: &str, pins: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pin in pins {
            self.append_pin(net, designator, pin.as_ref());
        }
    }

    pub fn merge(&mut self, other: Netlist) {
        for net in other.nets.into_values() {
            self.append(net);
        }
    }

    pub fn net(&self, name: &str) -> Option<&Net> {
        self.nets.get(name)
    }

    pub fn nets(&self) -> impl Iterator<Item = &Net> {
        self.nets.values()
    }

    pub fn net_names(&self) -> impl Iterator<Item = &str> {
        self.nets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }

    /// Collect the pins of every designator starting with `prefix`, with the net of each pin.
    ///
    /// Nets are visited in insertion order, so when a pin shows up on several
    /// nets the net visited last is kept.
    pub fn filter_designator(&self, prefix: &str) -> Designators {
        let mut designators = Designators::new();
        for net in self.nets() {
            for connection in net.connections() {
                if !connection.designator.starts_with(prefix) {
                    continue;
                }
                for pin in connection.pins.iter() {
                    designators.append(&connection.designator, pin, &net.name);
                }
            }
        }
        designators
    }

    pub fn to_dict(&self) -> IndexMap<String, IndexMap<String, Vec<String>>> {
        self.nets
            .values()
            .map(|net| (net.name.clone(), net.to_dict()))
            .collect()
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for Netlist {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.nets.values())
    }
}

impl Display for Netlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for net in self.nets() {
            writeln!(f, "{}", net)?;
        }
        Ok(())
    }
}

/// Pins of one component across all nets, each pin with its net
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Designator {
    designator: String,
    pin_nets: BTreeMap<String, String>,
}

impl Designator {
    pub fn new(designator: &str) -> Self {
        Self {
            designator: designator.to_owned(),
            pin_nets: BTreeMap::new(),
        }
    }

    pub fn designator(&self) -> &str {
        &self.designator
    }

    /// Record the net of `pin`, replacing any net recorded before
    pub fn append(&mut self, pin: &str, net: &str) {
        self.pin_nets.insert(pin.to_owned(), net.to_owned());
    }

    pub fn net(&self, pin: &str) -> Option<&str> {
        self.pin_nets.get(pin).map(String::as_str)
    }

    pub fn pin_nets(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pin_nets.iter().map(|(p, n)| (p.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pin_nets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pin_nets.is_empty()
    }
}

impl Serialize for Designator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct PinNet<'a> {
            pin: &'a str,
            net: &'a str,
        }

        let pin_nets: Vec<_> = self.pin_nets().map(|(pin, net)| PinNet { pin, net }).collect();
        let mut s = serializer.serialize_struct("Designator", 2)?;
        s.serialize_field("designator", &self.designator)?;
        s.serialize_field("pin_nets", &pin_nets)?;
        s.end()
    }
}

/// Result of [`Netlist::filter_designator`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Designators {
    items: IndexMap<String, Designator>,
}

impl Designators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, designator: &str, pin: &str, net: &str) {
        self.items
            .entry(designator.to_owned())
            .or_insert_with(|| Designator::new(designator))
            .append(pin, net);
    }

    pub fn get(&self, designator: &str) -> Option<&Designator> {
        self.items.get(designator)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Designator> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_dict(&self) -> IndexMap<String, BTreeMap<String, String>> {
        self.items
            .values()
            .map(|d| (d.designator.clone(), d.pin_nets.clone()))
            .collect()
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for Designators {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn dict(entries: &[(&str, &[&str])]) -> IndexMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(d, pins)| (d.to_string(), pins.iter().map(|p| p.to_string()).collect()))
            .collect()
    }

    fn template_netlist() -> Netlist {
        let mut netlist = Netlist::new();
        netlist.append_pins("NetR1_1", "R1", ["1", "2"]);
        assert_eq!(netlist.len(), 1);
        netlist
    }

    #[test]
    fn connections_merge_by_designator() {
        let mut net = Net::new("N");
        net.append(Connection::new("D1", ["1", "2"].into_iter().collect()));
        net.append(Connection::new("D2", ["3", "4"].into_iter().collect()));
        net.append(Connection::new("D3", ["5", "6"].into_iter().collect()));
        net.append(Connection::new("D3", ["7"].into_iter().collect()));
        net.append(Connection::new("D3", ["8"].into_iter().collect()));
        net.append(Connection::new("D3", ["8"].into_iter().collect()));
        assert_eq!(
            net.to_dict(),
            dict(&[("D1", &["1", "2"][..]), ("D2", &["3", "4"]), ("D3", &["5", "6", "7", "8"])])
        );
        assert_eq!(net.len(), 3);
    }

    #[test]
    fn duplicated_net_designator_and_pins() {
        let mut netlist = template_netlist();
        netlist.append_pins("NetR1_1", "R1", ["1", "2"]);
        assert_eq!(netlist.len(), 1);
        assert_eq!(netlist.net("NetR1_1").unwrap().to_dict(), dict(&[("R1", &["1", "2"])]));
    }

    #[test]
    fn duplicated_designator_and_pins_on_other_net() {
        let mut netlist = template_netlist();
        netlist.append_pins("NetR2_2", "R1", ["1", "2"]);
        assert_eq!(netlist.len(), 2);
        assert_eq!(netlist.net("NetR1_1").unwrap().to_dict(), dict(&[("R1", &["1", "2"])]));
        assert_eq!(netlist.net("NetR2_2").unwrap().to_dict(), dict(&[("R1", &["1", "2"])]));
    }

    #[rstest]
    #[case(&["3", "4"], &["1", "2", "3", "4"])]
    #[case(&["7", "4"], &["1", "2", "4", "7"])]
    #[case(&["A44", "A4"], &["1", "2", "A4", "A44"])]
    #[case(&["10", "2"], &["1", "10", "2"])]
    fn pins_are_sorted_lexicographically(#[case] extra: &[&str], #[case] expected: &[&str]) {
        let mut netlist = template_netlist();
        netlist.append_pins("NetR1_1", "R1", extra);
        let pins = netlist.net("NetR1_1").unwrap().connection("R1").unwrap().pins();
        assert_eq!(pins.as_slice(), expected);
    }

    #[test]
    fn pin_merge_is_order_independent() {
        let mut forward = Netlist::new();
        forward.append_pins("N", "U1", ["B2", "1", "A1", "1"]);
        let mut backward = Netlist::new();
        backward.append_pins("N", "U1", ["1", "A1", "1", "B2"]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn reappending_a_pin_is_a_noop() {
        let mut netlist = Netlist::new();
        for _ in 0..5 {
            netlist.append_pin("GND", "C1", "2");
        }
        let net = netlist.net("GND").unwrap();
        assert_eq!(net.len(), 1);
        assert_eq!(net.connection("C1").unwrap().pins().len(), 1);
    }

    #[test]
    fn merge_netlists() {
        let mut first = template_netlist();
        let mut second = Netlist::new();
        second.append_pins("NetR1_1", "R1", ["3"]);
        second.append_pins("GND", "C1", ["2"]);
        first.merge(second);
        assert_eq!(first.net_names().collect::<Vec<_>>(), ["NetR1_1", "GND"]);
        assert_eq!(
            first.net("NetR1_1").unwrap().connection("R1").unwrap().pins().as_slice(),
            ["1", "2", "3"]
        );
    }

    #[test]
    fn large_netlist() {
        let mut netlist = Netlist::new();
        for i in 0..1000 {
            let net = format!("NetR{i}_1");
            let designator = format!("R{i}");
            for pin in 1..5 {
                netlist.append_pin(&net, &designator, &pin.to_string());
            }
        }
        assert_eq!(netlist.len(), 1000);
    }

    #[test]
    fn filter_designator_matches_prefix() {
        let mut netlist = Netlist::new();
        netlist.append_pin("N1", "R1", "1");
        netlist.append_pin("N1", "RN1", "3");
        netlist.append_pin("N2", "R2", "1");
        netlist.append_pin("N2", "C1", "1");

        let designators = netlist.filter_designator("R");
        assert_eq!(designators.len(), 3);
        assert!(designators.get("R1").is_some());
        assert!(designators.get("R2").is_some());
        assert!(designators.get("RN1").is_some());
        assert!(designators.get("C1").is_none());

        let designators = netlist.filter_designator("RN");
        assert_eq!(designators.len(), 1);
    }

    #[test]
    fn filter_designator_collects_pins_across_nets() {
        let mut netlist = Netlist::new();
        netlist.append_pin("VCC", "U1", "8");
        netlist.append_pin("GND", "U1", "4");
        netlist.append_pin("OUT", "U1", "3");

        let designators = netlist.filter_designator("U1");
        let u1 = designators.get("U1").unwrap();
        assert_eq!(
            u1.pin_nets().collect::<Vec<_>>(),
            [("3", "OUT"), ("4", "GND"), ("8", "VCC")]
        );
    }

    #[test]
    fn filter_designator_last_net_wins() {
        let mut netlist = Netlist::new();
        netlist.append_pin("FIRST", "U1", "1");
        netlist.append_pin("SECOND", "U1", "1");
        let designators = netlist.filter_designator("U");
        assert_eq!(designators.get("U1").unwrap().net("1"), Some("SECOND"));
    }

    #[test]
    fn netlist_json() {
        let mut netlist = Netlist::new();
        netlist.append_pins("NetD1_2", "R1", ["1"]);
        netlist.append_pins("NetD1_2", "D1", ["2"]);
        netlist.append_pins("GND", "J1", ["2"]);
        let json = netlist.to_json().unwrap();
        assert_eq!(
            json,
            r#"[{"net":"NetD1_2","connections":[{"designator":"R1","pins":["1"]},{"designator":"D1","pins":["2"]}]},{"net":"GND","connections":[{"designator":"J1","pins":["2"]}]}]"#
        );
    }

    #[test]
    fn designators_json() {
        let mut netlist = Netlist::new();
        netlist.append_pin("GND", "U1", "2");
        netlist.append_pin("VCC", "U1", "1");
        let json = netlist.filter_designator("U").to_json().unwrap();
        assert_eq!(
            json,
            r#"[{"designator":"U1","pin_nets":[{"pin":"1","net":"VCC"},{"pin":"2","net":"GND"}]}]"#
        );
    }
}
