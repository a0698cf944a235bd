//! Bus endpoint: the five channels of one AXI4 port.

use axiflow::Signal;
use axiflow_std::VrChannel;

use crate::{Addr, BusConfig, RRes, WReq, WRes};

/// Who drives a wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Driven by the initiator.
    MasterToSlave,
    /// Driven by the target.
    SlaveToMaster,
}

/// One wire of the endpoint contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    /// Wire name, e.g. `aw_addr`.
    pub name: String,
    /// Width in bits.
    pub width: usize,
    /// Driver.
    pub direction: Direction,
}

/// AXI4 endpoint.
///
/// The same struct is used on both sides of a connection: an initiator drives `aw`, `w`, `ar`
/// and the ready of `b` and `r`; a target drives the rest.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Endpoint {
    /// Write address.
    pub aw: VrChannel<Addr>,
    /// Write data.
    pub w: VrChannel<WReq>,
    /// Write response.
    pub b: VrChannel<WRes>,
    /// Read address.
    pub ar: VrChannel<Addr>,
    /// Read data.
    pub r: VrChannel<RRes>,
}

impl Endpoint {
    /// Point-to-point connection: ties same-named wires of an initiator-side and a target-side
    /// endpoint without added logic.
    pub fn connect(master: &mut Endpoint, slave: &mut Endpoint) {
        VrChannel::connect(&mut master.aw, &mut slave.aw);
        VrChannel::connect(&mut master.w, &mut slave.w);
        VrChannel::connect(&mut master.ar, &mut slave.ar);
        VrChannel::connect(&mut slave.b, &mut master.b);
        VrChannel::connect(&mut slave.r, &mut master.r);
    }

    /// Appends the bit image of every channel.
    pub fn probe(&self, bits: &mut Vec<bool>) {
        self.aw.probe(bits);
        self.w.probe(bits);
        self.b.probe(bits);
        self.ar.probe(bits);
        self.r.probe(bits);
    }

    /// Wire contract for the given bus parameters.
    ///
    /// `id`, `addr`, `data` and `strb` take their configured widths; every other field has the
    /// fixed width of the protocol.
    pub fn ports(config: &BusConfig) -> Vec<Port> {
        fn channel<V: Signal>(name: &str, forward: Direction, config: &BusConfig) -> Vec<Port> {
            let backward = match forward {
                Direction::MasterToSlave => Direction::SlaveToMaster,
                Direction::SlaveToMaster => Direction::MasterToSlave,
            };
            VrChannel::<V>::port_decls()
                .flatten(Some(name.to_string()))
                .into_iter()
                .filter_map(|(port, width)| port.map(|port| (port, width)))
                .map(|(port, width)| {
                    let field = &port[name.len() + 1..];
                    let width = match field {
                        "id" => config.id_width,
                        "addr" => config.addr_width,
                        "data" => config.data_width,
                        "strb" => config.strb_width(),
                        _ => width,
                    };
                    let direction = if field == "ready" { backward } else { forward };
                    Port { name: port, width, direction }
                })
                .collect()
        }

        let mut ports = Vec::new();
        ports.extend(channel::<Addr>("aw", Direction::MasterToSlave, config));
        ports.extend(channel::<WReq>("w", Direction::MasterToSlave, config));
        ports.extend(channel::<WRes>("b", Direction::SlaveToMaster, config));
        ports.extend(channel::<Addr>("ar", Direction::MasterToSlave, config));
        ports.extend(channel::<RRes>("r", Direction::SlaveToMaster, config));
        ports
    }
}
