//! ## IP protocol numbers
//!
//! The next-header byte of an ESP trailer carries the same IANA protocol number
//! as the IPv4 `protocol` and IPv6 `next header` fields. Only the protocols an
//! IPsec-carrying network commonly nests inside ESP are named here; any other
//! value is still a valid protocol id and is handled numerically.

/// Protocol which is encapsulated in the IP (or ESP) payload.
/// <https://www.iana.org/assignments/protocol-numbers/protocol-numbers.xhtml>
#[repr(u8)]
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub enum IpProto {
    /// IPv6 Hop-by-Hop Option
    HopOpt = 0,
    /// Internet Control Message
    Icmp = 1,
    /// Internet Group Management
    Igmp = 2,
    /// IPv4 encapsulation
    Ipv4 = 4,
    /// Transmission Control
    Tcp = 6,
    /// User Datagram
    Udp = 17,
    /// IPv6 encapsulation
    Ipv6 = 41,
    /// Routing Header for IPv6
    Ipv6Route = 43,
    /// Fragment Header for IPv6
    Ipv6Frag = 44,
    /// Reservation Protocol
    Rsvp = 46,
    /// Generic Routing Encapsulation
    Gre = 47,
    /// Encap Security Payload
    Esp = 50,
    /// Authentication Header
    Ah = 51,
    /// ICMP for IPv6
    Ipv6Icmp = 58,
    /// No Next Header for IPv6
    Ipv6NoNxt = 59,
    /// Destination Options for IPv6
    Ipv6Opts = 60,
    /// EIGRP
    Eigrp = 88,
    /// OSPFIGP
    Ospfigp = 89,
    /// Protocol Independent Multicast
    Pim = 103,
    /// IP Payload Compression Protocol
    IpComp = 108,
    /// Virtual Router Redundancy Protocol
    Vrrp = 112,
    /// Layer Two Tunneling Protocol Version 3
    L2tp = 115,
    /// Stream Control Transmission Protocol
    Sctp = 132,
    /// Mobility Header
    MobilityHeader = 135,
    /// Lightweight User Datagram
    UdpLite = 136,
    /// MPLS-in-IP
    Mpls = 137,
    /// Host Identity Protocol
    Hip = 139,
    /// Shim6 Protocol
    Shim6 = 140,
    /// Wrapped Encapsulating Security Payload
    Wesp = 141,
    /// Reserved
    #[default]
    Reserved = 255,
}

impl IpProto {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpProto::HopOpt => "hopopt",
            IpProto::Icmp => "icmp",
            IpProto::Igmp => "igmp",
            IpProto::Ipv4 => "ipv4",
            IpProto::Tcp => "tcp",
            IpProto::Udp => "udp",
            IpProto::Ipv6 => "ipv6",
            IpProto::Ipv6Route => "ipv6-route",
            IpProto::Ipv6Frag => "ipv6-frag",
            IpProto::Rsvp => "rsvp",
            IpProto::Gre => "gre",
            IpProto::Esp => "esp",
            IpProto::Ah => "ah",
            IpProto::Ipv6Icmp => "icmpv6",
            IpProto::Ipv6NoNxt => "ipv6-nonxt",
            IpProto::Ipv6Opts => "ipv6-opts",
            IpProto::Eigrp => "eigrp",
            IpProto::Ospfigp => "ospfigp",
            IpProto::Pim => "pim",
            IpProto::IpComp => "ipcomp",
            IpProto::Vrrp => "vrrp",
            IpProto::L2tp => "l2tp",
            IpProto::Sctp => "sctp",
            IpProto::MobilityHeader => "mobility-header",
            IpProto::UdpLite => "udplite",
            IpProto::Mpls => "mpls-in-ip",
            IpProto::Hip => "hip",
            IpProto::Shim6 => "shim6",
            IpProto::Wesp => "wesp",
            IpProto::Reserved => "reserved",
        }
    }

    pub fn try_from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(IpProto::HopOpt),
            1 => Some(IpProto::Icmp),
            2 => Some(IpProto::Igmp),
            4 => Some(IpProto::Ipv4),
            6 => Some(IpProto::Tcp),
            17 => Some(IpProto::Udp),
            41 => Some(IpProto::Ipv6),
            43 => Some(IpProto::Ipv6Route),
            44 => Some(IpProto::Ipv6Frag),
            46 => Some(IpProto::Rsvp),
            47 => Some(IpProto::Gre),
            50 => Some(IpProto::Esp),
            51 => Some(IpProto::Ah),
            58 => Some(IpProto::Ipv6Icmp),
            59 => Some(IpProto::Ipv6NoNxt),
            60 => Some(IpProto::Ipv6Opts),
            88 => Some(IpProto::Eigrp),
            89 => Some(IpProto::Ospfigp),
            103 => Some(IpProto::Pim),
            108 => Some(IpProto::IpComp),
            112 => Some(IpProto::Vrrp),
            115 => Some(IpProto::L2tp),
            132 => Some(IpProto::Sctp),
            135 => Some(IpProto::MobilityHeader),
            136 => Some(IpProto::UdpLite),
            137 => Some(IpProto::Mpls),
            139 => Some(IpProto::Hip),
            140 => Some(IpProto::Shim6),
            141 => Some(IpProto::Wesp),
            255 => Some(IpProto::Reserved),
            _ => None,
        }
    }

    /// Name of a raw protocol id, if it is one of the named protocols.
    ///
    /// Ids above 255 never appear on the wire and always map to `None`.
    pub fn name_of(id: u16) -> Option<&'static str> {
        u8::try_from(id)
            .ok()
            .and_then(Self::try_from_u8)
            .map(|p| p.as_str())
    }
}

impl core::fmt::Display for IpProto {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
