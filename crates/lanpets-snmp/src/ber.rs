//! A minimal ASN.1 BER codec covering exactly the SNMPv1 types this poller
//! speaks: INTEGER, OCTET STRING, NULL, OBJECT IDENTIFIER, SEQUENCE, and the
//! application-tagged `Counter32`/`Gauge32`/`TimeTicks`/`IpAddress` types a
//! router's agent returns from MIB-II and UCD-SNMP tables. No general ASN.1
//! crate on the registry targets this non-standard-padding-adjacent, very
//! narrow SNMPv1 subset cleanly, so it is hand-rolled — the same call the
//! original makes by reaching for `pyasn1`'s raw encoder/decoder rather than
//! a higher-level SNMP client library.

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_NULL: u8 = 0x05;
pub const TAG_OID: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;
pub const TAG_IP_ADDRESS: u8 = 0x40;
pub const TAG_COUNTER32: u8 = 0x41;
pub const TAG_GAUGE32: u8 = 0x42;
pub const TAG_TIME_TICKS: u8 = 0x43;

pub const TAG_GET_REQUEST: u8 = 0xA0;
pub const TAG_GET_NEXT_REQUEST: u8 = 0xA1;
pub const TAG_GET_RESPONSE: u8 = 0xA2;

#[derive(Debug, Clone)]
pub enum SnmpValue {
    Integer(i64),
    OctetString(Vec<u8>),
    Null,
    Oid(Vec<u32>),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    IpAddress([u8; 4]),
}

impl SnmpValue {
    /// The numeric reading a counter/gauge/timeticks/integer carries, for
    /// callers that don't care which of the four it came back as.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            SnmpValue::Integer(v) => u32::try_from(*v).ok(),
            SnmpValue::Counter32(v) | SnmpValue::Gauge32(v) | SnmpValue::TimeTicks(v) => Some(*v),
            _ => None,
        }
    }
}

fn encode_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let significant: Vec<u8> = bytes.into_iter().skip_while(|&b| b == 0).collect();
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(&significant);
}

pub fn encode_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    encode_length(content.len(), &mut out);
    out.extend_from_slice(content);
    out
}

/// Minimal two's-complement big-endian encoding, as ASN.1 INTEGER requires.
pub fn encode_integer(value: i64) -> Vec<u8> {
    let mut bytes = value.to_be_bytes().to_vec();
    while bytes.len() > 1 {
        let redundant_high_byte = (bytes[0] == 0x00 && bytes[1] & 0x80 == 0) || (bytes[0] == 0xFF && bytes[1] & 0x80 != 0);
        if !redundant_high_byte {
            break;
        }
        bytes.remove(0);
    }
    bytes
}

fn encode_base128(value: u32) -> Vec<u8> {
    let mut groups = vec![value & 0x7F];
    let mut remainder = value >> 7;
    while remainder > 0 {
        groups.push(remainder & 0x7F);
        remainder >>= 7;
    }
    groups.reverse();
    let last = groups.len() - 1;
    groups.iter().enumerate().map(|(i, &g)| if i == last { g as u8 } else { g as u8 | 0x80 }).collect()
}

/// `arcs` is the dotted-decimal OID split on `.`, e.g. `[1,3,6,1,2,1,1,1,0]`.
pub fn encode_oid(arcs: &[u32]) -> Vec<u8> {
    assert!(arcs.len() >= 2, "an OID needs at least two arcs");
    let mut out = vec![(arcs[0] * 40 + arcs[1]) as u8];
    for &arc in &arcs[2..] {
        out.extend(encode_base128(arc));
    }
    out
}

pub fn parse_oid_str(s: &str) -> Vec<u32> {
    s.split('.').filter_map(|part| part.parse().ok()).collect()
}

pub fn oid_to_string(arcs: &[u32]) -> String {
    arcs.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(".")
}

pub struct Tlv<'a> {
    pub tag: u8,
    pub content: &'a [u8],
}

pub fn parse_tlv(input: &[u8]) -> Result<(Tlv<'_>, &[u8]), String> {
    if input.is_empty() {
        return Err("empty BER input".into());
    }
    let tag = input[0];
    let (len, rest) = parse_length(&input[1..])?;
    if rest.len() < len {
        return Err("truncated BER content".into());
    }
    let (content, remainder) = rest.split_at(len);
    Ok((Tlv { tag, content }, remainder))
}

fn parse_length(input: &[u8]) -> Result<(usize, &[u8]), String> {
    let &first = input.first().ok_or("truncated BER length")?;
    if first & 0x80 == 0 {
        return Ok((first as usize, &input[1..]));
    }
    let n = (first & 0x7F) as usize;
    if input.len() < 1 + n {
        return Err("truncated long-form BER length".into());
    }
    let mut len = 0usize;
    for &b in &input[1..1 + n] {
        len = (len << 8) | b as usize;
    }
    Ok((len, &input[1 + n..]))
}

pub fn decode_integer(content: &[u8]) -> i64 {
    let mut value: i64 = if content.first().is_some_and(|b| b & 0x80 != 0) { -1 } else { 0 };
    for &b in content {
        value = (value << 8) | b as i64;
    }
    value
}

pub fn decode_u32(content: &[u8]) -> u32 {
    let mut value: u32 = 0;
    for &b in content {
        value = (value << 8) | b as u32;
    }
    value
}

pub fn decode_oid(content: &[u8]) -> Vec<u32> {
    let Some(&first) = content.first() else { return Vec::new() };
    let mut arcs = vec![(first / 40) as u32, (first % 40) as u32];
    let mut value: u32 = 0;
    for &b in &content[1..] {
        value = (value << 7) | (b & 0x7F) as u32;
        if b & 0x80 == 0 {
            arcs.push(value);
            value = 0;
        }
    }
    arcs
}

pub fn decode_value(tag: u8, content: &[u8]) -> SnmpValue {
    match tag {
        TAG_INTEGER => SnmpValue::Integer(decode_integer(content)),
        TAG_OCTET_STRING => SnmpValue::OctetString(content.to_vec()),
        TAG_NULL => SnmpValue::Null,
        TAG_OID => SnmpValue::Oid(decode_oid(content)),
        TAG_COUNTER32 => SnmpValue::Counter32(decode_u32(content)),
        TAG_GAUGE32 => SnmpValue::Gauge32(decode_u32(content)),
        TAG_TIME_TICKS => SnmpValue::TimeTicks(decode_u32(content)),
        TAG_IP_ADDRESS => {
            let mut bytes = [0u8; 4];
            let n = content.len().min(4);
            bytes[..n].copy_from_slice(&content[..n]);
            SnmpValue::IpAddress(bytes)
        }
        _ => SnmpValue::OctetString(content.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_round_trips_through_minimal_encoding() {
        for value in [0i64, 1, -1, 127, 128, -128, -129, 255, 65535, -70000] {
            let encoded = encode_integer(value);
            assert_eq!(decode_integer(&encoded), value, "value {value}");
        }
    }

    #[test]
    fn oid_round_trips() {
        let arcs = parse_oid_str("1.3.6.1.2.1.1.1.0");
        let encoded = encode_oid(&arcs);
        assert_eq!(decode_oid(&encoded), arcs);
    }

    #[test]
    fn tlv_round_trips_nested_sequence() {
        let inner = encode_tlv(TAG_INTEGER, &encode_integer(42));
        let outer = encode_tlv(TAG_SEQUENCE, &inner);
        let (tlv, rest) = parse_tlv(&outer).unwrap();
        assert!(rest.is_empty());
        assert_eq!(tlv.tag, TAG_SEQUENCE);
        let (inner_tlv, rest) = parse_tlv(tlv.content).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decode_integer(inner_tlv.content), 42);
    }

    #[test]
    fn long_form_length_round_trips() {
        let content = vec![0xAAu8; 200];
        let encoded = encode_tlv(TAG_OCTET_STRING, &content);
        let (tlv, rest) = parse_tlv(&encoded).unwrap();
        assert!(rest.is_empty());
        assert_eq!(tlv.content, content.as_slice());
    }
}
