//! The router's login endpoint implements a nonstandard RSA padding: the
//! plaintext is zero-padded to the modulus width and encrypted as a single
//! raw modular exponentiation, with none of PKCS#1 v1.5's random padding
//! bytes. A standard RSA/PKCS#1 crate would produce a different ciphertext
//! the router wouldn't accept.

use num_bigint::BigUint;

/// `em = message || 0x00 * (k - len(message))`, `c = em^e mod n`, both `em`
/// and `c` fixed at `k` bytes (`k` = the modulus's byte width).
pub fn encrypt(message: &[u8], modulus: &BigUint, exponent: &BigUint) -> Result<Vec<u8>, String> {
    let k = modulus.bits().div_ceil(8) as usize;
    if message.len() > k {
        return Err(format!("plaintext of {} bytes too long for a {k}-byte modulus", message.len()));
    }
    let mut em = message.to_vec();
    em.resize(k, 0u8);

    let em_int = BigUint::from_bytes_be(&em);
    let c_int = em_int.modpow(exponent, modulus);

    let mut c = c_int.to_bytes_be();
    if c.len() < k {
        let mut padded = vec![0u8; k - c.len()];
        padded.extend_from_slice(&c);
        c = padded;
    }
    Ok(c)
}

pub fn parse_hex_biguint(hex: &str) -> Result<BigUint, String> {
    BigUint::parse_bytes(hex.as_bytes(), 16).ok_or_else(|| format!("invalid hex integer: {hex}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_plaintext_with_trailing_zero_bytes_to_modulus_width() {
        // n = 143 (11*13), e = 7 — tiny toy key, one byte wide.
        let n = BigUint::from(143u32);
        let e = BigUint::from(7u32);
        let ciphertext = encrypt(&[9u8], &n, &e).unwrap();
        assert_eq!(ciphertext.len(), 1);
        let expected = BigUint::from(9u32).modpow(&e, &n);
        assert_eq!(BigUint::from_bytes_be(&ciphertext), expected);
    }

    #[test]
    fn rejects_plaintext_wider_than_modulus() {
        let n = BigUint::from(143u32);
        let e = BigUint::from(7u32);
        assert!(encrypt(&[1, 2], &n, &e).is_err());
    }

    #[test]
    fn hex_integer_round_trips() {
        assert_eq!(parse_hex_biguint("ff").unwrap(), BigUint::from(255u32));
    }
}
