//! Ledger identities (principals) and their c32check address form.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;
use tracing::instrument;

const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Mainnet single-signature address version (`SP…`).
pub const MAINNET_SINGLESIG: u8 = 22;
/// Testnet single-signature address version (`ST…`).
pub const TESTNET_SINGLESIG: u8 = 26;

/// Error parsing an address string into an [`Identity`].
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum IdentityError {
    /// Address does not start with `S`.
    #[display("Address must start with 'S'")]
    MissingPrefix,
    /// Character outside the c32 alphabet.
    #[display("Invalid c32 character {:?}", _0)]
    InvalidCharacter(#[error(not(source))] char),
    /// Version byte does not fit one c32 digit.
    #[display("Address version {} is out of range", _0)]
    InvalidVersion(#[error(not(source))] u8),
    /// Payload of the wrong size.
    #[display("Invalid address payload length {}", _0)]
    InvalidLength(#[error(not(source))] usize),
    /// Checksum does not match the payload.
    #[display("Address checksum mismatch")]
    BadChecksum,
    /// Contract name is empty, too long, or not ASCII.
    #[display("Invalid contract name {:?}", _0)]
    InvalidContractName(#[error(not(source))] String),
}

/// A principal on the ledger: a standard account or a deployed contract.
///
/// Compared structurally (version, hash, contract name), never as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity {
    version: u8,
    hash160: [u8; 20],
    contract: Option<String>,
}

impl Identity {
    /// Creates a standard (account) identity.
    ///
    /// The version must fit one c32 digit (`0..32`).
    pub fn standard(version: u8, hash160: [u8; 20]) -> Result<Self, IdentityError> {
        if usize::from(version) >= C32_ALPHABET.len() {
            return Err(IdentityError::InvalidVersion(version));
        }
        Ok(Self {
            version,
            hash160,
            contract: None,
        })
    }

    /// Qualifies this identity with a contract name.
    pub fn with_contract(self, name: impl Into<String>) -> Result<Self, IdentityError> {
        let name = name.into();
        if name.is_empty() || name.len() > 128 || !name.is_ascii() {
            return Err(IdentityError::InvalidContractName(name));
        }
        Ok(Self {
            contract: Some(name),
            ..self
        })
    }

    /// Address version byte.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// 20-byte account hash.
    pub fn hash160(&self) -> &[u8; 20] {
        &self.hash160
    }

    /// Contract name, for contract principals.
    pub fn contract_name(&self) -> Option<&str> {
        self.contract.as_deref()
    }

    /// The account part of this identity (drops any contract name).
    pub fn account(&self) -> Identity {
        Identity {
            version: self.version,
            hash160: self.hash160,
            contract: None,
        }
    }

    /// Renders the c32check address of the account part.
    #[instrument(skip(self))]
    pub fn address(&self) -> String {
        let mut payload = self.hash160.to_vec();
        payload.extend_from_slice(&checksum(self.version, &self.hash160));
        format!(
            "S{}{}",
            C32_ALPHABET[self.version as usize] as char,
            c32_encode(&payload)
        )
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.contract {
            Some(name) => write!(f, "{}.{}", self.address(), name),
            None => f.write_str(&self.address()),
        }
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    #[instrument]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, contract) = match s.split_once('.') {
            Some((address, name)) => (address, Some(name)),
            None => (s, None),
        };
        let body = address
            .strip_prefix('S')
            .ok_or(IdentityError::MissingPrefix)?;
        let mut chars = body.chars();
        let version_char = chars.next().ok_or(IdentityError::InvalidLength(0))?;
        let version = c32_digit(version_char)?;
        let decoded = c32_decode(chars.as_str())?;
        if decoded.len() != 24 {
            return Err(IdentityError::InvalidLength(decoded.len()));
        }
        let (hash, sum) = decoded.split_at(20);
        if sum != checksum(version, hash) {
            return Err(IdentityError::BadChecksum);
        }
        let mut hash160 = [0u8; 20];
        hash160.copy_from_slice(hash);
        let identity = Identity::standard(version, hash160)?;
        match contract {
            Some(name) => identity.with_contract(name),
            None => Ok(identity),
        }
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.to_string()
    }
}

fn checksum(version: u8, data: &[u8]) -> [u8; 4] {
    let mut hasher = Sha256::new();
    hasher.update([version]);
    hasher.update(data);
    let first = hasher.finalize();
    let second = Sha256::digest(first);
    let mut out = [0u8; 4];
    out.copy_from_slice(&second[..4]);
    out
}

fn c32_digit(c: char) -> Result<u8, IdentityError> {
    let normalized = match c.to_ascii_uppercase() {
        'O' => '0',
        'I' | 'L' => '1',
        other => other,
    };
    C32_ALPHABET
        .iter()
        .position(|&b| b as char == normalized)
        .map(|i| i as u8)
        .ok_or(IdentityError::InvalidCharacter(c))
}

/// Big-endian base-32 encoding that keeps leading zero bytes as leading `0`s.
fn c32_encode(input: &[u8]) -> String {
    let mut out = Vec::new();
    let mut carry: u32 = 0;
    let mut carry_bits: u32 = 0;

    for &byte in input.iter().rev() {
        carry |= u32::from(byte) << carry_bits;
        carry_bits += 8;
        while carry_bits >= 5 {
            out.push(C32_ALPHABET[(carry & 0x1f) as usize]);
            carry >>= 5;
            carry_bits -= 5;
        }
    }
    if carry_bits > 0 {
        out.push(C32_ALPHABET[(carry & 0x1f) as usize]);
    }
    while out.last() == Some(&b'0') {
        out.pop();
    }
    for _ in input.iter().take_while(|&&b| b == 0) {
        out.push(b'0');
    }
    out.iter().rev().map(|&b| b as char).collect()
}

fn c32_decode(input: &str) -> Result<Vec<u8>, IdentityError> {
    let digits = input.chars().map(c32_digit).collect::<Result<Vec<_>, _>>()?;
    let mut out = Vec::new();
    let mut carry: u32 = 0;
    let mut carry_bits: u32 = 0;

    for &digit in digits.iter().rev() {
        carry |= u32::from(digit) << carry_bits;
        carry_bits += 5;
        if carry_bits >= 8 {
            out.push((carry & 0xff) as u8);
            carry >>= 8;
            carry_bits -= 8;
        }
    }
    if carry_bits > 0 {
        out.push(carry as u8);
    }
    while out.last() == Some(&0) {
        out.pop();
    }
    for _ in digits.iter().take_while(|&&d| d == 0) {
        out.push(0);
    }
    out.reverse();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_from_hex(s: &str) -> [u8; 20] {
        let mut out = [0u8; 20];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).unwrap();
            out[i] = u8::from_str_radix(pair, 16).unwrap();
        }
        out
    }

    #[test]
    fn test_known_mainnet_address() {
        let id = Identity::standard(
            MAINNET_SINGLESIG,
            hash_from_hex("a46ff88886c2ef9762d970b4d2c63678835bd39d"),
        )
        .unwrap();
        assert_eq!(id.to_string(), "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7");
    }

    #[test]
    fn test_parse_display_round_trip() {
        let text = "ST2HYQ0YP5YK1DF7HF859G5HDQ4JKRRFFBT48SM0M";
        let id: Identity = text.parse().expect("valid testnet address");
        assert_eq!(id.version(), TESTNET_SINGLESIG);
        assert_eq!(id.to_string(), text);
    }

    #[test]
    fn test_leading_zero_hash_survives() {
        let mut hash = [0u8; 20];
        hash[19] = 7;
        let id = Identity::standard(TESTNET_SINGLESIG, hash).unwrap();
        let parsed: Identity = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_contract_principal() {
        let id: Identity = "ST2HYQ0YP5YK1DF7HF859G5HDQ4JKRRFFBT48SM0M.tic-tac-toe"
            .parse()
            .unwrap();
        assert_eq!(id.contract_name(), Some("tic-tac-toe"));
        assert_ne!(id, id.account());
    }

    #[test]
    fn test_checksum_mismatch_rejected() {
        let result = "ST2HYQ0YP5YK1DF7HF859G5HDQ4JKRRFFBT48SM0N".parse::<Identity>();
        assert_eq!(result, Err(IdentityError::BadChecksum));
    }

    #[test]
    fn test_version_beyond_five_bits_rejected() {
        assert_eq!(
            Identity::standard(0x3a, [7; 20]),
            Err(IdentityError::InvalidVersion(0x3a))
        );
        let highest = Identity::standard(31, [7; 20]).unwrap();
        assert_eq!(highest.version(), 31);
        assert_eq!(highest.to_string().parse::<Identity>(), Ok(highest));
    }

    #[test]
    fn test_missing_prefix_rejected() {
        assert_eq!(
            "XT2HYQ0YP5YK1DF7HF859G5HDQ4JKRRFFBT48SM0M".parse::<Identity>(),
            Err(IdentityError::MissingPrefix)
        );
    }
}
