//! # Object Identifiers
//!
//! An [`Oid`] is an ordered list of arcs (`1.3.6.1.2.1.1.2.0`). The type is
//! used as a map key and for subtree checks during table walks.

use std::fmt;
use std::str::FromStr;

use crate::error::DecodeError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Oid(Vec<u32>);

impl Oid {
    pub fn new(arcs: Vec<u32>) -> Self {
        Self(arcs)
    }

    pub fn from_slice(arcs: &[u32]) -> Self {
        Self(arcs.to_vec())
    }

    pub fn arcs(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new OID with `arc` appended.
    pub fn child(&self, arc: u32) -> Self {
        let mut arcs = self.0.clone();
        arcs.push(arc);
        Self(arcs)
    }

    /// Returns a new OID with every arc of `suffix` appended.
    pub fn extend(&self, suffix: &[u32]) -> Self {
        let mut arcs = self.0.clone();
        arcs.extend_from_slice(suffix);
        Self(arcs)
    }

    /// True if `self` lies inside the subtree rooted at `base`.
    pub fn starts_with(&self, base: &Oid) -> bool {
        self.0.starts_with(&base.0)
    }

    /// The first BER sub-identifier, which packs the first two arcs.
    ///
    /// Only 0, 1 and 2 exist at the top level, and below 0 and 1 the second
    /// arc stays under 40. Anything else has no wire form.
    pub fn leading_subidentifier(&self) -> Option<u32> {
        match self.0.as_slice() {
            [] => None,
            [a, ..] if *a > 2 => None,
            [a] => Some(a * 40),
            [a, b, ..] if *a < 2 && *b >= 40 => None,
            [a, b, ..] => (a * 40).checked_add(*b),
        }
    }

    pub fn is_encodable(&self) -> bool {
        self.leading_subidentifier().is_some()
    }

    /// The arcs following `base`, if `self` is inside that subtree.
    pub fn suffix(&self, base: &Oid) -> Option<&[u32]> {
        if self.starts_with(base) {
            Some(&self.0[base.0.len()..])
        } else {
            None
        }
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{arc}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Oid {
    type Err = DecodeError;

    /// Parses dotted notation. A single leading dot is accepted (`.1.3.6`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('.');
        if trimmed.is_empty() {
            return Err(DecodeError::BadOid(s.to_string()));
        }
        trimmed
            .split('.')
            .map(|arc| arc.parse::<u32>())
            .collect::<Result<Vec<u32>, _>>()
            .map(Oid)
            .map_err(|_| DecodeError::BadOid(s.to_string()))
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self::from_slice(arcs)
    }
}

/// Rewrites an enterprise OID to its short mnemonic form.
///
/// `1.3.6.1.4.1.9.1.516` becomes `ent.9.1.516`; anything outside the
/// enterprises subtree is returned unchanged.
pub fn enterprise_mnemonic(oid_text: &str) -> String {
    const PREFIX: &str = "1.3.6.1.4.1";
    let text = oid_text.trim().trim_start_matches('.');
    match text.strip_prefix(PREFIX) {
        Some(rest) if rest.is_empty() || rest.starts_with('.') => format!("ent{rest}"),
        _ => text.to_string(),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
