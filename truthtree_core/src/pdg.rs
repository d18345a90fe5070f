//! PDG particle-code classification.

/// Splits `|pdgid|` into decimal digits, least significant first.
fn digits(pdgid: i32) -> Vec<u32> {
    let mut n = pdgid.unsigned_abs();
    let mut out = Vec::new();
    while n > 0 {
        out.push(n % 10);
        n /= 10;
    }
    out
}

/// Hadrons start at the neutral pion (111).
pub fn is_hadron(pdgid: i32) -> bool {
    pdgid.unsigned_abs() >= 111
}

/// Mesons have a zero thousands digit and a non-zero hundreds digit.
pub fn is_meson(pdgid: i32) -> bool {
    let d = digits(pdgid);
    let hundreds = d.get(2).copied().unwrap_or(0);
    let thousands = d.get(3).copied().unwrap_or(0);
    hundreds > 0 && thousands == 0
}

pub fn is_baryon(pdgid: i32) -> bool {
    is_hadron(pdgid) && !is_meson(pdgid)
}

/// Short name for the particle codes the viewers label explicitly.
pub fn particle_name(pdgid: i32) -> Option<&'static str> {
    let name = match pdgid.unsigned_abs() {
        11 => "electron",
        13 => "muon",
        22 => "photon",
        111 => "pi0",
        211 => "pion",
        130 | 310 | 321 => "kaon",
        2112 => "neutron",
        2212 => "proton",
        _ => return None,
    };
    Some(name)
}
